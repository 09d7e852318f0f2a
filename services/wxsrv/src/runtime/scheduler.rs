//! Poll scheduler
//!
//! One poll cycle per tick: connect, send every enabled request in catalog
//! order on the same connection, route each response by its header, then
//! normalize and publish what was collected. Cycles never overlap; a cycle
//! still talking to the station when the next tick is due loses its
//! connection and its partial data.

use crate::config::SchedulerConfig;
use crate::error::{Result, WxSrvError};
use crate::protocol::{enabled_calls, transport, ResponseOutcome, Session};
use crate::runtime::publisher::Ingestor;
use common::hex;
use futures::{SinkExt, StreamExt};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wx_model::{Channel, RawFieldMap, Vocabulary};

pub struct Scheduler {
    config: SchedulerConfig,
    ingestor: Ingestor,
    interval: Duration,
    io_timeout: Duration,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, ingestor: Ingestor) -> Self {
        let interval = Duration::from_secs(config.interval_secs.max(1));
        let io_timeout = Duration::from_millis(config.timeout_ms.max(1));
        Self {
            config,
            ingestor,
            interval,
            io_timeout,
        }
    }

    /// Override the tick period
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Tick until `cancel` fires. An interrupted cycle publishes nothing.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Poll scheduler started for {}:{}, interval {:?}",
            self.config.address, self.config.port, self.interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let started = Instant::now();
            let exchange = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Poll cycle interrupted by shutdown");
                    break;
                },
                _ = sleep(self.interval) => {
                    warn!(
                        "Poll cycle overran the {:?} interval, closing the stale connection",
                        self.interval
                    );
                    continue;
                },
                result = self.exchange() => result,
            };

            match exchange {
                Ok(accumulator) => match self.flush(accumulator).await {
                    Ok(written) => debug!(
                        "Poll cycle finished in {:?}, {written} states written",
                        started.elapsed()
                    ),
                    Err(e) => error!("Publishing poll results failed: {e}"),
                },
                Err(e) => error!("Poll cycle aborted: {e}"),
            }
        }

        info!("Poll scheduler stopped");
    }

    /// One complete cycle without the overrun guard.
    pub async fn poll_once(&self) -> Result<usize> {
        let accumulator = self.exchange().await?;
        self.flush(accumulator).await
    }

    /// Request/response phase. The connection is closed on return.
    async fn exchange(&self) -> Result<BTreeMap<Channel, RawFieldMap>> {
        let mut session = Session::new(enabled_calls(&self.config.calls));
        if session.is_complete() {
            debug!("No calls enabled, nothing to poll");
            return Ok(BTreeMap::new());
        }

        let stream =
            transport::connect(&self.config.address, self.config.port, self.io_timeout).await?;
        let mut framed = Framed::new(stream, session.codec());

        while let Some(call) = session.next_request() {
            // Leftovers from a previous answer must not prefix this one
            framed.read_buffer_mut().clear();

            debug!(call = call.name, "-> {}", hex::encode_spaced(call.request));
            timeout(self.io_timeout, framed.send(call.request))
                .await
                .map_err(|_| WxSrvError::timeout(format!("writing '{}'", call.name)))??;

            loop {
                let frame = match timeout(self.io_timeout, framed.next()).await {
                    Ok(Some(frame)) => frame?,
                    Ok(None) => {
                        return Err(WxSrvError::connection(format!(
                            "station closed the connection while awaiting '{}'",
                            call.name
                        )));
                    },
                    Err(_) => {
                        return Err(WxSrvError::timeout(format!(
                            "awaiting response to '{}'",
                            call.name
                        )));
                    },
                };
                debug!(len = frame.len(), "<- {}", hex::encode_spaced(&frame));

                match session.parse_response(&frame)? {
                    ResponseOutcome::Continue | ResponseOutcome::Complete => break,
                    ResponseOutcome::Unknown(header) => warn!(
                        command = header.command,
                        subcommand = header.subcommand,
                        "Unknown response dropped"
                    ),
                    ResponseOutcome::Unexpected(other) => {
                        warn!(call = other.name, "Out-of-sequence response dropped")
                    },
                }
            }
        }

        Ok(session.into_accumulator())
    }

    async fn flush(&self, accumulator: BTreeMap<Channel, RawFieldMap>) -> Result<usize> {
        let mut written = 0;
        for (channel, raw) in &accumulator {
            written += self
                .ingestor
                .ingest(Vocabulary::DeviceBinary, raw, Some(*channel))
                .await?;
        }
        Ok(written)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::pipeline::FieldRegistry;
    use crate::protocol::catalog::{CallFlags, GET_CURRENT, GET_DAILY_MIN};
    use crate::protocol::frame;
    use crate::runtime::publisher::{DisplayUnits, StatePublisher};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tracing_test::traced_test;
    use wx_model::{CanonicalValue, RawValue};
    use wx_rtdb::{MemoryRtdb, Rtdb};

    fn scheduler(port: u16, calls: CallFlags, rtdb: Arc<MemoryRtdb>) -> Scheduler {
        let registry = Arc::new(FieldRegistry::builtin().unwrap());
        let publisher = StatePublisher::new(rtdb, registry, DisplayUnits::new());
        let config = SchedulerConfig {
            enabled: true,
            address: "127.0.0.1".to_string(),
            port,
            interval_secs: 1,
            timeout_ms: 500,
            calls,
        };
        Scheduler::new(config, Ingestor::new(publisher))
    }

    fn current_frame(temp: i64) -> Vec<u8> {
        let values: RawFieldMap = [("temp".to_string(), RawValue::Integer(temp))]
            .into_iter()
            .collect();
        frame::encode(GET_CURRENT.response, &GET_CURRENT.layout, &values).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unknown_response_is_skipped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 8];
            socket.read_exact(&mut request).await.unwrap();
            let stray = frame::encode(
                GET_DAILY_MIN.response,
                &GET_DAILY_MIN.layout,
                &RawFieldMap::new(),
            )
            .unwrap();
            socket.write_all(&stray).await.unwrap();
            socket.write_all(&current_frame(212)).await.unwrap();
            let _ = socket.read(&mut request).await;
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let flags = CallFlags::none().enable(crate::protocol::CallFlag::Current);
        let written = scheduler(port, flags, rtdb.clone()).poll_once().await.unwrap();
        assert!(written > 0);

        let state = rtdb.get_state("weather.current.outdoortemp").await.unwrap().unwrap();
        assert_eq!(state.value, CanonicalValue::Number(21.2));
        assert!(logs_contain("Unknown response dropped"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_foreign_frame_in_same_write_as_answer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 8];
            socket.read_exact(&mut request).await.unwrap();
            // Header 0B 09 is not in the catalog
            let mut reply = vec![0xFF, 0xFF, 0x0B, 0x09, 0x01, 0x02];
            reply.extend_from_slice(&current_frame(212));
            socket.write_all(&reply).await.unwrap();
            let _ = socket.read(&mut request).await;
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let flags = CallFlags::none().enable(crate::protocol::CallFlag::Current);
        scheduler(port, flags, rtdb.clone()).poll_once().await.unwrap();

        let state = rtdb.get_state("weather.current.outdoortemp").await.unwrap().unwrap();
        assert_eq!(state.value, CanonicalValue::Number(21.2));
        assert!(logs_contain("Unknown response dropped"));
    }

    #[tokio::test]
    async fn test_stop_during_exchange_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (asked_tx, asked_rx) = tokio::sync::oneshot::channel();
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = socket.read(&mut buf).await;
            let _ = asked_tx.send(());
            // Never answer; report when the scheduler hangs up
            while socket.read(&mut buf).await.map(|n| n > 0).unwrap_or(false) {}
            let _ = closed_tx.send(());
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let mut sched = scheduler(port, CallFlags::default(), rtdb.clone());
        sched.io_timeout = Duration::from_secs(30);
        let sched = sched.with_interval(Duration::from_secs(30));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sched.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(5), asked_rx)
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), closed_rx)
            .await
            .expect("connection left open")
            .unwrap();
        assert_eq!(rtdb.stats().state_count, 0);
    }

    #[tokio::test]
    async fn test_silent_station_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            while socket.read(&mut buf).await.map(|n| n > 0).unwrap_or(false) {}
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let err = scheduler(port, CallFlags::default(), rtdb.clone())
            .poll_once()
            .await
            .unwrap_err();
        assert!(matches!(err, WxSrvError::TimeoutError(_)));
        assert_eq!(rtdb.stats().state_count, 0);
    }

    #[tokio::test]
    async fn test_truncated_response_aborts_cycle() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 8];
            socket.read_exact(&mut request).await.unwrap();
            let frame = current_frame(212);
            socket.write_all(&frame[..30]).await.unwrap();
            // closing mid-frame
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let flags = CallFlags::none().enable(crate::protocol::CallFlag::Current);
        let err = scheduler(port, flags, rtdb.clone()).poll_once().await.unwrap_err();
        assert!(matches!(err, WxSrvError::Protocol(_)));
        assert_eq!(rtdb.stats().state_count, 0);
    }

    #[tokio::test]
    async fn test_nothing_enabled_skips_connect() {
        let rtdb = Arc::new(MemoryRtdb::new());
        // Port 1 is never listened on in tests
        let written = scheduler(1, CallFlags::none(), rtdb).poll_once().await.unwrap();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_overrun_closes_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            // Never answer; report when the scheduler hangs up
            while socket.read(&mut buf).await.map(|n| n > 0).unwrap_or(false) {}
            let _ = closed_tx.send(());
        });

        let rtdb = Arc::new(MemoryRtdb::new());
        let mut sched = scheduler(port, CallFlags::default(), rtdb);
        sched.io_timeout = Duration::from_secs(10);
        let sched = sched.with_interval(Duration::from_millis(200));

        // Run on the test task so the warning is captured
        let cancel = CancellationToken::new();
        let hang_up = {
            let cancel = cancel.clone();
            async move {
                tokio::time::timeout(Duration::from_secs(5), closed_rx)
                    .await
                    .unwrap()
                    .unwrap();
                cancel.cancel();
            }
        };
        tokio::join!(sched.run(cancel.clone()), hang_up);

        assert!(logs_contain("overran"));
    }
}
