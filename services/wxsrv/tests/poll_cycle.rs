#![allow(clippy::disallowed_methods)]

//! End-to-end poll cycles against a fake station on a local socket.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use wx_model::{CanonicalValue, RawFieldMap, RawValue};
use wx_rtdb::{MemoryRtdb, Rtdb};
use wxsrv::config::SchedulerConfig;
use wxsrv::protocol::catalog::{catalog, CallFlag, CallFlags, CommandSpec};
use wxsrv::protocol::frame;
use wxsrv::runtime::{DisplayUnits, Ingestor, Scheduler, StatePublisher};
use wxsrv::FieldRegistry;

/// Requests received, one entry per connection
type RequestLog = Arc<Mutex<Vec<Vec<Vec<u8>>>>>;

fn response_for(spec: &CommandSpec) -> Vec<u8> {
    let mut values = RawFieldMap::new();
    match spec.name {
        "Get Firmware" => {
            values.insert("softwaretype".into(), RawValue::from("EasyWeatherV1.6.4"));
        },
        "Get Current Data" => {
            values.insert("temp".into(), RawValue::Integer(212));
            values.insert("indoortemp".into(), RawValue::Integer(235));
            values.insert("humidity".into(), RawValue::Integer(45));
            values.insert("baromrel".into(), RawValue::Integer(10132));
            values.insert("windspeed".into(), RawValue::Integer(25));
        },
        _ => {
            values.insert("temp".into(), RawValue::Integer(305));
        },
    }
    frame::encode(spec.response, &spec.layout, &values).unwrap()
}

/// Answer every known request on the connection until it closes
async fn serve_connection(mut socket: TcpStream, log: RequestLog) {
    log.lock().await.push(Vec::new());
    let mut buf = [0u8; 64];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let request = buf[..n].to_vec();
        if let Some(last) = log.lock().await.last_mut() {
            last.push(request.clone());
        }
        if let Some(spec) = catalog().iter().find(|c| c.request == request.as_slice()) {
            if socket.write_all(&response_for(spec)).await.is_err() {
                return;
            }
        }
    }
}

async fn fake_station() -> (u16, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let log: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let station_log = log.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_connection(socket, station_log.clone()));
        }
    });
    (port, log)
}

fn scheduler(port: u16, calls: CallFlags, units: DisplayUnits) -> (Scheduler, Arc<MemoryRtdb>) {
    let rtdb = Arc::new(MemoryRtdb::new());
    let registry = Arc::new(FieldRegistry::builtin().unwrap());
    let publisher = StatePublisher::new(rtdb.clone(), registry, units);
    let config = SchedulerConfig {
        enabled: true,
        address: "127.0.0.1".to_string(),
        port,
        interval_secs: 1,
        timeout_ms: 1000,
        calls,
    };
    (Scheduler::new(config, Ingestor::new(publisher)), rtdb)
}

async fn number(rtdb: &MemoryRtdb, path: &str) -> f64 {
    rtdb.get_state(path)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("{path} not stored"))
        .value
        .as_f64()
        .unwrap()
}

#[tokio::test]
async fn test_firmware_and_current_data() {
    let (port, log) = fake_station().await;
    let (scheduler, rtdb) = scheduler(port, CallFlags::default(), DisplayUnits::new());

    // Fields the fake leaves at zero are published too, except the
    // pressure readings that fall outside their bounds
    let written = scheduler.poll_once().await.unwrap();
    assert!(written >= 6, "{written}");
    assert!(rtdb.get_state("weather.current.pressureabs").await.unwrap().is_none());

    let firmware = rtdb.get_state("info.softwaretype").await.unwrap().unwrap();
    assert_eq!(firmware.value, CanonicalValue::Text("EasyWeatherV1.6.4".into()));
    assert_eq!(number(&rtdb, "weather.current.outdoortemp").await, 21.2);
    assert_eq!(number(&rtdb, "weather.current.indoortemp").await, 23.5);
    assert_eq!(number(&rtdb, "weather.current.outdoorhumidity").await, 45.0);
    assert_eq!(number(&rtdb, "weather.current.pressurerel").await, 1013.2);
    assert_eq!(number(&rtdb, "weather.current.windspeed").await, 9.0);
    assert!(rtdb.get_state("info.last_update").await.unwrap().is_some());

    // Exactly two round trips on one connection
    let connections = log.lock().await.clone();
    assert_eq!(connections.len(), 1);
    assert_eq!(
        connections[0],
        vec![
            vec![0xFF, 0xFF, 0x50, 0x03, 0x53],
            vec![0xFF, 0xFF, 0x0B, 0x00, 0x06, 0x04, 0x04, 0x19],
        ]
    );
}

#[tokio::test]
async fn test_disabled_calls_never_sent() {
    let (port, log) = fake_station().await;
    let flags = CallFlags::none()
        .enable(CallFlag::Current)
        .enable(CallFlag::DailyMax);
    let (scheduler, rtdb) = scheduler(port, flags, DisplayUnits::new());

    scheduler.poll_once().await.unwrap();

    let sent: Vec<Vec<u8>> = log.lock().await.concat();
    assert_eq!(sent.len(), 2);
    for spec in catalog() {
        let enabled = matches!(spec.name, "Get Current Data" | "Get Daily Max Data");
        assert_eq!(
            sent.iter().any(|r| r.as_slice() == spec.request),
            enabled,
            "{}",
            spec.name
        );
    }

    assert_eq!(number(&rtdb, "weather.dailymax.outdoortemp").await, 30.5);
    assert!(rtdb.get_state("info.softwaretype").await.unwrap().is_none());
    assert!(rtdb.get_state("weather.maxvalues.outdoortemp").await.unwrap().is_none());
}

#[tokio::test]
async fn test_all_calls_land_on_their_channels() {
    let (port, _log) = fake_station().await;
    let flags = CallFlags::none()
        .enable(CallFlag::Max)
        .enable(CallFlag::Min)
        .enable(CallFlag::DailyMax)
        .enable(CallFlag::DailyMin);
    let (scheduler, rtdb) = scheduler(port, flags, DisplayUnits::new());

    scheduler.poll_once().await.unwrap();

    for path in [
        "weather.maxvalues.outdoortemp",
        "weather.minvalues.outdoortemp",
        "weather.dailymax.outdoortemp",
        "weather.dailymin.outdoortemp",
    ] {
        assert_eq!(number(&rtdb, path).await, 30.5, "{path}");
    }
    assert!(rtdb.get_state("weather.current.outdoortemp").await.unwrap().is_none());
}

#[tokio::test]
async fn test_display_units_applied() {
    let (port, _log) = fake_station().await;
    let mut units = DisplayUnits::new();
    units.insert(wx_model::UnitGroup::Temperature, "°F".to_string());
    let (scheduler, rtdb) = scheduler(port, CallFlags::default(), units);

    scheduler.poll_once().await.unwrap();

    let state = rtdb.get_state("weather.current.outdoortemp").await.unwrap().unwrap();
    let value = state.value.as_f64().unwrap();
    assert!((value - 70.16).abs() < 1e-9, "{value}");
    assert_eq!(state.unit.as_deref(), Some("°F"));
}

#[tokio::test]
async fn test_scheduler_repeats_and_stops() {
    let (port, log) = fake_station().await;
    let (scheduler, rtdb) = scheduler(port, CallFlags::default(), DisplayUnits::new());
    let scheduler = scheduler.with_interval(Duration::from_millis(100));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(scheduler.run(cancel.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while log.lock().await.len() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(number(&rtdb, "weather.current.outdoortemp").await, 21.2);
}
