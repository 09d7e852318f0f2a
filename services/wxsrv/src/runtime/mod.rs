//! Service runtime
//!
//! - `publisher`: writes canonical pairs to the state store
//! - `scheduler`: binary protocol poll loop
//! - `listener`: HTTP upload endpoint

pub mod listener;
pub mod publisher;
pub mod scheduler;

pub use publisher::{DisplayUnits, Ingestor, StatePublisher};
pub use scheduler::Scheduler;

use crate::config::AppConfig;
use crate::error::Result;
use crate::pipeline::FieldRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wx_rtdb::Rtdb;

/// Running scheduler and listener tasks
pub struct Runtime {
    cancel: CancellationToken,
    ingestor: Ingestor,
    scheduler: Option<JoinHandle<()>>,
    listener: Option<JoinHandle<Result<()>>>,
    listener_addr: Option<SocketAddr>,
}

impl Runtime {
    /// Reconcile stored units, then start whatever the configuration enables.
    pub async fn start(
        config: &AppConfig,
        registry: Arc<FieldRegistry>,
        rtdb: Arc<dyn Rtdb>,
    ) -> Result<Self> {
        let publisher = StatePublisher::new(rtdb, registry, config.display_units());
        publisher.reconcile_stored().await?;
        let ingestor = Ingestor::new(publisher);
        let cancel = CancellationToken::new();

        let listener = if config.listener.enabled {
            Some(listener::bind(&config.listener).await?)
        } else {
            None
        };
        let listener_addr = listener.as_ref().and_then(|l| l.local_addr().ok());
        let listener = listener.map(|l| {
            tokio::spawn(listener::serve(
                l,
                config.listener.path.clone(),
                ingestor.clone(),
                cancel.child_token(),
            ))
        });

        let scheduler = config.scheduler.enabled.then(|| {
            let scheduler = Scheduler::new(config.scheduler.clone(), ingestor.clone());
            tokio::spawn(scheduler.run(cancel.child_token()))
        });

        if scheduler.is_none() && listener.is_none() {
            warn!("Neither scheduler nor listener is enabled, nothing will be ingested");
        }
        info!(
            scheduler = scheduler.is_some(),
            listener = listener.is_some(),
            "Runtime started"
        );

        Ok(Self {
            cancel,
            ingestor,
            scheduler,
            listener,
            listener_addr,
        })
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Address the upload listener is bound to
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener_addr
    }

    /// Cancel both tasks and wait for them to finish.
    pub async fn stop(self) {
        self.cancel.cancel();

        if let Some(task) = self.scheduler {
            if let Err(e) = task.await {
                error!("Scheduler task failed: {e}");
            }
        }
        if let Some(task) = self.listener {
            match task.await {
                Ok(Ok(())) => {},
                Ok(Err(e)) => error!("Listener failed: {e}"),
                Err(e) => error!("Listener task failed: {e}"),
            }
        }

        info!("Runtime stopped");
    }
}
