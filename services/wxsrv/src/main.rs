use clap::Parser;
use errors::{WxError, WxResult};
use std::sync::Arc;
use tracing::info;
use wx_rtdb::{MemoryRtdb, Rtdb};
use wxsrv::bootstrap::{self, Args};
use wxsrv::{FieldRegistry, Runtime, WxSrvError};

#[tokio::main]
async fn main() -> WxResult<()> {
    let args = Args::parse();
    let result = run(args).await;
    if let Err(e) = &result {
        bootstrap::report_failure(e);
    }
    result
}

async fn run(args: Args) -> WxResult<()> {
    let mut config = bootstrap::load_configuration(&args)?;
    bootstrap::init_logging(&args, &config.logging)?;

    let registry = Arc::new(FieldRegistry::builtin().map_err(WxSrvError::from)?);
    let issues = config.validate(&registry);
    bootstrap::report_issues(&issues);

    if args.validate {
        if issues.is_empty() {
            info!("Configuration is valid");
            return Ok(());
        }
        return Err(WxError::config(format!(
            "{} configuration issue(s) found",
            issues.len()
        )));
    }

    let rtdb: Arc<dyn Rtdb> = Arc::new(MemoryRtdb::new());
    let runtime = Runtime::start(&config, registry, rtdb)
        .await
        .map_err(|e| WxError::startup(e.to_string()))?;

    common::wait_for_shutdown().await;
    info!("Shutting down");
    runtime.stop().await;

    Ok(())
}
