//! TCP transport to the station

use crate::error::{Result, WxSrvError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Open one connection, failing with `Timeout` once `limit` expires.
pub async fn connect(host: &str, port: u16, limit: Duration) -> Result<TcpStream> {
    let addr = format!("{host}:{port}");
    debug!("Connecting to weather station at {addr}");

    let stream = match timeout(limit, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            return Err(WxSrvError::connection(format!("{addr}: {e}")));
        },
        Err(_) => {
            return Err(WxSrvError::timeout(format!(
                "connect to {addr} after {}ms",
                limit.as_millis()
            )));
        },
    };

    // Requests are a few bytes each
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {e}");
    }

    Ok(stream)
}
