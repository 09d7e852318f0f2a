//! HTTP upload listener
//!
//! Stations push readings to one path: Wunderground-style as a GET query
//! string, Ecowitt-style as a form-encoded POST body. Both land in the same
//! normalization pipeline as the poll scheduler.

use crate::config::ListenerConfig;
use crate::error::{Result, WxSrvError};
use crate::runtime::publisher::Ingestor;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::{Form, Router};
use std::collections::HashMap;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wx_model::{RawFieldMap, RawValue, Vocabulary};

/// Upload routes on `path`; anything else answers 400.
pub fn router(path: &str, ingestor: Ingestor) -> Router {
    Router::new()
        .route(path, get(wunderground_upload).post(ecowitt_upload))
        .fallback(unknown_path)
        .layer(axum::middleware::from_fn(common::logging::http_request_logger))
        .with_state(ingestor)
}

/// Bind the upload port.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener> {
    let addr = format!("{}:{}", config.bind, config.port);
    TcpListener::bind(&addr)
        .await
        .map_err(|e| WxSrvError::config(format!("cannot bind upload listener on {addr}: {e}")))
}

/// Serve uploads on `listener` until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    path: String,
    ingestor: Ingestor,
    cancel: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Upload listener on http://{addr}{path}");
    }

    axum::serve(listener, router(&path, ingestor))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Upload listener stopped");
    Ok(())
}

async fn wunderground_upload(
    State(ingestor): State<Ingestor>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    ingest(&ingestor, Vocabulary::Wunderground, params).await
}

async fn ecowitt_upload(
    State(ingestor): State<Ingestor>,
    Form(params): Form<HashMap<String, String>>,
) -> StatusCode {
    ingest(&ingestor, Vocabulary::Ecowitt, params).await
}

async fn unknown_path(uri: Uri) -> StatusCode {
    warn!(path = %uri.path(), "Upload on unknown path rejected");
    StatusCode::BAD_REQUEST
}

async fn ingest(
    ingestor: &Ingestor,
    vocabulary: Vocabulary,
    params: HashMap<String, String>,
) -> StatusCode {
    let raw: RawFieldMap = params
        .into_iter()
        .map(|(key, value)| (key, RawValue::Text(value)))
        .collect();

    match ingestor.ingest(vocabulary, &raw, None).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            error!(%vocabulary, "Ingest failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}
