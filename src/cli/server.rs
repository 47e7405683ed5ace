//! HTTP server mode serving a feed endpoint
//!
//! `GET <path>?n=..&cursor0=..&headers=..&pagesizehint=..` answers with the
//! page as NDJSON. Rejected requests get a status code and a
//! `{"detail": ...}` body. A reader failure after the first line ends the
//! body with an error line instead.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::decode::{encode_error, encode_item, NDJSON_CONTENT_TYPE};
use crate::error::{Error, Result};
use crate::handler::PageHandler;
use crate::protocol::PageItem;

/// Build the router serving `handler` at `path`
pub fn router(handler: Arc<PageHandler>, path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(path, get(feed))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Start the HTTP server
pub async fn serve(handler: PageHandler, path: &str, port: u16) -> Result<()> {
    let app = router(Arc::new(handler), path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Serving feed on http://{}{}", addr, path);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Feed endpoint
async fn feed(
    State(handler): State<Arc<PageHandler>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut items = match handler.handle_query(&params) {
        Ok(items) => items,
        Err(e) => return error_response(&e),
    };

    // Nothing is sent before the first item, so a failure there still gets a status
    let first = match items.next().await {
        Some(Err(e)) => return error_response(&e),
        first => first,
    };

    let lines = stream::iter(first)
        .chain(items)
        .map(|item| Ok::<_, Infallible>(encode_line(item)));

    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}

fn encode_line(item: Result<PageItem>) -> bytes::Bytes {
    match item.and_then(|item| encode_item(&item)) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "Page ended with an error");
            encode_error(&e)
        }
    }
}

fn error_response(error: &Error) -> Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!(error = %error, "Page request failed");
    } else {
        tracing::debug!(error = %error, "Page request rejected");
    }
    (status, Json(json!({ "detail": detail(error) }))).into_response()
}

fn detail(error: &Error) -> String {
    match error {
        Error::CursorsMissing { partitions } if partitions.is_empty() => {
            "Cursor parameter is missing".to_string()
        }
        other => other.to_string(),
    }
}
