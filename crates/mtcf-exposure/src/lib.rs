// # Registry Exposure Endpoint
//
// Publishes the current registry snapshot for a cloudflare-mode instance to
// poll:
//
// ```http
// GET /servers
// Authorization: Bearer {MOONLIGHTAPIKEY}
// ```
//
// - `200` with the JSON array of servers when the header is exactly
//   `Bearer {key}`
// - `401` with an empty body otherwise
//
// The endpoint only ever reads through a `RegistryReader`, so a response is
// always one complete snapshot.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use mtcf_core::{RegistryReader, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct ExposureState {
    reader: RegistryReader,
    /// Full expected header value, `Bearer {key}`
    /// ⚠️ NEVER log this value
    expected_auth: Arc<str>,
}

/// Build the exposure router
pub fn router(reader: RegistryReader, api_key: &str) -> Router {
    let state = ExposureState {
        reader,
        expected_auth: Arc::from(format!("Bearer {}", api_key)),
    };

    Router::new()
        .route("/servers", get(list_servers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn list_servers(State(state): State<ExposureState>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == &*state.expected_auth);

    if !authorized {
        tracing::debug!("Rejected unauthorized /servers request");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let snapshot = state.reader.snapshot().await;
    Json(snapshot.to_vec()).into_response()
}

/// Serve the exposure router on an already bound listener
///
/// Binding is left to the caller so an unusable address is reported as a
/// startup failure.
///
/// # Errors
///
/// `Error::Io` when the server fails.
pub async fn serve(listener: TcpListener, reader: RegistryReader, api_key: &str) -> Result<()> {
    tracing::info!("Exposure endpoint listening on {}", listener.local_addr()?);

    axum::serve(listener, router(reader, api_key)).await?;
    Ok(())
}
