//! JSON HTTP surface.
//!
//! - `POST /api/get-expiry` resolves one product name
//! - `GET /api/health` liveness probe

use crate::core::resolver::ExpiryResolver;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::validate_product_name;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub struct AppState<S: RecordStore> {
    pub resolver: Arc<ExpiryResolver<S>>,
}

impl<S: RecordStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetExpiryRequest {
    #[serde(rename = "productName", default)]
    product_name: Option<String>,
}

/// Error body for the JSON API: client mistakes echo their message, every
/// other failure is reported generically and logged.
pub struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TrackerError::ValidationError { message } => (StatusCode::BAD_REQUEST, message.clone()),
            err => {
                tracing::error!("❌ Request failed ({:?}): {}", err.category(), err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn router<S: RecordStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/get-expiry", post(get_expiry::<S>))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("🌐 Listening on http://{}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn get_expiry<S: RecordStore + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    // Missing, empty or malformed bodies all count as "no product name".
    let request: GetExpiryRequest = serde_json::from_slice(&body).unwrap_or_default();
    let name = validate_product_name(request.product_name.as_deref())?;

    let resolution = state.resolver.resolve_expiry(name).await?;
    Ok(Json(resolution).into_response())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
