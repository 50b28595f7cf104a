use axum::Json;

use taskdeck_api::{Data, HealthResponse};

use super::ok;

/// GET /api/health
pub async fn health() -> Json<Data<HealthResponse>> {
    ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
