use axum::{Json, extract::State};

use cleanops_api::HealthResponse;

use crate::storage::Db;

/// GET /api/health — liveness plus a database round trip.
pub async fn health(State(db): State<Db>) -> Json<HealthResponse> {
    let db_ok = db
        .conn()
        .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .is_ok();
    if !db_ok {
        tracing::warn!("health check: database unreachable");
    }
    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
