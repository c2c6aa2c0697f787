//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub schema_version: i64,
}

/// `GET /api/health`: storage round-trip plus build version.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let schema_version = ctx
        .with_conn(|conn| {
            let version = conn.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |row| row.get::<_, i64>(0),
            )?;
            Ok(version)
        })
        .await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        schema_version,
    }))
}
