use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    /// `ok` when every dependency is usable, `degraded` otherwise.
    pub status: String,
    pub version: String,
    pub engine: EngineStatus,
    pub database: DatabaseStatus,
    pub queue: QueueStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EngineStatus {
    pub status: String,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct QueueStatus {
    pub input: String,
    pub response: String,
    /// Messages waiting on the input queue; absent if the database is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u64>,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let engine = state.pipeline.engine();
    let engine_ok = engine.is_available();
    let engine_status = EngineStatus {
        status: if engine_ok { "available" } else { "unavailable" }.to_string(),
        backend: engine.describe(),
    };

    let db_ok = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database ping failed");
            false
        }
    };

    let queues = &state.config.queue;
    let depth = if db_ok {
        state.db.queue_depth(&queues.input_queue).await.ok()
    } else {
        None
    };

    ApiResponse::success(HealthData {
        status: if engine_ok && db_ok { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: engine_status,
        database: DatabaseStatus {
            status: if db_ok { "ok" } else { "error" }.to_string(),
        },
        queue: QueueStatus {
            input: queues.input_queue.clone(),
            response: queues.response_queue.clone(),
            depth,
        },
    })
}
