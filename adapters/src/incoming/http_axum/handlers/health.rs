use axum::{Json, extract::State};
use serde_json::{Value, json};

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::responses::ApiResponseValue;
use crate::incoming::http_axum::dto::responses::ApiResponse;
use crate::shared::app_state::AppState;

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up; reports the storage backend and credit pricing", body = ApiResponseValue,
         example = json!({
             "ok": true,
             "data": {
                 "environment": "development",
                 "storage": "postgres",
                 "credits": {
                     "initial": 6,
                     "main_image_cost": 1,
                     "multi_pose_cost": 5
                 }
             }
         })
        )
    ),
    tag = "system",
    summary = "System health check",
    operation_id = "health_check"
))]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let config = &state.config;

    Json(ApiResponse::success_with_data(Some(json!({
        "environment": config.environment.env,
        "storage": config.storage.backend,
        "credits": {
            "initial": config.credits.initial_credits,
            "main_image_cost": config.credits.main_image_cost,
            "multi_pose_cost": config.credits.multi_pose_cost
        }
    }))))
}
