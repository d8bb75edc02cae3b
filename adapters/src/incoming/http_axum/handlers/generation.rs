#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::RateLimitExceededResponse;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use axum_login::AuthSession;
use tracing::{debug, info, instrument};

use domain::generation::{GenerationKind, GenerationRequest};
use wornshot_application::error::{AppError, AppResult};

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::responses::CreditsErrorResponse;
use crate::{
    incoming::http_axum::{
        auth::backend::AuthBackend,
        dto::{requests::GenerateRequest, responses::GenerationResponse},
        error_mapper::CreditsHttpError,
    },
    shared::app_state::AppState,
};

fn parse_request(
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<GenerationRequest> {
    let body = payload.map(|Json(body)| body).unwrap_or_else(|rejection| {
        debug!(%rejection, "Unreadable generation body treated as missing parameters");
        GenerateRequest::default()
    });

    let (Some(scene_id), Some(reference_image_url)) = (body.scene_id, body.reference_image_url)
    else {
        return Err(AppError::MissingParameters {
            message: "sceneId and referenceImageUrl are required".to_string(),
        });
    };

    Ok(GenerationRequest::new(
        scene_id,
        reference_image_url,
        body.prompt,
    )?)
}

async fn generate(
    auth_session: AuthSession<AuthBackend>,
    state: AppState,
    kind: GenerationKind,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, CreditsHttpError> {
    let user = auth_session
        .user
        .ok_or(CreditsHttpError(AppError::Unauthorized))?;
    let request = parse_request(payload)?;

    let outcome = state
        .generation_use_case
        .generate(&user.user_id(), kind, request)
        .await?;

    info!(
        user_id = %user.id,
        kind = %kind,
        images = outcome.images.len(),
        charged = outcome.credits_charged,
        "Generation served"
    );

    Ok(Json(GenerationResponse {
        success: true,
        reservation_id: *outcome.reservation_id.as_uuid(),
        images: outcome.images.into_iter().map(Into::into).collect(),
        credits_charged: outcome.credits_charged,
        new_balance: outcome.new_balance,
    }))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/api/generate/main",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Main image generated and charged", body = GenerationResponse),
        (status = 400, description = "Missing parameters or insufficient credits", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "积分不足" })),
        (status = 401, description = "No session", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "未登录" })),
        (status = 429, response = RateLimitExceededResponse),
        (status = 502, description = "Generation failed and the reserved credits were refunded", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "生成失败，积分已退还" }))
    ),
    tag = "generation",
    summary = "Generate a main product image"
))]
#[instrument(skip(auth_session, state, payload))]
pub async fn generate_main_image(
    auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, CreditsHttpError> {
    generate(auth_session, state, GenerationKind::MainImage, payload).await
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/api/generate/multi-pose",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Pose set generated and charged", body = GenerationResponse),
        (status = 400, description = "Missing parameters or insufficient credits", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "积分不足" })),
        (status = 401, description = "No session", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "未登录" })),
        (status = 429, response = RateLimitExceededResponse),
        (status = 502, description = "Every pose failed and the reserved credits were refunded", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "生成失败，积分已退还" }))
    ),
    tag = "generation",
    summary = "Generate a multi-pose image set"
))]
#[instrument(skip(auth_session, state, payload))]
pub async fn generate_multi_pose(
    auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, CreditsHttpError> {
    generate(auth_session, state, GenerationKind::MultiPose, payload).await
}
