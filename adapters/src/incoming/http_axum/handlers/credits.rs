#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::RateLimitExceededResponse;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use axum_login::AuthSession;
use serde_json::Value;
use tracing::{debug, instrument};

use domain::credits::{CreditAction, CreditAmount, CreditError};
use wornshot_application::error::{AppError, AppResult};

use crate::{
    incoming::http_axum::{
        auth::backend::AuthBackend,
        dto::{
            requests::CreditsRequest,
            responses::{CreditsBalanceResponse, CreditsMutationResponse},
        },
        error_mapper::CreditsHttpError,
    },
    shared::app_state::AppState,
};
#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::responses::CreditsErrorResponse;

fn is_blank(value: &Value) -> bool {
    value.is_null() || value.as_str() == Some("")
}

fn parse_action(action: &Value) -> AppResult<CreditAction> {
    action
        .as_str()
        .and_then(|name| name.parse::<CreditAction>().ok())
        .ok_or_else(|| AppError::InvalidAction {
            action: action
                .as_str()
                .map_or_else(|| action.to_string(), str::to_string),
        })
}

/// Validates a mutation body in contract order: presence, then action, then
/// amount.
fn parse_mutation(request: CreditsRequest) -> AppResult<(CreditAction, CreditAmount)> {
    let action = request.action.filter(|action| !is_blank(action));
    let amount = request.amount.filter(|amount| !amount.is_null());

    let (Some(action), Some(amount)) = (action, amount) else {
        return Err(AppError::MissingParameters {
            message: "action and amount are required".to_string(),
        });
    };

    let action = parse_action(&action)?;

    let amount = match &amount {
        Value::Number(number) => number
            .as_i64()
            .map_or(Err(CreditError::InvalidAmount { amount: 0 }), CreditAmount::from_i64),
        _ => Err(CreditError::InvalidAmount { amount: 0 }),
    }?;

    Ok((action, amount))
}

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/api/credits",
    responses(
        (status = 200, description = "Balance of the caller; the profile is created on first access", body = CreditsBalanceResponse),
        (status = 401, description = "No session", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "未登录" })),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, description = "Profile could not be created", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "创建用户资料失败" }))
    ),
    tag = "credits",
    summary = "Read the credit balance"
))]
#[instrument(skip(auth_session, state))]
pub async fn get_credits(
    auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
) -> Result<Json<CreditsBalanceResponse>, CreditsHttpError> {
    let user = auth_session
        .user
        .ok_or(CreditsHttpError(AppError::Unauthorized))?;

    let profile = state
        .credits_use_case
        .ensure_profile(&user.user_id())
        .await?;

    Ok(Json(CreditsBalanceResponse {
        success: true,
        credits: profile.credits,
        is_subscriber: profile.is_subscriber,
    }))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/api/credits",
    request_body = CreditsRequest,
    responses(
        (status = 200, description = "Mutation applied", body = CreditsMutationResponse),
        (status = 400, description = "Missing parameters, unknown action, invalid amount, insufficient credits or unknown user", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "积分不足" })),
        (status = 401, description = "No session", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "未登录" })),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, description = "Storage fault", body = CreditsErrorResponse,
         example = json!({ "success": false, "error": "服务器错误" }))
    ),
    tag = "credits",
    summary = "Deduct or add credits"
))]
#[instrument(skip(auth_session, state, payload))]
pub async fn post_credits(
    auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
    payload: Result<Json<CreditsRequest>, JsonRejection>,
) -> Result<Json<CreditsMutationResponse>, CreditsHttpError> {
    let user = auth_session
        .user
        .ok_or(CreditsHttpError(AppError::Unauthorized))?;
    let user_id = user.user_id();

    state.credits_use_case.ensure_profile(&user_id).await?;

    let request = payload
        .map(|Json(request)| request)
        .unwrap_or_else(|rejection| {
            debug!(%rejection, "Unreadable credits body treated as missing parameters");
            CreditsRequest::default()
        });
    let (action, amount) = parse_mutation(request)?;

    let new_balance = state
        .credits_use_case
        .apply(&user_id, action, amount)
        .await?
        .map_err(AppError::from)?;

    Ok(Json(CreditsMutationResponse {
        success: true,
        new_balance,
    }))
}
