#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::common_responses::{
    InternalServerErrorResponse, RateLimitExceededResponse, UnauthorizedResponse,
    ValidationErrorResponse,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_login::AuthSession;
use axum_valid::Valid;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use domain::auth::UserPublic;
use wornshot_application::error::AppError;

#[cfg(feature = "docs")]
use crate::incoming::http_axum::dto::responses::ApiResponseUser;
use crate::{
    incoming::http_axum::{
        auth::backend::{AuthBackend, Credentials, User},
        dto::{
            requests::{LoginRequest, RegisterRequest},
            responses::{ApiResponse, UserResponse},
        },
        error_mapper::HttpError,
    },
    shared::app_state::AppState,
};

fn user_response(user: UserPublic) -> UserResponse {
    UserResponse {
        id: *user.id.as_uuid(),
        email: user.email,
        username: user.username,
        created_at: user.created_at.format(&Rfc3339).unwrap_or_default(),
    }
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, logged in, and granted the starting balance", body = ApiResponseUser,
         example = json!({
             "ok": true,
             "data": {
                 "id": "550e8400-e29b-41d4-a716-446655440000",
                 "email": "user@example.com",
                 "username": "johndoe",
                 "created_at": "2025-01-01T12:00:00Z"
             }
         })
        ),
        (status = 422, response = ValidationErrorResponse),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "auth",
    summary = "Register a new user account",
    description = "Creates a user with email and password, creates their credit profile, then logs them in with a session cookie."
))]
pub async fn register_handler(
    mut auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, HttpError> {
    let user_public = state
        .auth_use_case
        .register_local(request.email, request.username, request.password)
        .await?;

    auth_session
        .login(&User::from(user_public.clone()))
        .await
        .map_err(|e| {
            warn!(error = %e, "Session login after registration failed");
            HttpError(AppError::InternalServerError)
        })?;

    info!(user_id = %user_public.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_data(Some(user_response(
            user_public,
        )))),
    ))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in successfully", body = ApiResponseUser),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "auth",
    summary = "Login with email and password",
    description = "Authenticates user credentials and creates a session cookie if successful."
))]
pub async fn login_handler(
    mut auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<impl IntoResponse, HttpError> {
    let credentials = Credentials {
        email: request.email,
        password: request.password,
    };

    let user = auth_session.authenticate(credentials).await.map_err(|e| {
        warn!(error = %e, "Authentication backend failed");
        HttpError(AppError::InternalServerError)
    })?;

    let Some(user) = user else {
        return Err(HttpError(AppError::Unauthorized));
    };

    auth_session.login(&user).await.map_err(|e| {
        warn!(error = %e, "Session login failed");
        HttpError(AppError::InternalServerError)
    })?;

    let user_public = state.auth_use_case.me(&user.user_id()).await?;

    Ok(Json(ApiResponse::success_with_data(Some(user_response(
        user_public,
    )))))
}

#[cfg_attr(feature = "docs", utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "User logged out successfully"),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "auth",
    summary = "Logout current user"
))]
pub async fn logout_handler(
    mut auth_session: AuthSession<AuthBackend>,
) -> Result<impl IntoResponse, HttpError> {
    auth_session
        .logout()
        .await
        .map_err(|_| HttpError(AppError::InternalServerError))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg_attr(feature = "docs", utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user information", body = ApiResponseUser),
        (status = 401, response = UnauthorizedResponse),
        (status = 429, response = RateLimitExceededResponse),
        (status = 500, response = InternalServerErrorResponse)
    ),
    tag = "auth",
    summary = "Get current user information"
))]
pub async fn me_handler(
    auth_session: AuthSession<AuthBackend>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let Some(user) = auth_session.user else {
        return Err(HttpError(AppError::Unauthorized));
    };

    let user_public = state.auth_use_case.me(&user.user_id()).await?;

    Ok(Json(ApiResponse::success_with_data(Some(user_response(
        user_public,
    )))))
}
