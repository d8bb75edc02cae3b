use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use domain::error::DomainError;
use wornshot_application::error::AppError;

use crate::incoming::http_axum::dto::responses::CreditsErrorResponse;

pub const MSG_UNAUTHENTICATED: &str = "未登录";
pub const MSG_MISSING_PARAMETERS: &str = "参数缺失";
pub const MSG_INVALID_ACTION: &str = "无效操作";
pub const MSG_PROFILE_CREATION_FAILED: &str = "创建用户资料失败";
pub const MSG_SERVER_ERROR: &str = "服务器错误";
pub const MSG_GENERATION_REFUNDED: &str = "生成失败，积分已退还";

fn log_error(app_error: &AppError) {
    if app_error.is_client_error() {
        debug!("Client error response generated: {}", app_error);
    } else {
        error!("Server error response generated: {}", app_error);
    }
}

/// `{ok, error, status}` envelope used by the auth and system routes.
pub struct HttpError(pub AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        log_error(app_error);

        let (status_code, message) = match app_error {
            AppError::Domain(_)
            | AppError::Credit(_)
            | AppError::MissingParameters { .. }
            | AppError::InvalidAction { .. } => (StatusCode::BAD_REQUEST, app_error.to_string()),

            AppError::ValidationError { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, app_error.to_string())
            }

            AppError::ConfigError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
            ),

            AppError::DatabaseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),

            AppError::InternalServerError
            | AppError::ProfileCreationFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),

            AppError::GenerationFailed { .. } | AppError::ExternalServiceError { .. } => (
                StatusCode::BAD_GATEWAY,
                "External service error".to_string(),
            ),

            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),

            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
        };

        let error_response = json!({
            "ok": false,
            "error": message,
            "status": status_code.as_u16()
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<AppError> for HttpError {
    fn from(app_error: AppError) -> Self {
        HttpError(app_error)
    }
}

/// `{success: false, error}` envelope of the `/api` routes. The `error`
/// strings are shown to end users verbatim, so they are fixed per failure
/// class and never carry internal detail.
pub struct CreditsHttpError(pub AppError);

impl CreditsHttpError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, MSG_UNAUTHENTICATED.to_string()),

            AppError::MissingParameters { .. }
            | AppError::Domain(DomainError::InvalidGenerationRequest(_)) => {
                (StatusCode::BAD_REQUEST, MSG_MISSING_PARAMETERS.to_string())
            }

            AppError::InvalidAction { .. }
            | AppError::Domain(DomainError::InvalidCreditAction(_)) => {
                (StatusCode::BAD_REQUEST, MSG_INVALID_ACTION.to_string())
            }

            AppError::Credit(credit_error) => (StatusCode::BAD_REQUEST, credit_error.to_string()),

            AppError::Domain(domain_error) => (StatusCode::BAD_REQUEST, domain_error.to_string()),

            AppError::ValidationError { message } => (StatusCode::BAD_REQUEST, message.clone()),

            AppError::ProfileCreationFailed { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MSG_PROFILE_CREATION_FAILED.to_string(),
            ),

            AppError::GenerationFailed { .. } => {
                (StatusCode::BAD_GATEWAY, MSG_GENERATION_REFUNDED.to_string())
            }

            _ => (StatusCode::INTERNAL_SERVER_ERROR, MSG_SERVER_ERROR.to_string()),
        }
    }
}

impl IntoResponse for CreditsHttpError {
    fn into_response(self) -> Response {
        log_error(&self.0);
        let (status_code, message) = self.status_and_message();

        (
            status_code,
            Json(CreditsErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<AppError> for CreditsHttpError {
    fn from(app_error: AppError) -> Self {
        CreditsHttpError(app_error)
    }
}

#[cfg(test)]
mod tests {
    use domain::credits::CreditError;

    use super::*;

    fn mapped(error: AppError) -> (StatusCode, String) {
        CreditsHttpError(error).status_and_message()
    }

    #[test]
    fn credit_outcomes_keep_their_user_facing_message() {
        assert_eq!(
            mapped(AppError::Credit(CreditError::InsufficientCredits {
                required: 5,
                available: 1
            })),
            (StatusCode::BAD_REQUEST, "积分不足".to_string())
        );
        assert_eq!(
            mapped(AppError::Credit(CreditError::UserNotFound)),
            (StatusCode::BAD_REQUEST, "用户不存在".to_string())
        );
        assert_eq!(
            mapped(AppError::Credit(CreditError::InvalidAmount { amount: 0 })),
            (StatusCode::BAD_REQUEST, "无效金额".to_string())
        );
    }

    #[test]
    fn storage_faults_never_leak_detail() {
        let (status, message) = mapped(AppError::DatabaseError {
            message: "connection refused on 10.0.0.3".to_string(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, MSG_SERVER_ERROR);
    }

    #[test]
    fn failed_generation_reports_the_refund() {
        assert_eq!(
            mapped(AppError::GenerationFailed {
                message: "timeout".to_string()
            }),
            (StatusCode::BAD_GATEWAY, MSG_GENERATION_REFUNDED.to_string())
        );
    }
}
