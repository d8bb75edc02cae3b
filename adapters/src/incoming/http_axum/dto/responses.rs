use serde::Serialize;
#[cfg(feature = "docs")]
use utoipa::ToSchema;
use uuid::Uuid;

use domain::generation::GeneratedImage;

/// Envelope used by the auth and system routes.
#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Standard API response wrapper with success indicator, optional error message, and optional data payload"
))]
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success_with_data(data: Option<T>) -> Self {
        Self {
            ok: true,
            error: None,
            data,
        }
    }
}

#[cfg(feature = "docs")]
#[derive(serde::Serialize, utoipa::ToSchema)]
#[schema(title = "ApiResponseValue")]
pub struct ApiResponseValue {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(feature = "docs")]
#[derive(serde::Serialize, utoipa::ToSchema)]
#[schema(title = "ApiResponseUser")]
pub struct ApiResponseUser {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserResponse>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "User data returned in authentication responses",
    example = json!({
        "id": "550e8400-e29b-41d4-a716-446655440000",
        "email": "user@example.com",
        "username": "johndoe",
        "created_at": "2025-01-01T12:00:00Z"
    })
))]
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub created_at: String,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Current balance of the caller",
    example = json!({ "success": true, "credits": 6, "isSubscriber": false })
))]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsBalanceResponse {
    pub success: bool,
    pub credits: i32,
    pub is_subscriber: bool,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Balance after a successful mutation",
    example = json!({ "success": true, "newBalance": 5 })
))]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsMutationResponse {
    pub success: bool,
    pub new_balance: i32,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Failure envelope of the /api routes. `error` is the user-facing message.",
    example = json!({ "success": false, "error": "积分不足" })
))]
#[derive(Debug, Clone, Serialize)]
pub struct CreditsErrorResponse {
    pub success: bool,
    pub error: String,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImageResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pose: Option<String>,
}

impl From<GeneratedImage> for GeneratedImageResponse {
    fn from(image: GeneratedImage) -> Self {
        Self {
            url: image.url,
            pose: image.pose,
        }
    }
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Images produced by a charged generation",
    example = json!({
        "success": true,
        "reservationId": "0b8f3c1e-6a55-4c43-9a8a-3f0e0f1b2c3d",
        "images": [{ "url": "https://img.example.com/out.png" }],
        "creditsCharged": 1,
        "newBalance": 5
    })
))]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub success: bool,
    pub reservation_id: Uuid,
    pub images: Vec<GeneratedImageResponse>,
    pub credits_charged: i32,
    pub new_balance: i32,
}
