use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "docs")]
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /api/credits`. Both fields are untyped JSON at the wire level
/// so the handler can answer a missing or mistyped one with the contract's own
/// message instead of a deserializer rejection.
#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Balance mutation. `action` is `deduct` or `add`; `amount` is a positive integer.",
    example = json!({
        "action": "deduct",
        "amount": 1
    })
))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreditsRequest {
    #[cfg_attr(feature = "docs", schema(value_type = Option<String>, example = "deduct"))]
    pub action: Option<Value>,
    #[cfg_attr(feature = "docs", schema(value_type = Option<i64>, example = 1))]
    pub amount: Option<Value>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Generation request for a main image or a multi-pose set",
    example = json!({
        "sceneId": "studio-white",
        "referenceImageUrl": "https://cdn.example.com/uploads/dress.png",
        "prompt": "soft morning light"
    })
))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[cfg_attr(feature = "docs", schema(example = "studio-white"))]
    pub scene_id: Option<String>,
    #[cfg_attr(feature = "docs", schema(example = "https://cdn.example.com/uploads/dress.png"))]
    pub reference_image_url: Option<String>,
    #[cfg_attr(feature = "docs", schema(example = "soft morning light"))]
    pub prompt: Option<String>,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Request to register a new user account with email and password. Password strength is evaluated using zxcvbn with a minimum score of 3/4 (strong).",
    example = json!({
        "email": "user@example.com",
        "username": "johndoe",
        "password": "MyVerySecure!Password123"
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[cfg_attr(feature = "docs", schema(example = "user@example.com"))]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[cfg_attr(feature = "docs", schema(example = "johndoe"))]
    #[validate(length(
        min = 4,
        max = 32,
        message = "Username must be between 4 and 32 characters"
    ))]
    pub username: String,

    #[cfg_attr(feature = "docs", schema(example = "MyVerySecure!Password123"))]
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[cfg_attr(feature = "docs", schema(
    description = "Request to login with email and password",
    example = json!({
        "email": "user@example.com",
        "password": "MyVerySecure!Password123"
    })
))]
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[cfg_attr(feature = "docs", schema(example = "user@example.com"))]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[cfg_attr(feature = "docs", schema(example = "secure_password"))]
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}
