use crate::incoming::http_axum::{dto, handlers};
use dto::common_responses::{
    InternalServerErrorResponse, RateLimitExceededResponse, UnauthorizedResponse,
    ValidationErrorResponse,
};
use dto::requests::{CreditsRequest, GenerateRequest, LoginRequest, RegisterRequest};
use dto::responses::{
    ApiResponseUser, ApiResponseValue, CreditsBalanceResponse, CreditsErrorResponse,
    CreditsMutationResponse, GeneratedImageResponse, GenerationResponse, UserResponse,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::credits::get_credits,
        handlers::credits::post_credits,
        handlers::generation::generate_main_image,
        handlers::generation::generate_multi_pose,
        handlers::health::health_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
    ),
    components(
        schemas(
            CreditsRequest,
            GenerateRequest,
            RegisterRequest,
            LoginRequest,
            CreditsBalanceResponse,
            CreditsMutationResponse,
            CreditsErrorResponse,
            GeneratedImageResponse,
            GenerationResponse,
            ApiResponseValue,
            ApiResponseUser,
            UserResponse
        ),
        responses(
            RateLimitExceededResponse,
            InternalServerErrorResponse,
            UnauthorizedResponse,
            ValidationErrorResponse
        )
    ),
    tags(
        (name = "credits", description = "Credit balance - read the caller's balance and apply deduct/add mutations atomically"),
        (name = "generation", description = "Charged image generation - credits are reserved up front, confirmed on success and refunded on failure"),
        (name = "auth", description = "Authentication - register, login, logout, and current user"),
        (name = "system", description = "System health and status monitoring")
    ),
    info(
        title = "Wornshot Backend API",
        description = "Backend for an AI product-photo app. Users spend credits to turn garment photos into model shots; balances are enforced server-side with atomic conditional updates.",
        contact(
            name = "Wornshot",
        ),
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
    )
)]
pub struct ApiDoc;
