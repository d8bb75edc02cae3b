use crate::error::AppResult;
use domain::auth::UserId;
use domain::generation::{GeneratedImage, GenerationKind, GenerationRequest};
use domain::reservation::ReservationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    pub reservation_id: ReservationId,
    pub kind: GenerationKind,
    pub images: Vec<GeneratedImage>,
    pub credits_charged: i32,
    pub new_balance: i32,
}

#[async_trait::async_trait]
pub trait GenerationUseCase: Send + Sync {
    /// Reserves the cost of `kind`, runs the generation, and either confirms
    /// the charge or refunds it.
    async fn generate(
        &self,
        user_id: &UserId,
        kind: GenerationKind,
        request: GenerationRequest,
    ) -> AppResult<GenerationOutcome>;
}
