use futures::future::join_all;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::config::CreditSettings;
use crate::credits::service::load_or_create_profile;
use crate::error::{AppError, AppResult};
use crate::ports::incoming::generation::{GenerationOutcome, GenerationUseCase};
use crate::ports::outgoing::image_generation::{DynImageGenerationPort, ImagePrompt};
use crate::ports::outgoing::profile_store::DynProfileStorePort;
use crate::ports::outgoing::reservation_store::DynReservationStorePort;
use domain::auth::UserId;
use domain::generation::{GeneratedImage, GenerationKind, GenerationRequest, POSE_DIRECTIONS};
use domain::reservation::{Reservation, ReservationId};

/// Charges for a generation before it runs and settles the charge after.
///
/// The cost is held in a reservation. Success confirms it; a failed or empty
/// generation refunds it. A reservation that is never settled, because the
/// process died mid-call, is refunded later by the reconciler once it expires.
pub struct GenerationService {
    profile_store: DynProfileStorePort,
    reservation_store: DynReservationStorePort,
    generator: DynImageGenerationPort,
    settings: CreditSettings,
}

impl GenerationService {
    pub fn new(
        profile_store: DynProfileStorePort,
        reservation_store: DynReservationStorePort,
        generator: DynImageGenerationPort,
        settings: CreditSettings,
    ) -> Self {
        Self {
            profile_store,
            reservation_store,
            generator,
            settings,
        }
    }

    async fn run(&self, kind: GenerationKind, request: &GenerationRequest) -> Vec<GeneratedImage> {
        match kind {
            GenerationKind::MainImage => {
                let prompt = ImagePrompt {
                    prompt: request.main_prompt(),
                    reference_image_url: request.reference_image_url.clone(),
                };
                match self.generator.generate(&prompt).await {
                    Ok(Some(url)) => vec![GeneratedImage { url, pose: None }],
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        warn!(error = %e, "Main image generation call failed");
                        Vec::new()
                    }
                }
            }
            GenerationKind::MultiPose => {
                let prompts: Vec<ImagePrompt> = request
                    .pose_prompts(self.settings.multi_pose_count)
                    .into_iter()
                    .map(|prompt| ImagePrompt {
                        prompt,
                        reference_image_url: request.reference_image_url.clone(),
                    })
                    .collect();

                let results = join_all(prompts.iter().map(|p| self.generator.generate(p))).await;

                results
                    .into_iter()
                    .zip(POSE_DIRECTIONS)
                    .filter_map(|(result, pose)| match result {
                        Ok(Some(url)) => Some(GeneratedImage {
                            url,
                            pose: Some(pose.to_string()),
                        }),
                        Ok(None) => None,
                        Err(e) => {
                            warn!(error = %e, pose, "Pose generation call failed");
                            None
                        }
                    })
                    .collect()
            }
        }
    }

    async fn refund_after_failure(&self, reservation_id: &ReservationId) -> AppError {
        match self
            .reservation_store
            .refund(reservation_id, OffsetDateTime::now_utc())
            .await
        {
            Ok(Some(refund)) => {
                info!(
                    reservation_id = %reservation_id,
                    new_balance = refund.new_balance,
                    "Refunded credits after failed generation"
                );
                AppError::GenerationFailed {
                    message: "no image was produced".to_string(),
                }
            }
            Ok(None) => {
                warn!(reservation_id = %reservation_id, "Reservation already settled before refund");
                AppError::GenerationFailed {
                    message: "no image was produced".to_string(),
                }
            }
            Err(e) => {
                error!(
                    reservation_id = %reservation_id,
                    error = %e,
                    "Refund failed; reservation left pending for the reconciler"
                );
                AppError::GenerationFailed {
                    message: "no image was produced; refund deferred".to_string(),
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl GenerationUseCase for GenerationService {
    #[instrument(skip(self, request), fields(user_id = %user_id, kind = %kind, scene = %request.scene_id))]
    async fn generate(
        &self,
        user_id: &UserId,
        kind: GenerationKind,
        request: GenerationRequest,
    ) -> AppResult<GenerationOutcome> {
        load_or_create_profile(
            &self.profile_store,
            user_id,
            self.settings.pricing.initial_credits,
        )
        .await?;

        let cost = kind.cost(&self.settings.pricing);
        let reservation = Reservation::new(
            user_id.clone(),
            kind,
            cost,
            OffsetDateTime::now_utc(),
            self.settings.reservation_ttl,
        );

        let balance_after_reserve = self.reservation_store.reserve(&reservation).await??;

        info!(
            reservation_id = %reservation.id,
            cost = cost.get(),
            balance = balance_after_reserve,
            "Reserved credits for generation"
        );

        let images = self.run(kind, &request).await;

        if images.is_empty() {
            return Err(self.refund_after_failure(&reservation.id).await);
        }

        let confirmed = self
            .reservation_store
            .confirm(&reservation.id, OffsetDateTime::now_utc())
            .await?;

        let (credits_charged, new_balance) = if confirmed.is_some() {
            (cost.get(), balance_after_reserve)
        } else {
            // Expired and refunded by the reconciler while the model was still running.
            warn!(reservation_id = %reservation.id, "Reservation settled before confirmation");
            let balance = self
                .profile_store
                .get_profile(user_id)
                .await?
                .map_or(balance_after_reserve, |p| p.credits);
            (0, balance)
        };

        info!(
            reservation_id = %reservation.id,
            images = images.len(),
            credits_charged,
            "Generation completed"
        );

        Ok(GenerationOutcome {
            reservation_id: reservation.id,
            kind,
            images,
            credits_charged,
            new_balance,
        })
    }
}
