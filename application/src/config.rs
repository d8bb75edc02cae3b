use domain::credits::CreditPricing;
use time::Duration;

use crate::error::{AppError, AppResult};
use crate::infrastructure_config::Config;

#[derive(Debug, Clone)]
pub struct CreditSettings {
    pub pricing: CreditPricing,
    pub reservation_ttl: Duration,
    pub multi_pose_count: usize,
    pub reconcile_batch_size: usize,
}

impl CreditSettings {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let pricing = CreditPricing::new(
            config.credits.initial_credits,
            config.credits.main_image_cost,
            config.credits.multi_pose_cost,
        )
        .map_err(|e| AppError::ConfigError {
            message: format!("Invalid credit pricing: {e}"),
        })?;

        Ok(Self {
            pricing,
            reservation_ttl: Duration::seconds(
                i64::try_from(config.credits.reservation_ttl_secs).unwrap_or(i64::MAX),
            ),
            multi_pose_count: config.generation.multi_pose_count,
            reconcile_batch_size: config.credits.reconcile_batch_size,
        })
    }
}

impl Default for CreditSettings {
    fn default() -> Self {
        Self {
            pricing: CreditPricing::default(),
            reservation_ttl: Duration::minutes(10),
            multi_pose_count: 3,
            reconcile_batch_size: 100,
        }
    }
}
