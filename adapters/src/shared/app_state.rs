use std::sync::Arc;

use wornshot_application::infrastructure_config::Config;
use wornshot_application::ports::incoming::{
    auth::AuthUseCase, credits::CreditsUseCase, generation::GenerationUseCase,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credits_use_case: Arc<dyn CreditsUseCase + Send + Sync>,
    pub generation_use_case: Arc<dyn GenerationUseCase + Send + Sync>,
    pub auth_use_case: Arc<dyn AuthUseCase + Send + Sync>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        credits_use_case: Arc<dyn CreditsUseCase + Send + Sync>,
        generation_use_case: Arc<dyn GenerationUseCase + Send + Sync>,
        auth_use_case: Arc<dyn AuthUseCase + Send + Sync>,
    ) -> Self {
        Self {
            config,
            credits_use_case,
            generation_use_case,
            auth_use_case,
        }
    }
}
