use std::sync::Arc;

use crate::error::AppResult;

/// A single call to the external image model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePrompt {
    pub prompt: String,
    pub reference_image_url: String,
}

#[async_trait::async_trait]
pub trait ImageGenerationPort: Send + Sync {
    /// Returns the URL of the generated image, or `None` when the model
    /// answered without a usable result.
    async fn generate(&self, prompt: &ImagePrompt) -> AppResult<Option<String>>;
}

pub type DynImageGenerationPort = Arc<dyn ImageGenerationPort>;
