use tracing::debug;
use uuid::Uuid;

use wornshot_application::{
    error::AppResult,
    ports::outgoing::image_generation::{ImageGenerationPort, ImagePrompt},
};

/// Development stand-in for the model: answers every prompt with a
/// placeholder URL derived from the reference image.
#[derive(Debug, Default)]
pub struct EchoImageGenerator;

#[async_trait::async_trait]
impl ImageGenerationPort for EchoImageGenerator {
    async fn generate(&self, prompt: &ImagePrompt) -> AppResult<Option<String>> {
        let url = format!(
            "{}#generated-{}",
            prompt.reference_image_url,
            Uuid::new_v4().simple()
        );
        debug!(%url, "Echo generator produced placeholder image");
        Ok(Some(url))
    }
}
