use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use wornshot_application::{
    error::{AppError, AppResult},
    infrastructure_config::GenerationConfig,
    ports::outgoing::image_generation::{ImageGenerationPort, ImagePrompt},
};

#[derive(Debug, Serialize)]
struct GenerateImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    reference_image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateImageResponse {
    image_url: Option<String>,
}

/// Calls the external garment try-on model over HTTP.
///
/// Transport errors, timeouts and non-2xx answers are `ExternalServiceError`.
/// A 2xx answer without an `image_url` is a valid "no result".
pub struct HttpImageGenerator {
    client: Client,
    endpoint_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpImageGenerator {
    pub fn from_config(config: &GenerationConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError {
                message: format!("Failed to build generation HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ImageGenerationPort for HttpImageGenerator {
    #[instrument(skip(self, prompt), fields(endpoint = %self.endpoint_url, model = %self.model))]
    async fn generate(&self, prompt: &ImagePrompt) -> AppResult<Option<String>> {
        let body = GenerateImageRequest {
            model: &self.model,
            prompt: &prompt.prompt,
            reference_image_url: &prompt.reference_image_url,
        };

        let mut request = self.client.post(&self.endpoint_url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "Generation request failed");
            AppError::ExternalServiceError {
                message: format!("generation request failed: {e}"),
            }
        })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, detail = %detail, "Generation endpoint returned an error");
            return Err(AppError::ExternalServiceError {
                message: format!("generation endpoint returned {status}"),
            });
        }

        let parsed: GenerateImageResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::ExternalServiceError {
                    message: format!("unreadable generation response: {e}"),
                })?;

        let image_url = parsed.image_url.filter(|url| !url.trim().is_empty());
        debug!(produced = image_url.is_some(), "Generation call finished");
        Ok(image_url)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use wornshot_application::infrastructure_config::GenerationBackend;

    fn config_for(server: &MockServer, api_key: Option<&str>) -> GenerationConfig {
        GenerationConfig {
            backend: GenerationBackend::Http,
            endpoint_url: format!("{}/v1/images/generate", server.uri()),
            api_key: api_key.map(SecretString::from),
            model: "garment-tryon-v1".to_string(),
            timeout_secs: 2,
            multi_pose_count: 3,
        }
    }

    fn prompt() -> ImagePrompt {
        ImagePrompt {
            prompt: "model wearing the dress, scene: beach".to_string(),
            reference_image_url: "https://cdn.example/dress.png".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_image_url_and_sends_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generate"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "garment-tryon-v1",
                "reference_image_url": "https://cdn.example/dress.png"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "image_url": "https://img.example/out.png" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::from_config(&config_for(&server, Some("sk-test"))).unwrap();

        let url = generator.generate(&prompt()).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://img.example/out.png"));
    }

    #[tokio::test]
    async fn missing_image_is_no_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "image_url": null })))
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::from_config(&config_for(&server, None)).unwrap();

        assert_eq!(generator.generate(&prompt()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_error_is_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::from_config(&config_for(&server, None)).unwrap();

        assert!(matches!(
            generator.generate(&prompt()).await,
            Err(AppError::ExternalServiceError { .. })
        ));
    }

    #[tokio::test]
    async fn slow_model_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "image_url": "https://img.example/late.png" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let generator = HttpImageGenerator::from_config(&config_for(&server, None)).unwrap();

        assert!(generator.generate(&prompt()).await.is_err());
    }
}
