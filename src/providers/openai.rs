use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::illustrate::ImageAsset;
use crate::request::{CompletionRequest, ImageRequest};

// ===== Wire Types =====

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse
{   pub choices: Vec<CompletionChoice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice
{   pub text: String
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesResponse
{   pub data: Vec<ImageData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData
{   #[serde(default)]
    pub url: Option<String>
  , #[serde(default)]
    pub b64_json: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorEnvelope
{   error: ApiErrorDetail
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorDetail
{   message: String
}

// ===== OpenAI Client =====

/// OpenAI-compatible client for completions and images
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   /// Build a client; fails without a credential
    pub fn new(config: &ProviderConfig) -> Result<Self, Error>
    {   debug!("Creating OpenAiClient for {}", config.api_base);
        let api_key = config.api_key.clone().ok_or_else(|| {
          error!("No OpenAI API key configured");
          Error::ProviderInitError(
            "OPENAI_API_KEY is not set".to_string()
          )
        })?;

        let http_client = reqwest::Client::builder()
          .timeout(config.timeout())
          .build()
          .map_err(|e| {
            error!("HTTP client build failed: {}", e);
            Error::ProviderInitError(e.to_string())
          })?;

        Ok(OpenAiClient
        {   api_key
          , api_base: config.api_base.clone()
          , http_client
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
      &self
    , path: &str
    , body: &T
    ) -> Result<reqwest::Response, String>
    {   let response = self.http_client
          .post(format!("{}/{}", self.api_base, path))
          .header(
            "Authorization",
            format!("Bearer {}", self.api_key)
          )
          .json(body)
          .send()
          .await
          .map_err(|e| format!("HTTP error: {}", e))?;

        let status = response.status();
        trace!("{} response status: {}", path, status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(format!(
              "API error ({}): {}",
              status,
              api_error_message(&error_text)
            ));
        }
        Ok(response)
    }

    async fn fetch_image_bytes(&self, url: &str)
      -> Result<Vec<u8>, String>
    {   trace!("Fetching image from {}", url);
        let response = self.http_client
          .get(url)
          .send()
          .await
          .map_err(|e| format!("image download failed: {}", e))?;

        let status = response.status();
        if !status.is_success()
        {   return Err(format!(
              "image download returned {}",
              status
            ));
        }

        response.bytes().await
          .map(|b| b.to_vec())
          .map_err(|e| format!("image download failed: {}", e))
    }
}

#[async_trait]
impl crate::providers::TextCompletion for OpenAiClient
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<String, Error>
    {   debug!("Requesting completion from {}", request.model);

        let response = self
          .post_json("completions", request)
          .await
          .map_err(|e| {
            error!("Completion failed: {}", e);
            Error::TextGenerationError(e)
          })?;

        let completion: CompletionResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            Error::TextGenerationError(
              format!("Parse error: {}", e)
            )
          })?;

        let choice = completion.choices.into_iter().next()
          .ok_or_else(|| {
            error!("No choices in response");
            Error::TextGenerationError(
              "API response contained no choices".to_string()
            )
          })?;

        debug!(
          "Completion finished: {} chars, reason={:?}",
          choice.text.len(),
          choice.finish_reason
        );
        Ok(choice.text)
    }
}

#[async_trait]
impl crate::providers::ImageGeneration for OpenAiClient
{   async fn generate_image(
      &self
    , request: &ImageRequest
    ) -> Result<ImageAsset, Error>
    {   let slide = request.slide;
        let failure = |reason: String| {
          Error::ImageGenerationFailure { slide, reason }
        };

        let response = self
          .post_json("images/generations", request)
          .await
          .map_err(failure)?;

        let images: ImagesResponse = response.json().await
          .map_err(|e| failure(format!("Parse error: {}", e)))?;

        let image = images.data.into_iter().next()
          .ok_or_else(|| {
            failure("API response contained no images".to_string())
          })?;

        match (image.url, image.b64_json)
        {   (_, Some(encoded)) => {
              let data = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| failure(e.to_string()))?;
              ImageAsset::new(None, data).map_err(failure)
            }
          , (Some(url), None) => {
              let data = self.fetch_image_bytes(&url).await
                .map_err(failure)?;
              ImageAsset::new(Some(url), data).map_err(failure)
            }
          , (None, None) => Err(failure(
              "image entry had neither url nor data".to_string()
            ))
        }
    }
}

/// Pull `error.message` out of an API error body when present
fn api_error_message(body: &str) -> String
{   serde_json::from_str::<ApiErrorEnvelope>(body)
      .map(|e| e.error.message)
      .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn client_requires_api_key()
    {   let config = ProviderConfig::default();
        assert!(matches!(
          OpenAiClient::new(&config),
          Err(Error::ProviderInitError(_))
        ));

        let config = ProviderConfig
        {   api_key: Some("sk-test".to_string())
          , ..ProviderConfig::default()
        };
        assert!(OpenAiClient::new(&config).is_ok());
    }

    #[test]
    fn api_error_message_prefers_structured_error()
    {   let body = r#"{"error":{"message":"quota exceeded"}}"#;
        assert_eq!(api_error_message(body), "quota exceeded");
        assert_eq!(api_error_message("bad gateway"), "bad gateway");
    }
}
