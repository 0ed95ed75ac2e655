use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info};
use serde_json::Value;

use crate::config::DeckConfig;
use crate::deck::Deck;
use crate::deliver::{deliver, DeckFile};
use crate::error::Error;
use crate::illustrate::generate_illustrations;
use crate::outline::generate_outline;
use crate::providers::{
  HttpWebhook, ImageGeneration, OpenAiClient, TextCompletion,
  WebhookSender,
};
use crate::request::DeckRequest;
use crate::response::{error_response, ApiGatewayResponse};

/// Provider handles shared by every invocation
#[derive(Clone)]
pub struct Backend
{   pub text: Arc<dyn TextCompletion>
  , pub images: Arc<dyn ImageGeneration>
  , pub webhook: Arc<dyn WebhookSender>
}

impl Backend
{   /// OpenAI for text and images, plain HTTP for the webhook
    pub fn from_config(config: &DeckConfig) -> Result<Self, Error>
    {   let openai = Arc::new(OpenAiClient::new(&config.provider)?);
        let webhook = Arc::new(HttpWebhook::new(&config.provider)?);
        Ok(Backend
        {   text: openai.clone()
          , images: openai
          , webhook
        })
    }
}

/// The deck generation function.
///
/// Runs Validate -> Outline -> Illustrate -> Assemble -> Deliver.
/// Any stage failure short-circuits to an error response; only
/// per-slide image failures are absorbed.
pub struct DeckHandler
{   config: DeckConfig
  , backend: Result<Backend, Error>
}

impl DeckHandler
{   /// Build with the real providers. A provider failure is kept
    /// and reported on each request after validation.
    pub fn new(config: DeckConfig) -> Self
    {   let backend = Backend::from_config(&config);
        if let Err(e) = &backend
        {   error!("Provider initialization failed: {}", e);
        }
        DeckHandler { config, backend }
    }

    /// Build with explicit providers
    pub fn with_backend(config: DeckConfig, backend: Backend) -> Self
    {   DeckHandler
        {   config
          , backend: Ok(backend)
        }
    }

    /// Handle one event, always producing a response
    pub async fn handle(&self, event: Value) -> ApiGatewayResponse
    {   match self.run(event).await
        {   Ok(response) => {
              info!("Function completed successfully");
              response
            }
          , Err(e) => {
              error!("Request failed: {}", e);
              error_response(&e)
            }
        }
    }

    /// Like `handle`, but a panic anywhere in the pipeline becomes
    /// a 500 `UnexpectedError` response
    pub async fn handle_guarded(&self, event: Value)
      -> ApiGatewayResponse
    {   match AssertUnwindSafe(self.handle(event))
          .catch_unwind()
          .await
        {   Ok(response) => response
          , Err(panic) => {
              let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
              error!("Unexpected error in deck handler: {}", message);
              error_response(&Error::UnexpectedError(message))
            }
        }
    }

    async fn run(&self, event: Value)
      -> Result<ApiGatewayResponse, Error>
    {   let request = DeckRequest::from_event(
          event,
          self.config.max_slides
        )?;
        info!(
          "Generating {} slides on {:?}",
          request.num_slides, request.topic
        );

        let backend = self.backend.as_ref().map_err(Clone::clone)?;

        let contents = generate_outline(
          backend.text.as_ref(),
          &self.config.provider,
          &request
        ).await?;

        let images = generate_illustrations(
          backend.images.as_ref(),
          &self.config.provider,
          &request,
          self.config.image_concurrency
        ).await;

        let deck = Deck::assemble(&request.topic, contents, images);
        let bytes = deck.to_pptx()?;
        debug!("Deck serialized");

        let file = DeckFile::new(
          &request.topic,
          bytes,
          deck.slides.len()
        );
        deliver(
          &file,
          &self.config.delivery,
          backend.webhook.as_ref()
        ).await
    }
}
