//! Provider seams and their HTTP implementations

pub mod openai;
pub mod webhook;

use async_trait::async_trait;

use crate::error::Error;
use crate::illustrate::ImageAsset;
use crate::request::{CompletionRequest, ImageRequest};

// Re-export for convenience
pub use openai::OpenAiClient;
pub use webhook::HttpWebhook;

/// Text-completion capability used by the outline stage
#[async_trait]
pub trait TextCompletion: Send + Sync
{   async fn complete(
      &self
    , request: &CompletionRequest
    ) -> Result<String, Error>;
}

/// Image-generation capability used by the illustration stage
#[async_trait]
pub trait ImageGeneration: Send + Sync
{   async fn generate_image(
      &self
    , request: &ImageRequest
    ) -> Result<ImageAsset, Error>;
}

/// Outbound webhook used by the webhook delivery strategy
#[async_trait]
pub trait WebhookSender: Send + Sync
{   async fn post_deck(
      &self
    , url: &str
    , file: &crate::deliver::DeckFile
    ) -> Result<(), Error>;
}
