use async_trait::async_trait;
use log::{debug, error};

use crate::config::ProviderConfig;
use crate::deliver::DeckFile;
use crate::error::Error;

/// Plain HTTP POST of the deck binary
#[derive(Debug, Clone)]
pub struct HttpWebhook
{   http_client: reqwest::Client
}

impl HttpWebhook
{   pub fn new(config: &ProviderConfig) -> Result<Self, Error>
    {   let http_client = reqwest::Client::builder()
          .timeout(config.timeout())
          .build()
          .map_err(|e| Error::ProviderInitError(e.to_string()))?;
        Ok(HttpWebhook { http_client })
    }
}

#[async_trait]
impl crate::providers::WebhookSender for HttpWebhook
{   async fn post_deck(
      &self
    , url: &str
    , file: &DeckFile
    ) -> Result<(), Error>
    {   debug!(
          "Posting {} ({} bytes) to webhook",
          file.filename,
          file.bytes.len()
        );

        let response = self.http_client
          .post(url)
          .header("Content-Type", crate::deliver::PPTX_MIME_TYPE)
          .header("Content-Disposition", file.content_disposition())
          .body(file.bytes.clone())
          .send()
          .await
          .map_err(|e| {
            error!("Webhook HTTP error: {}", e);
            Error::DeliveryError(e.to_string())
          })?;

        let status = response.status();
        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Webhook rejected deck: {} {}", status, error_text);
            return Err(Error::DeliveryError(format!(
              "webhook returned {}: {}",
              status, error_text
            )));
        }

        debug!("Webhook accepted deck with {}", status);
        Ok(())
    }
}
