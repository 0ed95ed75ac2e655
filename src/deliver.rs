//! Delivery of the finished deck

use std::collections::BTreeMap;

use log::{info, error};
use serde_json::json;

use crate::config::Delivery;
use crate::error::Error;
use crate::providers::WebhookSender;
use crate::response::{binary_response, json_response, ApiGatewayResponse};

pub const PPTX_MIME_TYPE: &str
  = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Serialized deck plus the metadata delivery needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckFile
{   pub filename: String
  , pub bytes: Vec<u8>
  , pub slide_count: usize
}

impl DeckFile
{   pub fn new(topic: &str, bytes: Vec<u8>, slide_count: usize) -> Self
    {   DeckFile
        {   filename: deck_filename(topic)
          , bytes
          , slide_count
        }
    }

    pub fn content_disposition(&self) -> String
    {   format!("attachment; filename=\"{}\"", self.filename)
    }

    fn headers(&self) -> BTreeMap<String, String>
    {   BTreeMap::from([
          ("Content-Type".to_string(), PPTX_MIME_TYPE.to_string()),
          (
            "Content-Disposition".to_string(),
            self.content_disposition()
          ),
        ])
    }
}

/// Topic with every whitespace run replaced by one underscore,
/// plus the `.pptx` extension. Quotes, backslashes and control
/// characters are dropped so the name stays a valid header value.
pub fn deck_filename(topic: &str) -> String
{   let mut name = String::with_capacity(topic.len() + 5);
    let mut in_space = false;
    for c in topic.chars()
    {   if c.is_whitespace()
        {   if !in_space
            {   name.push('_');
            }
            in_space = true;
        } else
        {   in_space = false;
            if c != '"' && c != '\\' && !c.is_control()
            {   name.push(c);
            }
        }
    }
    name.push_str(".pptx");
    name
}

/// Hand the deck to the configured destination
pub async fn deliver(
  file: &DeckFile
, delivery: &Delivery
, webhook: &dyn WebhookSender
) -> Result<ApiGatewayResponse, Error>
{   match delivery
    {   Delivery::Download => {
          info!(
            "Returning {} ({} bytes) as download",
            file.filename,
            file.bytes.len()
          );
          Ok(binary_response(&file.bytes, file.headers()))
        }
      , Delivery::Webhook { url } => {
          info!("Forwarding {} to webhook", file.filename);
          webhook.post_deck(url, file).await.map_err(|e| {
            error!("Webhook delivery failed: {}", e);
            match e
            {   Error::DeliveryError(_) => e
              , other => Error::DeliveryError(other.to_string())
            }
          })?;
          Ok(json_response(200, &json!({
            "status": "delivered",
            "filename": file.filename,
            "slides": file.slide_count,
          })))
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn whitespace_runs_collapse_to_one_underscore()
    {   assert_eq!(
          deck_filename("Renewable Energy"),
          "Renewable_Energy.pptx"
        );
        assert_eq!(
          deck_filename("  Solar \t\t and   Wind\n"),
          "_Solar_and_Wind_.pptx"
        );
        assert_eq!(deck_filename("Tides"), "Tides.pptx");
    }

    #[test]
    fn quotes_never_reach_the_header()
    {   let file = DeckFile::new("The \"Best\" Plan", vec![], 0);
        assert_eq!(
          file.content_disposition(),
          "attachment; filename=\"The_Best_Plan.pptx\""
        );

        let file = DeckFile::new("A\u{1}B\u{7f}C\u{9b}", vec![], 0);
        assert_eq!(file.filename, "ABC.pptx");
    }

    #[test]
    fn download_sets_attachment_headers()
    {   struct Unused;

        #[async_trait::async_trait]
        impl WebhookSender for Unused
        {   async fn post_deck(
              &self
            , _url: &str
            , _file: &DeckFile
            ) -> Result<(), Error>
            {   panic!("download must not call the webhook");
            }
        }

        let file = DeckFile::new("Deep Sea", b"PK".to_vec(), 1);
        let response = tokio_test::block_on(
          deliver(&file, &Delivery::Download, &Unused)
        )
        .expect("download should succeed");

        assert_eq!(response.header("Content-Type"), Some(PPTX_MIME_TYPE));
        assert_eq!(
          response.header("Content-Disposition"),
          Some("attachment; filename=\"Deep_Sea.pptx\"")
        );
        assert_eq!(response.binary_body(), Some(b"PK".to_vec()));
    }
}
