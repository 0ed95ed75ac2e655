//! Configuration for providers and deck delivery

use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::debug;

pub const DEFAULT_API_BASE: &str
  = "https://api.openai.com/v1";
pub const DEFAULT_TEXT_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_MAX_TOKENS: usize = 500;
pub const DEFAULT_IMAGE_SIZE: &str = "512x512";
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_SLIDES: usize = 20;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// How a finished deck leaves the function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery
{   /// Base64 body with attachment headers
    Download
  , /// POST the binary to an external endpoint
    Webhook
    {   url: String
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// Credential, absent until configured
    #[serde(skip_serializing)]
    pub api_key: Option<String>
  , /// API base URL
    pub api_base: String
  , /// Completion model identifier
    pub text_model: String
  , /// Completion output bound
    pub max_tokens: usize
  , /// Image model, provider default when unset
    pub image_model: Option<String>
  , /// Image resolution, e.g. "512x512"
    pub image_size: String
  , /// Request timeout in seconds
    pub timeout_secs: u64
}

impl ProviderConfig
{   pub fn timeout(&self) -> Duration
    {   Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_key: None
          , api_base: DEFAULT_API_BASE.to_string()
          , text_model: DEFAULT_TEXT_MODEL.to_string()
          , max_tokens: DEFAULT_MAX_TOKENS
          , image_model: None
          , image_size: DEFAULT_IMAGE_SIZE.to_string()
          , timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS
        }
    }
}

/// Deck generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig
{   /// Provider configuration
    pub provider: ProviderConfig
  , /// Max in-flight image requests
    pub image_concurrency: usize
  , /// Largest accepted slide count
    pub max_slides: usize
  , /// Delivery strategy
    pub delivery: Delivery
}

impl Default for DeckConfig
{   fn default() -> Self
    {   DeckConfig
        {   provider: ProviderConfig::default()
          , image_concurrency: DEFAULT_IMAGE_CONCURRENCY
          , max_slides: DEFAULT_MAX_SLIDES
          , delivery: Delivery::Download
        }
    }
}

impl DeckConfig
{   /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F)
      -> Result<Self, crate::error::Error>
    where
      F: Fn(&str) -> Option<String>
    {   let get = |key: &str| {
          lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        };

        let defaults = ProviderConfig::default();
        let provider = ProviderConfig
        {   api_key: get("OPENAI_API_KEY")
          , api_base: get("OPENAI_BASE_URL")
              .map(|v| v.trim_end_matches('/').to_string())
              .unwrap_or(defaults.api_base)
          , text_model: get("DECK_TEXT_MODEL")
              .unwrap_or(defaults.text_model)
          , max_tokens: parse_or(
              "DECK_MAX_TOKENS",
              get("DECK_MAX_TOKENS"),
              defaults.max_tokens
            )?
          , image_model: get("DECK_IMAGE_MODEL")
          , image_size: get("DECK_IMAGE_SIZE")
              .unwrap_or(defaults.image_size)
          , timeout_secs: parse_or(
              "DECK_HTTP_TIMEOUT_SECS",
              get("DECK_HTTP_TIMEOUT_SECS"),
              defaults.timeout_secs
            )?
        };

        let delivery = match get("DECK_DELIVERY")
          .map(|v| v.to_ascii_lowercase())
          .as_deref()
        {   None | Some("download") => Delivery::Download
          , Some("webhook") => {
              let url = get("DECK_WEBHOOK_URL").ok_or_else(|| {
                crate::error::Error::InvalidConfiguration(
                  "DECK_WEBHOOK_URL is required for webhook delivery"
                    .to_string()
                )
              })?;
              Delivery::Webhook { url }
            }
          , Some(other) => {
              return Err(crate::error::Error::InvalidConfiguration(
                format!("unknown DECK_DELIVERY mode: {}", other)
              ));
            }
        };

        let image_concurrency = parse_or(
          "DECK_IMAGE_CONCURRENCY",
          get("DECK_IMAGE_CONCURRENCY"),
          DEFAULT_IMAGE_CONCURRENCY
        )?;
        let max_slides = parse_or(
          "DECK_MAX_SLIDES",
          get("DECK_MAX_SLIDES"),
          DEFAULT_MAX_SLIDES
        )?;

        if image_concurrency == 0 || max_slides == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "DECK_IMAGE_CONCURRENCY and DECK_MAX_SLIDES must be \
               positive"
                .to_string()
            ));
        }

        debug!(
          "Loaded config: model={}, delivery={:?}",
          provider.text_model, delivery
        );

        Ok(DeckConfig
        {   provider
          , image_concurrency
          , max_slides
          , delivery
        })
    }
}

fn parse_or<T: std::str::FromStr>(
  key: &str
, value: Option<String>
, default: T
) -> Result<T, crate::error::Error>
{   match value
    {   None => Ok(default)
      , Some(raw) => raw.parse().map_err(|_| {
          crate::error::Error::InvalidConfiguration(
            format!("{} is not a valid number: {}", key, raw)
          )
        })
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)])
      -> impl Fn(&str) -> Option<String>
    {   let map: HashMap<String, String> = pairs
          .iter()
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults()
    {   let config = DeckConfig::from_lookup(lookup(&[]))
          .expect("defaults should load");
        assert!(config.provider.api_key.is_none());
        assert_eq!(config.provider.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.provider.image_size, "512x512");
        assert_eq!(config.delivery, Delivery::Download);
    }

    #[test]
    fn webhook_mode_reads_destination()
    {   let config = DeckConfig::from_lookup(lookup(&[
          ("DECK_DELIVERY", "Webhook"),
          ("DECK_WEBHOOK_URL", "https://hooks.example.test/deck"),
          ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]))
        .expect("webhook config should load");
        assert_eq!(
          config.delivery,
          Delivery::Webhook
          {   url: "https://hooks.example.test/deck".to_string()
          }
        );
        assert_eq!(
          config.provider.api_base,
          "http://localhost:8080/v1"
        );
    }

    #[test]
    fn webhook_mode_without_url_is_rejected()
    {   let result = DeckConfig::from_lookup(lookup(&[
          ("DECK_DELIVERY", "webhook"),
        ]));
        assert!(matches!(
          result,
          Err(crate::error::Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn bad_numbers_are_rejected()
    {   let result = DeckConfig::from_lookup(lookup(&[
          ("DECK_MAX_TOKENS", "lots"),
        ]));
        assert!(matches!(
          result,
          Err(crate::error::Error::InvalidConfiguration(_))
        ));

        let result = DeckConfig::from_lookup(lookup(&[
          ("DECK_IMAGE_CONCURRENCY", "0"),
        ]));
        assert!(result.is_err());
    }
}
