//! Inbound request parsing and outbound provider request types

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use log::{debug, trace};

use crate::error::Error;

/// Validated deck request, one per invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRequest
{   /// Presentation topic
    pub topic: String
  , /// Requested slide count, always >= 1
    #[serde(rename = "numSlides")]
    pub num_slides: usize
}

impl DeckRequest
{   /// Parse and validate an inbound function event.
    ///
    /// Accepts an API-Gateway proxy event (`body` as JSON text,
    /// base64 text when `isBase64Encoded`, or an object) or the
    /// bare payload for direct invocations.
    pub fn from_event(
      event: Value
    , max_slides: usize
    ) -> Result<Self, Error>
    {   let payload = event_payload(event)?;
        trace!("Request payload: {}", payload);
        Self::from_payload(&payload, max_slides)
    }

    /// Validate an already-decoded payload object
    pub fn from_payload(
      payload: &Value
    , max_slides: usize
    ) -> Result<Self, Error>
    {   let object = payload.as_object().ok_or_else(|| {
          Error::MalformedRequest(
            "request body must be a JSON object".to_string()
          )
        })?;

        let topic = read_topic(object)?;
        let num_slides = read_num_slides(object)?;

        let (Some(topic), Some(num_slides)) = (topic, num_slides)
        else
        {   return Err(Error::MissingField(
              "topic and numSlides must both be provided".to_string()
            ));
        };

        if num_slides > max_slides
        {   return Err(Error::MalformedRequest(format!(
              "numSlides must be at most {}, got {}",
              max_slides, num_slides
            )));
        }

        debug!(
          "Parsed request: topic={:?}, slides={}",
          topic, num_slides
        );
        Ok(DeckRequest { topic, num_slides })
    }
}

fn event_payload(event: Value) -> Result<Value, Error>
{   let Value::Object(mut object) = event
    else
    {   return Err(Error::MalformedRequest(
          "event must be a JSON object".to_string()
        ));
    };

    let encoded = object
      .get("isBase64Encoded")
      .and_then(Value::as_bool)
      .unwrap_or(false);

    match object.remove("body")
    {   None => Ok(Value::Object(object))
      , Some(Value::Null) => Err(Error::MalformedRequest(
          "request body is empty".to_string()
        ))
      , Some(Value::String(text)) => {
          let text = if encoded
          {   decode_base64_body(&text)?
          } else
          {   text
          };
          serde_json::from_str(&text).map_err(|e| {
            Error::MalformedRequest(e.to_string())
          })
        }
      , Some(body @ Value::Object(_)) => Ok(body)
      , Some(_) => Err(Error::MalformedRequest(
          "request body must be a JSON object".to_string()
        ))
    }
}

fn decode_base64_body(text: &str) -> Result<String, Error>
{   let bytes = base64::engine::general_purpose::STANDARD
      .decode(text.trim())
      .map_err(|e| Error::MalformedRequest(
        format!("body is not valid base64: {}", e)
      ))?;
    String::from_utf8(bytes).map_err(|e| {
      Error::MalformedRequest(
        format!("body is not valid UTF-8: {}", e)
      )
    })
}

fn read_topic(object: &Map<String, Value>)
  -> Result<Option<String>, Error>
{   match object.get("topic")
    {   None | Some(Value::Null) => Ok(None)
      , Some(Value::String(topic)) => {
          if topic.trim().is_empty()
          {   Ok(None)
          } else
          {   Ok(Some(topic.clone()))
          }
        }
      , Some(_) => Err(Error::MalformedRequest(
          "topic must be a string".to_string()
        ))
    }
}

fn read_num_slides(object: &Map<String, Value>)
  -> Result<Option<usize>, Error>
{   match object.get("numSlides")
    {   None | Some(Value::Null) => Ok(None)
      , Some(Value::Number(n)) => {
          if let Some(count) = n.as_u64()
          {   if count == 0
              {   return Ok(None);
              }
              return usize::try_from(count).map(Some).map_err(|_| {
                Error::MalformedRequest(
                  "numSlides is too large".to_string()
                )
              });
          }
          match n.as_f64()
          {   Some(f) if f == 0.0 => return Ok(None)
            , Some(f) if f > 0.0 && f.fract() == 0.0
                && f <= u32::MAX as f64 => {
                return Ok(Some(f as usize));
              }
            , _ => {}
          }
          Err(Error::MalformedRequest(format!(
            "numSlides must be a positive integer, got {}",
            n
          )))
        }
      , Some(_) => Err(Error::MalformedRequest(
          "numSlides must be a positive integer".to_string()
        ))
    }
}

/// Text-completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// Model identifier
    pub model: String
  , /// Prompt text
    pub prompt: String
  , /// Max tokens to generate
    pub max_tokens: usize
}

/// Image-generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest
{   /// Zero-based slide index the image is for
    #[serde(skip)]
    pub slide: usize
  , /// Prompt text
    pub prompt: String
  , /// Image count, always 1 here
    pub n: u32
  , /// Resolution such as "512x512"
    pub size: String
  , /// Optional model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>
}

/// JSON error body returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody
{   /// Short error summary
    pub error: String
  , /// Underlying cause, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>
}

impl From<&Error> for ErrorBody
{   fn from(err: &Error) -> Self
    {   ErrorBody
        {   error: err.summary().to_string()
          , details: err.details()
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[test]
    fn parses_proxy_event_with_string_body()
    {   let event = json!({
          "body": "{\"topic\":\"Renewable Energy\",\"numSlides\":3}"
        });
        let request = DeckRequest::from_event(event, 20)
          .expect("request should parse");
        assert_eq!(request.topic, "Renewable Energy");
        assert_eq!(request.num_slides, 3);
    }

    #[test]
    fn parses_base64_body_and_bare_payload()
    {   let body = base64::engine::general_purpose::STANDARD
          .encode(r#"{"topic":"Tides","numSlides":2}"#);
        let event = json!({ "body": body, "isBase64Encoded": true });
        let request = DeckRequest::from_event(event, 20)
          .expect("base64 body should parse");
        assert_eq!(request.num_slides, 2);

        let bare = json!({ "topic": "Tides", "numSlides": 1 });
        let request = DeckRequest::from_event(bare, 20)
          .expect("bare payload should parse");
        assert_eq!(request.topic, "Tides");
    }

    #[test]
    fn invalid_json_is_malformed()
    {   let event = json!({ "body": "{not json" });
        assert!(matches!(
          DeckRequest::from_event(event, 20),
          Err(Error::MalformedRequest(_))
        ));

        let event = json!({ "body": null });
        assert!(matches!(
          DeckRequest::from_event(event, 20),
          Err(Error::MalformedRequest(_))
        ));
    }

    #[test]
    fn falsy_fields_are_missing()
    {   for payload in [
          json!({ "numSlides": 3 }),
          json!({ "topic": "", "numSlides": 3 }),
          json!({ "topic": "   ", "numSlides": 3 }),
          json!({ "topic": "Solar" }),
          json!({ "topic": "Solar", "numSlides": 0 }),
          json!({ "topic": "Solar", "numSlides": null }),
        ]
        {   assert!(
              matches!(
                DeckRequest::from_payload(&payload, 20),
                Err(Error::MissingField(_))
              ),
              "expected MissingField for {}",
              payload
            );
        }
    }

    #[test]
    fn wrongly_typed_fields_are_malformed()
    {   for payload in [
          json!({ "topic": 7, "numSlides": 3 }),
          json!({ "topic": "Solar", "numSlides": -2 }),
          json!({ "topic": "Solar", "numSlides": 2.5 }),
          json!({ "topic": "Solar", "numSlides": "3" }),
          json!({ "topic": "Solar", "numSlides": 21 }),
          json!([1, 2, 3]),
        ]
        {   assert!(
              matches!(
                DeckRequest::from_payload(&payload, 20),
                Err(Error::MalformedRequest(_))
              ),
              "expected MalformedRequest for {}",
              payload
            );
        }
    }

    #[test]
    fn integral_floats_count_as_integers()
    {   let payload = json!({ "topic": "Solar", "numSlides": 2.0 });
        let request = DeckRequest::from_payload(&payload, 20)
          .expect("2.0 should be accepted");
        assert_eq!(request.num_slides, 2);

        let payload = json!({ "topic": "Solar", "numSlides": 0.0 });
        assert!(matches!(
          DeckRequest::from_payload(&payload, 20),
          Err(Error::MissingField(_))
        ));

        let payload = json!({ "topic": "Solar", "numSlides": 40.0 });
        assert!(matches!(
          DeckRequest::from_payload(&payload, 20),
          Err(Error::MalformedRequest(_))
        ));
    }

    #[test]
    fn image_request_omits_unset_model()
    {   let request = ImageRequest
        {   slide: 0
          , prompt: "a sunrise".to_string()
          , n: 1
          , size: "512x512".to_string()
          , model: None
        };
        let value = serde_json::to_value(&request)
          .expect("request should serialize");
        assert_eq!(
          value,
          json!({ "prompt": "a sunrise", "n": 1, "size": "512x512" })
        );
    }
}
