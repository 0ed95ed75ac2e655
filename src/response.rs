//! API-Gateway-style response envelope

use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::request::ErrorBody;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse
{   #[serde(rename = "statusCode")]
    pub status_code: u16
  , pub headers: BTreeMap<String, String>
  , pub body: String
  , #[serde(rename = "isBase64Encoded", default)]
    pub is_base64_encoded: bool
}

impl ApiGatewayResponse
{   pub fn header(&self, name: &str) -> Option<&str>
    {   self.headers
          .iter()
          .find(|(k, _)| k.eq_ignore_ascii_case(name))
          .map(|(_, v)| v.as_str())
    }

    /// Parse the body as JSON, for JSON responses
    pub fn json_body(&self) -> Option<Value>
    {   serde_json::from_str(&self.body).ok()
    }

    /// Decode the body, for binary responses
    pub fn binary_body(&self) -> Option<Vec<u8>>
    {   if !self.is_base64_encoded
        {   return None;
        }
        base64::engine::general_purpose::STANDARD
          .decode(self.body.as_bytes())
          .ok()
    }
}

pub fn json_response(status_code: u16, payload: &Value)
  -> ApiGatewayResponse
{   ApiGatewayResponse
    {   status_code
      , headers: BTreeMap::from([(
          "Content-Type".to_string(),
          "application/json".to_string()
        )])
      , body: payload.to_string()
      , is_base64_encoded: false
    }
}

pub fn error_response(err: &Error) -> ApiGatewayResponse
{   let body = ErrorBody::from(err);
    let payload = serde_json::to_value(&body)
      .unwrap_or_else(|_| serde_json::json!({ "error": body.error }));
    json_response(err.status_code(), &payload)
}

pub fn binary_response(
  bytes: &[u8]
, headers: BTreeMap<String, String>
) -> ApiGatewayResponse
{   ApiGatewayResponse
    {   status_code: 200
      , headers
      , body: base64::engine::general_purpose::STANDARD.encode(bytes)
      , is_base64_encoded: true
    }
}
