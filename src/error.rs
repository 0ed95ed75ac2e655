use std::fmt;

/// Custom error type for deck generation
/// Implements Clone so a start-up failure can be
/// reported again on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Request body could not be parsed
    MalformedRequest(String)
  , /// Topic or slide count absent or falsy
    MissingField(String)
  , /// Provider client could not be created
    ProviderInitError(String)
  , /// Outline completion call failed
    TextGenerationError(String)
  , /// Outline produced fewer chunks than slides
    InsufficientContent
    {   requested: usize
      , produced: usize
    }
  , /// Image generation failed for a single slide
    ImageGenerationFailure
    {   slide: usize
      , reason: String
    }
  , /// Deck could not be serialized
    DeckBuildError(String)
  , /// Webhook forward failed
    DeliveryError(String)
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Catch-all
    UnexpectedError(String)
}

impl Error
{   /// HTTP status reported to the caller
    pub fn status_code(&self) -> u16
    {   match self
        {   Error::MalformedRequest(_)
          | Error::MissingField(_)
          | Error::InsufficientContent { .. } => 400
          , _ => 500
        }
    }

    /// Stable `error` string of the JSON error body
    pub fn summary(&self) -> &'static str
    {   match self
        {   Error::MalformedRequest(_) => "Invalid request body"
          , Error::MissingField(_) => {
              "Topic and number of slides are required"
            }
          , Error::ProviderInitError(_) => {
              "Error initializing OpenAI client"
            }
          , Error::TextGenerationError(_) => {
              "Error generating slide content"
            }
          , Error::InsufficientContent { .. } => {
              "Insufficient slide content generated."
            }
          , Error::ImageGenerationFailure { .. } => {
              "Error generating slide image"
            }
          , Error::DeckBuildError(_) => "Error creating PowerPoint"
          , Error::DeliveryError(_) => {
              "Failed to deliver deck to webhook"
            }
          , Error::InvalidConfiguration(_) => "Invalid configuration"
          , Error::UnexpectedError(_) => "Internal Server Error"
        }
    }

    /// Optional `details` string of the JSON error body
    pub fn details(&self) -> Option<String>
    {   match self
        {   Error::MalformedRequest(msg)
          | Error::MissingField(msg)
          | Error::ProviderInitError(msg)
          | Error::TextGenerationError(msg)
          | Error::DeckBuildError(msg)
          | Error::DeliveryError(msg)
          | Error::InvalidConfiguration(msg)
          | Error::UnexpectedError(msg) => Some(msg.clone())
          , Error::InsufficientContent { requested, produced } => {
              Some(format!(
                "requested {} slides, outline produced {}",
                requested, produced
              ))
            }
          , Error::ImageGenerationFailure { slide, reason } => {
              Some(format!("slide {}: {}", slide + 1, reason))
            }
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MalformedRequest(msg) => {
              write!(f, "Malformed request: {}", msg)
            }
          , Error::MissingField(msg) => {
              write!(f, "Missing field: {}", msg)
            }
          , Error::ProviderInitError(msg) => {
              write!(f, "Provider initialization failed: {}", msg)
            }
          , Error::TextGenerationError(msg) => {
              write!(f, "Text generation failed: {}", msg)
            }
          , Error::InsufficientContent { requested, produced } => {
              write!(f,
                "Insufficient content: requested {} slides, got {}",
                requested,
                produced
              )
            }
          , Error::ImageGenerationFailure { slide, reason } => {
              write!(f,
                "Image generation failed for slide {}: {}",
                slide + 1,
                reason
              )
            }
          , Error::DeckBuildError(msg) => {
              write!(f, "Deck build failed: {}", msg)
            }
          , Error::DeliveryError(msg) => {
              write!(f, "Delivery failed: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::UnexpectedError(msg) => {
              write!(f, "Unexpected error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::UnexpectedError(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::UnexpectedError(s.to_string())
    }
}

impl From<zip::result::ZipError> for Error
{   fn from(e: zip::result::ZipError) -> Self
    {   Error::DeckBuildError(e.to_string())
    }
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::DeckBuildError(e.to_string())
    }
}
