//! Per-slide image generation with per-item failure isolation

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::providers::ImageGeneration;
use crate::request::{DeckRequest, ImageRequest};

/// Image encodings a deck can embed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat
{   Png
  , Jpeg
  , Gif
}

impl ImageFormat
{   /// Sniff the format from magic bytes
    pub fn detect(data: &[u8]) -> Option<Self>
    {   if data.starts_with(b"\x89PNG\r\n\x1a\n")
        {   Some(ImageFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF])
        {   Some(ImageFormat::Jpeg)
        } else if data.starts_with(b"GIF87a")
          || data.starts_with(b"GIF89a")
        {   Some(ImageFormat::Gif)
        } else
        {   None
        }
    }

    pub const ALL: [ImageFormat; 3]
      = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif];

    pub fn extension(&self) -> &'static str
    {   match self
        {   ImageFormat::Png => "png"
          , ImageFormat::Jpeg => "jpeg"
          , ImageFormat::Gif => "gif"
        }
    }

    pub fn content_type(&self) -> &'static str
    {   match self
        {   ImageFormat::Png => "image/png"
          , ImageFormat::Jpeg => "image/jpeg"
          , ImageFormat::Gif => "image/gif"
        }
    }
}

/// Downloaded image ready to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset
{   /// Source URL, absent for inline base64 results
    pub url: Option<String>
  , pub format: ImageFormat
  , pub data: Vec<u8>
}

impl ImageAsset
{   pub fn new(
      url: Option<String>
    , data: Vec<u8>
    ) -> Result<Self, String>
    {   let format = ImageFormat::detect(&data)
          .ok_or_else(|| "unrecognized image format".to_string())?;
        Ok(ImageAsset { url, format, data })
    }
}

/// Image lookup result for one slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideImage
{   pub index: usize
  , /// None when generation failed for this slide
    pub image: Option<ImageAsset>
}

pub fn image_prompt(topic: &str, index: usize) -> String
{   format!(
      "A visually appealing and relevant image for slide {} \
       on the topic \"{}\"",
      index + 1,
      topic
    )
}

/// Generate one image per slide, at most `concurrency` at a time.
///
/// Failures degrade to an empty slot for that slide only. The
/// result always has `num_slides` entries ordered by index.
pub async fn generate_illustrations(
  images: &dyn ImageGeneration
, provider: &ProviderConfig
, request: &DeckRequest
, concurrency: usize
) -> Vec<SlideImage>
{   info!(
      "Generating {} images ({} at a time)",
      request.num_slides, concurrency
    );

    let mut results: Vec<SlideImage>
      = stream::iter(0..request.num_slides)
        .map(|index| {
          let image_request = ImageRequest
          {   slide: index
            , prompt: image_prompt(&request.topic, index)
            , n: 1
            , size: provider.image_size.clone()
            , model: provider.image_model.clone()
          };
          async move {
            let image = match images
              .generate_image(&image_request)
              .await
            {   Ok(asset) => {
                  debug!("Generated image for slide {}", index + 1);
                  Some(asset)
                }
              , Err(e) => {
                  warn!("{}", e);
                  None
                }
            };
            SlideImage { index, image }
          }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|slot| slot.index);

    let missing = results.iter()
      .filter(|slot| slot.image.is_none())
      .count();
    if missing > 0
    {   warn!("{} of {} slides have no image", missing, results.len());
    }
    results
}

#[cfg(test)]
mod tests
{   use super::*;
    use async_trait::async_trait;
    use crate::error::Error;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n0000";

    /// Fails every slide whose index is odd
    struct OddFailures;

    #[async_trait]
    impl ImageGeneration for OddFailures
    {   async fn generate_image(
          &self
        , request: &ImageRequest
        ) -> Result<ImageAsset, Error>
        {   if request.slide % 2 == 1
            {   return Err(Error::ImageGenerationFailure
                {   slide: request.slide
                  , reason: "boom".to_string()
                });
            }
            ImageAsset::new(
              Some(format!("https://img.test/{}", request.slide)),
              PNG.to_vec()
            )
            .map_err(Error::UnexpectedError)
        }
    }

    #[test]
    fn detects_embeddable_formats()
    {   assert_eq!(ImageFormat::detect(PNG), Some(ImageFormat::Png));
        assert_eq!(
          ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]),
          Some(ImageFormat::Jpeg)
        );
        assert_eq!(
          ImageFormat::detect(b"GIF89a.."),
          Some(ImageFormat::Gif)
        );
        assert_eq!(ImageFormat::detect(b"<html>"), None);
        assert!(ImageAsset::new(None, b"<html>".to_vec()).is_err());
    }

    #[test]
    fn prompt_uses_one_based_slide_numbers()
    {   assert_eq!(
          image_prompt("Tides", 0),
          "A visually appealing and relevant image for slide 1 \
           on the topic \"Tides\""
        );
    }

    #[test]
    fn failures_only_empty_their_own_slot()
    {   let request = DeckRequest
        {   topic: "Tides".to_string()
          , num_slides: 5
        };
        let provider = ProviderConfig::default();

        let slots = tokio_test::block_on(generate_illustrations(
          &OddFailures,
          &provider,
          &request,
          3
        ));

        assert_eq!(slots.len(), 5);
        for (i, slot) in slots.iter().enumerate()
        {   assert_eq!(slot.index, i);
            assert_eq!(slot.image.is_some(), i % 2 == 0);
        }
        assert_eq!(
          slots[2].image.as_ref().and_then(|i| i.url.as_deref()),
          Some("https://img.test/2")
        );
    }
}
