//! In-memory deck model and assembly

pub mod pptx;

use log::{debug, info};

use crate::illustrate::{ImageAsset, SlideImage};
use crate::outline::SlideContent;

/// Position and size of a frame, in inches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame
{   pub x: f64
  , pub y: f64
  , pub w: f64
  , pub h: f64
}

/// 16:9 slide canvas
pub const SLIDE_WIDTH_IN: f64 = 10.0;
pub const SLIDE_HEIGHT_IN: f64 = 5.625;

pub const TITLE_FRAME: Frame
  = Frame { x: 0.5, y: 0.5, w: 9.0, h: 0.75 };
pub const BODY_FRAME: Frame
  = Frame { x: 0.5, y: 1.5, w: 9.0, h: 1.0 };
pub const IMAGE_FRAME: Frame
  = Frame { x: 0.5, y: 2.5, w: 6.0, h: 3.0 };

pub const TITLE_FONT_PT: u32 = 24;
pub const BODY_FONT_PT: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide
{   pub title: String
  , pub body: String
  , pub image: Option<ImageAsset>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck
{   /// Document title, the request topic
    pub title: String
  , pub slides: Vec<Slide>
}

impl Deck
{   /// Build one slide per content block, attaching the image
    /// with the same index when one was generated
    pub fn assemble(
      topic: &str
    , contents: Vec<SlideContent>
    , images: Vec<SlideImage>
    ) -> Self
    {   let mut by_index: Vec<Option<ImageAsset>>
          = vec![None; contents.len()];
        for slot in images
        {   if let Some(entry) = by_index.get_mut(slot.index)
            {   *entry = slot.image;
            }
        }

        let slides: Vec<Slide> = contents
          .into_iter()
          .zip(by_index)
          .map(|(content, image)| Slide
          {   title: format!("Slide {}", content.index + 1)
            , body: content.text
            , image
          })
          .collect();

        debug!(
          "Assembled {} slides, {} with images",
          slides.len(),
          slides.iter().filter(|s| s.image.is_some()).count()
        );

        Deck
        {   title: topic.to_string()
          , slides
        }
    }

    /// Serialize to a .pptx buffer
    pub fn to_pptx(&self) -> Result<Vec<u8>, crate::error::Error>
    {   info!("Creating PowerPoint with {} slides", self.slides.len());
        let bytes = pptx::write_presentation(self)?;
        debug!("PowerPoint is {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nxxxx";

    fn contents(n: usize) -> Vec<SlideContent>
    {   (0..n)
          .map(|index| SlideContent
          {   index
            , text: format!("body {}", index + 1)
          })
          .collect()
    }

    #[test]
    fn images_attach_by_index_regardless_of_order()
    {   let images = vec![
          SlideImage
          {   index: 2
            , image: ImageAsset::new(None, PNG.to_vec()).ok()
          },
          SlideImage { index: 1, image: None },
          SlideImage
          {   index: 0
            , image: ImageAsset::new(None, PNG.to_vec()).ok()
          },
        ];

        let deck = Deck::assemble("Tides", contents(3), images);

        assert_eq!(deck.slides.len(), 3);
        assert_eq!(deck.slides[0].title, "Slide 1");
        assert_eq!(deck.slides[2].body, "body 3");
        assert!(deck.slides[0].image.is_some());
        assert!(deck.slides[1].image.is_none());
        assert!(deck.slides[2].image.is_some());
    }

    #[test]
    fn missing_image_slots_leave_text_only_slides()
    {   let deck = Deck::assemble("Tides", contents(2), vec![]);
        assert!(deck.slides.iter().all(|s| s.image.is_none()));
        assert_eq!(deck.slides[1].title, "Slide 2");
    }
}
