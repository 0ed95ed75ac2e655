//! Outline generation: one completion call split into slide bodies

use log::{debug, info, error};

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::providers::TextCompletion;
use crate::request::{CompletionRequest, DeckRequest};

/// Body text for one slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideContent
{   pub index: usize
  , pub text: String
}

pub fn outline_prompt(topic: &str, num_slides: usize) -> String
{   format!(
      "Create a {}-slide presentation outline for the topic: {}. \
       Each slide should include a title and content.",
      num_slides, topic
    )
}

/// Split completion text on runs of blank lines.
///
/// A line counts as blank when it is empty after trimming.
/// Chunks are trimmed and empty ones dropped.
pub fn split_outline(text: &str) -> Vec<String>
{   let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines()
    {   if line.trim().is_empty()
        {   if !current.is_empty()
            {   chunks.push(current.join("\n"));
                current.clear();
            }
        } else
        {   current.push(line);
        }
    }
    if !current.is_empty()
    {   chunks.push(current.join("\n"));
    }

    chunks
      .into_iter()
      .map(|chunk| chunk.trim().to_string())
      .filter(|chunk| !chunk.is_empty())
      .collect()
}

/// Request the outline and cut it into exactly `num_slides` bodies
pub async fn generate_outline(
  text: &dyn TextCompletion
, provider: &ProviderConfig
, request: &DeckRequest
) -> Result<Vec<SlideContent>, Error>
{   info!("Generating slide content for {:?}", request.topic);

    let completion = CompletionRequest
    {   model: provider.text_model.clone()
      , prompt: outline_prompt(&request.topic, request.num_slides)
      , max_tokens: provider.max_tokens
    };
    let raw = text.complete(&completion).await?;

    let chunks = split_outline(&raw);
    debug!("Outline produced {} chunks", chunks.len());

    if chunks.len() < request.num_slides
    {   error!(
          "Insufficient content: {} of {} slides",
          chunks.len(), request.num_slides
        );
        return Err(Error::InsufficientContent
        {   requested: request.num_slides
          , produced: chunks.len()
        });
    }
    if chunks.len() > request.num_slides
    {   debug!(
          "Dropping {} surplus chunks",
          chunks.len() - request.num_slides
        );
    }

    Ok(chunks
      .into_iter()
      .take(request.num_slides)
      .enumerate()
      .map(|(index, text)| SlideContent { index, text })
      .collect())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn splits_on_blank_line_runs()
    {   let text = "\n\nIntro\nWhy it matters\n\n\n\nHistory\n \t\n\
                    Outlook  \n";
        assert_eq!(
          split_outline(text),
          vec![
            "Intro\nWhy it matters".to_string(),
            "History".to_string(),
            "Outlook".to_string(),
          ]
        );
    }

    #[test]
    fn handles_crlf_and_empty_text()
    {   assert_eq!(
          split_outline("One\r\n\r\nTwo\r\n"),
          vec!["One".to_string(), "Two".to_string()]
        );
        assert!(split_outline("").is_empty());
        assert!(split_outline("\n   \n\n").is_empty());
    }

    #[test]
    fn single_newlines_stay_inside_a_chunk()
    {   let chunks = split_outline("Title\n- a\n- b");
        assert_eq!(chunks, vec!["Title\n- a\n- b".to_string()]);
    }

    #[test]
    fn prompt_names_topic_and_count()
    {   assert_eq!(
          outline_prompt("Renewable Energy", 3),
          "Create a 3-slide presentation outline for the topic: \
           Renewable Energy. Each slide should include a title and \
           content."
        );
    }
}
