//! Short story with a matching illustration.

use super::image::IMAGE_MODEL;
use super::media::DataUri;
use crate::error::{Error, Result};
use crate::llm::{prompt, GenerateRequest, InferenceClient, LlmError, Modality};

/// Model used for the story text.
pub const STORY_MODEL: &str = "googleai/gemini-1.5-flash-latest";

/// A generated story and its illustration.
#[derive(Debug, Clone)]
pub struct Story {
    pub story: String,
    pub image: DataUri,
}

/// Write a one-paragraph story about `topic`, then illustrate its opening.
///
/// The two calls run sequentially; the illustration is prompted from the story.
pub async fn generate_story<C>(client: &C, topic: &str) -> Result<Story>
where
    C: InferenceClient + ?Sized,
{
    if topic.trim().is_empty() {
        return Err(Error::InvalidInput("a topic is required".to_string()));
    }

    let story = client
        .generate(GenerateRequest::prompt(STORY_MODEL, prompt::story(topic)))
        .await?
        .into_text()?;
    tracing::debug!(chars = story.len(), "Story written, requesting illustration");

    let request = GenerateRequest::prompt(IMAGE_MODEL, prompt::illustration(&story))
        .with_modalities(&[Modality::Text, Modality::Image]);
    let response = client.generate(request).await?;
    let media = response.first_media("image/").ok_or_else(|| {
        LlmError::Malformed("image generation failed to produce an image for the story".into())
    })?;

    Ok(Story {
        image: DataUri::new(media.mime_type.clone(), media.data.clone()),
        story,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerateResponse;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct StoryClient {
        prompts: Mutex<Vec<(String, String)>>,
        with_image: bool,
    }

    #[async_trait]
    impl InferenceClient for StoryClient {
        async fn generate(
            &self,
            request: GenerateRequest,
        ) -> std::result::Result<GenerateResponse, LlmError> {
            let text = request.last_text().unwrap_or_default().to_string();
            self.prompts.lock().push((request.model.clone(), text));
            if request.model == STORY_MODEL {
                Ok(GenerateResponse::from_text("Once upon a time, a robot learned to paint."))
            } else if self.with_image {
                Ok(GenerateResponse::from_media("image/png", "cGFpbnQ="))
            } else {
                Ok(GenerateResponse::from_text("no image today"))
            }
        }
    }

    #[tokio::test]
    async fn writes_story_then_illustrates_it() {
        let client = StoryClient {
            with_image: true,
            ..StoryClient::default()
        };
        let story = generate_story(&client, "a painting robot").await.unwrap();

        assert_eq!(story.story, "Once upon a time, a robot learned to paint.");
        assert_eq!(story.image.mime_type, "image/png");

        let prompts = client.prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].1.contains("a painting robot"));
        assert_eq!(prompts[1].0, IMAGE_MODEL);
        assert!(prompts[1].1.contains("a robot learned to paint"));
    }

    #[tokio::test]
    async fn missing_illustration_fails_the_story() {
        let client = StoryClient::default();
        let err = generate_story(&client, "dragons").await.unwrap_err();
        assert!(matches!(err, Error::Inference(LlmError::Malformed(_))));
    }

    #[tokio::test]
    async fn topic_is_required() {
        let client = StoryClient::default();
        assert!(matches!(generate_story(&client, "").await, Err(Error::InvalidInput(_))));
        assert!(client.prompts.lock().is_empty());
    }
}
