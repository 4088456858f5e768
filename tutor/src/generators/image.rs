//! Image generation from a text prompt.

use super::media::DataUri;
use crate::error::{Error, Result};
use crate::llm::{GenerateRequest, InferenceClient, LlmError, Modality};

/// Model used for image output.
pub const IMAGE_MODEL: &str = "googleai/gemini-2.0-flash-preview-image-generation";

/// A generated image.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub image: DataUri,
    /// Any caption text the model returned alongside the image.
    pub caption: Option<String>,
}

/// Generate an image for `prompt`.
pub async fn generate_image<C>(client: &C, prompt: &str) -> Result<GeneratedImage>
where
    C: InferenceClient + ?Sized,
{
    if prompt.trim().is_empty() {
        return Err(Error::InvalidInput("a prompt is required".to_string()));
    }

    let request = GenerateRequest::prompt(IMAGE_MODEL, prompt)
        .with_modalities(&[Modality::Text, Modality::Image]);
    let response = client.generate(request).await?;

    let media = response.first_media("image/").ok_or_else(|| {
        tracing::warn!("Image generation returned no image");
        LlmError::EmptyOutput
    })?;

    Ok(GeneratedImage {
        image: DataUri::new(media.mime_type.clone(), media.data.clone()),
        caption: response.text.clone().filter(|t| !t.trim().is_empty()),
    })
}
