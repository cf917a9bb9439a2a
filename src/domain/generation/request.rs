//! Generation request value object.

use crate::domain::foundation::ValidationError;

use super::AspectRatio;

/// Upper bound on reference images forwarded to the provider.
pub const MAX_REFERENCE_IMAGES: usize = 10;

/// Upper bound on prompt length, in characters.
pub const MAX_PROMPT_CHARS: usize = 5000;

/// A validated request to generate one image.
///
/// Transient: it lives for the duration of a single dispatch and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    reference_image_urls: Vec<String>,
    aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Validates and builds a request.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if the prompt is blank
    /// - `OutOfRange` if the prompt or reference list is too long
    /// - `InvalidFormat` if a reference locator is not an http(s) URL
    pub fn new(
        prompt: impl Into<String>,
        reference_image_urls: Vec<String>,
        aspect_ratio: AspectRatio,
    ) -> Result<Self, ValidationError> {
        let prompt = prompt.into().trim().to_string();
        if prompt.is_empty() {
            return Err(ValidationError::empty_field("prompt"));
        }

        let prompt_chars = prompt.chars().count();
        if prompt_chars > MAX_PROMPT_CHARS {
            return Err(ValidationError::out_of_range(
                "prompt",
                1,
                MAX_PROMPT_CHARS as i64,
                prompt_chars as i64,
            ));
        }

        if reference_image_urls.len() > MAX_REFERENCE_IMAGES {
            return Err(ValidationError::out_of_range(
                "reference_image_urls",
                0,
                MAX_REFERENCE_IMAGES as i64,
                reference_image_urls.len() as i64,
            ));
        }

        if let Some(bad) = reference_image_urls
            .iter()
            .find(|url| !(url.starts_with("https://") || url.starts_with("http://")))
        {
            return Err(ValidationError::invalid_format(
                "reference_image_urls",
                format!("'{}' is not an http(s) URL", bad),
            ));
        }

        Ok(Self {
            prompt,
            reference_image_urls,
            aspect_ratio,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn reference_image_urls(&self) -> &[String] {
        &self.reference_image_urls
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }
}
