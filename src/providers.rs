use async_trait::async_trait;
use image::{ImageBuffer, Rgba};
use std::fmt;

/// Provider failures, split so retry loops can tell transient from fatal.
#[derive(Debug)]
pub enum ProviderError {
    RateLimited,
    /// Network-layer or server-side trouble worth retrying.
    Http(String),
    /// Malformed or empty response; retrying will not help.
    Fatal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ProviderError::Fatal(_))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::RateLimited => write!(f, "rate limited by provider"),
            ProviderError::Http(msg) => write!(f, "http error: {msg}"),
            ProviderError::Fatal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub model: String,
}

/// Produces the next scene description, optionally evolving the previous one.
/// Pure request/response: implementations must not persist anything.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    async fn next_prompt(&self, last_prompt: Option<&str>) -> Result<String, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Renders a prompt into image bytes.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn render(&self, prompt: &str) -> Result<GeneratedImage, ProviderError>;
    fn name(&self) -> &'static str;
}

/// Offline provider: deterministic prompt evolution and a synthesized PNG.
pub struct MockProvider;

const SEED_PROMPT: &str = "A cinematic wide shot of a misty mountain valley at dawn, \
painterly softness, warm golden light.";

#[async_trait]
impl PromptProvider for MockProvider {
    async fn next_prompt(&self, last_prompt: Option<&str>) -> Result<String, ProviderError> {
        Ok(match last_prompt {
            None => SEED_PROMPT.to_string(),
            Some(last) => format!(
                "{}, as dusk settles and the first stars appear.",
                last.trim_end_matches('.')
            ),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl ImageProvider for MockProvider {
    async fn render(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        // CPU-bound synthesis, small enough to do inline.
        let (w, h) = (64u32, 64u32);
        let mut img = ImageBuffer::<Rgba<u8>, Vec<u8>>::new(w, h);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let v = ((x ^ y) & 0xff) as u8;
            *p = Rgba([v, 255 - v, (prompt.len() % 255) as u8, 255]);
        }
        let mut png_bytes: Vec<u8> = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut png_bytes),
                image::ImageFormat::Png,
            )
            .map_err(|e| ProviderError::Fatal(format!("encode error: {e}")))?;

        Ok(GeneratedImage {
            bytes: png_bytes,
            model: "mock".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_seeds_on_first_run_and_evolves_after() {
        let first = MockProvider.next_prompt(None).await.unwrap();
        assert_eq!(first, SEED_PROMPT);

        let second = MockProvider.next_prompt(Some(&first)).await.unwrap();
        assert!(second.starts_with("A cinematic wide shot"));
        assert!(second.ends_with("the first stars appear."));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn mock_render_produces_a_valid_png() {
        let img = MockProvider.render("anything").await.unwrap();
        assert_eq!(img.model, "mock");
        let decoded = image::load_from_memory(&img.bytes).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 64);
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::RateLimited.is_transient());
        assert!(ProviderError::Http("503".into()).is_transient());
        assert!(!ProviderError::Fatal("no image data returned".into()).is_transient());
    }
}
