//! OpenAI-style chat and image clients.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::prompt;
use crate::providers::{GeneratedImage, ImageProvider, PromptProvider, ProviderError};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    prompt_model: String,
    image_model: String,
    size: String,
    quality: String,
    max_prompt_tokens: u32,
    download_timeout: Duration,
}

impl OpenAiClient {
    pub fn new(cfg: &Config, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            api_key,
            prompt_model: cfg.prompt_model.clone(),
            image_model: cfg.image_model.clone(),
            size: cfg.size.clone(),
            quality: cfg.quality.clone(),
            max_prompt_tokens: cfg.max_prompt_tokens,
            download_timeout: Duration::from_secs(cfg.download_timeout_secs),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let resp = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;
        let bytes = resp.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOwned,
}

#[derive(Deserialize)]
struct MsgOwned {
    content: String,
}

#[derive(Serialize)]
struct ImageReq<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
}

#[derive(Deserialize)]
struct ImageResp {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize, Default)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

#[derive(Debug)]
enum ImageSource {
    Url(String),
    Inline(Vec<u8>),
}

/// Resolve one image result: a remote URL wins over an inline payload, and
/// a result carrying neither is a hard failure.
fn pick_source(datum: Option<ImageDatum>) -> Result<ImageSource, ProviderError> {
    let datum = datum.ok_or_else(|| ProviderError::Fatal("no image data returned".into()))?;
    if let Some(url) = datum.url.filter(|u| !u.is_empty()) {
        return Ok(ImageSource::Url(url));
    }
    if let Some(b64) = datum.b64_json.filter(|b| !b.is_empty()) {
        let bytes = BASE64
            .decode(b64.as_bytes())
            .map_err(|e| ProviderError::Fatal(format!("invalid base64 image payload: {e}")))?;
        return Ok(ImageSource::Inline(bytes));
    }
    Err(ProviderError::Fatal("no image data returned".into()))
}

fn classify(err: reqwest::Error) -> ProviderError {
    if let Some(status) = err.status() {
        if status.as_u16() == 429 {
            return ProviderError::RateLimited;
        }
        if status.is_server_error() {
            return ProviderError::Http(err.to_string());
        }
        return ProviderError::Fatal(err.to_string());
    }
    if err.is_decode() {
        return ProviderError::Fatal(err.to_string());
    }
    ProviderError::Http(err.to_string())
}

#[async_trait]
impl PromptProvider for OpenAiClient {
    async fn next_prompt(&self, last_prompt: Option<&str>) -> Result<String, ProviderError> {
        let user = prompt::user_message(last_prompt);
        let req = ChatReq {
            model: &self.prompt_model,
            max_tokens: self.max_prompt_tokens,
            messages: vec![
                Msg {
                    role: "system",
                    content: prompt::SYSTEM_INSTRUCTION,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
        };
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?
            .json::<ChatResp>()
            .await
            .map_err(classify)?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Fatal("empty chat response".into()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn render(&self, prompt_text: &str) -> Result<GeneratedImage, ProviderError> {
        let req = ImageReq {
            model: &self.image_model,
            prompt: prompt_text,
            size: &self.size,
            quality: &self.quality,
        };
        let resp = self
            .http
            .post(format!("{}/images/generations", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?
            .json::<ImageResp>()
            .await
            .map_err(classify)?;

        let bytes = match pick_source(resp.data.into_iter().next())? {
            ImageSource::Url(url) => {
                tracing::debug!(%url, "downloading image result");
                self.download(&url).await?
            }
            ImageSource::Inline(bytes) => bytes,
        };

        Ok(GeneratedImage {
            bytes,
            model: self.image_model.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
