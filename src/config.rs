use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Bounded-retry settings for the external calls.
#[derive(Debug, Clone)]
pub struct RetryCfg {
    pub attempts: u32,
    pub base_ms: u64,
    pub factor: f64,
    pub jitter_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Provider backend: "openai" or "mock".
    pub provider: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub prompt_model: String,
    pub image_model: String,
    /// Output resolution string, e.g. "1536x1024".
    pub size: String,
    /// Quality tier, e.g. "low".
    pub quality: String,
    pub max_prompt_tokens: u32,
    /// Client-side timeout for the generation calls, in seconds.
    pub timeout_secs: u64,
    /// Timeout for downloading a URL-based image result, in seconds.
    pub download_timeout_secs: u64,
    pub retry: RetryCfg,
    pub out_dir: PathBuf,
    pub state_file: PathBuf,
    /// Whether to apply the saved image as the desktop background.
    pub apply: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let out_dir = match std::env::var("WALLGEN_OUT_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => default_out_dir()?,
        };
        let state_file = match std::env::var("WALLGEN_STATE_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_state_file()?,
        };

        Ok(Self {
            provider: env_str("WALLGEN_PROVIDER", "openai"),
            api_base: env_str("WALLGEN_API_BASE", "https://api.openai.com/v1"),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            prompt_model: env_str("WALLGEN_PROMPT_MODEL", "gpt-4o-mini"),
            image_model: env_str("WALLGEN_IMAGE_MODEL", "gpt-image-1"),
            size: env_str("WALLGEN_SIZE", "1536x1024"),
            quality: env_str("WALLGEN_QUALITY", "low"),
            max_prompt_tokens: env_parse("WALLGEN_MAX_PROMPT_TOKENS", 150),
            timeout_secs: env_parse("WALLGEN_TIMEOUT_SECS", 120),
            download_timeout_secs: env_parse("WALLGEN_DOWNLOAD_TIMEOUT_SECS", 30),
            retry: RetryCfg {
                attempts: env_parse("WALLGEN_RETRIES", 3),
                base_ms: env_parse("WALLGEN_BACKOFF_BASE_MS", 500),
                factor: env_parse("WALLGEN_BACKOFF_FACTOR", 2.0),
                jitter_ms: env_parse("WALLGEN_BACKOFF_JITTER_MS", 250),
            },
            out_dir,
            state_file,
            apply: true,
        })
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn default_out_dir() -> Result<PathBuf> {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .map(|p| p.join("AI_Wallpapers"))
        .context("could not resolve a pictures directory")
}

fn default_state_file() -> Result<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_dir)
        .map(|d| d.join("wallgen").join("state.json"))
        .context("could not resolve a state directory")
}
