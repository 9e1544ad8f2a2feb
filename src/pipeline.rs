//! The run driver: wipe, load continuity, generate prompt, render image,
//! save, commit, apply. Strictly sequential; the first failure aborts the
//! remaining steps and leaves the continuity store untouched.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::backoff::backoff_ms;
use crate::config::{Config, RetryCfg};
use crate::io;
use crate::providers::{ImageProvider, PromptProvider, ProviderError};
use crate::setter::WallpaperSetter;
use crate::store::PromptStore;

#[derive(Debug)]
pub struct RunOutcome {
    pub image_path: PathBuf,
    pub prompt: String,
    pub applied: bool,
}

pub async fn run(
    cfg: &Config,
    store: &PromptStore,
    prompts: &dyn PromptProvider,
    images: &dyn ImageProvider,
    setter: &dyn WallpaperSetter,
) -> Result<RunOutcome> {
    tokio::fs::create_dir_all(&cfg.out_dir)
        .await
        .with_context(|| format!("failed to create {}", cfg.out_dir.display()))?;

    let removed = io::clean_dir(&cfg.out_dir).await?;
    if removed > 0 {
        info!(removed, "cleared previous wallpapers");
    }

    let last = store.load().map(|s| s.last_prompt);
    debug!(has_last = last.is_some(), "loaded continuity state");

    let raw = with_retries(&cfg.retry, "prompt generation", || {
        prompts.next_prompt(last.as_deref())
    })
    .await?;
    let prompt = raw.trim().to_string();
    if prompt.is_empty() {
        // Passed through unchanged; the image call decides what to make of it.
        warn!("prompt model returned blank text");
    } else {
        info!(provider = prompts.name(), %prompt, "generated prompt");
    }

    let image = with_retries(&cfg.retry, "image generation", || images.render(&prompt)).await?;

    let image_path =
        io::save_wallpaper(&cfg.out_dir, &image.bytes, &prompt, &image.model, &cfg.size).await?;
    info!(path = %image_path.display(), bytes = image.bytes.len(), "wallpaper saved");

    // Commit only now that the file is verified on disk.
    store
        .commit(&prompt)
        .context("failed to commit prompt state")?;

    let applied = if cfg.apply {
        setter
            .apply(&image_path)
            .with_context(|| format!("failed to apply wallpaper via {}", setter.name()))?;
        true
    } else {
        debug!("apply disabled, leaving desktop unchanged");
        false
    };

    Ok(RunOutcome {
        image_path,
        prompt,
        applied,
    })
}

/// Retry `call` on transient provider errors, up to `cfg.attempts` tries.
/// Fatal errors and the final attempt's error surface immediately.
async fn with_retries<T, F, Fut>(cfg: &RetryCfg, what: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < cfg.attempts => {
                let delay = backoff_ms(attempt, cfg.base_ms, cfg.factor, cfg.jitter_ms);
                warn!(attempt, delay_ms = delay, error = %e, "{what} failed, retrying");
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("{what} failed after {attempt} attempt(s)")))
            }
        }
    }
}
