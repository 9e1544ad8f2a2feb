use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// The continuity record: the prompt behind the last wallpaper that was
/// actually saved to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptState {
    pub last_prompt: String,
    pub updated_at: String,
}

/// Single-slot store for [`PromptState`], one JSON file on disk.
///
/// A missing file is the normal first-run state. A corrupt file is treated
/// the same as a missing one; the next commit overwrites it.
pub struct PromptStore {
    path: PathBuf,
}

impl PromptStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Option<PromptState> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&data) {
            Ok(state) => Some(state),
            Err(err) => {
                tracing::debug!(path = %self.path.display(), %err, "ignoring corrupt state file");
                None
            }
        }
    }

    /// Record `prompt` as the last successfully used one. Called only after
    /// the wallpaper write has been verified.
    pub fn commit(&self, prompt: &str) -> Result<()> {
        let state = PromptState {
            last_prompt: prompt.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(&state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
