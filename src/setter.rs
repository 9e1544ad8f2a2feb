//! Desktop-background capability, one implementation per supported platform.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

pub trait WallpaperSetter: Send + Sync {
    /// Apply `image` as the desktop background.
    fn apply(&self, image: &Path) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// macOS: System Events via osascript, every desktop.
pub struct MacosSetter;

impl WallpaperSetter for MacosSetter {
    fn apply(&self, image: &Path) -> Result<()> {
        let abs = image
            .canonicalize()
            .with_context(|| format!("wallpaper not found at {}", image.display()))?;
        let script = format!(
            "tell application \"System Events\" to set picture of every desktop to POSIX file \"{}\"",
            abs.display()
        );
        let status = Command::new("osascript")
            .arg("-e")
            .arg(&script)
            .status()
            .context("failed to run osascript")?;
        if !status.success() {
            bail!("osascript exited with {status}");
        }
        tracing::info!(path = %abs.display(), "desktop background updated");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "macos"
    }
}

/// Fallback for platforms without an implemented mechanism. Not a failure.
pub struct NoopSetter;

impl WallpaperSetter for NoopSetter {
    fn apply(&self, image: &Path) -> Result<()> {
        tracing::info!(
            path = %image.display(),
            "no wallpaper mechanism implemented for this platform, skipping"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

pub fn for_os(os: &str) -> Box<dyn WallpaperSetter> {
    match os {
        "macos" => Box::new(MacosSetter),
        _ => Box::new(NoopSetter),
    }
}

/// Pick the setter for the running OS, once at startup.
pub fn detect() -> Box<dyn WallpaperSetter> {
    for_os(std::env::consts::OS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macos_gets_the_native_setter() {
        assert_eq!(for_os("macos").name(), "macos");
    }

    #[test]
    fn other_platforms_get_the_noop() {
        assert_eq!(for_os("linux").name(), "noop");
        assert_eq!(for_os("windows").name(), "noop");
        assert_eq!(for_os("freebsd").name(), "noop");
    }

    #[test]
    fn noop_apply_always_succeeds() {
        assert!(NoopSetter.apply(Path::new("/does/not/exist.png")).is_ok());
    }

    #[test]
    fn macos_apply_fails_for_missing_file() {
        let err = MacosSetter
            .apply(Path::new("/does/not/exist.png"))
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
