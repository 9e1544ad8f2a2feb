use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

const IMAGE_EXTS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Serialize)]
struct Sidecar<'a> {
    prompt: &'a str,
    model: &'a str,
    size: &'a str,
    created_at: String,
}

/// Wipe the previous run's output: every image file plus our own
/// `wallpaper_*.json` sidecars. Returns how many files were removed.
pub async fn clean_dir(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    let mut rd = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read {}", dir.display()))?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let name = entry.file_name();
        let is_sidecar = ext == "json"
            && name
                .to_str()
                .is_some_and(|n| n.starts_with("wallpaper_"));
        if IMAGE_EXTS.contains(&ext) || is_sidecar {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Write the wallpaper atomically (tmp + rename), re-stat it, then write the
/// metadata sidecar. Returns the final image path.
pub async fn save_wallpaper(
    dir: &Path,
    bytes: &[u8],
    prompt: &str,
    model: &str,
    size: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    let png = dir.join(format!("wallpaper_{ts}.png"));
    let png_tmp = dir.join(format!("wallpaper_{ts}.png.tmp"));

    {
        let mut f = fs::File::create(&png_tmp)
            .await
            .with_context(|| format!("failed to create {}", png_tmp.display()))?;
        f.write_all(bytes).await?;
        let _ = f.sync_all().await; // best-effort
    }
    fs::rename(&png_tmp, &png).await?;

    // Post-write verification before anything downstream trusts the file.
    let meta = fs::metadata(&png)
        .await
        .with_context(|| format!("wallpaper missing after write: {}", png.display()))?;
    if meta.len() != bytes.len() as u64 {
        bail!(
            "wallpaper at {} has {} bytes, expected {}",
            png.display(),
            meta.len(),
            bytes.len()
        );
    }

    let sidecar = Sidecar {
        prompt,
        model,
        size,
        created_at: Utc::now().to_rfc3339(),
    };
    let json = dir.join(format!("wallpaper_{ts}.json"));
    let json_tmp = dir.join(format!("wallpaper_{ts}.json.tmp"));
    let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)?;
    {
        let mut f = fs::File::create(&json_tmp).await?;
        f.write_all(&sidecar_bytes).await?;
        let _ = f.sync_all().await;
    }
    fs::rename(&json_tmp, &json).await?;

    Ok(png)
}

/// Image files currently in `dir`, by extension.
#[allow(dead_code)]
pub async fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if IMAGE_EXTS.contains(&ext) {
                files.push(path);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_image_and_sidecar() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = save_wallpaper(tmp.path(), b"png-bytes", "a prompt", "gpt-image-1", "1536x1024")
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");

        let sidecar_path = path.with_extension("json");
        let sidecar: serde_json::Value =
            serde_json::from_slice(&std::fs::read(sidecar_path).unwrap()).unwrap();
        assert_eq!(sidecar["prompt"], "a prompt");
        assert_eq!(sidecar["model"], "gpt-image-1");
        assert_eq!(sidecar["size"], "1536x1024");
    }

    #[tokio::test]
    async fn save_leaves_no_tmp_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        save_wallpaper(tmp.path(), b"x", "p", "m", "s").await.unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn clean_removes_images_and_sidecars_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        for name in [
            "wallpaper_20250101_000000.png",
            "old.jpg",
            "older.jpeg",
            "wallpaper_20250101_000000.json",
        ] {
            std::fs::write(tmp.path().join(name), b"x").unwrap();
        }
        // Unrelated files survive the wipe.
        std::fs::write(tmp.path().join("notes.txt"), b"keep").unwrap();
        std::fs::write(tmp.path().join("config.json"), b"keep").unwrap();

        let removed = clean_dir(tmp.path()).await.unwrap();
        assert_eq!(removed, 4);
        assert!(tmp.path().join("notes.txt").exists());
        assert!(tmp.path().join("config.json").exists());
        assert!(image_files(tmp.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clean_then_save_leaves_exactly_one_image() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("stale.png"), b"x").unwrap();

        clean_dir(tmp.path()).await.unwrap();
        save_wallpaper(tmp.path(), b"fresh", "p", "m", "s").await.unwrap();

        let images = image_files(tmp.path()).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(std::fs::read(&images[0]).unwrap(), b"fresh");
    }
}
