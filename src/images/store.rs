//! Disk persistence for inline image bytes returned by image models.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use rand::Rng as _;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes decoded images under a directory and keeps only the newest
/// `max_images` files. Writes go through a hidden temp sibling plus an
/// atomic rename; pruning is best-effort and never fails the request.
pub struct ImageStore {
    dir: PathBuf,
    max_images: usize,
    base_url: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, max_images: usize, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            max_images,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public URL for a stored filename, as embedded in markdown links.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/images/{filename}", self.base_url)
    }

    /// Decode a base64 payload and persist it, returning the filename.
    pub async fn save_base64(&self, payload: &str, mime_type: Option<&str>) -> io::Result<String> {
        let raw = decode_base64_tolerant(payload)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        if raw.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "empty image payload"));
        }

        let ext = extension_for_mime(mime_type);
        let filename = format!(
            "{}_{:016x}.{ext}",
            Utc::now().timestamp_millis(),
            rand::rng().random::<u64>()
        );

        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(&filename);
        let tmp_path = self.dir.join(format!(".{filename}.tmp"));
        tokio::fs::write(&tmp_path, &raw).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        self.prune().await;
        Ok(filename)
    }

    /// Keep only the `max_images` newest files by mtime. Failures are
    /// swallowed: retention must never break the response path.
    async fn prune(&self) {
        if self.max_images == 0 {
            return;
        }

        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime)> = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(mtime) = meta.modified() else {
                continue;
            };
            files.push((entry.path(), mtime));
        }

        files.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in files.into_iter().skip(self.max_images) {
            if tokio::fs::remove_file(&path).await.is_ok() {
                debug!("Pruned old image {}", path.display());
            }
        }
    }
}

/// Accepts standard and URL-safe alphabets, stray whitespace, an optional
/// `data:image/...;base64,` prefix, and missing padding.
fn decode_base64_tolerant(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut data = payload.trim();
    if data.to_ascii_lowercase().starts_with("data:image/")
        && let Some((_, rest)) = data.split_once(',')
    {
        data = rest.trim();
    }

    let mut normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    normalized = normalized.trim_end_matches('=').to_string();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    STANDARD.decode(normalized)
}

fn extension_for_mime(mime_type: Option<&str>) -> &'static str {
    match mime_type.map(str::to_ascii_lowercase).as_deref() {
        Some("image/png") => "png",
        Some("image/jpeg" | "image/jpg") => "jpg",
        Some("image/webp") => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// 1x1 transparent PNG.
    pub(crate) const ONE_PIXEL_PNG: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn temp_store(tag: &str, max_images: usize) -> ImageStore {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut dir = std::env::temp_dir();
        dir.push(format!("vega-images-{tag}-{}-{nanos}", std::process::id()));
        ImageStore::new(dir, max_images, "http://127.0.0.1:8000")
    }

    #[tokio::test]
    async fn saves_png_with_expected_filename_shape() {
        let store = temp_store("shape", 10);
        let filename = store
            .save_base64(ONE_PIXEL_PNG, Some("image/png"))
            .await
            .unwrap();

        assert!(filename.ends_with(".png"));
        let (stem, _) = filename.rsplit_once('.').unwrap();
        let (epoch_ms, hex) = stem.split_once('_').unwrap();
        assert!(epoch_ms.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));

        let bytes = std::fs::read(store.dir().join(&filename)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn urlsafe_and_unpadded_payloads_decode() {
        let store = temp_store("urlsafe", 10);
        let urlsafe = ONE_PIXEL_PNG.replace('+', "-").replace('/', "_");
        let unpadded = urlsafe.trim_end_matches('=').to_string();

        let filename = store
            .save_base64(&unpadded, Some("image/webp"))
            .await
            .unwrap();
        assert!(filename.ends_with(".webp"));
    }

    #[tokio::test]
    async fn data_url_prefix_is_stripped() {
        let store = temp_store("dataurl", 10);
        let payload = format!("data:image/png;base64,{ONE_PIXEL_PNG}");
        let filename = store.save_base64(&payload, Some("image/png")).await.unwrap();
        assert!(filename.ends_with(".png"));
    }

    #[tokio::test]
    async fn unknown_mime_falls_back_to_bin() {
        let store = temp_store("bin", 10);
        let filename = store.save_base64(ONE_PIXEL_PNG, None).await.unwrap();
        assert!(filename.ends_with(".bin"));
    }

    #[tokio::test]
    async fn retention_keeps_only_newest_files() {
        let store = temp_store("prune", 3);
        for _ in 0..6 {
            store
                .save_base64(ONE_PIXEL_PNG, Some("image/png"))
                .await
                .unwrap();
            // Distinct mtimes so the newest-by-mtime ordering is stable.
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let count = std::fs::read_dir(store.dir()).unwrap().count();
        assert!(count <= 3, "expected at most 3 files, found {count}");
    }

    #[tokio::test]
    async fn empty_payload_is_an_error() {
        let store = temp_store("empty", 10);
        assert!(store.save_base64("   ", Some("image/png")).await.is_err());
    }

    #[test]
    fn public_url_joins_base_and_filename() {
        let store = ImageStore::new("/tmp/x", 1, "https://gw.example.com/");
        assert_eq!(
            store.public_url("1_2.png"),
            "https://gw.example.com/images/1_2.png"
        );
    }
}
