use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Upper bound on an uploaded cover image.
pub const MAX_COVER_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only image files are allowed")]
    NotAnImage,

    #[error("Cover image must be 5 MiB or smaller")]
    TooLarge,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Owns the upload directory: validates incoming covers, writes them under
/// generated unique names, and removes stale files when a cover is replaced
/// or its book deleted.
pub struct UploadService {
    uploads_dir: PathBuf,
}

impl UploadService {
    #[must_use]
    pub fn new(uploads_path: &str) -> Self {
        Self {
            uploads_dir: PathBuf::from(uploads_path),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Validates and writes an uploaded cover, returning the stored filename.
    /// Nothing is written when the content type or size check fails.
    pub async fn save_cover(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
            return Err(UploadError::NotAnImage);
        }
        if bytes.len() > MAX_COVER_BYTES {
            return Err(UploadError::TooLarge);
        }

        if !self.uploads_dir.exists() {
            fs::create_dir_all(&self.uploads_dir).await?;
        }

        let filename = generate_filename(original_name, content_type);
        let path = self.uploads_dir.join(&filename);

        fs::write(&path, bytes).await?;

        info!(path = %path.display(), size = bytes.len(), "Stored cover image");
        Ok(filename)
    }

    /// Best-effort removal of a stored cover. A file that is already gone is
    /// not an error.
    pub async fn delete_cover(&self, filename: &str) {
        let path = self.uploads_dir.join(filename);
        if !path.exists() {
            return;
        }

        if let Err(e) = fs::remove_file(&path).await {
            warn!(path = %path.display(), "Failed to remove cover image: {e}");
        }
    }
}

/// Unique on-disk name: time component plus randomness, so concurrent uploads
/// cannot collide. The original extension is kept when it looks sane, falling
/// back to the content type.
fn generate_filename(original_name: Option<&str>, content_type: Option<&str>) -> String {
    let extension = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            content_type
                .and_then(mime_guess::get_mime_extensions_str)
                .and_then(|exts| exts.first())
                .map(|e| (*e).to_string())
        })
        .unwrap_or_else(|| "jpg".to_string());

    let suffix: u32 = rand::rng().random();

    format!(
        "book-cover-{}-{:08x}.{}",
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension
    )
}

/// Joins the serving base with a stored filename. Pure so it is testable
/// without a request context.
#[must_use]
pub fn cover_url(base_url: &str, filename: &str) -> String {
    format!("{}/uploads/{}", base_url.trim_end_matches('/'), filename)
}
