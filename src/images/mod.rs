//! Campaign image sets backed by one folder per campaign.
//!
//! The image list is derived on every read from a directory listing. Item ids
//! (`img1`, `img2`, ...) are positions in that listing, so they shift whenever
//! a file is added or removed; anything that must survive a change addresses
//! images by filename instead.

mod bundle;

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use url::Url;

use crate::db::models::ImageItem;
use crate::error::{AppError, AppResult};

pub use self::bundle::{bundle_stream, BundleEntry};

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// One file received from an upload, before it touches storage.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_base: Option<String>,
}

impl ImageStore {
    pub fn new(root: PathBuf, public_base: Option<&str>) -> Self {
        Self {
            root,
            public_base: public_base.map(str::to_string),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn campaign_dir(&self, campaign_id: &str) -> AppResult<PathBuf> {
        check_segment(campaign_id, "campaign id")?;
        Ok(self.root.join(campaign_id))
    }

    /// Current image set in listing order, first item selected.
    /// A campaign without a folder has no images.
    pub async fn list(&self, campaign_id: &str) -> AppResult<Vec<ImageItem>> {
        let dir = self.campaign_dir(campaign_id)?;
        let filenames = match list_image_files(&dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(filenames
            .into_iter()
            .enumerate()
            .map(|(index, filename)| ImageItem {
                id: format!("img{}", index + 1),
                url: self.image_url(campaign_id, &filename),
                alt: alt_text(&filename),
                selected: index == 0,
                filename,
            })
            .collect())
    }

    /// Persist a validated batch. Names that sanitize identically overwrite
    /// each other; the last write wins.
    pub async fn save(&self, campaign_id: &str, files: &[UploadFile]) -> AppResult<Vec<String>> {
        let dir = self.campaign_dir(campaign_id)?;
        let names = files
            .iter()
            .map(|file| stored_name(&file.file_name))
            .collect::<AppResult<Vec<_>>>()?;

        tokio::fs::create_dir_all(&dir).await?;
        for (file, name) in files.iter().zip(&names) {
            let path = dir.join(name);
            if tokio::fs::try_exists(&path).await? {
                tracing::warn!(campaign = campaign_id, file = %name, "Overwriting existing image");
            }
            tokio::fs::write(&path, &file.data).await?;
            tracing::info!(campaign = campaign_id, file = %name, bytes = file.data.len(), "Stored image");
        }

        Ok(names)
    }

    pub async fn delete(&self, campaign_id: &str, filename: &str) -> AppResult<()> {
        let path = self.image_path(campaign_id, filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(campaign = campaign_id, file = filename, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound("Image")),
            Err(e) => Err(e.into()),
        }
    }

    /// Open an image for streaming, returning the file and its length.
    pub async fn open(&self, campaign_id: &str, filename: &str) -> AppResult<(tokio::fs::File, u64)> {
        let path = self.image_path(campaign_id, filename)?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::NotFound("Image")),
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(AppError::NotFound("Image"));
        }
        Ok((file, metadata.len()))
    }

    /// Map `imgN` tokens onto the current listing. Tokens that match no
    /// position are ignored; a selection with no match at all is rejected.
    pub async fn resolve_selection(
        &self,
        campaign_id: &str,
        tokens: &[String],
    ) -> AppResult<Vec<BundleEntry>> {
        let dir = self.campaign_dir(campaign_id)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(AppError::NotFound("Campaign images"));
        }

        let entries: Vec<BundleEntry> = self
            .list(campaign_id)
            .await?
            .into_iter()
            .filter(|item| tokens.iter().any(|token| token.trim() == item.id))
            .map(|item| BundleEntry {
                path: dir.join(&item.filename),
                name: item.filename,
            })
            .collect();

        if entries.is_empty() {
            return Err(AppError::BadRequest("No valid images selected".into()));
        }
        Ok(entries)
    }

    fn image_path(&self, campaign_id: &str, filename: &str) -> AppResult<PathBuf> {
        check_segment(filename, "filename")?;
        Ok(self.campaign_dir(campaign_id)?.join(filename))
    }

    fn image_url(&self, campaign_id: &str, filename: &str) -> String {
        let path = encoded_image_path(campaign_id, filename);
        match &self.public_base {
            Some(base) => format!("{}{}", base, path),
            None => path,
        }
    }
}

/// Reject a whole batch on the first problem, before anything is written.
pub fn validate_upload(files: &[UploadFile]) -> AppResult<()> {
    if files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".into()));
    }
    if files.len() > MAX_FILES_PER_UPLOAD {
        return Err(AppError::BadRequest(format!(
            "Too many files: at most {} per upload",
            MAX_FILES_PER_UPLOAD
        )));
    }

    for file in files {
        let content_type = file.content_type.as_deref().unwrap_or("");
        if !ALLOWED_MIME_TYPES.contains(&content_type) {
            return Err(AppError::BadRequest(format!(
                "Invalid file type for {}: {}. Only JPEG, PNG, GIF and WebP images are allowed",
                file.file_name,
                if content_type.is_empty() { "unknown" } else { content_type }
            )));
        }
        if !has_allowed_extension(&file.file_name) {
            return Err(AppError::BadRequest(format!(
                "Invalid file extension for {}. Only .jpg, .jpeg, .png, .gif and .webp are allowed",
                file.file_name
            )));
        }
        if file.data.len() > MAX_FILE_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "{} exceeds the 10 MiB per-file limit",
                file.file_name
            )));
        }
    }
    Ok(())
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn stored_name(original: &str) -> AppResult<String> {
    let name = sanitize_filename(original);
    check_segment(&name, "filename")?;
    Ok(name)
}

fn check_segment(segment: &str, what: &str) -> AppResult<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(AppError::BadRequest(format!("Invalid {}", what)));
    }
    Ok(())
}

fn has_allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn list_image_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            if has_allowed_extension(&name) {
                names.push(name);
            }
        }
    }
    // read_dir order is filesystem-dependent; sort for a stable listing
    names.sort();
    Ok(names)
}

fn alt_text(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let alt = stem.replace(['_', '-'], " ").trim().to_string();
    if alt.is_empty() {
        filename.to_string()
    } else {
        alt
    }
}

fn encoded_image_path(campaign_id: &str, filename: &str) -> String {
    match Url::parse("http://localhost/") {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.extend(["api", "images", campaign_id, filename]);
            }
            url.path().to_string()
        }
        Err(_) => format!("/api/images/{}/{}", campaign_id, filename),
    }
}
