use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RuntimeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFile {
    pub name: String,
    pub bytes: Bytes,
}

/// Content handed to a native share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub text: String,
    pub url: String,
    pub files: Vec<SharedFile>,
}

/// Device capabilities the share flow drives: share sheet, link opening,
/// clipboard and file saving.
#[async_trait]
pub trait ShareRuntime: Send + Sync {
    /// Whether a native share sheet is available.
    fn can_share(&self) -> bool;

    /// Whether the share sheet accepts file attachments.
    fn can_share_files(&self) -> bool;

    async fn share(&self, payload: SharePayload) -> Result<(), RuntimeError>;

    /// Open an external link. Custom schemes give no feedback when the app is missing.
    async fn open_link(&self, url: &str) -> Result<(), RuntimeError>;

    async fn copy_text(&self, text: &str) -> Result<(), RuntimeError>;

    async fn save_file(&self, name: &str, bytes: Bytes) -> Result<(), RuntimeError>;
}
