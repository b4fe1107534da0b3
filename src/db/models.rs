use serde::{Deserialize, Serialize};

/// Caption used for seeded and auto-created campaigns.
pub const DEFAULT_CAPTION: &str = "Loving this! #YourBrand #Malaysia";

/// Share targets enabled for seeded and auto-created campaigns.
pub const DEFAULT_SHARE_TARGETS: [&str; 5] = ["instagram", "facebook", "whatsapp", "tiktok", "xhs"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub caption: String,
    /// Legacy single-image fallback, used when the image set is empty.
    #[serde(rename = "imageUrl", default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageItem>,
    #[serde(default)]
    pub share: Vec<String>,
}

/// A campaign as returned to a visitor, carrying the visit's scan token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedCampaign {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub scan: String,
}

/// One selectable image. `id` is positional (`img1`, `img2`, ...) and is
/// reassigned whenever the list is re-derived; `filename` is the stable key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub selected: bool,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    ShareClicked,
    CaptionCopied,
    ImagesDownloaded,
    ShareCompleted,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::ShareClicked => "share_clicked",
            EventType::CaptionCopied => "caption_copied",
            EventType::ImagesDownloaded => "images_downloaded",
            EventType::ShareCompleted => "share_completed",
            EventType::Other(other) => other,
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "share_clicked" => EventType::ShareClicked,
            "caption_copied" => EventType::CaptionCopied,
            "images_downloaded" => EventType::ImagesDownloaded,
            "share_completed" => EventType::ShareCompleted,
            _ => EventType::Other(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An analytics record. Append-only: never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub app: Option<String>,
    #[serde(rename = "campaignId")]
    pub campaign_id: String,
    pub scan: Option<String>,
    pub meta: serde_json::Value,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}
