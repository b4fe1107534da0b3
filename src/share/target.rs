use std::fmt;
use url::Url;

/// Social platform a visitor can share to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShareTarget {
    Instagram,
    Facebook,
    Whatsapp,
    Tiktok,
    Xhs,
    Other(String),
}

/// Where a non-native share sends the visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLink {
    /// A web share URL carrying the caption and page link.
    Web(String),
    /// A custom scheme that opens the platform's app, if installed.
    AppScheme(String),
}

impl ShareLink {
    pub fn url(&self) -> &str {
        match self {
            ShareLink::Web(url) | ShareLink::AppScheme(url) => url,
        }
    }
}

impl ShareTarget {
    pub fn as_str(&self) -> &str {
        match self {
            ShareTarget::Instagram => "instagram",
            ShareTarget::Facebook => "facebook",
            ShareTarget::Whatsapp => "whatsapp",
            ShareTarget::Tiktok => "tiktok",
            ShareTarget::Xhs => "xhs",
            ShareTarget::Other(name) => name,
        }
    }

    /// Fallback when the runtime has no native share sheet. WhatsApp and
    /// Facebook have web share URLs; the others can only be opened by scheme.
    pub fn fallback_link(&self, caption: &str, page_url: &str) -> Option<ShareLink> {
        match self {
            ShareTarget::Whatsapp => {
                let text = if page_url.is_empty() {
                    caption.to_string()
                } else {
                    format!("{} {}", caption, page_url)
                };
                web_link("https://api.whatsapp.com/send", &[("text", &text)])
            }
            ShareTarget::Facebook => web_link(
                "https://www.facebook.com/sharer/sharer.php",
                &[("u", page_url), ("quote", caption)],
            ),
            ShareTarget::Instagram => Some(ShareLink::AppScheme("instagram://app".into())),
            ShareTarget::Tiktok => Some(ShareLink::AppScheme("snssdk1233://".into())),
            ShareTarget::Xhs => Some(ShareLink::AppScheme("xhsdiscover://".into())),
            ShareTarget::Other(_) => None,
        }
    }
}

fn web_link(base: &str, params: &[(&str, &str)]) -> Option<ShareLink> {
    Url::parse_with_params(base, params)
        .ok()
        .map(|url| ShareLink::Web(url.into()))
}

impl From<&str> for ShareTarget {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "instagram" => ShareTarget::Instagram,
            "facebook" => ShareTarget::Facebook,
            "whatsapp" => ShareTarget::Whatsapp,
            "tiktok" => ShareTarget::Tiktok,
            "xhs" => ShareTarget::Xhs,
            other => ShareTarget::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ShareTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
