//! HTTP client for the campaign API, as used by the share flow.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::db::models::{EventType, ImageItem, ScannedCampaign};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("API unreachable: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),

    #[error("Not found")]
    NotFound,

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Event body sent to `POST /api/events`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(rename = "campaignId")]
    pub campaign_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// What the share flow needs from the backend.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    /// Base URL the API (and the landing page) is served from.
    fn base_url(&self) -> &str;

    /// Campaign record hydrated with its current image set.
    async fn fetch_campaign(
        &self,
        campaign_id: &str,
        scan: &str,
    ) -> Result<ScannedCampaign, ClientError>;

    /// Returns the recorded event id.
    async fn post_event(&self, event: &OutgoingEvent) -> Result<String, ClientError>;

    /// Bytes behind an image URL, absolute or relative to the API base.
    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, ClientError>;

    /// Zip archive of the given positional image ids.
    async fn download_bundle(
        &self,
        campaign_id: &str,
        image_ids: &[String],
    ) -> Result<Bytes, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    images: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    base_str: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        Self::with_client(base, reqwest::Client::new()).map_err(ClientError::from)
    }

    pub fn with_client(base: &str, http: reqwest::Client) -> Result<Self, url::ParseError> {
        let base = Url::parse(base)?;
        let base_str = base.as_str().trim_end_matches('/').to_string();
        Ok(Self {
            base,
            base_str,
            http,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, ClientError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(ClientError::UpstreamUnavailable)?;
        check_status(response)
    }

    pub async fn list_images(&self, campaign_id: &str) -> Result<Vec<ImageItem>, ClientError> {
        let url = self.endpoint(&["api", "campaigns", campaign_id, "images"])?;
        let body: ImagesResponse = self
            .get(url)
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)?;
        Ok(body.images)
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound),
        status => Err(ClientError::Status(status.as_u16())),
    }
}

#[async_trait]
impl CampaignApi for ApiClient {
    fn base_url(&self) -> &str {
        &self.base_str
    }

    async fn fetch_campaign(
        &self,
        campaign_id: &str,
        scan: &str,
    ) -> Result<ScannedCampaign, ClientError> {
        let mut url = self.endpoint(&["api", "campaigns", campaign_id])?;
        url.query_pairs_mut().append_pair("scan", scan);
        let mut campaign: ScannedCampaign = self
            .get(url)
            .await?
            .json()
            .await
            .map_err(ClientError::Decode)?;

        // The image set is optional decoration; keep the record if it fails.
        match self.list_images(campaign_id).await {
            Ok(images) if !images.is_empty() => {
                campaign.campaign.image_url = images[0].url.clone();
                campaign.campaign.images = images;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(campaign = campaign_id, "Failed to fetch campaign images: {}", e),
        }

        Ok(campaign)
    }

    async fn post_event(&self, event: &OutgoingEvent) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "events"])?;
        let response = self
            .http
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(ClientError::UpstreamUnavailable)?;
        let body: EventResponse = check_status(response)?
            .json()
            .await
            .map_err(ClientError::Decode)?;
        Ok(body.id)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes, ClientError> {
        let url = self.base.join(url)?;
        self.get(url)
            .await?
            .bytes()
            .await
            .map_err(ClientError::Decode)
    }

    async fn download_bundle(
        &self,
        campaign_id: &str,
        image_ids: &[String],
    ) -> Result<Bytes, ClientError> {
        let mut url = self.endpoint(&["api", "download", campaign_id])?;
        url.query_pairs_mut()
            .append_pair("images", &image_ids.join(","));
        self.get(url)
            .await?
            .bytes()
            .await
            .map_err(ClientError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_percent_encoded_under_base() {
        let client = ApiClient::new("http://localhost:4000/").unwrap();
        let url = client.endpoint(&["api", "campaigns", "spring sale"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/api/campaigns/spring%20sale");
        assert_eq!(client.base_url(), "http://localhost:4000");
    }

    #[test]
    fn outgoing_event_uses_wire_names_and_omits_empty_fields() {
        let event = OutgoingEvent {
            event_type: EventType::ShareClicked,
            app: Some("whatsapp".into()),
            campaign_id: "demo".into(),
            scan: None,
            meta: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "share_clicked", "app": "whatsapp", "campaignId": "demo" })
        );
    }

    #[tokio::test]
    async fn unreachable_api_is_reported_as_upstream_unavailable() {
        // Port 9 (discard) is essentially never listening on loopback.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.fetch_campaign("demo", "scan").await.unwrap_err();
        assert!(matches!(err, ClientError::UpstreamUnavailable(_)));
    }
}
