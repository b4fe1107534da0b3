use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::client::{CampaignApi, ClientError, OutgoingEvent};
use crate::db::models::{Campaign, EventType, DEFAULT_CAPTION, DEFAULT_SHARE_TARGETS};
use crate::scan;
use crate::share::runtime::{RuntimeError, SharePayload, SharedFile, ShareRuntime};
use crate::share::target::{ShareLink, ShareTarget};
use crate::share::visit::{Visit, VisitState};

pub const OFFLINE_BANNER: &str = "Using placeholders (API offline)";
const NOT_FOUND_BANNER: &str = "Campaign not found (showing placeholders)";

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("No images selected")]
    NothingSelected,

    #[error("Visit already completed")]
    Completed,

    #[error("Download failed: {0}")]
    Download(#[from] ClientError),

    #[error("Device action failed: {0}")]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Handed to the native share sheet with this many image attachments.
    Native { attached: usize },
    /// Opened a platform link instead.
    Link(ShareLink),
    /// No share sheet and no known link for this platform.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub file_name: String,
    pub count: usize,
}

/// What the terminal thank-you view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThankYou {
    pub campaign_id: String,
    pub reward_code: String,
}

/// One visitor's journey through a campaign.
///
/// Analytics events are spawned onto the Tokio runtime and never awaited by
/// the action that produced them; their failures are logged and dropped.
pub struct ShareFlow {
    api: Arc<dyn CampaignApi>,
    runtime: Arc<dyn ShareRuntime>,
    visit: Visit,
    page_url: String,
    pending: Vec<JoinHandle<()>>,
}

impl ShareFlow {
    /// Establish the scan token and hydrate the campaign. Never fails: an
    /// unreachable or unknown campaign falls back to placeholder content.
    pub async fn land(
        api: Arc<dyn CampaignApi>,
        runtime: Arc<dyn ShareRuntime>,
        campaign_id: &str,
        scan: Option<&str>,
    ) -> Self {
        let scan = scan::resolve(scan);

        let visit = match api.fetch_campaign(campaign_id, &scan).await {
            Ok(found) => Visit::new(found.campaign, found.scan, None),
            Err(e) => {
                tracing::warn!(campaign = campaign_id, "Falling back to placeholders: {}", e);
                let banner = match e {
                    ClientError::NotFound => NOT_FOUND_BANNER,
                    _ => OFFLINE_BANNER,
                };
                Visit::new(
                    placeholder_campaign(campaign_id),
                    scan,
                    Some(banner.to_string()),
                )
            }
        };

        let page_url = scan::landing_url(api.base_url(), &visit.campaign.id, &visit.scan)
            .unwrap_or_else(|_| api.base_url().to_string());

        Self {
            api,
            runtime,
            visit,
            page_url,
            pending: Vec::new(),
        }
    }

    pub fn visit(&self) -> &Visit {
        &self.visit
    }

    pub fn state(&self) -> &VisitState {
        &self.visit.state
    }

    /// Link shared alongside the caption.
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// Toggle one image. Ids not in the current image set are ignored.
    pub fn toggle_image(&mut self, id: &str) -> Result<bool, FlowError> {
        self.begin_viewing()?;
        if !self.visit.campaign.images.iter().any(|image| image.id == id) {
            return Ok(false);
        }
        Ok(self.visit.selection.toggle(id))
    }

    pub fn select_all(&mut self) -> Result<(), FlowError> {
        self.begin_viewing()?;
        self.visit.selection.select_all(&self.visit.campaign.images);
        Ok(())
    }

    pub fn deselect_all(&mut self) -> Result<(), FlowError> {
        self.begin_viewing()?;
        self.visit.selection.clear();
        Ok(())
    }

    /// Local edit only; nothing is sent until the visitor acts on it.
    pub fn set_caption(&mut self, caption: impl Into<String>) -> Result<(), FlowError> {
        self.begin_viewing()?;
        self.visit.caption = caption.into();
        Ok(())
    }

    pub async fn copy_caption(&mut self) -> Result<(), FlowError> {
        self.begin_viewing()?;
        self.runtime.copy_text(&self.visit.caption).await?;
        self.visit.mark_copied(Instant::now());
        self.emit(EventType::CaptionCopied, None, None);
        Ok(())
    }

    pub fn copied_visible(&self) -> bool {
        self.visit.copied_visible_at(Instant::now())
    }

    /// Share to a platform. `share_clicked` is reported before anything is
    /// attempted; failures of the share itself are not surfaced.
    pub async fn share(&mut self, target: ShareTarget) -> Result<ShareOutcome, FlowError> {
        self.ensure_active()?;
        self.visit.state = VisitState::Sharing(target.clone());
        self.emit(
            EventType::ShareClicked,
            Some(target.as_str().to_string()),
            None,
        );

        let outcome = if self.runtime.can_share() {
            let files = if self.runtime.can_share_files() {
                self.attachments().await
            } else {
                Vec::new()
            };
            let attached = files.len();
            let payload = SharePayload {
                text: self.visit.caption.clone(),
                url: self.page_url.clone(),
                files,
            };
            if let Err(e) = self.runtime.share(payload).await {
                tracing::debug!(platform = %target, "Native share did not complete: {}", e);
            }
            ShareOutcome::Native { attached }
        } else {
            match target.fallback_link(&self.visit.caption, &self.page_url) {
                Some(link) => {
                    if let Err(e) = self.runtime.open_link(link.url()).await {
                        tracing::debug!(platform = %target, "Opening share link failed: {}", e);
                    }
                    ShareOutcome::Link(link)
                }
                None => ShareOutcome::Unsupported,
            }
        };

        self.visit.state = VisitState::Viewing;
        Ok(outcome)
    }

    /// Save the selection: one image as-is, several as a zip bundle.
    /// `images_downloaded` is reported only once the file has been saved.
    pub async fn download(&mut self) -> Result<DownloadOutcome, FlowError> {
        self.begin_viewing()?;
        if !self.visit.can_download() {
            return Err(FlowError::NothingSelected);
        }

        let campaign_id = self.visit.campaign.id.clone();
        let picked: Vec<(String, String, String)> = self
            .visit
            .selection
            .pick(&self.visit.campaign.images)
            .into_iter()
            .map(|image| (image.id.clone(), image.url.clone(), image.filename.clone()))
            .collect();
        let ids: Vec<String> = picked.iter().map(|(id, _, _)| id.clone()).collect();

        let (file_name, bytes) = match picked.as_slice() {
            [] => {
                let bytes = self.api.fetch_bytes(&self.visit.campaign.image_url).await?;
                (format!("{}.jpg", campaign_id), bytes)
            }
            [(_, url, filename)] => (filename.clone(), self.api.fetch_bytes(url).await?),
            _ => (
                format!("{}-images.zip", campaign_id),
                self.api.download_bundle(&campaign_id, &ids).await?,
            ),
        };

        self.runtime.save_file(&file_name, bytes).await?;

        let count = ids.len().max(1);
        self.emit(
            EventType::ImagesDownloaded,
            None,
            Some(serde_json::json!({ "count": count, "images": ids })),
        );

        Ok(DownloadOutcome { file_name, count })
    }

    /// Finish the visit. Terminal: every later action is refused.
    pub fn complete(&mut self) -> Result<ThankYou, FlowError> {
        self.ensure_active()?;
        self.emit(EventType::ShareCompleted, None, None);
        self.visit.state = VisitState::Completed;
        Ok(ThankYou {
            campaign_id: self.visit.campaign.id.clone(),
            reward_code: format!("reward:{}", self.visit.campaign.id),
        })
    }

    /// Wait for in-flight analytics posts, e.g. before shutting down.
    pub async fn flush(&mut self) {
        for handle in self.pending.drain(..) {
            if let Err(e) = handle.await {
                tracing::debug!("Event dispatch task ended abnormally: {}", e);
            }
        }
    }

    fn ensure_active(&self) -> Result<(), FlowError> {
        if self.visit.state == VisitState::Completed {
            return Err(FlowError::Completed);
        }
        Ok(())
    }

    fn begin_viewing(&mut self) -> Result<(), FlowError> {
        self.ensure_active()?;
        self.visit.state = VisitState::Viewing;
        Ok(())
    }

    fn emit(&mut self, event_type: EventType, app: Option<String>, meta: Option<serde_json::Value>) {
        let event = OutgoingEvent {
            event_type,
            app,
            campaign_id: self.visit.campaign.id.clone(),
            scan: Some(self.visit.scan.clone()),
            meta,
        };
        let api = Arc::clone(&self.api);

        self.pending.retain(|handle| !handle.is_finished());
        self.pending.push(tokio::spawn(async move {
            if let Err(e) = api.post_event(&event).await {
                tracing::warn!(event_type = %event.event_type, "Dropping analytics event: {}", e);
            }
        }));
    }

    /// Selected images to attach to a native share. Images that fail to
    /// load are left out; the share goes ahead with text and link only.
    async fn attachments(&self) -> Vec<SharedFile> {
        let wanted: Vec<(String, String)> = if self.visit.is_legacy() {
            if self.visit.campaign.image_url.is_empty() {
                Vec::new()
            } else {
                vec![(
                    format!("{}.jpg", self.visit.campaign.id),
                    self.visit.campaign.image_url.clone(),
                )]
            }
        } else {
            self.visit
                .selection
                .pick(&self.visit.campaign.images)
                .into_iter()
                .map(|image| (image.filename.clone(), image.url.clone()))
                .collect()
        };

        let fetches = wanted.iter().map(|(_, url)| self.api.fetch_bytes(url));
        let results: Vec<Result<Bytes, ClientError>> = futures::future::join_all(fetches).await;

        wanted
            .into_iter()
            .zip(results)
            .filter_map(|((name, url), result)| match result {
                Ok(bytes) => Some(SharedFile { name, bytes }),
                Err(e) => {
                    tracing::warn!(url = %url, "Skipping share attachment: {}", e);
                    None
                }
            })
            .collect()
    }
}

fn placeholder_campaign(campaign_id: &str) -> Campaign {
    Campaign {
        id: campaign_id.to_string(),
        name: campaign_id.to_string(),
        caption: DEFAULT_CAPTION.to_string(),
        image_url: format!("https://picsum.photos/seed/{}/1080/1350", campaign_id),
        images: Vec::new(),
        share: DEFAULT_SHARE_TARGETS.iter().map(|s| s.to_string()).collect(),
    }
}
