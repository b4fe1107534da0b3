use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::db::models::{Campaign, ImageItem};
use crate::share::target::ShareTarget;

/// How long the "copied" confirmation stays visible.
pub const COPIED_CONFIRMATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitState {
    /// Scan token established and campaign hydrated.
    Landed,
    /// Selecting images and editing the caption locally.
    Viewing,
    /// A platform share is in progress.
    Sharing(ShareTarget),
    /// Terminal thank-you state.
    Completed,
}

/// The visitor's current image selection, by positional id.
/// Lives only on the client; nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    /// The default selection: items derived as `selected`.
    pub fn from_images(images: &[ImageItem]) -> Self {
        Self {
            ids: images
                .iter()
                .filter(|image| image.selected)
                .map(|image| image.id.clone())
                .collect(),
        }
    }

    /// Flip membership of one id. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn select_all(&mut self, images: &[ImageItem]) {
        self.ids = images.iter().map(|image| image.id.clone()).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Selected images in campaign order.
    pub fn pick<'a>(&self, images: &'a [ImageItem]) -> Vec<&'a ImageItem> {
        images
            .iter()
            .filter(|image| self.ids.contains(&image.id))
            .collect()
    }
}

/// Per-visit state: campaign, scan token, local edits.
#[derive(Debug, Clone)]
pub struct Visit {
    pub campaign: Campaign,
    pub scan: String,
    pub caption: String,
    pub selection: Selection,
    pub state: VisitState,
    /// Set when the campaign could not be loaded and placeholders are shown.
    pub banner: Option<String>,
    copied_until: Option<Instant>,
}

impl Visit {
    pub fn new(campaign: Campaign, scan: String, banner: Option<String>) -> Self {
        Self {
            caption: campaign.caption.clone(),
            selection: Selection::from_images(&campaign.images),
            campaign,
            scan,
            state: VisitState::Landed,
            banner,
            copied_until: None,
        }
    }

    /// No image set: preview, share and download use the legacy `imageUrl`.
    pub fn is_legacy(&self) -> bool {
        self.campaign.images.is_empty()
    }

    pub fn preview_url(&self) -> &str {
        self.selection
            .pick(&self.campaign.images)
            .first()
            .map(|image| image.url.as_str())
            .unwrap_or(&self.campaign.image_url)
    }

    pub fn can_download(&self) -> bool {
        if self.is_legacy() {
            !self.campaign.image_url.is_empty()
        } else {
            !self.selection.is_empty()
        }
    }

    pub fn mark_copied(&mut self, now: Instant) {
        self.copied_until = Some(now + COPIED_CONFIRMATION);
    }

    pub fn copied_visible_at(&self, now: Instant) -> bool {
        self.copied_until.map(|until| now < until).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(n: usize) -> ImageItem {
        ImageItem {
            id: format!("img{}", n),
            url: format!("/api/images/demo/{}.png", n),
            alt: n.to_string(),
            selected: n == 1,
            filename: format!("{}.png", n),
        }
    }

    fn campaign(images: Vec<ImageItem>) -> Campaign {
        Campaign {
            id: "demo".into(),
            name: "Demo".into(),
            caption: "hello".into(),
            image_url: "https://picsum.photos/seed/demo/1080/1350".into(),
            images,
            share: vec![],
        }
    }

    #[test]
    fn selection_starts_with_first_image() {
        let images = vec![image(1), image(2), image(3)];
        let selection = Selection::from_images(&images);
        assert_eq!(selection.len(), 1);
        assert!(selection.contains("img1"));
    }

    #[test]
    fn toggle_and_bulk_operations() {
        let images = vec![image(1), image(2), image(3)];
        let mut selection = Selection::from_images(&images);

        assert!(selection.toggle("img3"));
        assert!(!selection.toggle("img1"));
        let picked: Vec<_> = selection.pick(&images).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(picked, ["img3"]);

        selection.select_all(&images);
        assert_eq!(selection.len(), 3);
        selection.clear();
        assert!(selection.is_empty());
    }

    #[test]
    fn empty_selection_disables_download() {
        let mut visit = Visit::new(campaign(vec![image(1)]), "s".into(), None);
        assert!(visit.can_download());
        visit.selection.clear();
        assert!(!visit.can_download());
    }

    #[test]
    fn legacy_campaign_previews_image_url() {
        let visit = Visit::new(campaign(Vec::new()), "s".into(), None);
        assert!(visit.is_legacy());
        assert!(visit.can_download());
        assert_eq!(visit.preview_url(), "https://picsum.photos/seed/demo/1080/1350");
        assert_eq!(visit.state, VisitState::Landed);
    }

    #[test]
    fn copied_confirmation_expires_after_two_seconds() {
        let mut visit = Visit::new(campaign(Vec::new()), "s".into(), None);
        let now = Instant::now();
        assert!(!visit.copied_visible_at(now));

        visit.mark_copied(now);
        assert!(visit.copied_visible_at(now + Duration::from_millis(1999)));
        assert!(!visit.copied_visible_at(now + COPIED_CONFIRMATION));
    }
}
