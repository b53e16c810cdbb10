//! Viewer session controller.
//!
//! Owns which image is active, the overlay / controls flags and the viewport.
//! Any change of the active image resets the viewport and re-derives the
//! overlay default for the new record.

use std::sync::Arc;

use crate::collection::{ImageCollection, ImageRecord};
use crate::download::{self, DownloadRequest};
use crate::settings::ViewerSettings;
use crate::viewport::Viewport;

const DEFAULT_TITLE: &str = "Photo Viewer";

/// Notifications for the embedding program, drained with [`ViewerSession::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    Closed,
    ImageChanged { index: usize, id: String },
}

#[derive(Debug)]
pub struct ViewerSession {
    collection: Arc<ImageCollection>,
    settings: ViewerSettings,
    viewport: Viewport,
    active: Option<usize>,
    overlay_visible: bool,
    controls_visible: bool,
    events: Vec<ViewerEvent>,
}

impl ViewerSession {
    pub fn new(collection: Arc<ImageCollection>, settings: ViewerSettings) -> Self {
        let settings = settings.sanitized();
        let viewport = Viewport::new(&settings);
        Self {
            collection,
            settings,
            viewport,
            active: None,
            overlay_visible: false,
            controls_visible: false,
            events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn collection(&self) -> &Arc<ImageCollection> {
        &self.collection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_image(&self) -> Option<&ImageRecord> {
        self.active.and_then(|i| self.collection.get(i))
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    /// Hover state reported by the host.
    pub fn set_controls_visible(&mut self, visible: bool) {
        self.controls_visible = visible;
    }

    pub fn take_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    fn activate(&mut self, index: usize) {
        self.active = Some(index);
        self.viewport.force_reset();
        let has_overlay = self
            .collection
            .get(index)
            .is_some_and(ImageRecord::has_overlay);
        self.overlay_visible = self.settings.show_overlay_by_default && has_overlay;
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Open the viewer on the record with `id`. Unknown ids are ignored.
    pub fn open(&mut self, id: &str) -> bool {
        match self.collection.index_of(id) {
            Some(index) => self.open_index(index),
            None => {
                log::warn!("open: no image with id '{}'", id);
                false
            }
        }
    }

    pub fn open_index(&mut self, index: usize) -> bool {
        if index >= self.collection.len() {
            log::warn!("open: index {} out of range ({} images)", index, self.collection.len());
            return false;
        }
        log::debug!("[viewer] open {}", index);
        self.activate(index);
        true
    }

    pub fn close(&mut self) {
        if self.active.take().is_none() {
            return;
        }
        log::debug!("[viewer] close");
        self.viewport.force_reset();
        self.overlay_visible = false;
        self.events.push(ViewerEvent::Closed);
    }

    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn previous(&mut self) -> bool {
        self.step(-1)
    }

    fn step(&mut self, delta: i64) -> bool {
        let Some(current) = self.active else {
            return false;
        };
        if !self.can_navigate() {
            return false;
        }
        let Some(index) = self.collection.wrap_index(current, delta) else {
            return false;
        };
        log::debug!("[viewer] move {} -> {}", current, index);
        self.activate(index);
        let id = self.collection.get(index).map(|r| r.id.clone()).unwrap_or_default();
        self.events.push(ViewerEvent::ImageChanged { index, id });
        true
    }

    /// Flip the overlay; only for records that declare one.
    pub fn toggle_overlay(&mut self) -> bool {
        if !self.active_image().is_some_and(ImageRecord::has_overlay) {
            return false;
        }
        self.overlay_visible = !self.overlay_visible;
        true
    }

    // ------------------------------------------------------------------
    // Control visibility and helpers
    // ------------------------------------------------------------------

    pub fn can_navigate(&self) -> bool {
        self.collection.len() > 1
    }

    pub fn overlay_toggle_available(&self) -> bool {
        self.settings.show_overlay_toggle
            && self.active_image().is_some_and(ImageRecord::has_overlay)
    }

    pub fn reset_available(&self) -> bool {
        self.settings.allow_reset && self.viewport.is_transformed()
    }

    pub fn title(&self) -> &str {
        self.active_image()
            .and_then(|r| r.title.as_deref())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// Wrapped neighbours of the active image, for preloading.
    pub fn adjacent_indices(&self) -> Vec<usize> {
        let Some(current) = self.active else {
            return Vec::new();
        };
        if !self.can_navigate() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(2);
        for delta in [1, -1] {
            if let Some(i) = self.collection.wrap_index(current, delta) {
                if !out.contains(&i) {
                    out.push(i);
                }
            }
        }
        out
    }

    pub fn download_request(&self) -> Option<DownloadRequest> {
        if !self.settings.allow_download {
            return None;
        }
        self.active_image().map(download::request_for)
    }
}
