//! Viewer settings and carousel display options.
//!
//! Every field carries a documented default and the TOML loader only
//! overrides the keys a file actually names. Nonsensical values are
//! repaired by [`ViewerSettings::sanitized`] rather than rejected.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_MIN_ZOOM: f32 = 0.5;
pub const DEFAULT_MAX_ZOOM: f32 = 4.0;
pub const DEFAULT_ZOOM_STEP: f32 = 0.3;
pub const DEFAULT_JUMP_ZOOM: f32 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub allow_zoom: bool,
    pub allow_rotate: bool,
    pub allow_reset: bool,
    pub allow_download: bool,
    /// Zoom level toggled by double-click / double-tap.
    pub double_click_zoom_level: f32,
    pub click_outside_closes: bool,
    pub keyboard_enabled: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    pub show_overlay_by_default: bool,
    pub show_overlay_toggle: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            allow_zoom: true,
            allow_rotate: true,
            allow_reset: true,
            allow_download: false,
            double_click_zoom_level: DEFAULT_JUMP_ZOOM,
            click_outside_closes: true,
            keyboard_enabled: true,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom_step: DEFAULT_ZOOM_STEP,
            show_overlay_by_default: false,
            show_overlay_toggle: false,
        }
    }
}

impl ViewerSettings {
    /// Parse a TOML document; omitted keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: ViewerSettings = toml::from_str(s)?;
        Ok(settings.sanitized())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Load `path` if given, falling back to defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(s) => {
                log::info!("Loaded viewer settings from {}", path.display());
                s
            }
            Err(e) => {
                log::warn!("Ignoring settings file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Repair out-of-range values.
    ///
    /// Zoom bounds must be finite and positive, ordered, and bracket 1.0 so
    /// the unzoomed baseline stays reachable.
    pub fn sanitized(mut self) -> Self {
        if !self.min_zoom.is_finite() || self.min_zoom <= 0.0 {
            log::warn!("min_zoom {} out of range, using {}", self.min_zoom, DEFAULT_MIN_ZOOM);
            self.min_zoom = DEFAULT_MIN_ZOOM;
        }
        if !self.max_zoom.is_finite() || self.max_zoom <= 0.0 {
            log::warn!("max_zoom {} out of range, using {}", self.max_zoom, DEFAULT_MAX_ZOOM);
            self.max_zoom = DEFAULT_MAX_ZOOM;
        }
        if self.min_zoom > self.max_zoom {
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        self.min_zoom = self.min_zoom.min(1.0);
        self.max_zoom = self.max_zoom.max(1.0);

        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 {
            log::warn!("zoom_step {} out of range, using {}", self.zoom_step, DEFAULT_ZOOM_STEP);
            self.zoom_step = DEFAULT_ZOOM_STEP;
        }
        if !self.double_click_zoom_level.is_finite() {
            self.double_click_zoom_level = DEFAULT_JUMP_ZOOM;
        }
        self.double_click_zoom_level = self
            .double_click_zoom_level
            .clamp(self.min_zoom, self.max_zoom);
        self
    }
}

// ---------------------------------------------------------------------------
// Carousel options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselOptions {
    pub initial_index: usize,
    /// Track height in pixels.
    pub track_height: u32,
    pub show_indicators: bool,
    pub show_arrows: bool,
    /// Images on each side of the current one that get decoded.
    pub preload_radius: usize,
}

impl Default for CarouselOptions {
    fn default() -> Self {
        Self {
            initial_index: 0,
            track_height: 300,
            show_indicators: true,
            show_arrows: true,
            preload_radius: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ViewerSettings::default();
        assert!(s.allow_zoom && s.allow_rotate && s.allow_reset);
        assert!(!s.allow_download);
        assert_eq!(s.double_click_zoom_level, 4.0);
        assert!(s.click_outside_closes && s.keyboard_enabled);
        assert_eq!((s.min_zoom, s.max_zoom, s.zoom_step), (0.5, 4.0, 0.3));
        assert!(!s.show_overlay_by_default && !s.show_overlay_toggle);
    }

    #[test]
    fn partial_toml_overrides_key_by_key() {
        let s = ViewerSettings::from_toml_str("allow_download = true\nmax_zoom = 8.0\n").unwrap();
        assert!(s.allow_download);
        assert_eq!(s.max_zoom, 8.0);
        assert_eq!(s.min_zoom, 0.5);
        assert_eq!(s.zoom_step, 0.3);
    }

    #[test]
    fn sanitize_swaps_and_brackets_bounds() {
        let s = ViewerSettings {
            min_zoom: 3.0,
            max_zoom: 2.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.min_zoom, 1.0);
        assert_eq!(s.max_zoom, 3.0);
        assert_eq!(s.double_click_zoom_level, 3.0);
    }

    #[test]
    fn sanitize_replaces_invalid_values() {
        let s = ViewerSettings {
            min_zoom: -1.0,
            max_zoom: f32::NAN,
            zoom_step: 0.0,
            double_click_zoom_level: f32::INFINITY,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(s.max_zoom, DEFAULT_MAX_ZOOM);
        assert_eq!(s.zoom_step, DEFAULT_ZOOM_STEP);
        assert_eq!(s.double_click_zoom_level, DEFAULT_JUMP_ZOOM);
    }

    #[test]
    fn carousel_defaults() {
        let c = CarouselOptions::default();
        assert_eq!(c.track_height, 300);
        assert_eq!(c.preload_radius, 1);
        assert!(c.show_indicators && c.show_arrows);
    }
}
