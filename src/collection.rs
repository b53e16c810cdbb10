//! Image records and the ordered collection the widgets navigate.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Overlay content
// ---------------------------------------------------------------------------

/// Renderable overlay content supplied by the embedding program.
///
/// `paint` returns a `width * height * 4` RGBA buffer; the viewer composites
/// it above the base image without further scaling.
pub trait OverlayNode: Send + Sync {
    fn paint(&self, width: u32, height: u32) -> Vec<u8>;

    /// Intrinsic size used when the record's `OverlaySize` leaves it open.
    fn natural_size(&self) -> Option<(u32, u32)> {
        None
    }
}

#[derive(Clone)]
pub enum Overlay {
    /// Image resource drawn above the base image.
    Url(String),
    Node(Arc<dyn OverlayNode>),
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overlay::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Overlay::Node(_) => f.write_str("Node(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

/// Length relative to the image box the overlay is laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Px(f32),
    Percent(f32),
}

impl Dimension {
    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Dimension::Px(px) => px,
            Dimension::Percent(p) => reference * p / 100.0,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(num) = s.strip_suffix('%') {
            num.trim().parse().ok().map(Dimension::Percent)
        } else if let Some(num) = s.strip_suffix("px") {
            num.trim().parse().ok().map(Dimension::Px)
        } else {
            s.parse().ok().map(Dimension::Px)
        }
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(f32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(Dimension::Px(n)),
            Raw::Text(s) => Dimension::parse(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid dimension '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct OverlaySize {
    pub max_width: Option<Dimension>,
    pub max_height: Option<Dimension>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
}

impl OverlaySize {
    pub fn is_unconstrained(&self) -> bool {
        self.max_width.is_none()
            && self.max_height.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }
}

// ---------------------------------------------------------------------------
// Image record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: String,
    /// Local path or `file://` URI. Other schemes are kept but cannot be loaded.
    pub source: String,
    pub alt_text: Option<String>,
    pub title: Option<String>,
    pub overlay: Option<Overlay>,
    pub overlay_position: OverlayPosition,
    pub overlay_size: OverlaySize,
}

impl ImageRecord {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            alt_text: None,
            title: None,
            overlay: None,
            overlay_position: OverlayPosition::Center,
            overlay_size: OverlaySize::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_alt_text(mut self, alt: impl Into<String>) -> Self {
        self.alt_text = Some(alt.into());
        self
    }

    pub fn with_overlay(mut self, overlay: Overlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn from_path(path: PathBuf) -> Self {
        let source = path.display().to_string();
        let title = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Self {
            title,
            ..Self::new(source.clone(), source)
        }
    }
}

/// Resolve a record source to a local filesystem path.
pub fn local_path(uri: &str) -> Result<PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    match uri.split_once("://") {
        Some((scheme, _)) => Err(Error::UnsupportedScheme(scheme.to_string())),
        None => Ok(PathBuf::from(uri)),
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Ordered, read-only list of records. Shared between widgets with `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    records: Vec<ImageRecord>,
}

impl ImageCollection {
    pub fn new(records: Vec<ImageRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// `(index + delta) mod len`, or `None` for an empty collection.
    pub fn wrap_index(&self, index: usize, delta: i64) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let len = self.records.len() as i64;
        Some((index as i64 + delta).rem_euclid(len) as usize)
    }
}

impl From<Vec<ImageRecord>> for ImageCollection {
    fn from(records: Vec<ImageRecord>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> ImageCollection {
        ImageCollection::new(vec![
            ImageRecord::new("a", "a.png"),
            ImageRecord::new("b", "b.png"),
            ImageRecord::new("c", "c.png"),
        ])
    }

    #[test]
    fn wrap_index_goes_around_both_ends() {
        let c = abc();
        assert_eq!(c.wrap_index(2, 1), Some(0));
        assert_eq!(c.wrap_index(0, -1), Some(2));
        assert_eq!(c.wrap_index(1, 0), Some(1));
        assert_eq!(ImageCollection::default().wrap_index(0, 1), None);
    }

    #[test]
    fn index_of_finds_by_id() {
        let c = abc();
        assert_eq!(c.index_of("b"), Some(1));
        assert_eq!(c.index_of("zzz"), None);
    }

    #[test]
    fn local_path_accepts_plain_and_file_uris() {
        assert_eq!(local_path("/tmp/x.png").unwrap(), PathBuf::from("/tmp/x.png"));
        assert_eq!(local_path("file:///tmp/x.png").unwrap(), PathBuf::from("/tmp/x.png"));
        assert!(matches!(
            local_path("https://example.com/x.png"),
            Err(Error::UnsupportedScheme(s)) if s == "https"
        ));
    }

    #[test]
    fn dimension_parses_units() {
        assert_eq!(Dimension::parse("40%"), Some(Dimension::Percent(40.0)));
        assert_eq!(Dimension::parse("120px"), Some(Dimension::Px(120.0)));
        assert_eq!(Dimension::parse(" 64 "), Some(Dimension::Px(64.0)));
        assert_eq!(Dimension::parse("wide"), None);
        assert_eq!(Dimension::Percent(50.0).resolve(300.0), 150.0);
    }

    #[test]
    fn record_from_path_uses_file_name_as_title() {
        let r = ImageRecord::from_path(PathBuf::from("/photos/cat.jpg"));
        assert_eq!(r.id, "/photos/cat.jpg");
        assert_eq!(r.title.as_deref(), Some("cat.jpg"));
        assert!(!r.has_overlay());
    }
}
