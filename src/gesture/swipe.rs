//! Swipe recognition on release.

use std::time::Duration;

use crate::input::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    /// Minimum horizontal travel for a quick flick.
    pub quick_distance: f32,
    /// A flick must finish within this time.
    pub quick_time: Duration,
    /// Travel that counts as a swipe regardless of time, if any.
    pub long_distance: Option<f32>,
}

/// Full-screen viewer: only quick flicks navigate.
pub const VIEWER_SWIPE: SwipeThresholds = SwipeThresholds {
    quick_distance: 50.0,
    quick_time: Duration::from_millis(300),
    long_distance: None,
};

/// Fraction of the track width that swipes the carousel at any speed.
pub const CAROUSEL_DISTANCE_FRACTION: f32 = 0.2;

/// Carousel thresholds for a track of `track_width` pixels.
pub fn carousel_swipe(track_width: f32) -> SwipeThresholds {
    SwipeThresholds {
        quick_distance: 50.0,
        quick_time: Duration::from_millis(300),
        long_distance: Some(track_width * CAROUSEL_DISTANCE_FRACTION),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved right: show the previous image.
    Previous,
    /// Finger moved left: show the next image.
    Next,
}

/// Classify a release. Vertical-dominant motion is scroll intent and never swipes.
pub fn classify(
    start: Point,
    end: Point,
    elapsed: Duration,
    thresholds: &SwipeThresholds,
) -> Option<SwipeDirection> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.abs() <= dy.abs() {
        return None;
    }

    let quick = elapsed < thresholds.quick_time && dx.abs() > thresholds.quick_distance;
    let long = thresholds.long_distance.is_some_and(|d| dx.abs() > d);
    if !(quick || long) {
        return None;
    }

    Some(if dx > 0.0 {
        SwipeDirection::Previous
    } else {
        SwipeDirection::Next
    })
}
