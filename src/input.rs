//! Host-independent input events.
//!
//! The window host translates its native events into these before handing
//! them to a gesture interpreter or the carousel, so the interaction code
//! never sees winit types and can be driven directly from tests.

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Controls on the viewer's navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavAction {
    Close,
    Previous,
    Next,
    ZoomIn,
    ZoomOut,
    RotateLeft,
    RotateRight,
    Reset,
    Download,
    ToggleOverlay,
}

/// What a pointer-down landed on, as resolved by the host's hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Image,
    NavigationBar,
    NavAction(NavAction),
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Escape,
    ArrowLeft,
    ArrowRight,
    Char(char),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        pos: Point,
        button: PointerButton,
        target: HitTarget,
        time: Instant,
    },
    PointerMove {
        pos: Point,
    },
    PointerUp {
        pos: Point,
        button: PointerButton,
        time: Instant,
    },
    /// `delta_y > 0` scrolls down (zoom out), `< 0` scrolls up (zoom in).
    Wheel {
        pos: Point,
        delta_y: f32,
    },
    /// `touches` are all points currently down, the new one included.
    TouchStart {
        touches: Vec<Point>,
        target: HitTarget,
        time: Instant,
    },
    TouchMove {
        touches: Vec<Point>,
    },
    /// `remaining` are the points still down; `lifted` is the one released.
    TouchEnd {
        remaining: Vec<Point>,
        lifted: Point,
        time: Instant,
    },
    Key(KeyInput),
}
