//! Viewport transform model: zoom, pan and quarter-turn rotation.
//!
//! Every zoom path goes through [`Viewport::set_zoom`], which owns the clamp
//! and the rule that pan is zero whenever zoom sits at exactly 1.

use std::fmt;
use std::time::Duration;

use crate::input::Point;
use crate::settings::ViewerSettings;

/// Zoom values this close to 1 snap onto the baseline.
const BASELINE_EPSILON: f32 = 1e-4;

/// Easing time for non-drag transform changes.
pub const TRANSITION: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub zoom: f32,
    /// Unbounded quarter turns, positive clockwise.
    pub rotation_steps: i32,
    pub pan_x: f32,
    pub pan_y: f32,
    pub is_dragging: bool,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            rotation_steps: 0,
            pan_x: 0.0,
            pan_y: 0.0,
            is_dragging: false,
        }
    }
}

/// Transform applied to the image, composed as translate, rotate, scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedTransform {
    pub translate_x: f32,
    pub translate_y: f32,
    pub rotate_deg: f32,
    pub scale: f32,
}

impl ComposedTransform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        rotate_deg: 0.0,
        scale: 1.0,
    };

    /// Interpolate towards `to`; `t` in `[0, 1]`.
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Self {
            translate_x: mix(self.translate_x, to.translate_x),
            translate_y: mix(self.translate_y, to.translate_y),
            rotate_deg: mix(self.rotate_deg, to.rotate_deg),
            scale: mix(self.scale, to.scale),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Follow the pointer 1:1.
    Immediate,
    Eased(Duration),
}

#[derive(Debug, Clone, Copy)]
struct DragAnchor {
    pointer: Point,
    pan: (f32, f32),
}

pub type ChangeListener = Box<dyn FnMut(&ViewportState)>;

pub struct Viewport {
    state: ViewportState,
    min_zoom: f32,
    max_zoom: f32,
    zoom_step: f32,
    jump_zoom: f32,
    allow_rotate: bool,
    allow_reset: bool,
    drag: Option<DragAnchor>,
    listener: Option<ChangeListener>,
}

impl fmt::Debug for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("state", &self.state)
            .field("min_zoom", &self.min_zoom)
            .field("max_zoom", &self.max_zoom)
            .finish_non_exhaustive()
    }
}

impl Viewport {
    pub fn new(settings: &ViewerSettings) -> Self {
        Self {
            state: ViewportState::default(),
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
            zoom_step: settings.zoom_step,
            jump_zoom: settings.double_click_zoom_level,
            allow_rotate: settings.allow_rotate,
            allow_reset: settings.allow_reset,
            drag: None,
            listener: None,
        }
    }

    /// Register the callback run after every state change.
    pub fn on_change<F>(&mut self, f: F)
    where
        F: FnMut(&ViewportState) + 'static,
    {
        self.listener = Some(Box::new(f));
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn zoom(&self) -> f32 {
        self.state.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.state.pan_x, self.state.pan_y)
    }

    pub fn zoom_step(&self) -> f32 {
        self.zoom_step
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_dragging
    }

    pub fn is_unzoomed(&self) -> bool {
        self.state.zoom == 1.0
    }

    /// Zoom or rotation differ from the baseline.
    pub fn is_transformed(&self) -> bool {
        self.state.zoom != 1.0 || self.state.rotation_steps.rem_euclid(4) != 0
    }

    fn notify(&mut self, before: ViewportState) {
        if before != self.state {
            if let Some(listener) = self.listener.as_mut() {
                listener(&self.state);
            }
        }
    }

    fn clamp_zoom(&self, requested: f32) -> f32 {
        if !requested.is_finite() {
            return self.state.zoom;
        }
        let z = requested.clamp(self.min_zoom, self.max_zoom);
        if (z - 1.0).abs() < BASELINE_EPSILON { 1.0 } else { z }
    }

    /// Clamp and store a zoom level; returns the effective value.
    pub fn set_zoom(&mut self, requested: f32) -> f32 {
        let before = self.state;
        let z = self.clamp_zoom(requested);
        self.state.zoom = z;
        if z == 1.0 {
            self.state.pan_x = 0.0;
            self.state.pan_y = 0.0;
        }
        self.notify(before);
        z
    }

    /// Zoom while keeping the content under `anchor` in place.
    ///
    /// `anchor` is relative to the centre of the image container.
    pub fn zoom_at(&mut self, requested: f32, anchor: Point) -> f32 {
        let before = self.state;
        let old = self.state.zoom;
        let z = self.clamp_zoom(requested);

        let image_x = (anchor.x - self.state.pan_x) / old;
        let image_y = (anchor.y - self.state.pan_y) / old;

        self.state.zoom = z;
        if z == 1.0 {
            self.state.pan_x = 0.0;
            self.state.pan_y = 0.0;
        } else {
            self.state.pan_x = anchor.x - image_x * z;
            self.state.pan_y = anchor.y - image_y * z;
        }
        self.notify(before);
        z
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.state.zoom + self.zoom_step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.state.zoom - self.zoom_step)
    }

    /// Switch between the baseline and the configured jump zoom.
    pub fn toggle_jump_zoom(&mut self) -> f32 {
        let target = if self.state.zoom == self.jump_zoom {
            1.0
        } else {
            self.jump_zoom
        };
        self.set_zoom(target)
    }

    pub fn rotate(&mut self, direction: RotateDirection) {
        if !self.allow_rotate {
            return;
        }
        let before = self.state;
        self.state.rotation_steps += match direction {
            RotateDirection::Left => -1,
            RotateDirection::Right => 1,
        };
        self.notify(before);
    }

    /// Back to the baseline, unless reset is disabled.
    pub fn reset(&mut self) {
        if self.allow_reset {
            self.force_reset();
        }
    }

    /// Back to the baseline regardless of configuration.
    pub fn force_reset(&mut self) {
        let before = self.state;
        self.drag = None;
        self.state = ViewportState::default();
        self.notify(before);
    }

    // ------------------------------------------------------------------
    // Drag panning
    // ------------------------------------------------------------------

    /// Start a pan gesture; refused at or below the baseline zoom.
    pub fn begin_drag(&mut self, pointer: Point) -> bool {
        if self.state.zoom <= 1.0 {
            return false;
        }
        let before = self.state;
        self.drag = Some(DragAnchor {
            pointer,
            pan: (self.state.pan_x, self.state.pan_y),
        });
        self.state.is_dragging = true;
        self.notify(before);
        true
    }

    pub fn drag_to(&mut self, pointer: Point) -> bool {
        let Some(anchor) = self.drag else {
            return false;
        };
        if self.state.zoom <= 1.0 {
            return false;
        }
        let before = self.state;
        self.state.pan_x = pointer.x - (anchor.pointer.x - anchor.pan.0);
        self.state.pan_y = pointer.y - (anchor.pointer.y - anchor.pan.1);
        self.notify(before);
        true
    }

    pub fn end_drag(&mut self) {
        let before = self.state;
        self.drag = None;
        self.state.is_dragging = false;
        self.notify(before);
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn composed_transform(&self) -> ComposedTransform {
        ComposedTransform {
            translate_x: self.state.pan_x,
            translate_y: self.state.pan_y,
            rotate_deg: self.state.rotation_steps as f32 * 90.0,
            scale: self.state.zoom,
        }
    }

    /// Rotation reduced to `0, 90, 180, 270`.
    pub fn effective_rotation_deg(&self) -> i32 {
        self.state.rotation_steps.rem_euclid(4) * 90
    }

    pub fn transition(&self) -> Transition {
        if self.state.is_dragging {
            Transition::Immediate
        } else {
            Transition::Eased(TRANSITION)
        }
    }
}
