//! Gesture interpreters for the full-screen viewer.
//!
//! [`GestureInterpreter`] turns host-independent [`InputEvent`]s into viewport
//! mutations and session transitions. Tracking state for an in-flight gesture
//! (drag anchor, touch start, pinch distance, last click) lives here and is
//! dropped when the gesture ends or the image changes.

pub mod keys;
pub mod pinch;
pub mod swipe;

use std::time::{Duration, Instant};

use crate::download::DownloadRequest;
use crate::input::{HitTarget, InputEvent, KeyInput, NavAction, Point, PointerButton, Rect};
use crate::session::ViewerSession;
use crate::viewport::{RotateDirection, Viewport, ViewportState};

use keys::KeyCommand;
use pinch::PinchTracker;
use swipe::{SwipeDirection, VIEWER_SWIPE};

/// Double-click / double-tap detection window.
const DOUBLE_CLICK_THRESHOLD: Duration = Duration::from_millis(300);
/// Max distance between the two presses of a double-click.
const DOUBLE_CLICK_SLOP: f32 = 25.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Ignored,
    Transformed,
    Navigated,
    Closed,
    OverlayToggled,
    DownloadRequested(DownloadRequest),
}

impl GestureOutcome {
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, GestureOutcome::Ignored)
    }
}

#[derive(Debug, Clone, Copy)]
struct PressStart {
    pos: Point,
    time: Instant,
}

#[derive(Debug)]
pub struct GestureInterpreter {
    /// Image container in screen space; wheel and pinch anchors are taken
    /// relative to its centre.
    bounds: Rect,
    pointer_press: Option<PressStart>,
    touch_press: Option<PressStart>,
    pinch: Option<PinchTracker>,
    last_click: Option<PressStart>,
}

impl GestureInterpreter {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            pointer_press: None,
            touch_press: None,
            pinch: None,
            last_click: None,
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    fn local(&self, p: Point) -> Point {
        let c = self.bounds.center();
        Point::new(p.x - c.x, p.y - c.y)
    }

    /// Drop all in-flight gesture state.
    pub fn cancel(&mut self, session: &mut ViewerSession) {
        self.pointer_press = None;
        self.touch_press = None;
        self.pinch = None;
        if session.viewport().is_dragging() {
            session.viewport_mut().end_drag();
        }
    }

    /// Returns true on the second press of a double-click.
    fn register_click(&mut self, pos: Point, time: Instant) -> bool {
        if let Some(last) = self.last_click {
            let elapsed = time.saturating_duration_since(last.time);
            if elapsed < DOUBLE_CLICK_THRESHOLD && last.pos.distance(pos) < DOUBLE_CLICK_SLOP {
                self.last_click = None;
                return true;
            }
        }
        self.last_click = Some(PressStart { pos, time });
        false
    }

    pub fn handle(&mut self, session: &mut ViewerSession, event: &InputEvent) -> GestureOutcome {
        if !session.is_open() {
            return GestureOutcome::Ignored;
        }
        let before = *session.viewport().state();

        let outcome = match event {
            InputEvent::PointerDown { pos, button, target, time } => {
                self.pointer_down(session, *pos, *button, *target, *time)
            }
            InputEvent::PointerMove { pos } => {
                if session.viewport().is_dragging() {
                    session.viewport_mut().drag_to(*pos);
                }
                GestureOutcome::Ignored
            }
            InputEvent::PointerUp { pos, button, time } => {
                if *button == PointerButton::Primary {
                    self.pointer_up(session, *pos, *time)
                } else {
                    GestureOutcome::Ignored
                }
            }
            InputEvent::Wheel { pos, delta_y } => {
                self.wheel(session, *pos, *delta_y);
                GestureOutcome::Ignored
            }
            InputEvent::TouchStart { touches, target, time } => {
                self.touch_start(session, touches, *target, *time)
            }
            InputEvent::TouchMove { touches } => {
                self.touch_move(session, touches);
                GestureOutcome::Ignored
            }
            InputEvent::TouchEnd { remaining, lifted, time } => {
                self.touch_end(session, remaining, *lifted, *time)
            }
            InputEvent::Key(key) => self.key(session, *key),
        };

        match outcome {
            GestureOutcome::Ignored if changed(&before, session) => GestureOutcome::Transformed,
            GestureOutcome::Navigated | GestureOutcome::Closed => {
                self.cancel(session);
                self.last_click = None;
                outcome
            }
            other => other,
        }
    }

    // ------------------------------------------------------------------
    // Mouse
    // ------------------------------------------------------------------

    fn pointer_down(
        &mut self,
        session: &mut ViewerSession,
        pos: Point,
        button: PointerButton,
        target: HitTarget,
        time: Instant,
    ) -> GestureOutcome {
        match target {
            HitTarget::Outside => self.outside_press(session),
            HitTarget::NavAction(action) => dispatch_action(session, action),
            HitTarget::NavigationBar => GestureOutcome::Ignored,
            HitTarget::Image => {
                if button != PointerButton::Primary {
                    return GestureOutcome::Ignored;
                }
                if self.register_click(pos, time) && session.settings().allow_zoom {
                    self.cancel(session);
                    session.viewport_mut().toggle_jump_zoom();
                    log::debug!("[gesture] double-click zoom -> {}", session.viewport().zoom());
                    return GestureOutcome::Ignored;
                }
                if !session.viewport_mut().begin_drag(pos) {
                    self.pointer_press = Some(PressStart { pos, time });
                }
                GestureOutcome::Ignored
            }
        }
    }

    fn pointer_up(&mut self, session: &mut ViewerSession, pos: Point, time: Instant) -> GestureOutcome {
        if session.viewport().is_dragging() {
            session.viewport_mut().end_drag();
        }
        match self.pointer_press.take() {
            Some(start) => self.try_swipe(session, start, pos, time),
            None => GestureOutcome::Ignored,
        }
    }

    fn outside_press(&mut self, session: &mut ViewerSession) -> GestureOutcome {
        if session.settings().click_outside_closes {
            session.close();
            GestureOutcome::Closed
        } else {
            GestureOutcome::Ignored
        }
    }

    fn wheel(&mut self, session: &mut ViewerSession, pos: Point, delta_y: f32) {
        if !session.settings().allow_zoom || delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let anchor = self.local(pos);
        let viewport = session.viewport_mut();
        let step = if delta_y > 0.0 {
            -viewport.zoom_step()
        } else {
            viewport.zoom_step()
        };
        viewport.zoom_at(viewport.zoom() + step, anchor);
    }

    // ------------------------------------------------------------------
    // Touch
    // ------------------------------------------------------------------

    fn touch_start(
        &mut self,
        session: &mut ViewerSession,
        touches: &[Point],
        target: HitTarget,
        time: Instant,
    ) -> GestureOutcome {
        match touches {
            [pos] => {
                match target {
                    HitTarget::Outside => return self.outside_press(session),
                    HitTarget::NavAction(action) => return dispatch_action(session, action),
                    HitTarget::NavigationBar => return GestureOutcome::Ignored,
                    HitTarget::Image => {}
                }
                if self.register_click(*pos, time) && session.settings().allow_zoom {
                    self.cancel(session);
                    session.viewport_mut().toggle_jump_zoom();
                    log::debug!("[gesture] double-tap zoom -> {}", session.viewport().zoom());
                    return GestureOutcome::Ignored;
                }
                self.touch_press = Some(PressStart { pos: *pos, time });
                session.viewport_mut().begin_drag(*pos);
                GestureOutcome::Ignored
            }
            [] => GestureOutcome::Ignored,
            _ => {
                // A second finger turns any press into a multi-touch gesture.
                if session.viewport().is_dragging() {
                    session.viewport_mut().end_drag();
                }
                self.touch_press = None;
                self.pinch = if session.settings().allow_zoom {
                    PinchTracker::begin(touches, session.viewport().zoom())
                } else {
                    None
                };
                if self.pinch.is_some() {
                    log::debug!("[gesture] pinch start");
                }
                GestureOutcome::Ignored
            }
        }
    }

    fn touch_move(&mut self, session: &mut ViewerSession, touches: &[Point]) {
        if touches.len() == 2 {
            let Some(step) = self.pinch.as_mut().and_then(|p| p.update(touches)) else {
                return;
            };
            let anchor = self.local(step.midpoint);
            let viewport = session.viewport_mut();
            let target = viewport.zoom() * step.scale;
            viewport.zoom_at(target, anchor);
        } else if let [pos] = touches {
            if session.viewport().is_dragging() {
                session.viewport_mut().drag_to(*pos);
            }
        }
    }

    fn touch_end(
        &mut self,
        session: &mut ViewerSession,
        remaining: &[Point],
        lifted: Point,
        time: Instant,
    ) -> GestureOutcome {
        if remaining.len() > 1 {
            return GestureOutcome::Ignored;
        }
        if let Some(pinch) = self.pinch.take() {
            self.touch_press = None;
            log::debug!(
                "[gesture] pinch end, zoom {} -> {}",
                pinch.start_zoom(),
                session.viewport().zoom()
            );
            return GestureOutcome::Ignored;
        }
        if !remaining.is_empty() {
            self.touch_press = None;
            return GestureOutcome::Ignored;
        }
        if session.viewport().is_dragging() {
            session.viewport_mut().end_drag();
        }
        match self.touch_press.take() {
            Some(start) => self.try_swipe(session, start, lifted, time),
            None => GestureOutcome::Ignored,
        }
    }

    /// Swipes only apply to the unzoomed image; when zoomed the same motion pans.
    fn try_swipe(
        &mut self,
        session: &mut ViewerSession,
        start: PressStart,
        end: Point,
        time: Instant,
    ) -> GestureOutcome {
        if !session.viewport().is_unzoomed() || !session.can_navigate() {
            return GestureOutcome::Ignored;
        }
        let elapsed = time.saturating_duration_since(start.time);
        match swipe::classify(start.pos, end, elapsed, &VIEWER_SWIPE) {
            Some(direction) => {
                log::debug!("[gesture] swipe {:?}", direction);
                match direction {
                    SwipeDirection::Previous => session.previous(),
                    SwipeDirection::Next => session.next(),
                };
                GestureOutcome::Navigated
            }
            None => GestureOutcome::Ignored,
        }
    }

    // ------------------------------------------------------------------
    // Keyboard
    // ------------------------------------------------------------------

    fn key(&mut self, session: &mut ViewerSession, key: KeyInput) -> GestureOutcome {
        if !session.settings().keyboard_enabled {
            return GestureOutcome::Ignored;
        }
        let Some(command) = keys::command_for(key) else {
            return GestureOutcome::Ignored;
        };
        let action = match command {
            KeyCommand::Close => NavAction::Close,
            KeyCommand::ZoomIn => NavAction::ZoomIn,
            KeyCommand::ZoomOut => NavAction::ZoomOut,
            KeyCommand::RotateRight => NavAction::RotateRight,
            KeyCommand::RotateLeft => NavAction::RotateLeft,
            KeyCommand::Reset => NavAction::Reset,
            KeyCommand::Next => NavAction::Next,
            KeyCommand::Previous => NavAction::Previous,
        };
        dispatch_action(session, action)
    }
}

fn changed(before: &ViewportState, session: &ViewerSession) -> bool {
    before != session.viewport().state()
}

/// Run a navigation-bar control.
pub fn dispatch_action(session: &mut ViewerSession, action: NavAction) -> GestureOutcome {
    let allow_zoom = session.settings().allow_zoom;
    match action {
        NavAction::Close => {
            session.close();
            GestureOutcome::Closed
        }
        NavAction::Previous => navigated(session.previous()),
        NavAction::Next => navigated(session.next()),
        NavAction::ZoomIn if allow_zoom => {
            session.viewport_mut().zoom_in();
            GestureOutcome::Transformed
        }
        NavAction::ZoomOut if allow_zoom => {
            session.viewport_mut().zoom_out();
            GestureOutcome::Transformed
        }
        NavAction::ZoomIn | NavAction::ZoomOut => GestureOutcome::Ignored,
        NavAction::RotateLeft => transform(session, |v| v.rotate(RotateDirection::Left)),
        NavAction::RotateRight => transform(session, |v| v.rotate(RotateDirection::Right)),
        NavAction::Reset => transform(session, Viewport::reset),
        NavAction::Download => match session.download_request() {
            Some(request) => GestureOutcome::DownloadRequested(request),
            None => GestureOutcome::Ignored,
        },
        NavAction::ToggleOverlay => {
            if session.toggle_overlay() {
                GestureOutcome::OverlayToggled
            } else {
                GestureOutcome::Ignored
            }
        }
    }
}

/// `Transformed` only when `apply` actually changed the viewport.
fn transform(session: &mut ViewerSession, apply: impl FnOnce(&mut Viewport)) -> GestureOutcome {
    let before = *session.viewport().state();
    apply(session.viewport_mut());
    if changed(&before, session) {
        GestureOutcome::Transformed
    } else {
        GestureOutcome::Ignored
    }
}

fn navigated(moved: bool) -> GestureOutcome {
    if moved {
        GestureOutcome::Navigated
    } else {
        GestureOutcome::Ignored
    }
}
