use std::sync::Arc;
use std::time::{Duration, Instant};

use ivgal::collection::{ImageCollection, ImageRecord, Overlay};
use ivgal::gesture::{GestureInterpreter, GestureOutcome};
use ivgal::input::{HitTarget, InputEvent, KeyInput, NavAction, Point, PointerButton, Rect};
use ivgal::session::{ViewerEvent, ViewerSession};
use ivgal::settings::ViewerSettings;
use ivgal::viewport::RotateDirection;

const BOUNDS: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);
const CENTER: Point = Point::new(400.0, 300.0);

fn abc() -> Arc<ImageCollection> {
    Arc::new(ImageCollection::new(vec![
        ImageRecord::new("A", "a.png").with_title("Alpha"),
        ImageRecord::new("B", "b.png"),
        ImageRecord::new("C", "c.png").with_overlay(Overlay::Url("marks.png".into())),
    ]))
}

fn viewer(settings: ViewerSettings) -> (ViewerSession, GestureInterpreter) {
    let mut session = ViewerSession::new(abc(), settings);
    assert!(session.open("A"));
    (session, GestureInterpreter::new(BOUNDS))
}

fn drag(
    session: &mut ViewerSession,
    gestures: &mut GestureInterpreter,
    from: Point,
    to: Point,
    duration: Duration,
) -> GestureOutcome {
    let t0 = Instant::now();
    let down = InputEvent::PointerDown {
        pos: from,
        button: PointerButton::Primary,
        target: HitTarget::Image,
        time: t0,
    };
    gestures.handle(session, &down);
    gestures.handle(session, &InputEvent::PointerMove { pos: to });
    let up = InputEvent::PointerUp { pos: to, button: PointerButton::Primary, time: t0 + duration };
    gestures.handle(session, &up)
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[test]
fn test_next_wraps_around_collection() {
    let (mut s, _) = viewer(ViewerSettings::default());
    assert!(s.next());
    assert_eq!(s.active_image().map(|r| r.id.as_str()), Some("B"));
    s.next();
    s.next();
    assert_eq!(s.active_image().map(|r| r.id.as_str()), Some("A"));
}

#[test]
fn test_next_then_previous_returns_to_start() {
    let (mut s, _) = viewer(ViewerSettings::default());
    for start in 0..3 {
        assert!(s.open_index(start));
        s.next();
        s.previous();
        assert_eq!(s.active_index(), Some(start));
    }
}

#[test]
fn test_navigation_emits_image_changed() {
    let (mut s, _) = viewer(ViewerSettings::default());
    s.previous();
    let events = s.take_events();
    assert!(events.contains(&ViewerEvent::ImageChanged { index: 2, id: "C".into() }));
    assert!(s.take_events().is_empty());
}

#[test]
fn test_opening_another_image_resets_viewport() {
    let (mut s, _) = viewer(ViewerSettings::default());
    s.viewport_mut().set_zoom(3.0);
    s.viewport_mut().rotate(RotateDirection::Right);
    s.viewport_mut().zoom_at(3.5, Point::new(50.0, -20.0));
    assert!(s.open("B"));
    let st = *s.viewport().state();
    assert_eq!(st.zoom, 1.0);
    assert_eq!(st.rotation_steps, 0);
    assert_eq!((st.pan_x, st.pan_y), (0.0, 0.0));
}

// ---------------------------------------------------------------------------
// Zoom
// ---------------------------------------------------------------------------

#[test]
fn test_zoom_in_eleven_times_clamps_at_max() {
    let (mut s, _) = viewer(ViewerSettings::default());
    for _ in 0..11 {
        s.viewport_mut().zoom_in();
    }
    assert_eq!(s.viewport().zoom(), 4.0);
}

#[test]
fn test_set_zoom_always_within_bounds() {
    let (mut s, _) = viewer(ViewerSettings::default());
    for requested in [-3.0, 0.0, 0.2, 0.5, 1.7, 4.0, 9.0, f32::INFINITY] {
        let z = s.viewport_mut().set_zoom(requested);
        assert!((0.5..=4.0).contains(&z), "zoom {} out of range for {}", z, requested);
    }
}

#[test]
fn test_returning_to_unit_zoom_clears_pan() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    let cursor = Point::new(CENTER.x + 100.0, CENTER.y + 40.0);
    g.handle(&mut s, &InputEvent::Wheel { pos: cursor, delta_y: -1.0 });
    assert!(s.viewport().pan() != (0.0, 0.0));
    g.handle(&mut s, &InputEvent::Wheel { pos: cursor, delta_y: 1.0 });
    assert_eq!(s.viewport().zoom(), 1.0);
    assert_eq!(s.viewport().pan(), (0.0, 0.0));
}

#[test]
fn test_wheel_zoom_keeps_content_under_cursor() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    let cursor = Point::new(CENTER.x + 100.0, CENTER.y);
    let outcome = g.handle(&mut s, &InputEvent::Wheel { pos: cursor, delta_y: -1.0 });
    assert_eq!(outcome, GestureOutcome::Transformed);

    let z = s.viewport().zoom();
    assert!((z - 1.3).abs() < 1e-5);
    // Content point 100px right of centre must still map to the cursor.
    let (px, py) = s.viewport().pan();
    assert!((px + 100.0 * z - 100.0).abs() < 1e-3, "pan_x {}", px);
    assert_eq!(py, 0.0);
}

#[test]
fn test_double_click_jumps_and_returns() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    let t0 = Instant::now();
    let click = |time| InputEvent::PointerDown {
        pos: CENTER,
        button: PointerButton::Primary,
        target: HitTarget::Image,
        time,
    };
    g.handle(&mut s, &click(t0));
    g.handle(&mut s, &click(t0 + Duration::from_millis(150)));
    assert_eq!(s.viewport().zoom(), 4.0);

    g.handle(&mut s, &click(t0 + Duration::from_secs(2)));
    g.handle(&mut s, &InputEvent::PointerUp { pos: CENTER, button: PointerButton::Primary, time: t0 + Duration::from_secs(2) });
    g.handle(&mut s, &click(t0 + Duration::from_millis(2100)));
    assert_eq!(s.viewport().zoom(), 1.0);
    assert_eq!(s.viewport().pan(), (0.0, 0.0));
}

// ---------------------------------------------------------------------------
// Swipe vs pan
// ---------------------------------------------------------------------------

#[test]
fn test_quick_swipe_navigates_at_unit_zoom() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    let end = Point::new(CENTER.x - 60.0, CENTER.y + 8.0);
    let outcome = drag(&mut s, &mut g, CENTER, end, Duration::from_millis(200));
    assert_eq!(outcome, GestureOutcome::Navigated);
    assert_eq!(s.active_index(), Some(1));
}

#[test]
fn test_same_swipe_pans_when_zoomed() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    s.viewport_mut().set_zoom(2.0);
    let end = Point::new(CENTER.x - 60.0, CENTER.y + 8.0);
    let outcome = drag(&mut s, &mut g, CENTER, end, Duration::from_millis(200));
    assert_ne!(outcome, GestureOutcome::Navigated);
    assert_eq!(s.active_index(), Some(0));
    assert_eq!(s.viewport().pan(), (-60.0, 8.0));
    assert!(!s.viewport().is_dragging());
}

#[test]
fn test_single_image_never_swipes() {
    let one = Arc::new(ImageCollection::new(vec![ImageRecord::new("only", "o.png")]));
    let mut s = ViewerSession::new(one, ViewerSettings::default());
    s.open_index(0);
    let mut g = GestureInterpreter::new(BOUNDS);
    let outcome = drag(&mut s, &mut g, CENTER, Point::new(100.0, 300.0), Duration::from_millis(100));
    assert_eq!(outcome, GestureOutcome::Ignored);
    assert!(s.adjacent_indices().is_empty());
}

#[test]
fn test_two_finger_tap_without_zoom_does_not_navigate() {
    let settings = ViewerSettings { allow_zoom: false, ..Default::default() };
    let (mut s, mut g) = viewer(settings);
    let t0 = Instant::now();
    let a = CENTER;
    let b = Point::new(CENTER.x - 200.0, CENTER.y);

    g.handle(&mut s, &InputEvent::TouchStart { touches: vec![a], target: HitTarget::Image, time: t0 });
    g.handle(&mut s, &InputEvent::TouchStart { touches: vec![a, b], target: HitTarget::Image, time: t0 });
    let outcome = g.handle(
        &mut s,
        &InputEvent::TouchEnd { remaining: vec![a], lifted: b, time: t0 + Duration::from_millis(80) },
    );
    assert_ne!(outcome, GestureOutcome::Navigated);
    assert_eq!(s.active_index(), Some(0));
}

// ---------------------------------------------------------------------------
// Rotation, reset, keyboard
// ---------------------------------------------------------------------------

#[test]
fn test_four_right_rotations_are_identity() {
    let (mut s, _) = viewer(ViewerSettings::default());
    for _ in 0..4 {
        s.viewport_mut().rotate(RotateDirection::Right);
    }
    assert_eq!(s.viewport().effective_rotation_deg(), 0);
    assert!(!s.reset_available());
}

#[test]
fn test_keyboard_drives_viewer() {
    let (mut s, mut g) = viewer(ViewerSettings::default());
    g.handle(&mut s, &InputEvent::Key(KeyInput::Char('+')));
    g.handle(&mut s, &InputEvent::Key(KeyInput::Char('r')));
    assert!(s.reset_available());
    g.handle(&mut s, &InputEvent::Key(KeyInput::Char('0')));
    assert!(!s.viewport().is_transformed());

    g.handle(&mut s, &InputEvent::Key(KeyInput::ArrowRight));
    assert_eq!(s.active_index(), Some(1));
    let outcome = g.handle(&mut s, &InputEvent::Key(KeyInput::Escape));
    assert_eq!(outcome, GestureOutcome::Closed);
    assert!(!s.is_open());
    assert!(s.take_events().contains(&ViewerEvent::Closed));
}

#[test]
fn test_keyboard_can_be_disabled() {
    let settings = ViewerSettings { keyboard_enabled: false, ..Default::default() };
    let (mut s, mut g) = viewer(settings);
    let outcome = g.handle(&mut s, &InputEvent::Key(KeyInput::Escape));
    assert_eq!(outcome, GestureOutcome::Ignored);
    assert!(s.is_open());
}

// ---------------------------------------------------------------------------
// Click outside, overlay, download
// ---------------------------------------------------------------------------

#[test]
fn test_click_outside_respects_setting() {
    let press = InputEvent::PointerDown {
        pos: Point::new(5.0, 590.0),
        button: PointerButton::Primary,
        target: HitTarget::Outside,
        time: Instant::now(),
    };

    let (mut s, mut g) = viewer(ViewerSettings::default());
    assert_eq!(g.handle(&mut s, &press), GestureOutcome::Closed);

    let keep = ViewerSettings { click_outside_closes: false, ..Default::default() };
    let (mut s, mut g) = viewer(keep);
    assert_eq!(g.handle(&mut s, &press), GestureOutcome::Ignored);
    assert!(s.is_open());
}

#[test]
fn test_overlay_hidden_by_default_and_toggles_on_overlay_images() {
    let settings = ViewerSettings { show_overlay_toggle: true, ..Default::default() };
    let (mut s, _) = viewer(settings);
    assert!(!s.overlay_toggle_available());
    assert!(!s.toggle_overlay());

    s.open("C");
    assert!(!s.overlay_visible());
    assert!(s.overlay_toggle_available());
    assert!(s.toggle_overlay());
    assert!(s.overlay_visible());
}

#[test]
fn test_download_button_builds_request_from_title() {
    let settings = ViewerSettings { allow_download: true, ..Default::default() };
    let (mut s, mut g) = viewer(settings);
    let press = InputEvent::PointerDown {
        pos: Point::new(760.0, 20.0),
        button: PointerButton::Primary,
        target: HitTarget::NavAction(NavAction::Download),
        time: Instant::now(),
    };
    match g.handle(&mut s, &press) {
        GestureOutcome::DownloadRequested(req) => {
            assert_eq!(req.source, "a.png");
            assert_eq!(req.file_name, "Alpha");
        }
        other => panic!("expected download request, got {:?}", other),
    }
}

#[test]
fn test_download_unavailable_by_default() {
    let (s, _) = viewer(ViewerSettings::default());
    assert!(s.download_request().is_none());
}
