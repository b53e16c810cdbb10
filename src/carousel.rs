//! Swipeable single-row carousel.
//!
//! Unlike the viewer, the carousel does not wrap: the index is clamped to
//! the collection and dragging past either end is damped.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::collection::ImageCollection;
use crate::gesture::swipe::{self, SwipeDirection};
use crate::input::{InputEvent, KeyInput, Point, PointerButton, Rect};
use crate::settings::CarouselOptions;
use crate::viewport::Transition;

/// Share of the raw drag applied when pulling past the first or last slide.
pub const EDGE_RESISTANCE: f32 = 0.3;
/// Horizontal travel beyond which a press is a drag rather than a click.
pub const CLICK_SLOP: f32 = 5.0;
pub const SLIDE_TRANSITION: Duration = Duration::from_millis(300);

const ARROW_SIZE: f32 = 40.0;
const ARROW_MARGIN: f32 = 8.0;
const DOT_SIZE: f32 = 8.0;
const DOT_GAP: f32 = 8.0;
const DOT_BOTTOM: f32 = 12.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselEvent {
    ImageChanged { index: usize, id: String },
    ImageClicked { index: usize, id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselControl {
    PreviousArrow,
    NextArrow,
    Indicator(usize),
}

#[derive(Debug, Clone, Copy)]
struct Press {
    pos: Point,
    time: Instant,
}

#[derive(Debug)]
pub struct Carousel {
    collection: Arc<ImageCollection>,
    options: CarouselOptions,
    index: usize,
    track: Rect,
    press: Option<Press>,
    drag_offset: f32,
    has_moved: bool,
    events: Vec<CarouselEvent>,
}

impl Carousel {
    pub fn new(collection: Arc<ImageCollection>, options: CarouselOptions, track: Rect) -> Self {
        let index = options.initial_index.min(collection.len().saturating_sub(1));
        Self {
            collection,
            options,
            index,
            track,
            press: None,
            drag_offset: 0.0,
            has_moved: false,
            events: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn collection(&self) -> &Arc<ImageCollection> {
        &self.collection
    }

    pub fn options(&self) -> &CarouselOptions {
        &self.options
    }

    pub fn track(&self) -> Rect {
        self.track
    }

    pub fn set_track(&mut self, track: Rect) {
        self.track = track;
    }

    pub fn is_dragging(&self) -> bool {
        self.press.is_some() && self.can_drag()
    }

    pub fn drag_offset(&self) -> f32 {
        self.drag_offset
    }

    pub fn take_events(&mut self) -> Vec<CarouselEvent> {
        std::mem::take(&mut self.events)
    }

    fn can_drag(&self) -> bool {
        self.collection.len() > 1
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Jump to `index`, clamped into the collection.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.collection.is_empty() {
            return false;
        }
        let clamped = index.min(self.collection.len() - 1);
        if clamped == self.index {
            return false;
        }
        log::debug!("[carousel] {} -> {}", self.index, clamped);
        self.index = clamped;
        let id = self.collection.get(clamped).map(|r| r.id.clone()).unwrap_or_default();
        self.events.push(CarouselEvent::ImageChanged { index: clamped, id });
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.index + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.index.checked_sub(1) {
            Some(i) => self.go_to(i),
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Horizontal offset of the slide strip for a track `width` wide.
    pub fn track_offset(&self, width: f32) -> f32 {
        let base = -(self.index as f32 * width);
        let last = self.collection.len().saturating_sub(1);
        let past_start = self.index == 0 && self.drag_offset > 0.0;
        let past_end = self.index == last && self.drag_offset < 0.0;
        if past_start || past_end {
            base + self.drag_offset * EDGE_RESISTANCE
        } else {
            base + self.drag_offset
        }
    }

    /// Screen rectangle of slide `index` with the strip shifted by `offset`,
    /// normally an eased [`Carousel::track_offset`].
    pub fn slide_rect(&self, index: usize, offset: f32) -> Rect {
        Rect::new(
            self.track.x + offset + index as f32 * self.track.width,
            self.track.y,
            self.track.width,
            self.track.height,
        )
    }

    pub fn transition(&self) -> Transition {
        if self.is_dragging() {
            Transition::Immediate
        } else {
            Transition::Eased(SLIDE_TRANSITION)
        }
    }

    /// Slides within `preload_radius` of the current one.
    pub fn loaded_indices(&self) -> Range<usize> {
        if self.collection.is_empty() {
            return 0..0;
        }
        let radius = self.options.preload_radius;
        let start = self.index.saturating_sub(radius);
        let end = (self.index + radius + 1).min(self.collection.len());
        start..end
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.loaded_indices().contains(&index)
    }

    pub fn shows_previous_arrow(&self) -> bool {
        self.options.show_arrows && self.can_drag() && self.index > 0
    }

    pub fn shows_next_arrow(&self) -> bool {
        self.options.show_arrows && self.can_drag() && self.index + 1 < self.collection.len()
    }

    pub fn shows_indicators(&self) -> bool {
        self.options.show_indicators && self.can_drag()
    }

    pub fn control_rect(&self, control: CarouselControl) -> Option<Rect> {
        let t = self.track;
        let arrow_y = t.y + (t.height - ARROW_SIZE) / 2.0;
        match control {
            CarouselControl::PreviousArrow if self.shows_previous_arrow() => {
                Some(Rect::new(t.x + ARROW_MARGIN, arrow_y, ARROW_SIZE, ARROW_SIZE))
            }
            CarouselControl::NextArrow if self.shows_next_arrow() => Some(Rect::new(
                t.x + t.width - ARROW_MARGIN - ARROW_SIZE,
                arrow_y,
                ARROW_SIZE,
                ARROW_SIZE,
            )),
            CarouselControl::Indicator(i) if self.shows_indicators() && i < self.collection.len() => {
                let n = self.collection.len() as f32;
                let row = n * DOT_SIZE + (n - 1.0) * DOT_GAP;
                let x0 = t.x + (t.width - row) / 2.0;
                Some(Rect::new(
                    x0 + i as f32 * (DOT_SIZE + DOT_GAP),
                    t.y + t.height - DOT_BOTTOM - DOT_SIZE,
                    DOT_SIZE,
                    DOT_SIZE,
                ))
            }
            _ => None,
        }
    }

    pub fn control_at(&self, p: Point) -> Option<CarouselControl> {
        let mut candidates = vec![CarouselControl::PreviousArrow, CarouselControl::NextArrow];
        candidates.extend((0..self.collection.len()).map(CarouselControl::Indicator));
        candidates
            .into_iter()
            .find(|c| self.control_rect(*c).is_some_and(|r| r.contains(p)))
    }

    fn activate(&mut self, control: CarouselControl) -> bool {
        match control {
            CarouselControl::PreviousArrow => self.previous(),
            CarouselControl::NextArrow => self.next(),
            CarouselControl::Indicator(i) => self.go_to(i),
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Feed one input event; returns true when the carousel needs a redraw.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        if self.collection.is_empty() {
            return false;
        }
        match event {
            InputEvent::PointerDown { pos, button, time, .. } => {
                *button == PointerButton::Primary && self.press_at(*pos, *time)
            }
            InputEvent::PointerMove { pos } => self.move_to(*pos),
            InputEvent::PointerUp { pos, button, time } => {
                *button == PointerButton::Primary && self.release(*pos, *time)
            }
            InputEvent::TouchStart { touches, time, .. } => match touches.first() {
                Some(p) if touches.len() == 1 => self.press_at(*p, *time),
                _ => false,
            },
            InputEvent::TouchMove { touches } => match touches.first() {
                Some(p) => self.move_to(*p),
                None => false,
            },
            InputEvent::TouchEnd { remaining, lifted, time } if remaining.is_empty() => {
                self.release(*lifted, *time)
            }
            InputEvent::TouchEnd { .. } | InputEvent::Wheel { .. } => false,
            InputEvent::Key(KeyInput::ArrowRight) => self.next(),
            InputEvent::Key(KeyInput::ArrowLeft) => self.previous(),
            InputEvent::Key(_) => false,
        }
    }

    fn press_at(&mut self, pos: Point, time: Instant) -> bool {
        if let Some(control) = self.control_at(pos) {
            return self.activate(control);
        }
        if !self.track.contains(pos) {
            return false;
        }
        self.press = Some(Press { pos, time });
        self.has_moved = false;
        self.drag_offset = 0.0;
        false
    }

    fn move_to(&mut self, pos: Point) -> bool {
        let Some(press) = self.press else {
            return false;
        };
        let dx = pos.x - press.pos.x;
        if dx.abs() > CLICK_SLOP {
            self.has_moved = true;
        }
        if !self.can_drag() {
            return false;
        }
        self.drag_offset = dx;
        true
    }

    fn release(&mut self, pos: Point, time: Instant) -> bool {
        let Some(press) = self.press.take() else {
            return false;
        };
        let dx = pos.x - press.pos.x;
        if dx.abs() > CLICK_SLOP {
            self.has_moved = true;
        }
        self.drag_offset = 0.0;

        if self.can_drag() {
            let elapsed = time.saturating_duration_since(press.time);
            let thresholds = swipe::carousel_swipe(self.track.width);
            match swipe::classify(press.pos, pos, elapsed, &thresholds) {
                Some(SwipeDirection::Previous) => {
                    self.previous();
                }
                Some(SwipeDirection::Next) => {
                    self.next();
                }
                None => {}
            }
        }

        if !self.has_moved {
            let id = self.collection.get(self.index).map(|r| r.id.clone()).unwrap_or_default();
            log::debug!("[carousel] click {}", self.index);
            self.events.push(CarouselEvent::ImageClicked { index: self.index, id });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ImageRecord;
    use crate::input::HitTarget;

    const TRACK: Rect = Rect::new(0.0, 0.0, 400.0, 300.0);

    fn carousel(n: usize) -> Carousel {
        let records = (0..n)
            .map(|i| ImageRecord::new(format!("c{}", i), format!("c{}.png", i)))
            .collect();
        Carousel::new(Arc::new(ImageCollection::new(records)), CarouselOptions::default(), TRACK)
    }

    #[test]
    fn index_is_clamped_not_wrapped() {
        let mut c = carousel(3);
        assert!(!c.previous());
        assert!(c.next());
        assert!(c.next());
        assert!(!c.next());
        assert_eq!(c.index(), 2);
        assert!(c.go_to(0));
        assert!(c.go_to(99));
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn initial_index_is_clamped() {
        let records = vec![ImageRecord::new("a", "a.png"), ImageRecord::new("b", "b.png")];
        let options = CarouselOptions { initial_index: 10, ..Default::default() };
        let c = Carousel::new(Arc::new(ImageCollection::new(records)), options, TRACK);
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn edge_resistance_damps_overscroll() {
        let t0 = Instant::now();
        let mut c = carousel(3);
        c.handle(&InputEvent::TouchStart { touches: vec![Point::new(200.0, 150.0)], target: HitTarget::Image, time: t0 });
        c.handle(&InputEvent::TouchMove { touches: vec![Point::new(300.0, 150.0)] });
        assert_eq!(c.drag_offset(), 100.0);
        assert!((c.track_offset(400.0) - 30.0).abs() < 1e-4);
        c.handle(&InputEvent::TouchMove { touches: vec![Point::new(150.0, 150.0)] });
        assert_eq!(c.track_offset(400.0), -50.0);
    }

    #[test]
    fn slides_follow_the_strip() {
        let mut c = carousel(3);
        c.go_to(1);
        let offset = c.track_offset(TRACK.width);
        assert_eq!(c.slide_rect(1, offset), TRACK);
        assert_eq!(c.slide_rect(2, offset).x, 400.0);
        assert_eq!(c.slide_rect(0, offset - 50.0).x, -450.0);
    }

    #[test]
    fn loaded_window_is_clipped() {
        let mut c = carousel(5);
        assert_eq!(c.loaded_indices(), 0..2);
        c.go_to(2);
        assert_eq!(c.loaded_indices(), 1..4);
        c.go_to(4);
        assert_eq!(c.loaded_indices(), 3..5);
        assert!(!c.is_loaded(1));
    }

    #[test]
    fn arrows_hide_at_ends() {
        let mut c = carousel(2);
        assert!(!c.shows_previous_arrow());
        assert!(c.shows_next_arrow());
        c.next();
        assert!(c.shows_previous_arrow());
        assert!(!c.shows_next_arrow());
        assert!(!carousel(1).shows_next_arrow());
        assert!(!carousel(1).shows_indicators());
    }

    #[test]
    fn controls_hit_test() {
        let t0 = Instant::now();
        let mut c = carousel(3);
        let next = c.control_rect(CarouselControl::NextArrow).unwrap();
        assert_eq!(c.control_at(next.center()), Some(CarouselControl::NextArrow));
        assert!(c.handle(&InputEvent::PointerDown {
            pos: next.center(),
            button: PointerButton::Primary,
            target: HitTarget::Image,
            time: t0,
        }));
        assert_eq!(c.index(), 1);

        let dot = c.control_rect(CarouselControl::Indicator(2)).unwrap();
        assert_eq!(c.control_at(dot.center()), Some(CarouselControl::Indicator(2)));
        assert_eq!(c.control_at(Point::new(200.0, 150.0)), None);
    }
}
