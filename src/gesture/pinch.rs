//! Two-finger pinch tracking.

use crate::input::Point;

/// Below this finger spread the distance ratio is too noisy to use.
const MIN_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchTracker {
    /// Finger distance at the previous move event.
    last_distance: f32,
    /// Zoom level when the gesture began.
    start_zoom: f32,
}

/// Per-move result: multiply zoom by `scale`, anchored at `midpoint`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchStep {
    pub scale: f32,
    pub midpoint: Point,
}

fn geometry(touches: &[Point]) -> Option<(Point, f32)> {
    match touches {
        [a, b] => Some((a.midpoint(*b), a.distance(*b))),
        _ => None,
    }
}

impl PinchTracker {
    pub fn begin(touches: &[Point], zoom: f32) -> Option<Self> {
        let (_, distance) = geometry(touches)?;
        Some(Self {
            last_distance: distance,
            start_zoom: zoom,
        })
    }

    pub fn start_zoom(&self) -> f32 {
        self.start_zoom
    }

    /// Ratio against the previous move, so zoom follows the fingers continuously.
    pub fn update(&mut self, touches: &[Point]) -> Option<PinchStep> {
        let (midpoint, distance) = geometry(touches)?;
        if self.last_distance < MIN_DISTANCE || distance < MIN_DISTANCE {
            self.last_distance = distance;
            return None;
        }
        let scale = distance / self.last_distance;
        self.last_distance = distance;
        Some(PinchStep { scale, midpoint })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreading_fingers_scales_relative_to_last_move() {
        let mut p = PinchTracker::begin(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)], 1.0).unwrap();
        let step = p.update(&[Point::new(0.0, 0.0), Point::new(150.0, 0.0)]).unwrap();
        assert_eq!(step.scale, 1.5);
        assert_eq!(step.midpoint, Point::new(75.0, 0.0));
        let step = p.update(&[Point::new(0.0, 0.0), Point::new(300.0, 0.0)]).unwrap();
        assert_eq!(step.scale, 2.0);
        assert_eq!(p.start_zoom(), 1.0);
    }

    #[test]
    fn needs_exactly_two_touches() {
        assert!(PinchTracker::begin(&[Point::new(0.0, 0.0)], 1.0).is_none());
        let mut p = PinchTracker::begin(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], 1.0).unwrap();
        assert!(p.update(&[Point::new(0.0, 0.0)]).is_none());
    }

    #[test]
    fn coincident_fingers_do_not_divide_by_zero() {
        let mut p = PinchTracker::begin(&[Point::new(5.0, 5.0), Point::new(5.0, 5.0)], 2.0).unwrap();
        assert!(p.update(&[Point::new(0.0, 0.0), Point::new(40.0, 0.0)]).is_none());
        let step = p.update(&[Point::new(0.0, 0.0), Point::new(80.0, 0.0)]).unwrap();
        assert_eq!(step.scale, 2.0);
    }
}
