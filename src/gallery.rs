//! Thumbnail grid: layout, scrolling and hit testing.
//!
//! Columns follow an auto-fill rule: as many cells of at least
//! [`MIN_CELL`] pixels as fit in the container (capped at [`MAX_WIDTH`]),
//! with the leftover width shared equally between them.

use crate::input::{Point, Rect};
use crate::session::ViewerSession;

pub const MIN_CELL: f32 = 300.0;
pub const GAP: f32 = 16.0;
pub const MAX_WIDTH: f32 = 1200.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    /// Side of each square cell.
    pub cell: f32,
    /// Left edge of the centred grid.
    pub origin_x: f32,
}

impl GridLayout {
    pub fn for_width(container_width: f32) -> Self {
        let width = container_width.clamp(0.0, MAX_WIDTH);
        let columns = (((width + GAP) / (MIN_CELL + GAP)).floor() as usize).max(1);
        let cell = ((width - GAP * (columns as f32 - 1.0)) / columns as f32).max(1.0);
        let used = cell * columns as f32 + GAP * (columns as f32 - 1.0);
        let origin_x = ((container_width - used) / 2.0).max(0.0);
        Self { columns, cell, origin_x }
    }

    pub fn rows(&self, count: usize) -> usize {
        count.div_ceil(self.columns)
    }

    /// Height of the scrollable content for `count` cells, gaps included.
    pub fn content_height(&self, count: usize) -> f32 {
        let rows = self.rows(count);
        if rows == 0 {
            return 0.0;
        }
        rows as f32 * self.cell + (rows as f32 - 1.0) * GAP + 2.0 * GAP
    }

    /// Cell rectangle in content space (before scrolling).
    pub fn cell_rect(&self, index: usize) -> Rect {
        let col = index % self.columns;
        let row = index / self.columns;
        Rect::new(
            self.origin_x + col as f32 * (self.cell + GAP),
            GAP + row as f32 * (self.cell + GAP),
            self.cell,
            self.cell,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Gallery {
    count: usize,
    width: f32,
    height: f32,
    scroll: f32,
    layout: GridLayout,
}

impl Gallery {
    pub fn new(count: usize, width: f32, height: f32) -> Self {
        Self {
            count,
            width,
            height,
            scroll: 0.0,
            layout: GridLayout::for_width(width),
        }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.layout = GridLayout::for_width(width);
        self.scroll = self.scroll.clamp(0.0, self.max_scroll());
    }

    fn max_scroll(&self) -> f32 {
        (self.layout.content_height(self.count) - self.height).max(0.0)
    }

    /// Scroll by `dy` content pixels, positive moving down the list.
    pub fn scroll_by(&mut self, dy: f32) {
        if !dy.is_finite() {
            return;
        }
        self.scroll = (self.scroll + dy).clamp(0.0, self.max_scroll());
    }

    /// Cell rectangle on screen.
    pub fn cell_rect(&self, index: usize) -> Option<Rect> {
        if index >= self.count {
            return None;
        }
        let mut r = self.layout.cell_rect(index);
        r.y -= self.scroll;
        Some(r)
    }

    /// Indices whose cells intersect the visible area.
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        if self.count == 0 {
            return 0..0;
        }
        let pitch = self.layout.cell + GAP;
        let first_row = ((self.scroll - GAP) / pitch).floor().max(0.0) as usize;
        let last_row = ((self.scroll + self.height - GAP) / pitch).floor().max(0.0) as usize;
        let start = (first_row * self.layout.columns).min(self.count);
        let end = ((last_row + 1) * self.layout.columns).min(self.count);
        start..end
    }

    /// Cell under a screen point; gaps and margins hit nothing.
    pub fn hit_test(&self, p: Point) -> Option<usize> {
        if p.x < 0.0 || p.x >= self.width || p.y < 0.0 || p.y >= self.height {
            return None;
        }
        let content = Point::new(p.x, p.y + self.scroll);
        let pitch = self.layout.cell + GAP;
        let rel_x = content.x - self.layout.origin_x;
        let rel_y = content.y - GAP;
        if rel_x < 0.0 || rel_y < 0.0 {
            return None;
        }
        let col = (rel_x / pitch) as usize;
        let row = (rel_y / pitch) as usize;
        if col >= self.layout.columns {
            return None;
        }
        let index = row * self.layout.columns + col;
        if index >= self.count {
            return None;
        }
        self.layout.cell_rect(index).contains(content).then_some(index)
    }

    /// Open the viewer on the thumbnail under `p`.
    pub fn activate(&self, p: Point, session: &mut ViewerSession) -> bool {
        match self.hit_test(p) {
            Some(index) => {
                log::debug!("[gallery] activate {}", index);
                session.open_index(index)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_auto_fill() {
        assert_eq!(GridLayout::for_width(200.0).columns, 1);
        assert_eq!(GridLayout::for_width(615.0).columns, 1);
        assert_eq!(GridLayout::for_width(616.0).columns, 2);
        assert_eq!(GridLayout::for_width(1000.0).columns, 3);
        assert_eq!(GridLayout::for_width(1200.0).columns, 3);
        assert_eq!(GridLayout::for_width(3000.0).columns, 3);
    }

    #[test]
    fn cells_fill_width_and_centre() {
        let l = GridLayout::for_width(1000.0);
        assert!((l.cell - (1000.0 - 32.0) / 3.0).abs() < 1e-3);
        assert_eq!(l.origin_x, 0.0);

        let wide = GridLayout::for_width(1600.0);
        assert!((wide.cell - (1200.0 - 32.0) / 3.0).abs() < 1e-3);
        assert!((wide.origin_x - 200.0).abs() < 1e-3);
    }

    #[test]
    fn narrow_container_still_has_one_cell() {
        let l = GridLayout::for_width(120.0);
        assert_eq!(l.columns, 1);
        assert_eq!(l.cell, 120.0);
    }

    #[test]
    fn hit_test_maps_cells_and_skips_gaps() {
        let g = Gallery::new(5, 1000.0, 800.0);
        let cell = g.layout().cell;
        assert_eq!(g.hit_test(Point::new(10.0, 20.0)), Some(0));
        assert_eq!(g.hit_test(Point::new(cell + GAP + 5.0, 20.0)), Some(1));
        assert_eq!(g.hit_test(Point::new(cell + GAP / 2.0, 20.0)), None);
        assert_eq!(g.hit_test(Point::new(10.0, GAP + cell + GAP + 1.0)), Some(3));
        // Row 2 only has cells 3 and 4 filled.
        assert_eq!(g.hit_test(Point::new(2.0 * (cell + GAP) + 5.0, GAP + cell + GAP + 1.0)), None);
        assert_eq!(g.hit_test(Point::new(10.0, 5.0)), None);
    }

    #[test]
    fn scrolling_is_clamped_and_shifts_hits() {
        let mut g = Gallery::new(9, 1000.0, 400.0);
        let cell = g.layout().cell;
        g.scroll_by(-50.0);
        assert_eq!(g.scroll(), 0.0);
        g.scroll_by(1e6);
        let max = g.layout().content_height(9) - 400.0;
        assert!((g.scroll() - max).abs() < 1e-3);

        g.scroll_by(-1e6);
        g.scroll_by(cell + GAP);
        assert_eq!(g.hit_test(Point::new(10.0, 20.0)), Some(3));
        let top = g.cell_rect(3).unwrap().y;
        assert!((top - GAP).abs() < 1e-3);
        assert!(g.cell_rect(9).is_none());
    }

    #[test]
    fn visible_range_covers_viewport() {
        let g = Gallery::new(30, 1000.0, 700.0);
        let r = g.visible_range();
        assert_eq!(r.start, 0);
        assert!(r.end >= 6 && r.end <= 9);
        assert_eq!(Gallery::new(0, 1000.0, 700.0).visible_range(), 0..0);
    }
}
