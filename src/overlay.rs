//! Placement of an overlay inside the displayed image box.

use crate::collection::{OverlayPosition, OverlaySize};
use crate::input::Rect;

/// Box the overlay occupies, in the same space as `image_box`.
///
/// With no size constraints the overlay covers the whole image. Otherwise the
/// explicit width/height are used; a missing one follows the aspect ratio of
/// `natural` (or of the image box when unknown), and the max bounds shrink
/// the result proportionally.
pub fn overlay_rect(
    image_box: Rect,
    position: OverlayPosition,
    size: &OverlaySize,
    natural: Option<(f32, f32)>,
) -> Rect {
    if size.is_unconstrained() {
        return image_box;
    }

    let (nat_w, nat_h) = natural
        .filter(|&(w, h)| w > 0.0 && h > 0.0)
        .unwrap_or((image_box.width, image_box.height));
    let aspect = if nat_h > 0.0 { nat_w / nat_h } else { 1.0 };

    let explicit_w = size.width.map(|d| d.resolve(image_box.width));
    let explicit_h = size.height.map(|d| d.resolve(image_box.height));

    let (mut w, mut h) = match (explicit_w, explicit_h) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, w / aspect),
        (None, Some(h)) => (h * aspect, h),
        (None, None) => (nat_w, nat_h),
    };
    let keep_aspect = explicit_w.is_none() || explicit_h.is_none();

    if let Some(max_w) = size.max_width.map(|d| d.resolve(image_box.width)) {
        if w > max_w {
            if keep_aspect {
                h *= max_w / w;
            }
            w = max_w;
        }
    }
    if let Some(max_h) = size.max_height.map(|d| d.resolve(image_box.height)) {
        if h > max_h {
            if keep_aspect {
                w *= max_h / h;
            }
            h = max_h;
        }
    }

    let left = image_box.x;
    let top = image_box.y;
    let right = image_box.x + image_box.width - w;
    let bottom = image_box.y + image_box.height - h;
    let mid_x = image_box.x + (image_box.width - w) / 2.0;
    let mid_y = image_box.y + (image_box.height - h) / 2.0;

    let (x, y) = match position {
        OverlayPosition::Center => (mid_x, mid_y),
        OverlayPosition::TopLeft => (left, top),
        OverlayPosition::TopRight => (right, top),
        OverlayPosition::BottomLeft => (left, bottom),
        OverlayPosition::BottomRight => (right, bottom),
        OverlayPosition::Top => (mid_x, top),
        OverlayPosition::Bottom => (mid_x, bottom),
        OverlayPosition::Left => (left, mid_y),
        OverlayPosition::Right => (right, mid_y),
    };

    Rect::new(x, y, w, h)
}
