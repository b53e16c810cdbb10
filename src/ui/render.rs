//! Software rasterisation into the softbuffer framebuffer (`0x00RRGGBB`).

use rayon::prelude::*;

use ivgal::input::Rect;

pub const BG_COLOR: [u8; 4] = [31, 31, 31, 255];

pub type Rgba = (u8, u8, u8, u8);

// 5x7 bitmap font covering ASCII 32..127. Each glyph is 5 columns × 7 rows
// packed into 5 bytes (one byte per column, LSB = top row).
static FONT_5X7: [[u8; 5]; 96] = {
    let mut f = [[0u8; 5]; 96];
    // space
    f[0]  = [0x00, 0x00, 0x00, 0x00, 0x00];
    // !
    f[1]  = [0x00, 0x00, 0x5F, 0x00, 0x00];
    // "
    f[2]  = [0x00, 0x07, 0x00, 0x07, 0x00];
    // #
    f[3]  = [0x14, 0x7F, 0x14, 0x7F, 0x14];
    // $
    f[4]  = [0x24, 0x2A, 0x7F, 0x2A, 0x12];
    // %
    f[5]  = [0x23, 0x13, 0x08, 0x64, 0x62];
    // &
    f[6]  = [0x36, 0x49, 0x55, 0x22, 0x50];
    // '
    f[7]  = [0x00, 0x05, 0x03, 0x00, 0x00];
    // (
    f[8]  = [0x00, 0x1C, 0x22, 0x41, 0x00];
    // )
    f[9]  = [0x00, 0x41, 0x22, 0x1C, 0x00];
    // *
    f[10] = [0x14, 0x08, 0x3E, 0x08, 0x14];
    // +
    f[11] = [0x08, 0x08, 0x3E, 0x08, 0x08];
    // ,
    f[12] = [0x00, 0x50, 0x30, 0x00, 0x00];
    // -
    f[13] = [0x08, 0x08, 0x08, 0x08, 0x08];
    // .
    f[14] = [0x00, 0x60, 0x60, 0x00, 0x00];
    // /
    f[15] = [0x20, 0x10, 0x08, 0x04, 0x02];
    // 0
    f[16] = [0x3E, 0x51, 0x49, 0x45, 0x3E];
    // 1
    f[17] = [0x00, 0x42, 0x7F, 0x40, 0x00];
    // 2
    f[18] = [0x42, 0x61, 0x51, 0x49, 0x46];
    // 3
    f[19] = [0x21, 0x41, 0x45, 0x4B, 0x31];
    // 4
    f[20] = [0x18, 0x14, 0x12, 0x7F, 0x10];
    // 5
    f[21] = [0x27, 0x45, 0x45, 0x45, 0x39];
    // 6
    f[22] = [0x3C, 0x4A, 0x49, 0x49, 0x30];
    // 7
    f[23] = [0x01, 0x71, 0x09, 0x05, 0x03];
    // 8
    f[24] = [0x36, 0x49, 0x49, 0x49, 0x36];
    // 9
    f[25] = [0x06, 0x49, 0x49, 0x29, 0x1E];
    // :
    f[26] = [0x00, 0x36, 0x36, 0x00, 0x00];
    // ;
    f[27] = [0x00, 0x56, 0x36, 0x00, 0x00];
    // <
    f[28] = [0x08, 0x14, 0x22, 0x41, 0x00];
    // =
    f[29] = [0x14, 0x14, 0x14, 0x14, 0x14];
    // >
    f[30] = [0x00, 0x41, 0x22, 0x14, 0x08];
    // ?
    f[31] = [0x02, 0x01, 0x51, 0x09, 0x06];
    // @
    f[32] = [0x3E, 0x41, 0x5D, 0x55, 0x1E];
    // A
    f[33] = [0x7E, 0x11, 0x11, 0x11, 0x7E];
    // B
    f[34] = [0x7F, 0x49, 0x49, 0x49, 0x36];
    // C
    f[35] = [0x3E, 0x41, 0x41, 0x41, 0x22];
    // D
    f[36] = [0x7F, 0x41, 0x41, 0x22, 0x1C];
    // E
    f[37] = [0x7F, 0x49, 0x49, 0x49, 0x41];
    // F
    f[38] = [0x7F, 0x09, 0x09, 0x09, 0x01];
    // G
    f[39] = [0x3E, 0x41, 0x49, 0x49, 0x7A];
    // H
    f[40] = [0x7F, 0x08, 0x08, 0x08, 0x7F];
    // I
    f[41] = [0x00, 0x41, 0x7F, 0x41, 0x00];
    // J
    f[42] = [0x20, 0x40, 0x41, 0x3F, 0x01];
    // K
    f[43] = [0x7F, 0x08, 0x14, 0x22, 0x41];
    // L
    f[44] = [0x7F, 0x40, 0x40, 0x40, 0x40];
    // M
    f[45] = [0x7F, 0x02, 0x0C, 0x02, 0x7F];
    // N
    f[46] = [0x7F, 0x04, 0x08, 0x10, 0x7F];
    // O
    f[47] = [0x3E, 0x41, 0x41, 0x41, 0x3E];
    // P
    f[48] = [0x7F, 0x09, 0x09, 0x09, 0x06];
    // Q
    f[49] = [0x3E, 0x41, 0x51, 0x21, 0x5E];
    // R
    f[50] = [0x7F, 0x09, 0x19, 0x29, 0x46];
    // S
    f[51] = [0x46, 0x49, 0x49, 0x49, 0x31];
    // T
    f[52] = [0x01, 0x01, 0x7F, 0x01, 0x01];
    // U
    f[53] = [0x3F, 0x40, 0x40, 0x40, 0x3F];
    // V
    f[54] = [0x1F, 0x20, 0x40, 0x20, 0x1F];
    // W
    f[55] = [0x3F, 0x40, 0x38, 0x40, 0x3F];
    // X
    f[56] = [0x63, 0x14, 0x08, 0x14, 0x63];
    // Y
    f[57] = [0x07, 0x08, 0x70, 0x08, 0x07];
    // Z
    f[58] = [0x61, 0x51, 0x49, 0x45, 0x43];
    // [
    f[59] = [0x00, 0x7F, 0x41, 0x41, 0x00];
    // backslash
    f[60] = [0x02, 0x04, 0x08, 0x10, 0x20];
    // ]
    f[61] = [0x00, 0x41, 0x41, 0x7F, 0x00];
    // ^
    f[62] = [0x04, 0x02, 0x01, 0x02, 0x04];
    // _
    f[63] = [0x40, 0x40, 0x40, 0x40, 0x40];
    // `
    f[64] = [0x00, 0x01, 0x02, 0x04, 0x00];
    // a
    f[65] = [0x20, 0x54, 0x54, 0x54, 0x78];
    // b
    f[66] = [0x7F, 0x48, 0x44, 0x44, 0x38];
    // c
    f[67] = [0x38, 0x44, 0x44, 0x44, 0x20];
    // d
    f[68] = [0x38, 0x44, 0x44, 0x48, 0x7F];
    // e
    f[69] = [0x38, 0x54, 0x54, 0x54, 0x18];
    // f
    f[70] = [0x08, 0x7E, 0x09, 0x01, 0x02];
    // g
    f[71] = [0x0C, 0x52, 0x52, 0x52, 0x3E];
    // h
    f[72] = [0x7F, 0x08, 0x04, 0x04, 0x78];
    // i
    f[73] = [0x00, 0x44, 0x7D, 0x40, 0x00];
    // j
    f[74] = [0x20, 0x40, 0x44, 0x3D, 0x00];
    // k
    f[75] = [0x7F, 0x10, 0x28, 0x44, 0x00];
    // l
    f[76] = [0x00, 0x41, 0x7F, 0x40, 0x00];
    // m
    f[77] = [0x7C, 0x04, 0x18, 0x04, 0x78];
    // n
    f[78] = [0x7C, 0x08, 0x04, 0x04, 0x78];
    // o
    f[79] = [0x38, 0x44, 0x44, 0x44, 0x38];
    // p
    f[80] = [0x7C, 0x14, 0x14, 0x14, 0x08];
    // q
    f[81] = [0x08, 0x14, 0x14, 0x18, 0x7C];
    // r
    f[82] = [0x7C, 0x08, 0x04, 0x04, 0x08];
    // s
    f[83] = [0x48, 0x54, 0x54, 0x54, 0x20];
    // t
    f[84] = [0x04, 0x3F, 0x44, 0x40, 0x20];
    // u
    f[85] = [0x3C, 0x40, 0x40, 0x20, 0x7C];
    // v
    f[86] = [0x1C, 0x20, 0x40, 0x20, 0x1C];
    // w
    f[87] = [0x3C, 0x40, 0x30, 0x40, 0x3C];
    // x
    f[88] = [0x44, 0x28, 0x10, 0x28, 0x44];
    // y
    f[89] = [0x0C, 0x50, 0x50, 0x50, 0x3C];
    // z
    f[90] = [0x44, 0x64, 0x54, 0x4C, 0x44];
    // {
    f[91] = [0x00, 0x08, 0x36, 0x41, 0x00];
    // |
    f[92] = [0x00, 0x00, 0x7F, 0x00, 0x00];
    // }
    f[93] = [0x00, 0x41, 0x36, 0x08, 0x00];
    // ~
    f[94] = [0x10, 0x08, 0x08, 0x10, 0x08];
    // DEL (blank)
    f[95] = [0x00, 0x00, 0x00, 0x00, 0x00];
    f
};

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

fn unpack_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

/// Source-over blend of `color` onto one framebuffer pixel.
#[inline]
fn blend(px: &mut u32, color: Rgba) {
    let a = color.3 as u32;
    if a == 255 {
        *px = rgb(color.0, color.1, color.2);
        return;
    }
    if a == 0 {
        return;
    }
    let inv = 255 - a;
    let (dr, dg, db) = unpack_rgb(*px);
    let r = ((color.0 as u32 * a + dr as u32 * inv) / 255) as u8;
    let g = ((color.1 as u32 * a + dg as u32 * inv) / 255) as u8;
    let b = ((color.2 as u32 * a + db as u32 * inv) / 255) as u8;
    *px = rgb(r, g, b);
}

fn draw_char(buf: &mut [u32], stride: u32, buf_h: u32, ch: char, px: i32, py: i32, scale: u32, color: Rgba) {
    let idx = (ch as u32).wrapping_sub(32) as usize;
    if idx >= 96 {
        return;
    }
    let glyph = &FONT_5X7[idx];
    for col in 0..5u32 {
        let bits = glyph[col as usize];
        for row in 0..7u32 {
            if bits & (1 << row) == 0 {
                continue;
            }
            for sy in 0..scale {
                for sx in 0..scale {
                    let x = px + (col * scale + sx) as i32;
                    let y = py + (row * scale + sy) as i32;
                    if x >= 0 && y >= 0 && (x as u32) < stride && (y as u32) < buf_h {
                        blend(&mut buf[(y as u32 * stride + x as u32) as usize], color);
                    }
                }
            }
        }
    }
}

/// Draw a string. Returns the x position after the last character.
pub fn draw_text(buf: &mut [u32], stride: u32, buf_h: u32, text: &str, px: i32, py: i32, scale: u32, color: Rgba) -> i32 {
    let mut x = px;
    for ch in text.chars() {
        draw_char(buf, stride, buf_h, ch, x, py, scale, color);
        x += (6 * scale) as i32; // 5 pixels + 1 spacing
    }
    x
}

/// Pixel width of `text` at `scale`.
pub fn text_width(text: &str, scale: u32) -> i32 {
    (text.chars().count() as u32 * 6 * scale) as i32
}

/// Fill a rectangle with a color (with alpha blending).
pub fn fill_rect(buf: &mut [u32], stride: u32, buf_h: u32, rx: i32, ry: i32, rw: u32, rh: u32, color: Rgba) {
    let x0 = rx.max(0) as u32;
    let x1 = (rx + rw as i32).clamp(0, stride as i32) as u32;
    for row in 0..rh {
        let y = ry + row as i32;
        if y < 0 || y as u32 >= buf_h {
            continue;
        }
        let line = y as u32 * stride;
        for x in x0..x1 {
            blend(&mut buf[(line + x) as usize], color);
        }
    }
}

pub fn fill(buf: &mut [u32], stride: u32, buf_h: u32, r: Rect, color: Rgba) {
    fill_rect(
        buf,
        stride,
        buf_h,
        r.x.round() as i32,
        r.y.round() as i32,
        r.width.max(0.0).round() as u32,
        r.height.max(0.0).round() as u32,
        color,
    );
}

/// Centred label inside `r`.
pub fn draw_label(buf: &mut [u32], stride: u32, buf_h: u32, r: Rect, text: &str, scale: u32, color: Rgba) {
    let x = (r.x + r.width / 2.0) as i32 - text_width(text, scale) / 2;
    let y = (r.y + r.height / 2.0) as i32 - (7 * scale as i32) / 2;
    draw_text(buf, stride, buf_h, text, x, y, scale, color);
}

pub fn fit_scale(img_w: f32, img_h: f32, win_w: f32, win_h: f32) -> f32 {
    (win_w / img_w).min(win_h / img_h)
}

// ---------------------------------------------------------------------------
// Image blits
// ---------------------------------------------------------------------------

/// Screen placement of an image box: translate, then rotate, then scale
/// about `origin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: (f32, f32),
    pub rotate_deg: f32,
    pub scale: f32,
}

/// Exact values at quarter turns so axis-aligned blits have no seams.
fn sin_cos_deg(deg: f32) -> (f32, f32) {
    let r = deg.rem_euclid(360.0);
    if r == 0.0 {
        (0.0, 1.0)
    } else if r == 90.0 {
        (1.0, 0.0)
    } else if r == 180.0 {
        (0.0, -1.0)
    } else if r == 270.0 {
        (-1.0, 0.0)
    } else {
        r.to_radians().sin_cos()
    }
}

impl Placement {
    /// Screen position of a box-local point.
    pub fn map(&self, lx: f32, ly: f32) -> (f32, f32) {
        let (sin, cos) = sin_cos_deg(self.rotate_deg);
        let (x, y) = (lx * self.scale, ly * self.scale);
        (self.origin.0 + x * cos - y * sin, self.origin.1 + x * sin + y * cos)
    }

    /// Axis-aligned screen bounds of the box-local rectangle `local`.
    pub fn bounds(&self, local: Rect) -> Rect {
        let corners = [
            self.map(local.x, local.y),
            self.map(local.x + local.width, local.y),
            self.map(local.x, local.y + local.height),
            self.map(local.x + local.width, local.y + local.height),
        ];
        let (mut x0, mut y0, mut x1, mut y1) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for (x, y) in corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Pixel range of `r` clipped to `clip` and the framebuffer.
fn pixel_span(r: Rect, clip: Rect, dst_w: u32, dst_h: u32) -> Option<(usize, usize, usize, usize)> {
    let x0 = r.x.max(clip.x).max(0.0).floor() as usize;
    let y0 = r.y.max(clip.y).max(0.0).floor() as usize;
    let x1 = (r.x + r.width).min(clip.x + clip.width).min(dst_w as f32).ceil().max(0.0) as usize;
    let y1 = (r.y + r.height).min(clip.y + clip.height).min(dst_h as f32).ceil().max(0.0) as usize;
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

#[inline]
fn sample(src: &[u8], src_w: u32, src_h: u32, u: f32, v: f32) -> Rgba {
    let sx = ((u * src_w as f32) as u32).min(src_w - 1) as usize;
    let sy = ((v * src_h as f32) as u32).min(src_h - 1) as usize;
    let si = (sy * src_w as usize + sx) * 4;
    (src[si], src[si + 1], src[si + 2], src[si + 3])
}

/// Draw RGBA `src` stretched over the box-local rectangle `local`, placed by
/// `xf`, nearest-neighbour sampled. Rows are rasterised in parallel.
pub fn blit_transformed(
    dst: &mut [u32], dst_w: u32, dst_h: u32, clip: Rect,
    src: &[u8], src_w: u32, src_h: u32,
    local: Rect, xf: &Placement,
) {
    if src_w == 0 || src_h == 0 || src.len() < (src_w * src_h * 4) as usize {
        return;
    }
    if xf.scale <= 0.0 || local.width <= 0.0 || local.height <= 0.0 {
        return;
    }
    let Some((x0, y0, x1, y1)) = pixel_span(xf.bounds(local), clip, dst_w, dst_h) else {
        return;
    };
    let (sin, cos) = sin_cos_deg(xf.rotate_deg);
    let inv = 1.0 / xf.scale;
    let (ox, oy) = xf.origin;

    dst.par_chunks_mut(dst_w as usize)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5 - oy;
            for (x, px) in row.iter_mut().enumerate().take(x1).skip(x0) {
                let dx = x as f32 + 0.5 - ox;
                let lx = (dx * cos + py * sin) * inv;
                let ly = (-dx * sin + py * cos) * inv;
                let u = (lx - local.x) / local.width;
                let v = (ly - local.y) / local.height;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                blend(px, sample(src, src_w, src_h, u, v));
            }
        });
}

/// Draw `src` scaled to cover `rect` with the overflow cropped equally on
/// both sides.
pub fn blit_cover(
    dst: &mut [u32], dst_w: u32, dst_h: u32, clip: Rect,
    src: &[u8], src_w: u32, src_h: u32,
    rect: Rect,
) {
    if src_w == 0 || src_h == 0 || src.len() < (src_w * src_h * 4) as usize {
        return;
    }
    let scale = (rect.width / src_w as f32).max(rect.height / src_h as f32);
    if !(scale > 0.0) {
        return;
    }
    let drawn_w = src_w as f32 * scale;
    let drawn_h = src_h as f32 * scale;
    let left = rect.x + (rect.width - drawn_w) / 2.0;
    let top = rect.y + (rect.height - drawn_h) / 2.0;
    let Some((x0, y0, x1, y1)) = pixel_span(rect, clip, dst_w, dst_h) else {
        return;
    };

    dst.par_chunks_mut(dst_w as usize)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5 - top) / drawn_h;
            if !(0.0..1.0).contains(&v) {
                return;
            }
            for (x, px) in row.iter_mut().enumerate().take(x1).skip(x0) {
                let u = (x as f32 + 0.5 - left) / drawn_w;
                if (0.0..1.0).contains(&u) {
                    blend(px, sample(src, src_w, src_h, u, v));
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0xFF0000;
    const BLUE: u32 = 0x0000FF;

    // 2x1: red then blue.
    const STRIP: [u8; 8] = [255, 0, 0, 255, 0, 0, 255, 255];
    const EVERYWHERE: Rect = Rect::new(0.0, 0.0, 1e6, 1e6);

    #[test]
    fn fill_rect_blends_and_clips() {
        let mut buf = vec![rgb(0, 0, 0); 4];
        fill_rect(&mut buf, 2, 2, -1, 1, 2, 5, (255, 255, 255, 255));
        assert_eq!(buf, vec![0, 0, 0xFFFFFF, 0]);
        fill_rect(&mut buf, 2, 2, 0, 0, 1, 1, (200, 100, 0, 0));
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn unrotated_blit_copies_pixels() {
        let mut dst = vec![0u32; 16];
        let xf = Placement { origin: (2.0, 2.0), rotate_deg: 0.0, scale: 1.0 };
        let local = Rect::new(-1.0, -0.5, 2.0, 1.0);
        blit_transformed(&mut dst, 4, 4, EVERYWHERE, &STRIP, 2, 1, local, &xf);
        assert_eq!(dst[4 + 1], RED);
        assert_eq!(dst[4 + 2], BLUE);
        assert_eq!(dst[8 + 1], 0);
    }

    #[test]
    fn quarter_turn_puts_left_edge_on_top() {
        let mut dst = vec![0u32; 16];
        let xf = Placement { origin: (2.0, 2.0), rotate_deg: 90.0, scale: 1.0 };
        let local = Rect::new(-1.0, -0.5, 2.0, 1.0);
        blit_transformed(&mut dst, 4, 4, EVERYWHERE, &STRIP, 2, 1, local, &xf);
        assert_eq!(dst[4 + 2], RED);
        assert_eq!(dst[8 + 2], BLUE);
        assert_eq!(dst[4 + 1], 0);
        assert_eq!(xf.bounds(local), Rect::new(1.5, 1.0, 1.0, 2.0));
    }

    #[test]
    fn clip_limits_blit() {
        let mut dst = vec![0u32; 16];
        let xf = Placement { origin: (2.0, 2.0), rotate_deg: 0.0, scale: 2.0 };
        let local = Rect::new(-1.0, -0.5, 2.0, 1.0);
        blit_transformed(&mut dst, 4, 4, Rect::new(0.0, 0.0, 2.0, 4.0), &STRIP, 2, 1, local, &xf);
        assert_eq!(dst[4], RED);
        assert_eq!(dst[4 + 2], 0);
    }

    #[test]
    fn cover_crops_long_side() {
        let mut dst = vec![0u32; 4];
        blit_cover(&mut dst, 2, 2, EVERYWHERE, &STRIP, 2, 1, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(dst, vec![RED, BLUE, RED, BLUE]);
    }
}
