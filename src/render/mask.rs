//! Coverage masks for glyph fill and stroke.
//!
//! A [`CoverageMask`] holds per-pixel coverage in `0.0..=1.0` over a
//! rectangle in canvas coordinates. Masks are sized to the text plus its
//! stroke and clipped to the canvas, so large photos with small captions
//! stay cheap and no mask outgrows the image it is drawn on.

use crate::font::LoadableFont;

/// A rectangle in signed pixel coordinates.
///
/// Unlike the canvas, it may extend past any edge. Edge maths saturates at
/// the `i32` range, so rectangles near the extremes shrink instead of
/// wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn span(from: i32, to: i64) -> u32 {
    (to - from as i64).clamp(0, u32::MAX as i64) as u32
}

impl RectPx {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        saturate(self.x as i64 + self.width as i64)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        saturate(self.y as i64 + self.height as i64)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Grows the rectangle by `pad` pixels on every side.
    pub fn expand(&self, pad: u32) -> Self {
        let pad = pad as i64;
        let x = saturate(self.x as i64 - pad);
        let y = saturate(self.y as i64 - pad);
        Self {
            x,
            y,
            width: span(x, self.x as i64 + self.width as i64 + pad),
            height: span(y, self.y as i64 + self.height as i64 + pad),
        }
    }

    pub fn intersect(&self, other: &Self) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Self::new(x, y, 0, 0);
        }
        Self::new(x, y, span(x, right as i64), span(y, bottom as i64))
    }
}

/// Per-pixel coverage over a [`RectPx`].
///
/// `halo` keeps coverage that lies outside `bounds` but close enough to
/// reach into it when dilated, such as glyph pixels just off the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    bounds: RectPx,
    data: Vec<f32>,
    halo: Vec<(i32, i32, f32)>,
}

impl CoverageMask {
    /// Creates an empty (all zero) mask over `bounds`.
    pub fn empty(bounds: RectPx) -> Self {
        Self {
            bounds,
            data: vec![0.0; bounds.width as usize * bounds.height as usize],
            halo: Vec::new(),
        }
    }

    /// Rasterizes `text` with its line box anchored at `(x, y)`.
    ///
    /// The mask covers the tight box around the glyph coverage grown by
    /// `pad`, clipped to `canvas`, so it is never larger than the canvas.
    /// Coverage within `pad` of the canvas but outside it is kept in the
    /// halo for [`dilate`](Self::dilate). Returns `None` if nothing lands
    /// on or near the canvas.
    pub fn rasterize(
        font: &LoadableFont,
        text: &str,
        x: i32,
        y: i32,
        canvas: RectPx,
        pad: u32,
    ) -> Option<Self> {
        let reach = canvas.expand(pad);
        let mut points: Vec<(i32, i32, f32)> = Vec::new();
        font.rasterize(text, x, y, &mut |px, py, coverage| {
            if coverage > 0.0 && reach.contains(px, py) {
                points.push((px, py, coverage.min(1.0)));
            }
        });
        if points.is_empty() {
            return None;
        }

        let (min_x, min_y, max_x, max_y) = points.iter().fold(
            (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
            |(x0, y0, x1, y1), &(px, py, _)| (x0.min(px), y0.min(py), x1.max(px), y1.max(py)),
        );
        let tight = RectPx::new(
            min_x,
            min_y,
            span(min_x, max_x as i64 + 1),
            span(min_y, max_y as i64 + 1),
        );
        let bounds = tight.expand(pad).intersect(&canvas);
        if bounds.is_empty() {
            return None;
        }

        let mut mask = Self::empty(bounds);
        for (px, py, coverage) in points {
            if bounds.contains(px, py) {
                mask.raise(px, py, coverage);
            } else {
                mask.halo.push((px, py, coverage));
            }
        }
        Some(mask)
    }

    pub fn bounds(&self) -> RectPx {
        self.bounds
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let col = x - self.bounds.x as i64;
        let row = y - self.bounds.y as i64;
        if col < 0 || row < 0 || col >= self.bounds.width as i64 || row >= self.bounds.height as i64 {
            return None;
        }
        Some(row as usize * self.bounds.width as usize + col as usize)
    }

    /// Coverage at canvas position `(x, y)`; zero outside the mask.
    pub fn get(&self, x: i32, y: i32) -> f32 {
        self.index(x as i64, y as i64).map_or(0.0, |i| self.data[i])
    }

    /// Sets coverage to the max of its current value and `coverage`.
    fn raise(&mut self, x: i32, y: i32, coverage: f32) {
        if let Some(i) = self.index(x as i64, y as i64) {
            let slot = &mut self.data[i];
            *slot = slot.max(coverage);
        }
    }

    /// Returns true if no pixel has coverage.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&c| c == 0.0)
    }

    /// Grayscale dilation with a disc of the given radius.
    ///
    /// Each output pixel takes the maximum coverage of this mask and its halo
    /// within Euclidean distance `radius`. The result shares this mask's
    /// bounds and has no halo.
    pub fn dilate(&self, radius: u32) -> Self {
        let mut out = Self::empty(self.bounds);
        if self.bounds.is_empty() {
            return out;
        }

        // Beyond the mask's own extent a larger disc covers nothing new.
        let extent = self.bounds.width as i64 + self.bounds.height as i64 + self.halo_extent();
        let r = (radius as i64).min(extent);
        let spans: Vec<(i64, i64)> = (-r..=r)
            .map(|dy| (dy, ((r * r - dy * dy) as f64).sqrt().floor() as i64))
            .collect();

        let (bx, by) = (self.bounds.x as i64, self.bounds.y as i64);
        let (bw, bh) = (self.bounds.width as i64, self.bounds.height as i64);

        let inside = self.data.iter().enumerate().filter(|(_, c)| **c > 0.0).map(|(i, &c)| {
            let i = i as i64;
            (bx + i % bw, by + i / bw, c)
        });
        let outside = self.halo.iter().map(|&(x, y, c)| (x as i64, y as i64, c));

        for (cx, cy, coverage) in inside.chain(outside) {
            for &(dy, half) in &spans {
                let row = cy + dy - by;
                if row < 0 || row >= bh {
                    continue;
                }
                let from = (cx - half - bx).max(0);
                let to = (cx + half - bx).min(bw - 1);
                for col in from..=to {
                    let slot = &mut out.data[(row * bw + col) as usize];
                    *slot = slot.max(coverage);
                }
            }
        }
        out
    }

    /// Farthest distance, per axis summed, from the bounds to any halo point.
    fn halo_extent(&self) -> i64 {
        let (left, top) = (self.bounds.x as i64, self.bounds.y as i64);
        let (right, bottom) = (self.bounds.right() as i64, self.bounds.bottom() as i64);
        self.halo
            .iter()
            .map(|&(x, y, _)| {
                let (x, y) = (x as i64, y as i64);
                let dx = (left - x).max(x - right + 1).max(0);
                let dy = (top - y).max(y - bottom + 1).max(0);
                dx + dy
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let a = RectPx::new(-5, -5, 10, 10);
        let b = RectPx::new(0, 0, 100, 100);
        assert_eq!(a.intersect(&b), RectPx::new(0, 0, 5, 5));
        assert!(RectPx::new(200, 0, 5, 5).intersect(&b).is_empty());
        assert_eq!(a.expand(2), RectPx::new(-7, -7, 14, 14));
    }

    #[test]
    fn rect_edges_saturate_near_i32_limits() {
        let far = RectPx::new(i32::MAX - 3, i32::MIN + 1, 100, 100);
        assert_eq!(far.right(), i32::MAX);
        assert!(far.contains(i32::MAX - 1, i32::MIN + 50));

        let grown = far.expand(u32::MAX);
        assert_eq!(grown.x, i32::MIN);
        assert_eq!(grown.y, i32::MIN);
        assert_eq!(grown.right(), i32::MAX);

        let canvas = RectPx::new(0, 0, 32, 32);
        assert!(far.intersect(&canvas).is_empty());
        assert_eq!(grown.intersect(&canvas), canvas);
    }

    #[test]
    fn mask_never_exceeds_canvas_for_wide_stroke() {
        let font = LoadableFont::bitmap(8);
        let canvas = RectPx::new(0, 0, 32, 32);
        let mask = CoverageMask::rasterize(&font, "I", 4, 4, canvas, 50_000).unwrap();
        assert_eq!(mask.bounds(), canvas);

        let stroke = mask.dilate(50_000);
        assert_eq!(stroke.bounds(), canvas);
        assert_eq!(stroke.get(31, 31), 1.0);
    }

    #[test]
    fn rasterize_at_extreme_position_is_none() {
        let font = LoadableFont::bitmap(20);
        let canvas = RectPx::new(0, 0, 32, 32);
        assert!(CoverageMask::rasterize(&font, "HI", i32::MAX - 3, 0, canvas, 2).is_none());
        assert!(CoverageMask::rasterize(&font, "HI", i32::MIN, i32::MIN, canvas, 2).is_none());
    }

    #[test]
    fn offscreen_coverage_is_kept_for_dilation() {
        let font = LoadableFont::bitmap(8);
        let canvas = RectPx::new(0, 0, 16, 16);
        // 'I' lights columns 1..=3 of its cell, so x = -3..=-1 here.
        let mask = CoverageMask::rasterize(&font, "I", -4, 2, canvas, 3).unwrap();
        assert!(mask.bounds().x >= 0);
        assert!(mask.is_blank());
        assert!(!mask.dilate(3).is_blank());
    }

    #[test]
    fn rasterize_blank_text_is_none() {
        let font = LoadableFont::bitmap(8);
        let clip = RectPx::new(0, 0, 50, 50);
        assert!(CoverageMask::rasterize(&font, "  ", 0, 0, clip, 0).is_none());
        assert!(CoverageMask::rasterize(&font, "", 0, 0, clip, 0).is_none());
    }

    #[test]
    fn rasterize_clips_to_canvas() {
        let font = LoadableFont::bitmap(8);
        let clip = RectPx::new(0, 0, 20, 20);
        assert!(CoverageMask::rasterize(&font, "HI", 500, 500, clip, 0).is_none());

        let mask = CoverageMask::rasterize(&font, "HI", -3, 2, clip, 1).unwrap();
        assert!(mask.bounds().x >= 0);
        assert_eq!(mask.get(-1, 3), 0.0);
    }

    #[test]
    fn dilate_grows_single_pixel_into_disc() {
        let mut mask = CoverageMask::empty(RectPx::new(0, 0, 7, 7));
        mask.raise(3, 3, 0.5);
        let grown = mask.dilate(2);

        assert_eq!(grown.get(3, 3), 0.5);
        assert_eq!(grown.get(5, 3), 0.5);
        assert_eq!(grown.get(3, 1), 0.5);
        // (5, 5) is sqrt(8) away, outside radius 2
        assert_eq!(grown.get(5, 5), 0.0);
        assert_eq!(grown.get(4, 4), 0.5);
    }

    #[test]
    fn dilate_zero_radius_is_identity() {
        let font = LoadableFont::bitmap(16);
        let clip = RectPx::new(0, 0, 40, 40);
        let mask = CoverageMask::rasterize(&font, "A", 2, 2, clip, 0).unwrap();
        assert_eq!(mask.dilate(0), mask);
    }
}
