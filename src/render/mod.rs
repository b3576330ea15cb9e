//! Overlay renderer: draws styled text onto a copy of an image.
//!
//! [`render_overlay`] is a pure function. It never touches the caller's
//! image, and the same inputs always give the same pixels. Preview and batch
//! export both go through it, so what the preview shows is what the archive
//! contains.
//!
//! # Anchoring
//!
//! `(x, y)` is the top-left of the first line box:
//! - outline fonts put the baseline at `y + ascent`;
//! - the bitmap font puts the top of its glyph cells at `y`.
//!
//! # Stroke
//!
//! With `stroke_width > 0` the fill coverage is dilated by a disc of that
//! radius to get the stroke coverage. Each pixel's overlay is `fill OVER
//! stroke` in premultiplied alpha, and that single overlay is composited onto
//! the image once. With `stroke_width == 0` no stroke coverage is computed.

pub mod mask;

pub use mask::{CoverageMask, RectPx};

use image::{DynamicImage, Rgba, RgbaImage};

use crate::font::LoadableFont;
use crate::image_item::ImageItem;
use crate::style::{StyleConfig, TextColor};

/// Renders the styled text onto an RGBA copy of `image`.
pub fn render_overlay(image: &DynamicImage, style: &StyleConfig, font: &LoadableFont) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    draw_text_mut(&mut canvas, style, font);
    canvas
}

/// Renders onto a decoded [`ImageItem`].
pub fn render_item(item: &ImageItem, style: &StyleConfig, font: &LoadableFont) -> RgbaImage {
    render_overlay(&item.pixels, style, font)
}

/// Draws the styled text onto `canvas` in place.
pub fn draw_text_mut(canvas: &mut RgbaImage, style: &StyleConfig, font: &LoadableFont) {
    if style.is_blank() {
        return;
    }

    let stroke_width = style.stroke_width();
    let canvas_rect = RectPx::new(0, 0, canvas.width(), canvas.height());
    let (x, y) = style.position();

    let Some(fill) = CoverageMask::rasterize(font, style.text(), x, y, canvas_rect, stroke_width)
    else {
        return;
    };

    if stroke_width == 0 {
        composite_masks(canvas, &fill, style.text_color(), None);
    } else {
        let stroke = fill.dilate(stroke_width);
        composite_masks(
            canvas,
            &fill,
            style.text_color(),
            Some((&stroke, style.stroke_color())),
        );
    }
}

/// Returns the box the styled text occupies, including its stroke.
///
/// The box may extend past the canvas; rendering clips silently.
pub fn text_bounds(style: &StyleConfig, font: &LoadableFont) -> RectPx {
    let (x, y) = style.position();
    let (width, height) = font.measure(style.text());
    RectPx::new(x, y, width, height).expand(style.stroke_width())
}

/// Composites `fill OVER stroke` onto `canvas` in one source-over pass.
///
/// Pixels whose combined overlay alpha is zero are left untouched, so a fully
/// transparent stroke leaves exactly the same pixels as no stroke at all.
fn composite_masks(
    canvas: &mut RgbaImage,
    fill: &CoverageMask,
    fill_color: TextColor,
    stroke: Option<(&CoverageMask, TextColor)>,
) {
    let canvas_rect = RectPx::new(0, 0, canvas.width(), canvas.height());
    let area = fill.bounds().intersect(&canvas_rect);
    if area.is_empty() {
        return;
    }

    let fill_rgb = unit_rgb(fill_color);
    let fill_alpha = fill_color.a as f32 / 255.0;

    for py in area.y..area.bottom() {
        for px in area.x..area.right() {
            let fa = fill.get(px, py) * fill_alpha;
            let mut src_a = fa;
            let mut src = [fill_rgb[0] * fa, fill_rgb[1] * fa, fill_rgb[2] * fa];

            if let Some((stroke_mask, stroke_color)) = stroke {
                let sa = stroke_mask.get(px, py) * (stroke_color.a as f32 / 255.0);
                let under = sa * (1.0 - fa);
                let stroke_rgb = unit_rgb(stroke_color);
                src_a = fa + under;
                src = [
                    src[0] + stroke_rgb[0] * under,
                    src[1] + stroke_rgb[1] * under,
                    src[2] + stroke_rgb[2] * under,
                ];
            }

            if src_a <= 0.0 {
                continue;
            }

            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            *dst = source_over(src, src_a, *dst);
        }
    }
}

fn unit_rgb(color: TextColor) -> [f32; 3] {
    [
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
    ]
}

/// Porter-Duff source-over of a premultiplied source onto a straight pixel.
fn source_over(src: [f32; 3], src_a: f32, dst: Rgba<u8>) -> Rgba<u8> {
    let da = dst[3] as f32 / 255.0;
    let keep = da * (1.0 - src_a);
    let out_a = src_a + keep;

    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: f32, d: u8| -> u8 {
        let out = (s + d as f32 / 255.0 * keep) / out_a;
        (out.clamp(0.0, 1.0) * 255.0).round() as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a.clamp(0.0, 1.0) * 255.0).round() as u8,
    ])
}
