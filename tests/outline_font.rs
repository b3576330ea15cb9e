use std::path::PathBuf;

use image::{DynamicImage, Rgba, RgbaImage};
use textmark_renderer::{
    FontReference, FontResolver, FsFontStore, LoadableFont, StyleConfig, TextColor,
    render_overlay, text_bounds,
};

const BLUE: Rgba<u8> = Rgba([20, 40, 200, 255]);

fn fixture_font() -> FontReference {
    FontReference::Path(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf"),
    )
}

fn resolve(size: u32) -> LoadableFont {
    let resolved = FontResolver::new(FsFontStore::new()).resolve(&fixture_font(), size);
    assert!(resolved.warning.is_none(), "{:?}", resolved.warning);
    resolved.font
}

fn canvas() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(160, 80, BLUE))
}

fn style(stroke_width: u32, stroke_color: TextColor) -> StyleConfig {
    StyleConfig::builder("Hello\ngy")
        .font(fixture_font())
        .font_size(24)
        .text_color(TextColor::WHITE)
        .stroke(stroke_width, stroke_color)
        .position(12, 6)
        .build()
        .unwrap()
}

#[test]
fn truetype_file_resolves_to_outline_font() {
    let font = resolve(24);
    assert!(!font.is_bitmap());

    let (width, height) = font.measure("Hello");
    assert!(width > 0 && height > 0);
}

#[test]
fn outline_render_is_repeatable() {
    let font = resolve(24);
    let style = style(2, TextColor::BLACK);
    let image = canvas();

    let first = render_overlay(&image, &style, &font);
    let second = render_overlay(&image, &style, &font);
    assert_eq!(first, second);
    assert_eq!(image.to_rgba8().get_pixel(0, 0), &BLUE);
}

#[test]
fn outline_pixels_stay_inside_text_bounds() {
    let font = resolve(24);
    for stroke_width in [0, 3] {
        let style = style(stroke_width, TextColor::BLACK);
        let bounds = text_bounds(&style, &font);
        let out = render_overlay(&canvas(), &style, &font);

        let mut changed = 0;
        for (x, y, pixel) in out.enumerate_pixels() {
            if *pixel != BLUE {
                assert!(bounds.contains(x as i32, y as i32), "({x}, {y}) outside {bounds:?}");
                changed += 1;
            }
        }
        assert!(changed > 0, "stroke {stroke_width} changed nothing");
    }
}

#[test]
fn outline_zero_stroke_equals_transparent_stroke() {
    let font = resolve(24);
    let plain = render_overlay(&canvas(), &style(0, TextColor::BLACK), &font);
    let clear = render_overlay(&canvas(), &style(5, TextColor::TRANSPARENT), &font);
    assert_eq!(plain, clear);
}
