use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use textmark_renderer::{
    BatchSession, CacheState, CancelToken, ErrorKind, FontReference, FontWarning, InputImage,
    LoadableFont, SessionError, StyleConfig, TextColor, read_entries, text_bounds,
};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

fn encoded(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn red_png(name: &str, size: u32) -> InputImage {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(size, size, RED));
    InputImage::new(name, encoded(img, ImageFormat::Png))
}

fn hello_style() -> StyleConfig {
    StyleConfig::builder("Hello")
        .font_size(20)
        .text_color(TextColor::WHITE)
        .stroke(2, TextColor::BLACK)
        .position(10, 10)
        .build()
        .unwrap()
}

fn session_with(inputs: Vec<InputImage>) -> BatchSession {
    let mut session = BatchSession::default();
    session.set_style(hello_style());
    session.set_inputs(inputs);
    session
}

fn run_and_download(session: &mut BatchSession) -> Vec<(String, Vec<u8>)> {
    session.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();
    read_entries(&session.download().unwrap().bytes).unwrap()
}

#[test]
fn single_png_end_to_end() {
    let mut session = session_with(vec![red_png("a.png", 100)]);
    let entries = run_and_download(&mut session);

    assert_eq!(entries.len(), 1);
    let (name, bytes) = &entries[0];
    assert_eq!(name, "edited_a.png");
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Png);

    let out = image::load_from_memory(bytes).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (100, 100));

    let bounds = text_bounds(&hello_style(), &LoadableFont::bitmap(20));
    let mut changed = 0;
    for (x, y, pixel) in out.enumerate_pixels() {
        if *pixel != RED {
            assert!(bounds.contains(x as i32, y as i32), "({x}, {y}) outside {bounds:?}");
            changed += 1;
        }
    }
    assert!(changed > 0, "text must change some pixels");
}

#[test]
fn jpeg_input_stays_jpeg() {
    let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([30, 90, 200])));
    let input = InputImage::new("photo.jpg", encoded(photo, ImageFormat::Jpeg));
    let mut session = session_with(vec![input]);

    let entries = run_and_download(&mut session);
    let (name, bytes) = &entries[0];
    assert_eq!(name, "edited_photo.jpg");
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Jpeg);
    assert_eq!(image::load_from_memory(bytes).unwrap().dimensions(), (64, 48));
}

#[test]
fn one_bad_item_does_not_sink_the_batch() {
    let inputs = vec![
        red_png("1.png", 32),
        red_png("2.png", 32),
        InputImage::new("3.png", b"definitely not an image".to_vec()),
        red_png("4.png", 32),
        red_png("5.png", 32),
    ];
    let mut session = session_with(inputs);
    let report = session.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();

    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.failures[0].name, "3.png");
    assert_eq!(report.summary.failures[0].kind, ErrorKind::Decode);

    let names: Vec<String> = read_entries(&session.download().unwrap().bytes)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(
        names,
        vec!["edited_1.png", "edited_2.png", "edited_4.png", "edited_5.png"]
    );
}

#[test]
fn identical_runs_give_identical_archives() {
    let inputs = || vec![red_png("a.png", 40), red_png("b.png", 24)];

    let mut first = session_with(inputs());
    first.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();
    let mut second = session_with(inputs());
    second.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();

    let a = first.download().unwrap();
    let b = second.download().unwrap();
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.bytes, b.bytes);
}

#[test]
fn duplicate_upload_names_are_disambiguated() {
    let mut session = session_with(vec![
        red_png("a.png", 16),
        red_png("a.png", 16),
        red_png("a.png", 16),
    ]);
    let names: Vec<String> = run_and_download(&mut session)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["edited_a.png", "edited_a-2.png", "edited_a-3.png"]);
}

#[test]
fn cancel_mid_run_returns_partial_and_blocks_download() {
    let mut session = session_with((0..4).map(|i| red_png(&format!("{i}.png"), 16)).collect());
    let cancel = CancelToken::new();
    let signal = cancel.clone();

    let report = session
        .run_batch(
            &mut |p| {
                if p.completed == 2 {
                    signal.cancel();
                }
            },
            &cancel,
        )
        .unwrap();

    let partial = report.cancelled.expect("cancelled run carries its partial archive");
    assert_eq!(partial.entries, vec!["edited_0.png", "edited_1.png"]);
    assert!(partial.is_partial());
    assert_eq!(session.state(), CacheState::Invalid);
    assert!(matches!(session.download(), Err(SessionError::StaleArtifact)));
}

#[test]
fn changing_font_size_after_run_rejects_download() {
    let mut session = session_with(vec![red_png("a.png", 50)]);
    session.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();
    assert_eq!(session.state(), CacheState::Valid);

    session.set_font_size(21).unwrap();
    assert_eq!(session.state(), CacheState::Invalid);
    assert!(matches!(session.download(), Err(SessionError::StaleArtifact)));
}

#[test]
fn corrupt_uploaded_font_still_renders() {
    let mut session = session_with(vec![red_png("a.png", 60)]);
    session.set_font(FontReference::from_bytes("broken.ttf", b"not a font".to_vec()));

    let preview = session.preview().unwrap().unwrap();
    assert!(matches!(preview.warning, Some(FontWarning::LoadFailed { .. })));
    assert!(preview.image.pixels().any(|p| *p != RED));

    let report = session.run_batch(&mut |_| {}, &CancelToken::new()).unwrap();
    assert!(matches!(report.font_warning, Some(FontWarning::LoadFailed { .. })));
    assert_eq!(report.summary.succeeded, 1);
}

#[test]
fn zero_stroke_equals_transparent_stroke_end_to_end() {
    let mut plain = session_with(vec![red_png("a.png", 80)]);
    plain.set_stroke(0, TextColor::BLACK).unwrap();
    let mut clear = session_with(vec![red_png("a.png", 80)]);
    clear.set_stroke(4, TextColor::TRANSPARENT).unwrap();

    let a = run_and_download(&mut plain);
    let b = run_and_download(&mut clear);
    assert_eq!(a, b);
}
