use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use textmark_renderer::{
    BatchSession, CancelToken, Configurable, DEFAULT_ARCHIVE_NAME, ExportOptions, FontReference,
    FontResolver, FsFontStore, InputImage, StyleConfig, StyleProfile, TextColor,
};
use tracing_subscriber::EnvFilter;

/// Draw a line of text onto a batch of images and pack them into a ZIP.
#[derive(Parser, Debug)]
#[command(name = "textmark", version)]
struct Cli {
    /// Input images, exported in the order given.
    #[arg(required_unless_present = "list_fonts")]
    images: Vec<PathBuf>,

    /// Output archive path.
    #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
    out: PathBuf,

    /// Style profile JSON. Explicit flags override its values.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Overlay text.
    #[arg(long)]
    text: Option<String>,

    /// TrueType/OpenType font file.
    #[arg(long, conflicts_with = "font_name")]
    font: Option<PathBuf>,

    /// Directory searched by --font-name and --list-fonts.
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Font file name inside --font-dir.
    #[arg(long, requires = "font_dir")]
    font_name: Option<String>,

    /// Font size in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Text color: hex (#rgb, #rrggbb, #rrggbbaa) or a CSS name.
    #[arg(long)]
    color: Option<String>,

    /// Outline width in pixels. 0 disables the outline.
    #[arg(long)]
    stroke_width: Option<u32>,

    /// Outline color.
    #[arg(long)]
    stroke_color: Option<String>,

    /// Left edge of the text, in pixels.
    #[arg(short = 'x', allow_negative_numbers = true)]
    x: Option<i32>,

    /// Top edge of the text, in pixels.
    #[arg(short = 'y', allow_negative_numbers = true)]
    y: Option<i32>,

    /// Prefix for archive entry names.
    #[arg(long)]
    prefix: Option<String>,

    /// Also write a PNG preview of the first image.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// List fonts in --font-dir and exit.
    #[arg(long, default_value_t = false)]
    list_fonts: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = match &cli.font_dir {
        Some(dir) => FsFontStore::with_root(dir),
        None => FsFontStore::new(),
    };
    let mut session = BatchSession::new(FontResolver::new(store));

    if cli.list_fonts {
        for font in session.list_fonts() {
            println!("{}", font.label());
        }
        return Ok(());
    }

    if let Some(prefix) = &cli.prefix {
        session.set_options(ExportOptions {
            entry_prefix: prefix.clone(),
            ..ExportOptions::default()
        });
    }

    if let Some(path) = &cli.profile {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read profile '{}'", path.display()))?;
        let profile = StyleProfile::from_json(&json)
            .with_context(|| format!("parse profile '{}'", path.display()))?;
        session.apply_profile(&profile)?;
    }
    session.set_style(style_from_flags(&cli, session.style())?);

    let inputs = cli
        .images
        .iter()
        .map(|path| read_input(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    session.set_inputs(inputs);

    if let Some(path) = &cli.preview {
        if let Some(preview) = session.preview()? {
            preview
                .image
                .save_with_format(path, image::ImageFormat::Png)
                .with_context(|| format!("write preview '{}'", path.display()))?;
            eprintln!("wrote preview {}", path.display());
        }
    }

    let report = session.run_batch(
        &mut |p| tracing::debug!(completed = p.completed, total = p.total, "progress"),
        &CancelToken::new(),
    )?;
    if let Some(warning) = &report.font_warning {
        eprintln!("warning: {warning}");
    }

    let artifact = session.download()?;
    if let Some(parent) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&cli.out, &artifact.bytes)
        .with_context(|| format!("write archive '{}'", cli.out.display()))?;

    for failure in &report.summary.failures {
        eprintln!("skipped {}: {}", failure.name, failure.message);
    }
    eprintln!(
        "wrote {} ({} of {} images)",
        cli.out.display(),
        report.summary.succeeded,
        report.summary.total
    );
    Ok(())
}

/// Applies the explicitly given style flags on top of `base`.
fn style_from_flags(cli: &Cli, base: &StyleConfig) -> anyhow::Result<StyleConfig> {
    let mut style = base.clone();

    if let Some(text) = &cli.text {
        style = style.with_text(text.clone());
    }
    if let Some(path) = &cli.font {
        style = style.with_font(FontReference::Path(path.clone()));
    } else if let Some(name) = &cli.font_name {
        style = style.with_font(FontReference::Stored(name.clone()));
    }
    if let Some(size) = cli.size {
        style = style.with_font_size(size)?;
    }
    if let Some(color) = &cli.color {
        style = style.with_text_color(TextColor::parse("text", color)?);
    }
    if cli.stroke_width.is_some() || cli.stroke_color.is_some() {
        let width = cli.stroke_width.unwrap_or(style.stroke_width());
        let color = match &cli.stroke_color {
            Some(color) => TextColor::parse("stroke", color)?,
            None => style.stroke_color(),
        };
        style = style.with_stroke(width, color)?;
    }
    let (x, y) = style.position();
    style = style.with_position(cli.x.unwrap_or(x), cli.y.unwrap_or(y));

    Ok(style)
}

fn read_input(path: &Path) -> anyhow::Result<InputImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(InputImage::new(name, bytes))
}
