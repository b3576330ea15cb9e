//! Built-in 5x7 bitmap font used when no outline font can be loaded.
//!
//! Glyphs cover printable ASCII. Each glyph is five column bytes with the
//! least significant bit at the top row. Characters outside the table draw
//! as `?`.

/// Glyph cell width in font units.
pub const GLYPH_WIDTH: u32 = 5;
/// Glyph cell height in font units.
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, including one unit of spacing.
pub const ADVANCE: u32 = GLYPH_WIDTH + 1;
/// Vertical advance per line.
pub const LINE_HEIGHT: u32 = GLYPH_HEIGHT + 1;

const FIRST: u32 = 0x20;

#[rustfmt::skip]
static GLYPHS: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7F, 0x14, 0x7F, 0x14], // #
    [0x24, 0x2A, 0x7F, 0x2A, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1C, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1C, 0x00], // )
    [0x08, 0x2A, 0x1C, 0x2A, 0x08], // *
    [0x08, 0x08, 0x3E, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3E, 0x51, 0x49, 0x45, 0x3E], // 0
    [0x00, 0x42, 0x7F, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4B, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7F, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3C, 0x4A, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1E], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3E], // @
    [0x7E, 0x11, 0x11, 0x11, 0x7E], // A
    [0x7F, 0x49, 0x49, 0x49, 0x36], // B
    [0x3E, 0x41, 0x41, 0x41, 0x22], // C
    [0x7F, 0x41, 0x41, 0x22, 0x1C], // D
    [0x7F, 0x49, 0x49, 0x49, 0x41], // E
    [0x7F, 0x09, 0x09, 0x09, 0x01], // F
    [0x3E, 0x41, 0x49, 0x49, 0x7A], // G
    [0x7F, 0x08, 0x08, 0x08, 0x7F], // H
    [0x00, 0x41, 0x7F, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3F, 0x01], // J
    [0x7F, 0x08, 0x14, 0x22, 0x41], // K
    [0x7F, 0x40, 0x40, 0x40, 0x40], // L
    [0x7F, 0x02, 0x0C, 0x02, 0x7F], // M
    [0x7F, 0x04, 0x08, 0x10, 0x7F], // N
    [0x3E, 0x41, 0x41, 0x41, 0x3E], // O
    [0x7F, 0x09, 0x09, 0x09, 0x06], // P
    [0x3E, 0x41, 0x51, 0x21, 0x5E], // Q
    [0x7F, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7F, 0x01, 0x01], // T
    [0x3F, 0x40, 0x40, 0x40, 0x3F], // U
    [0x1F, 0x20, 0x40, 0x20, 0x1F], // V
    [0x3F, 0x40, 0x38, 0x40, 0x3F], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7F, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7F, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7F, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7F], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7E, 0x09, 0x01, 0x02], // f
    [0x0C, 0x52, 0x52, 0x52, 0x3E], // g
    [0x7F, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7D, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3D, 0x00], // j
    [0x7F, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7F, 0x40, 0x00], // l
    [0x7C, 0x04, 0x18, 0x04, 0x78], // m
    [0x7C, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7C, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7C], // q
    [0x7C, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3F, 0x44, 0x40, 0x20], // t
    [0x3C, 0x40, 0x40, 0x20, 0x7C], // u
    [0x1C, 0x20, 0x40, 0x20, 0x1C], // v
    [0x3C, 0x40, 0x30, 0x40, 0x3C], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0C, 0x50, 0x50, 0x50, 0x3C], // y
    [0x44, 0x64, 0x54, 0x4C, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7F, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x10, 0x08, 0x08, 0x10, 0x08], // ~
];

/// The built-in bitmap font at a fixed integer pixel scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapFont {
    scale: u32,
}

impl BitmapFont {
    /// Picks the pixel scale for a requested font size.
    ///
    /// One font unit becomes `max(1, size / LINE_HEIGHT)` pixels, so the
    /// line height tracks the requested size as closely as whole pixels allow.
    pub fn for_size(size: u32) -> Self {
        Self {
            scale: (size / LINE_HEIGHT).max(1),
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns the pixel size of `text` as `(width, height)`.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        let lines: Vec<&str> = text.split('\n').collect();
        let widest = lines
            .iter()
            .map(|line| line.chars().count() as u32)
            .max()
            .unwrap_or(0);
        let width = if widest == 0 {
            0
        } else {
            widest.saturating_mul(ADVANCE).saturating_sub(1).saturating_mul(self.scale)
        };
        let height = (lines.len() as u32)
            .saturating_mul(LINE_HEIGHT)
            .saturating_sub(1)
            .saturating_mul(self.scale);
        (width, height)
    }

    /// Calls `plot(x, y, coverage)` for every lit pixel of `text`, with the
    /// top-left of the first glyph cell at `(x, y)`.
    ///
    /// Pixels that would fall outside the `i32` coordinate range are skipped.
    pub fn rasterize(&self, text: &str, x: i32, y: i32, plot: &mut dyn FnMut(i32, i32, f32)) {
        let s = self.scale as i64;
        let line_step = LINE_HEIGHT as i64 * s;
        let advance = ADVANCE as i64 * s;

        for (line_idx, line) in text.split('\n').enumerate() {
            let top = y as i64 + line_idx as i64 * line_step;
            if top > i32::MAX as i64 {
                break;
            }
            for (char_idx, ch) in line.chars().enumerate() {
                let left = x as i64 + char_idx as i64 * advance;
                if left > i32::MAX as i64 {
                    break;
                }
                for (col, bits) in glyph(ch).iter().enumerate() {
                    for row in 0..GLYPH_HEIGHT as i64 {
                        if bits & (1 << row) == 0 {
                            continue;
                        }
                        let px = left + col as i64 * s;
                        let py = top + row * s;
                        for dy in 0..s {
                            for dx in 0..s {
                                if let (Ok(gx), Ok(gy)) =
                                    (i32::try_from(px + dx), i32::try_from(py + dy))
                                {
                                    plot(gx, gy, 1.0);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> &'static [u8; 5] {
    let code = ch as u32;
    if ch == '\t' {
        return &GLYPHS[0];
    }
    match code.checked_sub(FIRST) {
        Some(idx) if (idx as usize) < GLYPHS.len() => &GLYPHS[idx as usize],
        _ => &GLYPHS[('?' as u32 - FIRST) as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_pixels(font: &BitmapFont, text: &str) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        font.rasterize(text, 0, 0, &mut |x, y, _| out.push((x, y)));
        out
    }

    #[test]
    fn scale_follows_size() {
        assert_eq!(BitmapFont::for_size(1).scale(), 1);
        assert_eq!(BitmapFont::for_size(16).scale(), 2);
        assert_eq!(BitmapFont::for_size(20).scale(), 2);
        assert_eq!(BitmapFont::for_size(50).scale(), 6);
    }

    #[test]
    fn space_draws_nothing() {
        assert!(lit_pixels(&BitmapFont::for_size(8), "   ").is_empty());
    }

    #[test]
    fn glyph_stays_inside_its_cell() {
        let font = BitmapFont::for_size(16);
        let (w, h) = font.measure("H");
        assert_eq!((w, h), (10, 14));
        let pixels = lit_pixels(&font, "H");
        assert!(!pixels.is_empty());
        assert!(
            pixels
                .iter()
                .all(|&(x, y)| x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h)
        );
    }

    #[test]
    fn unknown_characters_draw_question_mark() {
        let font = BitmapFont::for_size(8);
        assert_eq!(lit_pixels(&font, "é"), lit_pixels(&font, "?"));
    }

    #[test]
    fn placement_near_i32_max_skips_unplaceable_pixels() {
        let font = BitmapFont::for_size(20);
        let mut plotted = Vec::new();
        font.rasterize("HI\nHI", i32::MAX - 3, i32::MAX - 20, &mut |x, y, _| {
            plotted.push((x, y))
        });
        assert!(!plotted.is_empty());
        assert!(plotted.iter().all(|&(x, y)| x >= i32::MAX - 3 && y >= i32::MAX - 20));
    }

    #[test]
    fn multiline_measure() {
        let font = BitmapFont::for_size(8);
        assert_eq!(font.measure("ab\nc"), (11, 15));
        assert_eq!(font.measure(""), (0, 7));
    }
}
