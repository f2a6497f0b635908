// Hybrid font: ASCII from an embedded-graphics mono font, everything
// else as a fixed 16x16 wide cell (CJK and other non-ASCII text).
// Glyph storage is a collaborator; see glyphs::WideGlyphs.

pub mod glyphs;

use embedded_graphics::mono_font::ascii::FONT_8X13;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

pub use glyphs::{GlyphTable, NoWideGlyphs, WIDE_CELL, WideGlyphs};

/// Pixel width of a string as the display will draw it.
///
/// Any `Fn(&str) -> u32` works, so wrapping and pagination can be
/// exercised without a font or a panel.
pub trait TextMetrics {
    fn string_width(&self, text: &str) -> u32;
}

impl<F> TextMetrics for F
where
    F: Fn(&str) -> u32,
{
    #[inline]
    fn string_width(&self, text: &str) -> u32 {
        self(text)
    }
}

#[inline]
pub fn is_narrow(ch: char) -> bool {
    matches!(ch as u32, 0x20..=0x7E)
}

pub struct HybridFont<G: WideGlyphs> {
    ascii: &'static MonoFont<'static>,
    wide: G,
}

impl HybridFont<NoWideGlyphs> {
    pub const fn ascii_only() -> Self {
        Self {
            ascii: &FONT_8X13,
            wide: NoWideGlyphs,
        }
    }
}

impl<G: WideGlyphs> HybridFont<G> {
    pub const fn new(ascii: &'static MonoFont<'static>, wide: G) -> Self {
        Self { ascii, wide }
    }

    pub const fn with_wide_glyphs(wide: G) -> Self {
        Self::new(&FONT_8X13, wide)
    }

    #[inline]
    pub fn ascii_advance(&self) -> u32 {
        self.ascii.character_size.width + self.ascii.character_spacing
    }

    /// Height of the tallest glyph cell.
    #[inline]
    pub fn cell_height(&self) -> u32 {
        self.ascii.character_size.height.max(WIDE_CELL)
    }

    #[inline]
    pub fn advance(&self, ch: char) -> u32 {
        if is_narrow(ch) {
            self.ascii_advance()
        } else {
            WIDE_CELL
        }
    }

    /// Draws `text` with its top-left corner at (x, y); returns the x
    /// position after the last glyph.
    pub fn draw_str<D>(
        &self,
        target: &mut D,
        text: &str,
        x: i32,
        y: i32,
        color: BinaryColor,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let style = MonoTextStyle::new(self.ascii, color);
        let mut cx = x;
        let mut rest = text;

        while !rest.is_empty() {
            // longest ASCII run goes through embedded-graphics in one call
            let run = rest
                .char_indices()
                .find(|&(_, c)| !is_narrow(c))
                .map_or(rest.len(), |(i, _)| i);
            if run > 0 {
                let next = Text::with_baseline(&rest[..run], Point::new(cx, y), style, Baseline::Top)
                    .draw(target)?;
                cx = next.x;
                rest = &rest[run..];
                continue;
            }

            let Some(ch) = rest.chars().next() else {
                break;
            };
            self.draw_wide(target, ch, cx, y, color)?;
            cx += WIDE_CELL as i32;
            rest = &rest[ch.len_utf8()..];
        }

        Ok(cx)
    }

    fn draw_wide<D>(
        &self,
        target: &mut D,
        ch: char,
        x: i32,
        y: i32,
        color: BinaryColor,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        match self.wide.glyph(ch) {
            Some(bitmap) => glyphs::blit_wide(target, bitmap, x, y, color),
            None => {
                // tofu: outlined cell so missing glyphs stay visible
                Rectangle::new(
                    Point::new(x + 2, y + 2),
                    Size::new(WIDE_CELL - 4, WIDE_CELL - 4),
                )
                .into_styled(PrimitiveStyle::with_stroke(color, 1))
                .draw(target)
            }
        }
    }
}

impl<G: WideGlyphs> TextMetrics for HybridFont<G> {
    fn string_width(&self, text: &str) -> u32 {
        text.chars().map(|c| self.advance(c)).sum()
    }
}

impl<G: WideGlyphs> TextMetrics for &HybridFont<G> {
    #[inline]
    fn string_width(&self, text: &str) -> u32 {
        (**self).string_width(text)
    }
}
