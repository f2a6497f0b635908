// 16x16 wide-cell glyph sources.
//
// Bitmaps are packed 1-bit, MSB-first, row-major, 2 bytes per row,
// 32 bytes per glyph. Where they live (flash blob, SD cache, table in
// .rodata) is up to the implementor.

use embedded_graphics_core::Pixel;
use embedded_graphics_core::pixelcolor::BinaryColor;
use embedded_graphics_core::prelude::*;

pub const WIDE_CELL: u32 = 16;
pub const WIDE_GLYPH_BYTES: usize = 32;

pub trait WideGlyphs {
    fn glyph(&self, ch: char) -> Option<&[u8; WIDE_GLYPH_BYTES]>;
}

/// No wide glyphs; every non-ASCII character draws as a box.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWideGlyphs;

impl WideGlyphs for NoWideGlyphs {
    #[inline]
    fn glyph(&self, _ch: char) -> Option<&[u8; WIDE_GLYPH_BYTES]> {
        None
    }
}

/// Static table sorted by code point.
pub struct GlyphTable {
    entries: &'static [(char, [u8; WIDE_GLYPH_BYTES])],
}

impl GlyphTable {
    pub const fn new(entries: &'static [(char, [u8; WIDE_GLYPH_BYTES])]) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WideGlyphs for GlyphTable {
    fn glyph(&self, ch: char) -> Option<&[u8; WIDE_GLYPH_BYTES]> {
        self.entries
            .binary_search_by(|(c, _)| c.cmp(&ch))
            .ok()
            .map(|i| &self.entries[i].1)
    }
}

pub(crate) fn blit_wide<D>(
    target: &mut D,
    bitmap: &[u8; WIDE_GLYPH_BYTES],
    x: i32,
    y: i32,
    color: BinaryColor,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let pixels = (0..16usize).flat_map(move |row| {
        let bits = u16::from_be_bytes([bitmap[row * 2], bitmap[row * 2 + 1]]);
        (0..16usize).filter_map(move |col| {
            if bits & (0x8000 >> col) != 0 {
                Some(Pixel(Point::new(x + col as i32, y + row as i32), color))
            } else {
                None
            }
        })
    });

    target.draw_iter(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::display::FrameBuffer;

    const DIAGONAL: [u8; WIDE_GLYPH_BYTES] = {
        let mut g = [0u8; WIDE_GLYPH_BYTES];
        let mut row = 0;
        while row < 16 {
            let bits: u16 = 0x8000 >> row;
            g[row * 2] = (bits >> 8) as u8;
            g[row * 2 + 1] = bits as u8;
            row += 1;
        }
        g
    };

    static TABLE: [(char, [u8; WIDE_GLYPH_BYTES]); 2] =
        [('一', DIAGONAL), ('中', [0xFF; WIDE_GLYPH_BYTES])];

    #[test]
    fn table_lookup_by_code_point() {
        let t = GlyphTable::new(&TABLE);
        assert_eq!(t.len(), 2);
        assert!(t.glyph('中').is_some());
        assert!(t.glyph('文').is_none());
    }

    #[test]
    fn blit_sets_exactly_the_glyph_bits() {
        let mut fb = FrameBuffer::new(32, 32);
        blit_wide(&mut fb, &DIAGONAL, 8, 4, BinaryColor::On).unwrap();
        assert_eq!(fb.ink_count(), 16);
        assert!(fb.is_ink(8, 4));
        assert!(fb.is_ink(23, 19));
        assert!(!fb.is_ink(9, 4));
    }
}
