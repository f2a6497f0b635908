// File menu drawing: directory path on top, up to MENU_ROWS entries with
// the selection inverted, key hint at the bottom. The visible window
// scrolls so the selection is always on screen.

use core::fmt::Write;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::PrimitiveStyle;

use crate::drivers::display::Panel;
use crate::drivers::storage::DirEntry;
use crate::fonts::{HybridFont, TextMetrics, WideGlyphs};
use crate::layout::Layout;
use crate::ui::stack_fmt::StackFmt;
use crate::ui::widget::{Alignment, Region};

pub const MENU_ROWS: usize = 10;
pub const ROW_H: u16 = 28;
const LIST_X: u16 = 20;
const LIST_Y: u16 = 40;
const ROW_W: u16 = 260;
const PATH_POS: (i32, i32) = (10, 10);
const HINT_Y: u16 = 370;
const HINT: &str = "K1/K2 move  K2x2 open  K1x2 back";

/// First visible row for a selection.
pub fn window_start(selected: usize, count: usize) -> usize {
    if count <= MENU_ROWS || selected < MENU_ROWS {
        return 0;
    }
    (selected + 1 - MENU_ROWS).min(count - MENU_ROWS)
}

pub struct MenuRenderer<'f, G: WideGlyphs> {
    font: &'f HybridFont<G>,
    layout: Layout,
}

impl<'f, G: WideGlyphs> MenuRenderer<'f, G> {
    pub fn new(font: &'f HybridFont<G>, layout: Layout) -> Self {
        Self { font, layout }
    }

    pub fn draw_menu<D: Panel>(
        &self,
        d: &mut D,
        entries: &[DirEntry],
        selected: usize,
        dir: &str,
    ) -> Result<(), &'static str> {
        d.clear(BinaryColor::Off).map_err(|_| "clear failed")?;

        let first = window_start(selected, entries.len());
        let rows = entries.iter().enumerate().skip(first).take(MENU_ROWS);
        for (slot, (i, entry)) in rows.enumerate() {
            let row = Region::new(LIST_X, LIST_Y + slot as u16 * ROW_H, ROW_W, ROW_H);
            self.draw_row(d, row, entry, i == selected)?;
        }

        if entries.is_empty() {
            let row = Region::new(LIST_X, LIST_Y, ROW_W, ROW_H);
            self.label(d, row, "(empty)", BinaryColor::On)?;
        }

        self.font
            .draw_str(d, dir, PATH_POS.0, PATH_POS.1, BinaryColor::On)
            .map_err(|_| "draw failed")?;
        let hint_row = Region::new(0, HINT_Y, self.layout.width, ROW_H);
        let w = self.font.string_width(HINT);
        let at = Alignment::TopCenter.position(hint_row, Size::new(w, self.font.cell_height()));
        self.font
            .draw_str(d, HINT, at.x, at.y, BinaryColor::On)
            .map_err(|_| "draw failed")?;

        d.present()
    }

    fn draw_row<D: Panel>(
        &self,
        d: &mut D,
        row: Region,
        entry: &DirEntry,
        selected: bool,
    ) -> Result<(), &'static str> {
        let fg = if selected {
            row.to_rect()
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(d)
                .map_err(|_| "draw failed")?;
            BinaryColor::Off
        } else {
            BinaryColor::On
        };

        let mut s = StackFmt::<24>::new();
        let prefix = if entry.is_dir { "[DIR] " } else { "      " };
        let _ = write!(s, "{}{}", prefix, entry.name_str());
        self.label(d, row, s.as_str(), fg)
    }

    fn label<D: Panel>(
        &self,
        d: &mut D,
        row: Region,
        text: &str,
        color: BinaryColor,
    ) -> Result<(), &'static str> {
        let size = Size::new(self.font.string_width(text), self.font.cell_height());
        let at = Alignment::CenterLeft.position(row, size);
        self.font
            .draw_str(d, text, at.x + 4, at.y, color)
            .map_err(|_| "draw failed")
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::display::FrameBuffer;

    #[test]
    fn window_follows_selection() {
        assert_eq!(window_start(0, 5), 0);
        assert_eq!(window_start(9, 30), 0);
        assert_eq!(window_start(10, 30), 1);
        assert_eq!(window_start(29, 30), 20);
    }

    #[test]
    fn selected_row_is_inverted() {
        let font = HybridFont::ascii_only();
        let r = MenuRenderer::new(&font, Layout::DEFAULT);
        let mut fb = FrameBuffer::new(300, 400);
        let entries = [
            DirEntry::new("BOOKS", true, 0),
            DirEntry::new("A.TXT", false, 10),
        ];
        r.draw_menu(&mut fb, &entries, 1, "/").unwrap();
        assert_eq!(fb.frames(), 1);
        // second row filled, first row background clear
        assert!(fb.is_ink(LIST_X + 1, LIST_Y + ROW_H + 1));
        assert!(!fb.is_ink(LIST_X + 1, LIST_Y + 1));
        assert!(fb.rows_have_ink(HINT_Y, HINT_Y + ROW_H));
    }

    #[test]
    fn empty_directory_shows_placeholder() {
        let font = HybridFont::ascii_only();
        let r = MenuRenderer::new(&font, Layout::DEFAULT);
        let mut fb = FrameBuffer::new(300, 400);
        r.draw_menu(&mut fb, &[], 0, "/EMPTY").unwrap();
        assert!(fb.rows_have_ink(LIST_Y, LIST_Y + ROW_H));
    }
}
