// Reader page drawing: title header, wrapped body, page footer, and the
// error dialog. Holds no state between calls; every screen is drawn
// from scratch and committed with Panel::present.

use core::fmt::Write;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use log::{debug, error};

use crate::drivers::display::Panel;
use crate::fonts::{HybridFont, TextMetrics, WideGlyphs};
use crate::formats::wrap::wrap_text_lines;
use crate::layout::Layout;
use crate::ui::stack_fmt::StackFmt;
use crate::ui::widget::{Alignment, Region};

const INK: BinaryColor = BinaryColor::On;
const PAPER: BinaryColor = BinaryColor::Off;

const ERROR_TITLE: &str = "System error";
const ERROR_HINTS: [&str; 2] = ["Check the SD card", "connection and format"];
const ERROR_BOX_W: u16 = 260;
const ERROR_BOX_H: u16 = 100;
const MAX_ERROR_LINES: usize = 3;

pub struct PageRenderer<'f, G: WideGlyphs> {
    font: &'f HybridFont<G>,
    layout: Layout,
}

impl<'f, G: WideGlyphs> PageRenderer<'f, G> {
    pub fn new(font: &'f HybridFont<G>, layout: Layout) -> Self {
        Self { font, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    fn text<D: Panel>(&self, d: &mut D, s: &str, x: i32, y: i32) -> Result<i32, &'static str> {
        self.font
            .draw_str(d, s, x, y, INK)
            .map_err(|_| "draw failed")
    }

    // horizontally centred on the screen, top edge at y
    fn centered<D: Panel>(&self, d: &mut D, s: &str, y: u16) -> Result<(), &'static str> {
        let size = Size::new(self.font.string_width(s), self.font.cell_height());
        let band = Region::row(y, size.height as u16, self.layout.width);
        let at = Alignment::TopCenter.position(band, size);
        self.text(d, s, at.x, at.y).map(|_| ())
    }

    fn hline<D: Panel>(&self, d: &mut D, x0: u16, x1: u16, y: u16) -> Result<(), &'static str> {
        Line::new(Point::new(x0 as i32, y as i32), Point::new(x1 as i32, y as i32))
            .into_styled(PrimitiveStyle::with_stroke(INK, 1))
            .draw(d)
            .map_err(|_| "draw failed")
    }

    pub fn draw_header<D: Panel>(&self, d: &mut D, filename: &str) -> Result<(), &'static str> {
        let l = &self.layout;
        if !filename.is_empty() {
            self.text(d, filename, l.margin as i32, l.title_y() as i32)?;
        }
        self.hline(d, l.margin, l.width - l.margin, l.separator_y())
    }

    /// "Page n/total" centred at the bottom, `tip` one line above it.
    pub fn draw_footer<D: Panel>(
        &self,
        d: &mut D,
        current_page: usize,
        total_pages: usize,
        tip: &str,
    ) -> Result<(), &'static str> {
        if total_pages == 0 {
            return Ok(());
        }
        let mut s = StackFmt::<32>::new();
        let _ = write!(s, "Page {}/{}", current_page + 1, total_pages);
        self.centered(d, s.as_str(), self.layout.footer_y())?;
        if !tip.is_empty() {
            self.centered(d, tip, self.layout.tip_y())?;
        }
        Ok(())
    }

    /// Draws and commits one full reader page.
    pub fn show_static_page<D: Panel>(
        &self,
        d: &mut D,
        page: usize,
        lines: &[impl AsRef<str>],
        total_pages: usize,
        filename: &str,
        tip: &str,
    ) -> Result<(), &'static str> {
        let l = &self.layout;
        d.clear(PAPER).map_err(|_| "clear failed")?;
        self.draw_header(d, filename)?;

        let end = l.content_end_y() as u32;
        let mut y = l.content_start_y() as u32;
        let mut in_gap = false;
        let mut drawn = 0;

        for line in lines {
            let line = line.as_ref();
            if line.is_empty() {
                // a run of blank lines is one paragraph gap
                if !in_gap {
                    y += l.paragraph_spacing as u32;
                    in_gap = true;
                }
                continue;
            }
            in_gap = false;
            if y + l.line_height as u32 > end {
                debug!("page: line {} would cross the footer, stopping", drawn);
                break;
            }
            self.text(d, line, l.margin as i32, y as i32)?;
            y += l.line_height as u32;
            drawn += 1;
        }

        self.draw_footer(d, page, total_pages, tip)?;
        d.present()
    }

    /// Boxed error dialog; the caller runs the countdown.
    pub fn display_error_screen<D: Panel>(
        &self,
        d: &mut D,
        message: &str,
        countdown_s: u32,
    ) -> Result<(), &'static str> {
        error!("page: error screen: {}", message);
        let l = &self.layout;
        d.clear(PAPER).map_err(|_| "clear failed")?;
        self.draw_header(d, "")?;

        let mut y = (l.height / 2).saturating_sub(70);
        self.centered(d, ERROR_TITLE, y)?;
        y += 2 * l.line_height;

        let boxed = Region::new(
            l.width.saturating_sub(ERROR_BOX_W) / 2,
            y,
            ERROR_BOX_W,
            ERROR_BOX_H,
        );
        boxed
            .to_rect()
            .into_styled(PrimitiveStyle::with_stroke(INK, 1))
            .draw(d)
            .map_err(|_| "draw failed")?;

        let inner = ERROR_BOX_W as u32 - 20;
        let mut my = y + 15;
        for line in wrap_text_lines(message, inner, self.font)
            .iter()
            .take(MAX_ERROR_LINES)
        {
            self.centered(d, line, my)?;
            my += l.line_height;
        }

        let mut hy = boxed.bottom() + 15;
        for hint in ERROR_HINTS {
            self.centered(d, hint, hy)?;
            hy += l.line_height;
        }

        self.draw_countdown(d, countdown_s)?;
        d.present()
    }

    /// Rewrites the "Exiting in N s" line of the error screen.
    pub fn update_countdown<D: Panel>(
        &self,
        d: &mut D,
        seconds_left: u32,
    ) -> Result<(), &'static str> {
        let band = Region::row(
            self.countdown_y(),
            self.font.cell_height() as u16,
            self.layout.width,
        );
        band.to_rect()
            .into_styled(PrimitiveStyle::with_fill(PAPER))
            .draw(d)
            .map_err(|_| "draw failed")?;
        self.draw_countdown(d, seconds_left)?;
        d.present()
    }

    fn countdown_y(&self) -> u16 {
        self.layout.height.saturating_sub(self.layout.margin + 30)
    }

    fn draw_countdown<D: Panel>(&self, d: &mut D, seconds_left: u32) -> Result<(), &'static str> {
        let mut s = StackFmt::<40>::new();
        let _ = write!(s, "Exiting in {} s", seconds_left);
        self.centered(d, s.as_str(), self.countdown_y())
    }
}
