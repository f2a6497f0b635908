//! Display collaborator.
//!
//! The reader only needs an embedded-graphics `DrawTarget` that can be
//! committed to glass and flipped between day and night mode. Panel
//! controllers (ST7305/ST7306, SSD1677, ...) implement [`Panel`]
//! directly, or hand their SPI transfer to a [`BufferedPanel`].

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::BinaryColor,
    prelude::Pixel,
};
use log::{debug, warn};

pub trait Panel: DrawTarget<Color = BinaryColor> {
    /// Push the drawn frame to the glass.
    fn present(&mut self) -> Result<(), &'static str>;

    /// Night mode inverts ink and paper on the glass.
    fn set_night_mode(&mut self, _night: bool) {}

    fn is_ready(&self) -> bool {
        true
    }
}

/// 1-bit framebuffer, MSB-first rows, 0 bit = ink.
pub struct FrameBuffer {
    buf: Vec<u8>,
    width: u16,
    height: u16,
    row_bytes: usize,
    night: bool,
    dirty: bool,
    frames: u32,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let row_bytes = (width as usize).div_ceil(8);
        Self {
            // 0xFF = all paper
            buf: vec![0xFFu8; row_bytes * height as usize],
            width,
            height,
            row_bytes,
            night: false,
            dirty: false,
            frames: 0,
        }
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buf
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_night(&self) -> bool {
        self.night
    }

    /// Number of frames committed with `present`.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn is_ink(&self, x: u16, y: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let (idx, bit) = self.locate(x, y);
        self.buf[idx] & bit == 0
    }

    pub fn ink_count(&self) -> usize {
        let mut n = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_ink(x, y) {
                    n += 1;
                }
            }
        }
        n
    }

    /// True if any pixel in rows `y0..y1` carries ink.
    pub fn rows_have_ink(&self, y0: u16, y1: u16) -> bool {
        (y0..y1.min(self.height)).any(|y| (0..self.width).any(|x| self.is_ink(x, y)))
    }

    #[inline]
    fn locate(&self, x: u16, y: u16) -> (usize, u8) {
        let idx = (x as usize / 8) + y as usize * self.row_bytes;
        (idx, 1 << (7 - (x % 8)))
    }

    fn set_pixel(&mut self, x: u16, y: u16, ink: bool) {
        let (idx, bit) = self.locate(x, y);
        if ink {
            self.buf[idx] &= !bit;
        } else {
            self.buf[idx] |= bit;
        }
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
                continue;
            }
            self.set_pixel(x as u16, y as u16, color.is_on());
            self.dirty = true;
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(if color.is_on() { 0x00 } else { 0xFF });
        self.dirty = true;
        Ok(())
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl Panel for FrameBuffer {
    fn present(&mut self) -> Result<(), &'static str> {
        self.frames += 1;
        self.dirty = false;
        Ok(())
    }

    fn set_night_mode(&mut self, night: bool) {
        self.night = night;
    }
}

/// Receives finished frames for a [`BufferedPanel`].
pub trait FrameSink {
    fn flush(&mut self, frame: &[u8], width: u16, height: u16, night: bool)
    -> Result<(), &'static str>;

    /// Controller answered its last status query.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Framebuffer in RAM, shipped to the controller on `present`.
pub struct BufferedPanel<S: FrameSink> {
    fb: FrameBuffer,
    sink: S,
}

impl<S: FrameSink> BufferedPanel<S> {
    pub fn new(width: u16, height: u16, sink: S) -> Self {
        Self {
            fb: FrameBuffer::new(width, height),
            sink,
        }
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: FrameSink> DrawTarget for BufferedPanel<S> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.fb.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fb.clear(color)
    }
}

impl<S: FrameSink> OriginDimensions for BufferedPanel<S> {
    fn size(&self) -> Size {
        self.fb.size()
    }
}

impl<S: FrameSink> Panel for BufferedPanel<S> {
    fn present(&mut self) -> Result<(), &'static str> {
        if !self.fb.is_dirty() {
            debug!("display: frame unchanged, skipping flush");
            return Ok(());
        }
        let (w, h, night) = (self.fb.width, self.fb.height, self.fb.night);
        if let Err(e) = self.sink.flush(&self.fb.buf, w, h, night) {
            warn!("display: flush failed: {}", e);
            return Err(e);
        }
        self.fb.present()
    }

    fn set_night_mode(&mut self, night: bool) {
        if self.fb.night != night {
            // same pixels, different polarity on glass
            self.fb.dirty = true;
        }
        self.fb.set_night_mode(night);
    }

    fn is_ready(&self) -> bool {
        self.sink.is_ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn starts_as_blank_paper() {
        let fb = FrameBuffer::new(20, 10);
        assert_eq!(fb.buffer().len(), 3 * 10);
        assert_eq!(fb.ink_count(), 0);
    }

    #[test]
    fn draws_and_clips() {
        let mut fb = FrameBuffer::new(16, 16);
        Line::new(Point::new(-5, 3), Point::new(30, 3))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut fb)
            .unwrap();
        assert_eq!(fb.ink_count(), 16);
        assert!(fb.is_ink(0, 3));
        assert!(fb.rows_have_ink(3, 4));
        assert!(!fb.rows_have_ink(4, 16));
    }

    #[test]
    fn clear_resets_every_pixel() {
        let mut fb = FrameBuffer::new(9, 9);
        fb.clear(BinaryColor::On).unwrap();
        assert!(fb.is_ink(8, 8));
        fb.clear(BinaryColor::Off).unwrap();
        assert_eq!(fb.ink_count(), 0);
    }

    struct CountingSink {
        flushes: u32,
        last_night: bool,
    }

    impl FrameSink for CountingSink {
        fn flush(&mut self, _f: &[u8], _w: u16, _h: u16, night: bool) -> Result<(), &'static str> {
            self.flushes += 1;
            self.last_night = night;
            Ok(())
        }
    }

    #[test]
    fn buffered_panel_flushes_only_changed_frames() {
        let sink = CountingSink {
            flushes: 0,
            last_night: false,
        };
        let mut panel = BufferedPanel::new(8, 8, sink);
        panel.present().unwrap();
        assert_eq!(panel.sink().flushes, 0);

        Pixel(Point::new(1, 1), BinaryColor::On).draw(&mut panel).unwrap();
        panel.present().unwrap();
        assert_eq!(panel.sink().flushes, 1);

        panel.set_night_mode(true);
        panel.present().unwrap();
        assert_eq!(panel.sink().flushes, 2);
        assert!(panel.sink().last_night);
        assert_eq!(panel.framebuffer().frames(), 2);
    }
}
