// Controllers: input events in, screens out.
//
// menu   - pick a .TXT file from the card
// reader - page through one file
//
// Both borrow their collaborators (storage, font, panel) so the firmware
// main loop can hand the same ones from the menu to the reader and back.

pub mod menu;
pub mod reader;

use alloc::string::String;

use embedded_hal::delay::DelayNs;
use log::{error, warn};

use crate::drivers::display::Panel;
use crate::fonts::WideGlyphs;
use crate::ui::PageRenderer;

pub use menu::MenuController;
pub use reader::TextReaderController;

/// Poll period of the blocking control loops.
pub const TICK_MS: u32 = 30;

/// Seconds the error screen stays up before the loop gives up.
pub const ERROR_COUNTDOWN_S: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    None,
    /// Screen changed and was redrawn.
    Redraw,
    /// Leave this controller.
    Exit,
    /// A file was chosen in the menu.
    Open(String),
}

/// Error dialog followed by the exit countdown.
pub fn show_error<G, D, T>(renderer: &PageRenderer<'_, G>, display: &mut D, msg: &str, delay: &mut T)
where
    G: WideGlyphs,
    D: Panel,
    T: DelayNs,
{
    if let Err(e) = renderer.display_error_screen(display, msg, ERROR_COUNTDOWN_S) {
        error!("app: error screen failed: {}", e);
    }
    for left in (1..=ERROR_COUNTDOWN_S).rev() {
        if left < ERROR_COUNTDOWN_S
            && let Err(e) = renderer.update_countdown(display, left)
        {
            error!("app: countdown redraw failed: {}", e);
        }
        warn!("app: {} - exiting in {} s", msg, left);
        delay.delay_ms(1000);
    }
}
