// Screens for a 1-bit reflective panel: reader page, error dialog,
// file menu. Everything draws through drivers::display::Panel.

pub mod menu;
pub mod page;
pub mod stack_fmt;
mod widget;

pub use menu::{MENU_ROWS, MenuRenderer};
pub use page::PageRenderer;
pub use stack_fmt::StackFmt;
pub use widget::{Alignment, Region};
