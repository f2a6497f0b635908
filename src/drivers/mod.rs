// Collaborator drivers: display surface, buttons, storage.
//
// Everything here is board-independent; the firmware binary supplies
// the SPI bus, the GPIO pins and the panel controller.

pub mod display;
pub mod input;
pub mod ram;
pub mod sdcard;
pub mod storage;
