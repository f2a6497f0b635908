// Paginated SD-card text reader for small 1-bit handhelds.
//
// formats  - line reader, hybrid wrap, page markers + prefetch slot
// fonts    - text metrics and the ASCII + wide-cell hybrid font
// drivers  - storage, panel and button collaborators
// ui       - page, error and menu rendering
// apps     - reader and file-menu control loops

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod apps;
pub mod drivers;
pub mod fonts;
pub mod formats;
pub mod layout;
pub mod settings;
pub mod ui;
