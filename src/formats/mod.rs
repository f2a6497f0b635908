// Plain-text pipeline for the reader
//
// wrap  - one raw line to display-width sub-lines (CJK + Latin)
// lines - buffered raw-line reader with byte-exact line offsets
// pages - page markers, page materialisation, one-page prefetch

pub mod lines;
pub mod pages;
pub mod wrap;

pub use pages::{PageManager, PageMarker};
pub use wrap::wrap_text_lines;
