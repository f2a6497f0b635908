// Page markers and page materialisation for plain text files.
//
// precompute_pages() walks the whole file once and records where each
// page starts: the byte offset of the raw line holding the page's first
// sub-line, plus that sub-line's index in the line's wrap. Pages are
// then rebuilt on demand by seeking to a marker and re-running the
// same wrap + height-budget walk, so a loaded page always holds exactly
// the lines the scan assigned to it.
//
// The file is reopened for every operation; no handle is kept between
// calls. One page of read-ahead is kept in a single prefetch slot.

use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::drivers::storage::{FileHandle, FileInfo, Storage};
use crate::fonts::TextMetrics;
use crate::formats::lines::LineReader;
use crate::formats::wrap::wrap_text_lines;
use crate::layout::{Layout, PageBudget};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageMarker {
    /// Byte offset of the raw line the page starts in.
    pub file_offset: u32,
    /// First wrapped sub-line of that raw line shown on the page.
    pub wrap_line_index: usize,
}

impl PageMarker {
    pub const START: Self = Self {
        file_offset: 0,
        wrap_line_index: 0,
    };
}

#[derive(Default)]
struct Prefetch {
    page: Option<usize>,
    lines: Vec<String>,
}

// Adds one sub-line to the running page; true if it had to open a new
// page. The scan and the load walk both go through here.
fn place_line(layout: &Layout, budget: &mut PageBudget, line: &str) -> bool {
    let cost = layout.line_cost(line);
    let cut = !budget.fits(cost);
    if cut {
        budget.reset();
    }
    budget.push(cost);
    cut
}

pub struct PageManager<S, M> {
    storage: S,
    metrics: M,
    path: String,
    layout: Layout,
    markers: Vec<PageMarker>,
    precomputed: bool,
    // file identity when the markers were built
    snapshot: Option<FileInfo>,
    prefetch: Prefetch,
}

impl<S, M> PageManager<S, M>
where
    S: Storage,
    M: TextMetrics,
{
    pub fn new(storage: S, metrics: M, path: &str, layout: Layout) -> Self {
        Self {
            storage,
            metrics,
            path: String::from(path),
            layout,
            markers: Vec::new(),
            precomputed: false,
            snapshot: None,
            prefetch: Prefetch::default(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// New geometry invalidates every marker; precompute again before use.
    pub fn set_layout(&mut self, layout: Layout) {
        if layout != self.layout {
            self.layout = layout;
            self.clear_page_markers();
        }
    }

    pub fn is_precomputed(&self) -> bool {
        self.precomputed
    }

    pub fn total_pages(&self) -> usize {
        self.markers.len()
    }

    pub fn markers(&self) -> &[PageMarker] {
        &self.markers
    }

    pub fn clear_page_markers(&mut self) {
        self.markers.clear();
        self.precomputed = false;
        self.snapshot = None;
        self.clear_next_page_cache();
    }

    /// Scans the whole file and rebuilds the page markers.
    ///
    /// On failure no markers are kept and `total_pages()` is 0.
    pub fn precompute_pages(&mut self) -> Result<usize, &'static str> {
        self.clear_page_markers();
        self.layout.validate()?;

        let max = self.layout.max_page_height();
        info!("pages: scanning {} (page height {}px)", self.path, max);

        let info = match self.storage.file_info(&self.path) {
            Ok(info) => info,
            Err(e) => {
                warn!("pages: stat {} failed: {}", self.path, e);
                return Err(e);
            }
        };

        let mut markers = Vec::new();
        markers.push(PageMarker::START);
        let (layout, metrics) = (&self.layout, &self.metrics);

        let scanned = self.storage.with_file(&self.path, |file| {
            let mut budget = PageBudget::new(max);
            walk_lines(file, layout, metrics, PageMarker::START, |offset, index, line| {
                if place_line(layout, &mut budget, line) {
                    markers.push(PageMarker {
                        file_offset: offset,
                        wrap_line_index: index,
                    });
                }
                true
            })
        });

        if let Err(e) = scanned {
            warn!("pages: scan of {} failed: {}", self.path, e);
            return Err(e);
        }

        self.markers = markers;
        self.snapshot = Some(info);
        self.precomputed = true;
        info!("pages: {} pages", self.markers.len());
        Ok(self.markers.len())
    }

    /// Materialises one page into `out`. `out` is empty on any failure.
    pub fn load_page_content(&self, page: usize, out: &mut Vec<String>) -> Result<(), &'static str> {
        out.clear();
        let Some(&marker) = self.markers.get(page) else {
            warn!("pages: page {} out of range ({} pages)", page, self.markers.len());
            return Err("page out of range");
        };

        debug!(
            "pages: load page {} at offset {} sub-line {}",
            page, marker.file_offset, marker.wrap_line_index
        );

        let (layout, metrics) = (&self.layout, &self.metrics);
        let res = self.storage.with_file(&self.path, |file| {
            let mut budget = PageBudget::new(layout.max_page_height());
            walk_lines(file, layout, metrics, marker, |_, _, line| {
                if place_line(layout, &mut budget, line) {
                    return false;
                }
                out.push(String::from(line));
                true
            })
        });

        if let Err(e) = res {
            warn!("pages: load page {} failed: {}", page, e);
            out.clear();
            return Err(e);
        }
        Ok(())
    }

    /// Read-ahead of `current + 1` into the prefetch slot.
    pub fn preload_next_page(&mut self, current: usize) -> Result<(), &'static str> {
        let next = current + 1;
        if next >= self.total_pages() {
            self.clear_next_page_cache();
            return Ok(());
        }
        if self.prefetch.page == Some(next) {
            return Ok(());
        }

        let mut lines = core::mem::take(&mut self.prefetch.lines);
        self.prefetch.page = None;
        match self.load_page_content(next, &mut lines) {
            Ok(()) => {
                debug!("pages: prefetched page {}", next);
                self.prefetch = Prefetch {
                    page: Some(next),
                    lines,
                };
                Ok(())
            }
            Err(e) => {
                self.clear_next_page_cache();
                Err(e)
            }
        }
    }

    pub fn is_page_cached(&self, page: usize) -> bool {
        self.prefetch.page == Some(page)
    }

    pub fn cached_lines(&self, page: usize) -> Option<&[String]> {
        if self.is_page_cached(page) {
            Some(&self.prefetch.lines)
        } else {
            None
        }
    }

    /// Moves the prefetched lines out if they belong to `page`.
    pub fn take_cached(&mut self, page: usize) -> Option<Vec<String>> {
        if !self.is_page_cached(page) {
            return None;
        }
        self.prefetch.page = None;
        Some(core::mem::take(&mut self.prefetch.lines))
    }

    pub fn clear_next_page_cache(&mut self) {
        self.prefetch.page = None;
        self.prefetch.lines.clear();
    }

    /// True if the file's size or modification stamp moved since the
    /// markers were built (or no markers exist). The caller repaginates.
    pub fn check_file_changed(&self) -> Result<bool, &'static str> {
        let Some(snapshot) = self.snapshot else {
            return Ok(true);
        };
        let now = self.storage.file_info(&self.path)?;
        if now != snapshot {
            info!(
                "pages: {} changed (size {} -> {})",
                self.path, snapshot.size, now.size
            );
            return Ok(true);
        }
        Ok(false)
    }
}

// Reads raw lines from `start`, wraps them and feeds each sub-line to
// `visit(line_offset, sub_line_index, text)` until it returns false or
// the file ends. Sub-lines before `start.wrap_line_index` of the first
// raw line are skipped.
fn walk_lines<M>(
    file: &mut dyn FileHandle,
    layout: &Layout,
    metrics: &M,
    start: PageMarker,
    mut visit: impl FnMut(u32, usize, &str) -> bool,
) -> Result<(), &'static str>
where
    M: TextMetrics + ?Sized,
{
    let width = layout.content_width();
    let mut reader = LineReader::new(file, start.file_offset)?;
    let mut raw = Vec::new();
    let mut skip = start.wrap_line_index;

    while let Some(offset) = reader.next_line(&mut raw)? {
        let text = String::from_utf8_lossy(&raw);
        let wrapped = wrap_text_lines(&text, width, metrics);
        for (index, line) in wrapped.iter().enumerate().skip(skip) {
            if !visit(offset, index, line) {
                return Ok(());
            }
        }
        skip = 0;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ram::RamStorage;

    fn mono(s: &str) -> u32 {
        s.chars().map(|c| if c.is_ascii() { 8 } else { 16 }).sum()
    }

    // page budget of `rows` text lines at 22px
    fn layout_rows(rows: u16) -> Layout {
        let base = Layout::DEFAULT;
        let height = base.content_start_y() + rows * 22 + base.margin + base.content_footer_spacing;
        Layout { height, ..base }
    }

    fn manager(text: &str, layout: Layout) -> PageManager<RamStorage, fn(&str) -> u32> {
        let ram = RamStorage::new().with("BOOK.TXT", text);
        PageManager::new(ram, mono as fn(&str) -> u32, "/BOOK.TXT", layout)
    }

    fn all_pages<S: Storage, M: TextMetrics>(pm: &PageManager<S, M>) -> Vec<Vec<String>> {
        (0..pm.total_pages())
            .map(|p| {
                let mut out = Vec::new();
                pm.load_page_content(p, &mut out).unwrap();
                out
            })
            .collect()
    }

    // wrap everything once, then cut by budget
    fn reference_pages(text: &str, layout: &Layout) -> Vec<Vec<String>> {
        let mut pages = vec![Vec::new()];
        let mut budget = PageBudget::new(layout.max_page_height());
        let body = text.strip_suffix('\n').unwrap_or(text);
        if text.is_empty() {
            return pages;
        }
        for raw in body.split('\n') {
            let raw = raw.strip_suffix('\r').unwrap_or(raw);
            for line in wrap_text_lines(raw, layout.content_width(), &mono) {
                if place_line(layout, &mut budget, &line) {
                    pages.push(Vec::new());
                }
                pages.last_mut().unwrap().push(line);
            }
        }
        pages
    }

    fn sample_text() -> String {
        let mut s = String::new();
        for i in 0..40 {
            s.push_str("Paragraph ");
            s.push_str(&i.to_string());
            s.push_str(" has some words that will need wrapping across lines on a narrow panel.\n");
            if i % 3 == 0 {
                s.push_str("\n\n");
            }
            if i % 5 == 0 {
                s.push_str("中文段落内容用于测试混合排版和分页是否一致，每个字符宽十六像素。\r\n");
            }
        }
        s
    }

    #[test]
    fn hello_world_is_one_page() {
        let mut pm = manager("Hello World", Layout::DEFAULT);
        assert_eq!(pm.precompute_pages().unwrap(), 1);
        let mut out = Vec::new();
        pm.load_page_content(0, &mut out).unwrap();
        assert_eq!(out, ["Hello World"]);
    }

    #[test]
    fn blank_line_costs_paragraph_spacing() {
        // room for exactly two sub-lines: 22 + 8 fits, + 22 does not
        let layout = Layout {
            height: Layout::DEFAULT.content_start_y() + 30 + 40,
            ..Layout::DEFAULT
        };
        let mut pm = manager("A\n\nB\n", layout);
        assert_eq!(pm.precompute_pages().unwrap(), 2);
        assert_eq!(
            pm.markers(),
            [
                PageMarker::START,
                PageMarker {
                    file_offset: 3,
                    wrap_line_index: 0
                }
            ]
        );
        let pages = all_pages(&pm);
        assert_eq!(pages[0], ["A", ""]);
        assert_eq!(pages[1], ["B"]);
    }

    #[test]
    fn spaces_only_line_costs_nothing() {
        // budget of 48px: "A" and "B" fit together, a blank would not
        let layout = Layout {
            height: Layout::DEFAULT.content_start_y() + 48 + 40,
            ..Layout::DEFAULT
        };
        let mut pm = manager("A\n   \nB\n", layout);
        assert_eq!(pm.precompute_pages().unwrap(), 1);
        assert_eq!(all_pages(&pm), [["A", "B"]]);

        let mut pm = manager("A\n\nB\n", layout);
        assert_eq!(pm.precompute_pages().unwrap(), 2);
    }

    #[test]
    fn page_can_start_mid_raw_line() {
        // one raw line wrapping to 5 sub-lines, 2 per page
        let line = "aaaa bbbb cccc dddd eeee";
        let layout = Layout {
            width: 40 + 2 * Layout::DEFAULT.margin,
            ..layout_rows(2)
        };
        let mut pm = manager(line, layout);
        assert_eq!(pm.precompute_pages().unwrap(), 3);
        assert_eq!(pm.markers()[1], PageMarker { file_offset: 0, wrap_line_index: 2 });
        assert_eq!(pm.markers()[2], PageMarker { file_offset: 0, wrap_line_index: 4 });
        let pages = all_pages(&pm);
        assert_eq!(pages, [vec!["aaaa", "bbbb"], vec!["cccc", "dddd"], vec!["eeee"]]);
    }

    #[test]
    fn pages_match_single_pass_wrap() {
        let text = sample_text();
        for rows in [1, 3, 7, 14] {
            let layout = layout_rows(rows);
            let mut pm = manager(&text, layout);
            pm.precompute_pages().unwrap();
            let pages = all_pages(&pm);
            assert_eq!(pages, reference_pages(&text, &layout), "rows {}", rows);
            assert!(pages.iter().all(|p| !p.is_empty()));
        }
    }

    #[test]
    fn markers_are_monotonic_and_stable() {
        let text = sample_text();
        let mut pm = manager(&text, layout_rows(4));
        pm.precompute_pages().unwrap();
        let first = pm.markers().to_vec();
        assert_eq!(first[0], PageMarker::START);
        for w in first.windows(2) {
            assert!(
                w[0].file_offset < w[1].file_offset
                    || (w[0].file_offset == w[1].file_offset
                        && w[0].wrap_line_index < w[1].wrap_line_index)
            );
        }
        pm.precompute_pages().unwrap();
        assert_eq!(pm.markers(), first.as_slice());
    }

    #[test]
    fn out_of_range_page_fails_and_clears() {
        let mut pm = manager("one\ntwo\n", Layout::DEFAULT);
        pm.precompute_pages().unwrap();
        let mut out = vec![String::from("stale")];
        assert!(pm.load_page_content(pm.total_pages(), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn load_before_precompute_fails() {
        let pm = manager("text", Layout::DEFAULT);
        let mut out = Vec::new();
        assert!(pm.load_page_content(0, &mut out).is_err());
    }

    #[test]
    fn empty_file_has_one_empty_page() {
        let mut pm = manager("", Layout::DEFAULT);
        assert_eq!(pm.precompute_pages().unwrap(), 1);
        let mut out = vec![String::from("x")];
        pm.load_page_content(0, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn prefetch_holds_the_next_page() {
        let text = sample_text();
        let mut pm = manager(&text, layout_rows(5));
        let total = pm.precompute_pages().unwrap();
        assert!(total > 3);

        pm.preload_next_page(0).unwrap();
        assert!(pm.is_page_cached(1));
        let mut direct = Vec::new();
        pm.load_page_content(1, &mut direct).unwrap();
        assert_eq!(pm.cached_lines(1).unwrap(), direct.as_slice());

        // backward navigation replaces the slot
        pm.preload_next_page(2).unwrap();
        assert!(!pm.is_page_cached(1));
        assert!(pm.is_page_cached(3));

        pm.preload_next_page(total - 1).unwrap();
        assert!(pm.cached_lines(total).is_none());
        assert!(!pm.is_page_cached(total));

        pm.preload_next_page(0).unwrap();
        let taken = pm.take_cached(1).unwrap();
        assert_eq!(taken, direct);
        assert!(!pm.is_page_cached(1));
    }

    #[test]
    fn detects_file_change() {
        let ram = RamStorage::new().with("BOOK.TXT", "first version\n");
        let mut pm = PageManager::new(&ram, mono as fn(&str) -> u32, "BOOK.TXT", Layout::DEFAULT);
        assert!(pm.check_file_changed().unwrap());
        pm.precompute_pages().unwrap();
        assert!(!pm.check_file_changed().unwrap());

        // rewritten in place
        ram.insert("BOOK.TXT", b"second version\n");
        assert!(pm.check_file_changed().unwrap());
        pm.precompute_pages().unwrap();
        assert!(!pm.check_file_changed().unwrap());

        ram.remove("BOOK.TXT");
        assert!(pm.check_file_changed().is_err());
    }

    #[test]
    fn failed_scan_keeps_no_markers() {
        let ram = RamStorage::new().with("BOOK.TXT", "a\nb\n");
        let mut pm = PageManager::new(&ram, mono as fn(&str) -> u32, "BOOK.TXT", Layout::DEFAULT);
        pm.precompute_pages().unwrap();
        ram.set_ejected(true);
        assert!(pm.precompute_pages().is_err());
        assert_eq!(pm.total_pages(), 0);
        assert!(!pm.is_precomputed());
    }

    #[test]
    fn layout_change_drops_markers() {
        let mut pm = manager("text\n", Layout::DEFAULT);
        pm.precompute_pages().unwrap();
        pm.set_layout(layout_rows(3));
        assert_eq!(pm.total_pages(), 0);
        assert!(pm.check_file_changed().unwrap());
    }
}
