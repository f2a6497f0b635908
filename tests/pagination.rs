// End-to-end: file on storage -> pages -> drawn frames.

use sd_text_reader::apps::{MenuController, TextReaderController, Transition};
use sd_text_reader::drivers::display::FrameBuffer;
use sd_text_reader::drivers::input::{KeyEvents, LogicEvent};
use sd_text_reader::drivers::ram::RamStorage;
use sd_text_reader::fonts::{HybridFont, TextMetrics};
use sd_text_reader::formats::{PageManager, wrap_text_lines};
use sd_text_reader::layout::Layout;

fn mixed_book() -> String {
    let mut s = String::new();
    for i in 0..25 {
        s.push_str(&format!("Chapter {i}\r\n\r\n"));
        s.push_str("It was a bright cold day in April, and the clocks were striking thirteen.\r\n");
        s.push_str("第一章的中文内容，用来检查宽字符换行与分页是否与整体换行一致。\r\n");
        s.push_str("\r\n\r\n\r\n");
    }
    s
}

#[test]
fn paging_through_equals_wrapping_once() {
    let text = mixed_book();
    let ram = RamStorage::new().with("MIXED.TXT", &text);
    let font = HybridFont::ascii_only();
    let layout = Layout::DEFAULT;

    let mut pm = PageManager::new(&ram, &font, "MIXED.TXT", layout);
    let total = pm.precompute_pages().unwrap();
    assert!(total > 5);

    let mut paged = Vec::new();
    let mut page = Vec::new();
    for p in 0..total {
        pm.load_page_content(p, &mut page).unwrap();
        assert!(!page.is_empty(), "page {p} empty");
        let height: u32 = page.iter().map(|l| layout.line_cost(l)).sum();
        assert!(height <= layout.max_page_height());
        paged.extend(page.drain(..));
    }

    let whole: Vec<String> = text
        .lines()
        .flat_map(|raw| wrap_text_lines(raw, layout.content_width(), &font))
        .collect();
    assert_eq!(paged, whole);

    for line in &whole {
        assert!(font.string_width(line) <= layout.content_width() || !line.contains(' '));
    }
}

#[test]
fn prefetch_matches_direct_load_on_every_page() {
    let text = mixed_book();
    let ram = RamStorage::new().with("MIXED.TXT", &text);
    let font = HybridFont::ascii_only();
    let mut pm = PageManager::new(&ram, &font, "MIXED.TXT", Layout::DEFAULT);
    let total = pm.precompute_pages().unwrap();

    let mut direct = Vec::new();
    for p in 0..total {
        pm.preload_next_page(p).unwrap();
        if p + 1 < total {
            pm.load_page_content(p + 1, &mut direct).unwrap();
            assert_eq!(pm.cached_lines(p + 1).unwrap(), direct.as_slice());
        } else {
            assert!(!pm.is_page_cached(p + 1));
        }
    }
}

#[test]
fn menu_to_reader_round_trip() {
    let ram = RamStorage::new()
        .with("BOOKS/MIXED.TXT", mixed_book())
        .with("NOTES.TXT", "a note");
    let font = HybridFont::ascii_only();
    let mut fb = FrameBuffer::new(300, 400);

    let chosen = {
        let mut menu = MenuController::new(&ram, &font, &mut fb);
        menu.refresh().unwrap();
        menu.draw().unwrap();
        let mut ev = KeyEvents::NONE;
        ev.key2 = LogicEvent::DoublePress;
        assert_eq!(menu.handle_events(ev).unwrap(), Transition::Redraw);
        match menu.handle_events(ev).unwrap() {
            Transition::Open(path) => path,
            other => panic!("expected a file, got {other:?}"),
        }
    };
    assert_eq!(chosen, "/BOOKS/MIXED.TXT");

    let mut reader = TextReaderController::new(&ram, &font, &mut fb, &chosen);
    reader.open().unwrap();
    assert_eq!(reader.lines()[0], "Chapter 0");
    let mut ev = KeyEvents::NONE;
    ev.key2 = LogicEvent::ShortPress;
    reader.handle_events(ev).unwrap();
    assert_eq!(reader.current_page(), 1);
    assert!(reader.display().rows_have_ink(48, 70));
}
