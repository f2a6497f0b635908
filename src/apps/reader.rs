// Text reader: one file, one page on screen.
//
// KEY1 short  previous page       KEY2 short  next page
// KEY1 long   back to the menu    KEY1+KEY2   day/night mode
// double presses are reserved
//
// Every page change materialises the page (from the prefetch slot when
// it holds it), draws it, then reads the following page ahead.

use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::apps::{TICK_MS, Transition, show_error};
use crate::drivers::display::Panel;
use crate::drivers::input::{InputSource, KeyEvents, LogicEvent};
use crate::drivers::storage::{Storage, file_name};
use crate::fonts::{HybridFont, WideGlyphs};
use crate::formats::PageManager;
use crate::settings::ReaderSettings;
use crate::ui::PageRenderer;

const TIP_FIRST: &str = "First page";
const TIP_LAST: &str = "Last page";
const TIP_NIGHT: &str = "Night mode";
const TIP_DAY: &str = "Day mode";
const TIP_CHANGED: &str = "File changed";

pub struct TextReaderController<'a, S, G, D>
where
    S: Storage,
    G: WideGlyphs,
    D: Panel,
{
    pages: PageManager<&'a S, &'a HybridFont<G>>,
    display: &'a mut D,
    settings: ReaderSettings,
    current_page: usize,
    lines: Vec<String>,
    // shown once with the next drawn page
    tip: &'static str,
}

impl<'a, S, G, D> TextReaderController<'a, S, G, D>
where
    S: Storage,
    G: WideGlyphs,
    D: Panel,
{
    pub fn new(storage: &'a S, font: &'a HybridFont<G>, display: &'a mut D, path: &str) -> Self {
        let settings = ReaderSettings::load(storage);
        let layout = settings.to_layout();
        Self {
            pages: PageManager::new(storage, font, path, layout),
            display,
            settings,
            current_page: 0,
            lines: Vec::new(),
            tip: "",
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn total_pages(&self) -> usize {
        self.pages.total_pages()
    }

    /// Lines of the page on screen.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn pages(&self) -> &PageManager<&'a S, &'a HybridFont<G>> {
        &self.pages
    }

    pub fn display(&self) -> &D {
        &*self.display
    }

    pub fn title(&self) -> &str {
        file_name(self.pages.path())
    }

    /// Paginates the file and shows the first page.
    pub fn open(&mut self) -> Result<(), &'static str> {
        if !self.display.is_ready() {
            warn!("reader: display not ready");
            return Err("display not ready");
        }
        if !self.pages.storage().is_ready() {
            warn!("reader: no card");
            return Err("no sd card");
        }
        self.display.set_night_mode(self.settings.night_mode);
        self.current_page = 0;
        self.reload_file()?;
        info!("reader: opened {} ({} pages)", self.pages.path(), self.total_pages());
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<Transition, &'static str> {
        if self.current_page + 1 >= self.total_pages() {
            self.tip = TIP_LAST;
        } else {
            self.current_page += 1;
        }
        self.update_display()?;
        Ok(Transition::Redraw)
    }

    pub fn prev_page(&mut self) -> Result<Transition, &'static str> {
        if self.current_page == 0 {
            self.tip = TIP_FIRST;
        } else {
            self.current_page -= 1;
        }
        self.update_display()?;
        Ok(Transition::Redraw)
    }

    pub fn jump_to_page(&mut self, page: usize) -> Result<Transition, &'static str> {
        if page >= self.total_pages() {
            warn!("reader: jump to {} of {} refused", page, self.total_pages());
            return Err("page out of range");
        }
        self.current_page = page;
        self.update_display()?;
        Ok(Transition::Redraw)
    }

    /// Flips day/night mode, persists it and redraws.
    pub fn toggle_mode(&mut self) -> Result<Transition, &'static str> {
        self.settings.night_mode = !self.settings.night_mode;
        self.display.set_night_mode(self.settings.night_mode);
        self.tip = if self.settings.night_mode {
            TIP_NIGHT
        } else {
            TIP_DAY
        };
        if let Err(e) = self.settings.save(self.pages.storage()) {
            // mode still applies for this session
            warn!("reader: night mode not persisted: {}", e);
        }
        self.update_display()?;
        Ok(Transition::Redraw)
    }

    /// Repaginates from scratch, keeping the page number when it still exists.
    pub fn reload_file(&mut self) -> Result<(), &'static str> {
        let total = self.pages.precompute_pages()?;
        self.current_page = self.current_page.min(total.saturating_sub(1));
        self.update_display()
    }

    /// Draws the current page.
    pub fn update_display(&mut self) -> Result<(), &'static str> {
        if self.pages.check_file_changed()? {
            let total = self.pages.precompute_pages()?;
            self.current_page = self.current_page.min(total.saturating_sub(1));
            if total > 0 {
                self.tip = TIP_CHANGED;
            }
        }

        match self.pages.take_cached(self.current_page) {
            Some(lines) => {
                debug!("reader: page {} from prefetch", self.current_page);
                self.lines = lines;
            }
            None => self
                .pages
                .load_page_content(self.current_page, &mut self.lines)?,
        }

        let renderer = PageRenderer::new(*self.pages.metrics(), *self.pages.layout());
        renderer.show_static_page(
            &mut *self.display,
            self.current_page,
            &self.lines,
            self.pages.total_pages(),
            file_name(self.pages.path()),
            self.tip,
        )?;
        self.tip = "";

        if let Err(e) = self.pages.preload_next_page(self.current_page) {
            warn!("reader: prefetch after page {} failed: {}", self.current_page, e);
        }
        Ok(())
    }

    pub fn handle_events(&mut self, ev: KeyEvents) -> Result<Transition, &'static str> {
        if ev.combo == LogicEvent::ComboPress {
            return self.toggle_mode();
        }
        if ev.key1 == LogicEvent::LongPress {
            info!("reader: exit");
            return Ok(Transition::Exit);
        }
        if ev.key1 == LogicEvent::DoublePress || ev.key2 == LogicEvent::DoublePress {
            debug!("reader: double press ignored");
            return Ok(Transition::None);
        }
        if ev.key1 == LogicEvent::ShortPress {
            return self.prev_page();
        }
        if ev.key2 == LogicEvent::ShortPress {
            return self.next_page();
        }
        Ok(Transition::None)
    }

    /// Blocking loop: returns `Ok` when the user leaves, `Err` after the
    /// error screen has counted down.
    pub fn run<I, T>(&mut self, input: &mut I, delay: &mut T) -> Result<(), &'static str>
    where
        I: InputSource,
        T: DelayNs,
    {
        if let Err(e) = self.open() {
            return self.fail(e, delay);
        }
        loop {
            match self.handle_events(input.poll()) {
                Ok(Transition::Exit) => return Ok(()),
                Ok(_) => {}
                Err(e) => return self.fail(e, delay),
            }
            delay.delay_ms(TICK_MS);
        }
    }

    fn fail<T: DelayNs>(&mut self, msg: &'static str, delay: &mut T) -> Result<(), &'static str> {
        let renderer = PageRenderer::new(*self.pages.metrics(), *self.pages.layout());
        show_error(&renderer, &mut *self.display, msg, delay);
        Err(msg)
    }
}
