// File menu: browse the card and pick a file.
//
// KEY1 short  up                  KEY2 short  down
// KEY2 double open dir / file     KEY1 double parent dir, or leave at root

use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::apps::{TICK_MS, Transition, show_error};
use crate::drivers::display::Panel;
use crate::drivers::input::{InputSource, KeyEvents, LogicEvent};
use crate::drivers::storage::{DirEntry, Storage, parent_dir, sort_entries};
use crate::fonts::{HybridFont, WideGlyphs};
use crate::layout::Layout;
use crate::ui::{MenuRenderer, PageRenderer};

pub struct MenuController<'a, S, G, D>
where
    S: Storage,
    G: WideGlyphs,
    D: Panel,
{
    storage: &'a S,
    font: &'a HybridFont<G>,
    display: &'a mut D,
    layout: Layout,
    dir: String,
    entries: Vec<DirEntry>,
    selected: usize,
}

fn join(dir: &str, name: &str) -> String {
    let mut p = String::from(dir.trim_end_matches('/'));
    p.push('/');
    p.push_str(name);
    p
}

impl<'a, S, G, D> MenuController<'a, S, G, D>
where
    S: Storage,
    G: WideGlyphs,
    D: Panel,
{
    pub fn new(storage: &'a S, font: &'a HybridFont<G>, display: &'a mut D) -> Self {
        Self {
            storage,
            font,
            display,
            layout: Layout::DEFAULT,
            dir: String::from("/"),
            entries: Vec::new(),
            selected: 0,
        }
    }

    pub fn current_dir(&self) -> &str {
        &self.dir
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn display(&self) -> &D {
        &*self.display
    }

    /// Full path of the highlighted entry if it is a file.
    pub fn selected_file(&self) -> Option<String> {
        self.entries
            .get(self.selected)
            .filter(|e| !e.is_dir)
            .map(|e| join(&self.dir, e.name_str()))
    }

    /// Re-lists the current directory and selects the first entry.
    pub fn refresh(&mut self) -> Result<(), &'static str> {
        if !self.storage.is_ready() {
            warn!("menu: no card");
            return Err("no sd card");
        }
        let mut entries = Vec::new();
        self.storage
            .list_dir(&self.dir, |e| {
                if !e.is_hidden() {
                    entries.push(*e);
                }
            })
            .inspect_err(|e| warn!("menu: listing {} failed: {}", self.dir, e))?;
        sort_entries(&mut entries);
        info!("menu: {} has {} entries", self.dir, entries.len());
        self.entries = entries;
        self.selected = 0;
        Ok(())
    }

    pub fn draw(&mut self) -> Result<(), &'static str> {
        let r = MenuRenderer::new(self.font, self.layout);
        r.draw_menu(&mut *self.display, &self.entries, self.selected, &self.dir)
    }

    pub fn move_up(&mut self) -> bool {
        if self.selected > 0 {
            self.selected -= 1;
            return true;
        }
        false
    }

    pub fn move_down(&mut self) -> bool {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
            return true;
        }
        false
    }

    pub fn select(&mut self) -> Result<Transition, &'static str> {
        let Some(entry) = self.entries.get(self.selected).copied() else {
            return Ok(Transition::None);
        };
        let path = join(&self.dir, entry.name_str());
        if entry.is_dir {
            info!("menu: enter {}", path);
            self.dir = path;
            self.refresh()?;
            return Ok(Transition::Redraw);
        }
        info!("menu: open {}", path);
        Ok(Transition::Open(path))
    }

    pub fn back(&mut self) -> Result<Transition, &'static str> {
        if self.dir == "/" {
            info!("menu: leave");
            return Ok(Transition::Exit);
        }
        self.dir = String::from(parent_dir(&self.dir));
        self.refresh()?;
        Ok(Transition::Redraw)
    }

    pub fn handle_events(&mut self, ev: KeyEvents) -> Result<Transition, &'static str> {
        if ev.combo == LogicEvent::ComboPress {
            debug!("menu: combo ignored");
            return Ok(Transition::None);
        }

        let t = if ev.key2 == LogicEvent::DoublePress {
            self.select()?
        } else if ev.key1 == LogicEvent::DoublePress {
            self.back()?
        } else if ev.key1 == LogicEvent::ShortPress && self.move_up() {
            Transition::Redraw
        } else if ev.key2 == LogicEvent::ShortPress && self.move_down() {
            Transition::Redraw
        } else {
            Transition::None
        };

        if t == Transition::Redraw {
            self.draw()?;
        }
        Ok(t)
    }

    /// Blocking loop; `Ok(Some(path))` for a chosen file, `Ok(None)` when
    /// the user leaves the root.
    pub fn run<I, T>(&mut self, input: &mut I, delay: &mut T) -> Result<Option<String>, &'static str>
    where
        I: InputSource,
        T: DelayNs,
    {
        let res = self.refresh().and_then(|_| self.draw());
        if let Err(e) = res {
            return self.fail(e, delay);
        }
        loop {
            match self.handle_events(input.poll()) {
                Ok(Transition::Open(path)) => return Ok(Some(path)),
                Ok(Transition::Exit) => return Ok(None),
                Ok(_) => {}
                Err(e) => return self.fail(e, delay),
            }
            delay.delay_ms(TICK_MS);
        }
    }

    fn fail<T: DelayNs>(
        &mut self,
        msg: &'static str,
        delay: &mut T,
    ) -> Result<Option<String>, &'static str> {
        let renderer = PageRenderer::new(self.font, self.layout);
        show_error(&renderer, &mut *self.display, msg, delay);
        Err(msg)
    }
}
