// Reader settings with persistent storage.
// Text-based key=value format in READER.TXT on the card root.

use log::{info, warn};

use crate::drivers::input::ButtonTiming;
use crate::drivers::storage::Storage;
use crate::layout::Layout;

pub const SETTINGS_FILE: &str = "/READER.TXT";
const MAX_SETTINGS_BYTES: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderSettings {
    pub line_height: u16,       // px per text line
    pub paragraph_spacing: u16, // px per blank line
    pub margin: u16,            // px on every screen edge
    pub night_mode: bool,
    pub long_press_ms: u16,
    pub double_press_ms: u16,
    pub debounce_ms: u16,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ReaderSettings {
    pub const fn defaults() -> Self {
        Self {
            line_height: Layout::DEFAULT.line_height,
            paragraph_spacing: Layout::DEFAULT.paragraph_spacing,
            margin: Layout::DEFAULT.margin,
            night_mode: false,
            long_press_ms: 400,
            double_press_ms: 300,
            debounce_ms: 50,
        }
    }

    fn sanitize(&mut self) {
        self.line_height = self.line_height.clamp(16, 64);
        self.paragraph_spacing = self.paragraph_spacing.min(self.line_height);
        self.margin = self.margin.clamp(4, 60);
        self.long_press_ms = self.long_press_ms.clamp(200, 3000);
        self.double_press_ms = self.double_press_ms.clamp(100, 1000);
        self.debounce_ms = self.debounce_ms.clamp(5, 200);
    }

    pub fn to_layout(&self) -> Layout {
        Layout {
            line_height: self.line_height,
            paragraph_spacing: self.paragraph_spacing,
            margin: self.margin,
            ..Layout::DEFAULT
        }
    }

    pub fn timing(&self) -> ButtonTiming {
        ButtonTiming {
            debounce_ms: self.debounce_ms as u32,
            long_press_ms: self.long_press_ms as u32,
            double_press_ms: self.double_press_ms as u32,
        }
    }

    /// Reads `SETTINGS_FILE`; any failure yields the defaults.
    pub fn load<S: Storage>(storage: &S) -> Self {
        let mut buf = [0u8; MAX_SETTINGS_BYTES];
        let read = storage.with_file(SETTINGS_FILE, |f| {
            let mut n = 0;
            while n < buf.len() {
                let got = f.read(&mut buf[n..])?;
                if got == 0 {
                    break;
                }
                n += got;
            }
            Ok(n)
        });

        let mut s = Self::defaults();
        match read {
            Ok(n) if n > 0 => {
                parse_settings_txt(&buf[..n], &mut s);
                s.sanitize();
                info!("settings: loaded from {}", SETTINGS_FILE);
            }
            _ => info!("settings: no file found, using defaults"),
        }
        s
    }

    pub fn save<S: Storage>(&self, storage: &S) -> Result<(), &'static str> {
        let mut buf = [0u8; MAX_SETTINGS_BYTES];
        let n = write_settings_txt(self, &mut buf);
        storage.write_file(SETTINGS_FILE, &buf[..n]).inspect_err(|e| {
            warn!("settings: save failed: {}", e);
        })?;
        info!("settings: saved {} bytes", n);
        Ok(())
    }
}

// Text format parser / writer
fn trim(s: &[u8]) -> &[u8] {
    let mut start = 0;
    let mut end = s.len();
    while start < end && matches!(s[start], b' ' | b'\t' | b'\r') {
        start += 1;
    }
    while end > start && matches!(s[end - 1], b' ' | b'\t' | b'\r') {
        end -= 1;
    }
    &s[start..end]
}

fn parse_u16(s: &[u8]) -> Option<u16> {
    if s.is_empty() {
        return None;
    }
    let mut val: u16 = 0;
    for &b in s {
        if !b.is_ascii_digit() {
            return None;
        }
        val = val.checked_mul(10)?.checked_add((b - b'0') as u16)?;
    }
    Some(val)
}

fn parse_bool(s: &[u8]) -> Option<bool> {
    match s {
        b"1" | b"true" | b"on" => Some(true),
        b"0" | b"false" | b"off" => Some(false),
        _ => None,
    }
}

fn apply_setting(key: &[u8], val: &[u8], s: &mut ReaderSettings) {
    let num = |slot: &mut u16| {
        if let Some(v) = parse_u16(val) {
            *slot = v;
        }
    };
    match key {
        b"line_height" => num(&mut s.line_height),
        b"paragraph_spacing" => num(&mut s.paragraph_spacing),
        b"margin" => num(&mut s.margin),
        b"long_press_ms" => num(&mut s.long_press_ms),
        b"double_press_ms" => num(&mut s.double_press_ms),
        b"debounce_ms" => num(&mut s.debounce_ms),
        b"night_mode" => {
            if let Some(v) = parse_bool(val) {
                s.night_mode = v;
            }
        }
        _ => {} // unknown keys silently ignored for forward compat
    }
}

fn parse_settings_txt(data: &[u8], settings: &mut ReaderSettings) {
    for line in data.split(|&b| b == b'\n') {
        let line = trim(line);
        if line.is_empty() || line[0] == b'#' {
            continue;
        }
        if let Some(eq) = line.iter().position(|&b| b == b'=') {
            let key = trim(&line[..eq]);
            let val = trim(&line[eq + 1..]);
            apply_setting(key, val, settings);
        }
    }
}

// tiny cursor writer for building the text representation
struct TxtWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> TxtWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put(&mut self, data: &[u8]) {
        let n = data.len().min(self.buf.len() - self.pos);
        self.buf[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
    }

    fn put_u16(&mut self, val: u16) {
        let mut digits = [0u8; 5];
        let mut i = 5;
        let mut v = val;
        loop {
            i -= 1;
            digits[i] = b'0' + (v % 10) as u8;
            v /= 10;
            if v == 0 {
                break;
            }
        }
        self.put(&digits[i..]);
    }

    fn kv_num(&mut self, key: &[u8], val: u16) {
        self.put(key);
        self.put(b"=");
        self.put_u16(val);
        self.put(b"\n");
    }
}

fn write_settings_txt(s: &ReaderSettings, buf: &mut [u8]) -> usize {
    let mut wr = TxtWriter::new(buf);
    wr.put(b"# text reader settings\n");
    wr.put(b"# lines starting with # are ignored\n\n");
    wr.kv_num(b"line_height", s.line_height);
    wr.kv_num(b"paragraph_spacing", s.paragraph_spacing);
    wr.kv_num(b"margin", s.margin);
    wr.kv_num(b"night_mode", s.night_mode as u16);
    wr.put(b"\n# buttons, milliseconds\n");
    wr.kv_num(b"long_press_ms", s.long_press_ms);
    wr.kv_num(b"double_press_ms", s.double_press_ms);
    wr.kv_num(b"debounce_ms", s.debounce_ms);
    wr.pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ram::RamStorage;

    #[test]
    fn missing_file_gives_defaults() {
        let ram = RamStorage::new();
        assert_eq!(ReaderSettings::load(&ram), ReaderSettings::defaults());
        assert_eq!(ReaderSettings::defaults().to_layout(), Layout::DEFAULT);
        assert_eq!(ReaderSettings::defaults().timing(), ButtonTiming::default());
    }

    #[test]
    fn parses_known_keys_and_ignores_the_rest() {
        let ram = RamStorage::new().with(
            SETTINGS_FILE,
            "# comment\r\nline_height = 24\r\nnight_mode=on\nfont=huge\nmargin=abc\n",
        );
        let s = ReaderSettings::load(&ram);
        assert_eq!(s.line_height, 24);
        assert!(s.night_mode);
        assert_eq!(s.margin, 20);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let ram = RamStorage::new().with(SETTINGS_FILE, "line_height=2\nparagraph_spacing=90\n");
        let s = ReaderSettings::load(&ram);
        assert_eq!(s.line_height, 16);
        assert_eq!(s.paragraph_spacing, 16);
        assert!(s.to_layout().validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let ram = RamStorage::new();
        let mut s = ReaderSettings::defaults();
        s.night_mode = true;
        s.line_height = 26;
        s.debounce_ms = 0;
        s.save(&ram).unwrap();
        let back = ReaderSettings::load(&ram);
        assert!(back.night_mode);
        assert_eq!(back.line_height, 26);
        // zero is written as "0" and clamped on the way back
        assert_eq!(back.debounce_ms, 5);
    }
}
