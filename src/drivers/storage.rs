// File access seen by the reader: open-run-close per operation.
//
// Every call reopens the volume and walks the path, so no handle ever
// outlives the operation that needed it. SdStorage is the FAT
// implementation; RamStorage (drivers::ram) backs tests and text
// bundled in flash.

use embedded_sdmmc::{BlockDevice, Mode, ShortFileName, TimeSource, Timestamp, VolumeIdx};

use crate::drivers::sdcard::SdStorage;

/// An open file positioned by byte offset.
pub trait FileHandle {
    /// Reads up to `buf.len()` bytes; a short read means end of file,
    /// 0 means already at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, &'static str>;
    fn seek(&mut self, offset: u32) -> Result<(), &'static str>;
    fn tell(&self) -> u32;
    fn size(&self) -> u32;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u32,
    /// Opaque modification stamp; equal stamps mean "not modified".
    pub modified: u32,
}

#[derive(Clone, Copy)]
pub struct DirEntry {
    pub name: [u8; 13],
    pub name_len: u8,
    pub is_dir: bool,
    pub size: u32,
}

impl DirEntry {
    pub const EMPTY: Self = Self {
        name: [0u8; 13],
        name_len: 0,
        is_dir: false,
        size: 0,
    };

    pub fn new(name: &str, is_dir: bool, size: u32) -> Self {
        let mut e = Self::EMPTY;
        let n = name.len().min(13);
        e.name[..n].copy_from_slice(&name.as_bytes()[..n]);
        e.name_len = n as u8;
        e.is_dir = is_dir;
        e.size = size;
        e
    }

    pub fn name_str(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len as usize]).unwrap_or("?")
    }

    // hidden: dot files and app-data dirs
    pub fn is_hidden(&self) -> bool {
        matches!(self.name.first(), Some(b'.' | b'_'))
    }
}

pub trait Storage {
    fn with_file<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut dyn FileHandle) -> Result<R, &'static str>,
    ) -> Result<R, &'static str>;

    fn file_info(&self, path: &str) -> Result<FileInfo, &'static str>;

    fn list_dir(&self, path: &str, f: impl FnMut(&DirEntry)) -> Result<(), &'static str>;

    /// Create or truncate `path` and write `data`.
    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), &'static str>;

    /// False while the medium is missing or unreadable.
    fn is_ready(&self) -> bool {
        true
    }
}

impl<S: Storage> Storage for &S {
    fn with_file<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut dyn FileHandle) -> Result<R, &'static str>,
    ) -> Result<R, &'static str> {
        (**self).with_file(path, f)
    }

    fn file_info(&self, path: &str) -> Result<FileInfo, &'static str> {
        (**self).file_info(path)
    }

    fn list_dir(&self, path: &str, f: impl FnMut(&DirEntry)) -> Result<(), &'static str> {
        (**self).list_dir(path, f)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), &'static str> {
        (**self).write_file(path, data)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

// "/BOOKS/A.TXT" -> ("BOOKS", "A.TXT"); leading slashes ignored
pub fn split_path(path: &str) -> (&str, &str) {
    let path = path.trim_start_matches('/');
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Directory components of a `/`-separated path, root first.
pub fn dir_parts(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|p| !p.is_empty())
}

/// Last path component, used as the page title.
pub fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Parent of a directory path; the root is its own parent.
pub fn parent_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &trimmed[..i],
    }
}

// insertion sort: dirs first, then names case-insensitive
pub fn sort_entries(entries: &mut [DirEntry]) {
    for i in 1..entries.len() {
        let key = entries[i];
        let mut j = i;
        while j > 0 && entry_gt(&entries[j - 1], &key) {
            entries[j] = entries[j - 1];
            j -= 1;
        }
        entries[j] = key;
    }
}

fn entry_gt(a: &DirEntry, b: &DirEntry) -> bool {
    if a.is_dir != b.is_dir {
        return !a.is_dir;
    }
    let an = &a.name[..a.name_len as usize];
    let bn = &b.name[..b.name_len as usize];
    for (&ab, &bb) in an.iter().zip(bn.iter()) {
        match ab.to_ascii_lowercase().cmp(&bb.to_ascii_lowercase()) {
            core::cmp::Ordering::Less => return false,
            core::cmp::Ordering::Greater => return true,
            core::cmp::Ordering::Equal => {}
        }
    }
    an.len() > bn.len()
}

// FAT implementation

impl<D, T, const DIRS: usize, const FILES: usize, const VOLS: usize> FileHandle
    for embedded_sdmmc::File<'_, D, T, DIRS, FILES, VOLS>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, &'static str> {
        let mut total = 0;
        while !self.is_eof() && total < buf.len() {
            let n = embedded_sdmmc::File::read(self, &mut buf[total..])
                .map_err(|_| "read failed")?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn seek(&mut self, offset: u32) -> Result<(), &'static str> {
        self.seek_from_start(offset).map_err(|_| "seek failed")
    }

    fn tell(&self) -> u32 {
        self.offset()
    }

    fn size(&self) -> u32 {
        self.length()
    }
}

// open volume -> root, step into each path component, run body with the dir
macro_rules! with_dir {
    ($sd:expr, $path:expr, |$dir:ident| $body:expr) => {{
        let volume = $sd
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(|_| "open volume failed")?;
        let mut $dir = volume.open_root_dir().map_err(|_| "open root dir failed")?;
        for part in dir_parts($path) {
            $dir.change_dir(part).map_err(|_| "open dir failed")?;
        }
        $body
    }};
}

impl<SPI, DELAY> Storage for SdStorage<SPI, DELAY>
where
    SPI: embedded_hal::spi::SpiDevice,
    DELAY: embedded_hal::delay::DelayNs,
{
    fn with_file<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut dyn FileHandle) -> Result<R, &'static str>,
    ) -> Result<R, &'static str> {
        let (parent, name) = split_path(path);
        with_dir!(self, parent, |dir| {
            let mut file = dir
                .open_file_in_dir(name, Mode::ReadOnly)
                .map_err(|_| "open file failed")?;
            f(&mut file)
        })
    }

    fn file_info(&self, path: &str) -> Result<FileInfo, &'static str> {
        let (parent, name) = split_path(path);
        with_dir!(self, parent, |dir| {
            let entry = dir
                .find_directory_entry(name)
                .map_err(|_| "file not found")?;
            Ok(FileInfo {
                size: entry.size,
                modified: pack_timestamp(&entry.mtime),
            })
        })
    }

    fn list_dir(&self, path: &str, mut f: impl FnMut(&DirEntry)) -> Result<(), &'static str> {
        with_dir!(self, path, |dir| {
            dir.iterate_dir(|entry| {
                if entry.attributes.is_volume() {
                    return;
                }
                let mut out = DirEntry::EMPTY;
                out.name_len = format_83_name(&entry.name, &mut out.name) as u8;
                out.is_dir = entry.attributes.is_directory();
                out.size = entry.size;
                f(&out);
            })
            .map_err(|_| "iterate dir failed")
        })
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), &'static str> {
        let (parent, name) = split_path(path);
        with_dir!(self, parent, |dir| {
            let file = dir
                .open_file_in_dir(name, Mode::ReadWriteCreateOrTruncate)
                .map_err(|_| "open file for write failed")?;
            if !data.is_empty() {
                file.write(data).map_err(|_| "write failed")?;
            }
            file.flush().map_err(|_| "flush failed")?;
            Ok(())
        })
    }

    // volume 0 mounts
    fn is_ready(&self) -> bool {
        self.volume_mgr.open_volume(VolumeIdx(0)).is_ok()
    }
}

// FAT date/time packed into one comparable word
fn pack_timestamp(ts: &Timestamp) -> u32 {
    (ts.year_since_1970 as u32) << 26
        | (ts.zero_indexed_month as u32) << 22
        | (ts.zero_indexed_day as u32) << 17
        | (ts.hours as u32) << 12
        | (ts.minutes as u32) << 6
        | ts.seconds as u32
}

fn format_83_name(sfn: &ShortFileName, out: &mut [u8; 13]) -> usize {
    let base = sfn.base_name();
    let ext = sfn.extension();

    let mut pos = 0;
    for &b in base.iter().take_while(|&&b| b != b' ') {
        out[pos] = b;
        pos += 1;
    }

    let ext_len = ext.iter().position(|&b| b == b' ').unwrap_or(ext.len());
    if ext_len > 0 {
        out[pos] = b'.';
        pos += 1;
        for &b in &ext[..ext_len] {
            out[pos] = b;
            pos += 1;
        }
    }

    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paths() {
        assert_eq!(split_path("/BOOKS/A.TXT"), ("BOOKS", "A.TXT"));
        assert_eq!(split_path("A.TXT"), ("", "A.TXT"));
        assert_eq!(split_path("/X/Y/Z.TXT"), ("X/Y", "Z.TXT"));
    }

    #[test]
    fn nested_dirs_are_walked_in_order() {
        let (parent, name) = split_path("/BOOKS/SCIFI/DUNE.TXT");
        let parts: Vec<&str> = dir_parts(parent).collect();
        assert_eq!(parts, ["BOOKS", "SCIFI"]);
        assert_eq!(name, "DUNE.TXT");
        assert_eq!(dir_parts("//A//B/").collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(dir_parts("/").count(), 0);
        assert_eq!(dir_parts("").count(), 0);
    }

    #[test]
    fn file_name_is_last_component() {
        assert_eq!(file_name("/BOOKS/NOVEL.TXT"), "NOVEL.TXT");
        assert_eq!(file_name("C:\\T\\A.TXT"), "A.TXT");
        assert_eq!(file_name("PLAIN.TXT"), "PLAIN.TXT");
    }

    #[test]
    fn parent_of_nested_and_root() {
        assert_eq!(parent_dir("/BOOKS/SCIFI"), "/BOOKS");
        assert_eq!(parent_dir("/BOOKS"), "/");
        assert_eq!(parent_dir("/"), "/");
    }

    #[test]
    fn sorts_dirs_first_then_names() {
        let mut v = [
            DirEntry::new("b.txt", false, 1),
            DirEntry::new("ZED", true, 0),
            DirEntry::new("A.TXT", false, 1),
            DirEntry::new("alpha", true, 0),
        ];
        sort_entries(&mut v);
        let names: [&str; 4] = core::array::from_fn(|i| v[i].name_str());
        assert_eq!(names, ["alpha", "ZED", "A.TXT", "b.txt"]);
    }

    #[test]
    fn hidden_entries() {
        assert!(DirEntry::new("_CACHE", true, 0).is_hidden());
        assert!(DirEntry::new(".trash", true, 0).is_hidden());
        assert!(!DirEntry::new("BOOK.TXT", false, 0).is_hidden());
    }
}
