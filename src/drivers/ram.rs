// In-memory storage: text bundled in flash, and the test double for
// the SD card. Paths compare case-insensitively like FAT 8.3 names.

use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::drivers::storage::{DirEntry, FileHandle, FileInfo, Storage, split_path};

struct RamFile {
    path: String,
    data: Vec<u8>,
    modified: u32,
}

pub struct RamStorage {
    files: RefCell<Vec<RamFile>>,
    clock: Cell<u32>,
    ejected: Cell<bool>,
}

impl Default for RamStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl RamStorage {
    pub const fn new() -> Self {
        Self {
            files: RefCell::new(Vec::new()),
            clock: Cell::new(0),
            ejected: Cell::new(false),
        }
    }

    /// Builder form of `insert`.
    pub fn with(self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.insert(path, data.as_ref());
        self
    }

    /// Create or replace a file; every write bumps its stamp.
    pub fn insert(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        let stamp = self.tick();
        let mut files = self.files.borrow_mut();
        match files.iter_mut().find(|f| f.path.eq_ignore_ascii_case(path)) {
            Some(f) => {
                f.data = data.to_vec();
                f.modified = stamp;
            }
            None => files.push(RamFile {
                path: String::from(path),
                data: data.to_vec(),
                modified: stamp,
            }),
        }
    }

    pub fn remove(&self, path: &str) -> bool {
        let path = normalize(path);
        let mut files = self.files.borrow_mut();
        let before = files.len();
        files.retain(|f| !f.path.eq_ignore_ascii_case(path));
        files.len() != before
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalize(path);
        self.files
            .borrow()
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(path))
            .map(|f| f.data.clone())
    }

    /// Simulates a pulled card: every operation fails until reinserted.
    pub fn set_ejected(&self, ejected: bool) {
        self.ejected.set(ejected);
    }

    fn tick(&self) -> u32 {
        let t = self.clock.get().wrapping_add(1);
        self.clock.set(t);
        t
    }

    fn check_present(&self) -> Result<(), &'static str> {
        if self.ejected.get() {
            Err("no card")
        } else {
            Ok(())
        }
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}

struct RamHandle<'a> {
    data: &'a [u8],
    pos: u32,
}

impl FileHandle for RamHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, &'static str> {
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u32;
        Ok(n)
    }

    fn seek(&mut self, offset: u32) -> Result<(), &'static str> {
        if offset as usize > self.data.len() {
            return Err("seek past end");
        }
        self.pos = offset;
        Ok(())
    }

    fn tell(&self) -> u32 {
        self.pos
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

impl Storage for RamStorage {
    fn is_ready(&self) -> bool {
        !self.ejected.get()
    }

    fn with_file<R>(
        &self,
        path: &str,
        f: impl FnOnce(&mut dyn FileHandle) -> Result<R, &'static str>,
    ) -> Result<R, &'static str> {
        self.check_present()?;
        let path = normalize(path);
        let files = self.files.borrow();
        let file = files
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(path))
            .ok_or("open file failed")?;
        let mut handle = RamHandle {
            data: &file.data,
            pos: 0,
        };
        f(&mut handle)
    }

    fn file_info(&self, path: &str) -> Result<FileInfo, &'static str> {
        self.check_present()?;
        let path = normalize(path);
        self.files
            .borrow()
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(path))
            .map(|f| FileInfo {
                size: f.data.len() as u32,
                modified: f.modified,
            })
            .ok_or("file not found")
    }

    fn list_dir(&self, path: &str, mut f: impl FnMut(&DirEntry)) -> Result<(), &'static str> {
        self.check_present()?;
        let dir = normalize(path).trim_end_matches('/');
        let files = self.files.borrow();
        let mut seen_dirs: Vec<&str> = Vec::new();

        for file in files.iter() {
            let rest = if dir.is_empty() {
                file.path.as_str()
            } else {
                match file.path.get(..dir.len()) {
                    Some(head) if head.eq_ignore_ascii_case(dir) => {
                        match file.path[dir.len()..].strip_prefix('/') {
                            Some(rest) => rest,
                            None => continue,
                        }
                    }
                    _ => continue,
                }
            };

            match rest.split_once('/') {
                // file sits in a subdirectory: report the subdirectory once
                Some((sub, _)) => {
                    if !seen_dirs.iter().any(|d| d.eq_ignore_ascii_case(sub)) {
                        seen_dirs.push(sub);
                        f(&DirEntry::new(sub, true, 0));
                    }
                }
                None => f(&DirEntry::new(rest, false, file.data.len() as u32)),
            }
        }
        Ok(())
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<(), &'static str> {
        self.check_present()?;
        let (_, name) = split_path(path);
        if name.is_empty() {
            return Err("open file for write failed");
        }
        self.insert(path, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_seek_tell() {
        let ram = RamStorage::new().with("/A.TXT", b"hello world");
        let out = ram
            .with_file("A.TXT", |f| {
                assert_eq!(f.size(), 11);
                f.seek(6)?;
                let mut buf = [0u8; 16];
                let n = f.read(&mut buf)?;
                assert_eq!(f.tell(), 11);
                assert_eq!(f.read(&mut buf)?, 0);
                Ok(buf[..n].to_vec())
            })
            .unwrap();
        assert_eq!(out, b"world");
    }

    #[test]
    fn missing_file_and_ejected_card_fail() {
        let ram = RamStorage::new().with("A.TXT", b"x");
        assert!(ram.with_file("B.TXT", |_| Ok(())).is_err());
        assert!(ram.is_ready());
        ram.set_ejected(true);
        assert!(!ram.is_ready());
        assert!(ram.with_file("A.TXT", |_| Ok(())).is_err());
        assert!(ram.file_info("A.TXT").is_err());
        ram.set_ejected(false);
        assert!(ram.file_info("a.txt").is_ok());
    }

    #[test]
    fn rewrite_bumps_stamp() {
        let ram = RamStorage::new().with("A.TXT", b"one");
        let before = ram.file_info("A.TXT").unwrap();
        ram.write_file("/A.TXT", b"two").unwrap();
        let after = ram.file_info("A.TXT").unwrap();
        assert_eq!(before.size, after.size);
        assert_ne!(before.modified, after.modified);
        assert_eq!(ram.contents("A.TXT").unwrap(), b"two");
    }

    #[test]
    fn lists_files_and_subdirs_once() {
        let ram = RamStorage::new()
            .with("ROOT.TXT", b"r")
            .with("BOOKS/A.TXT", b"a")
            .with("BOOKS/B.TXT", b"bb")
            .with("BOOKS/OLD/C.TXT", b"c");

        let mut root = Vec::new();
        ram.list_dir("/", |e| root.push((String::from(e.name_str()), e.is_dir)))
            .unwrap();
        assert_eq!(
            root,
            [(String::from("ROOT.TXT"), false), (String::from("BOOKS"), true)]
        );

        let mut books = Vec::new();
        ram.list_dir("/BOOKS", |e| books.push((String::from(e.name_str()), e.size)))
            .unwrap();
        assert_eq!(
            books,
            [
                (String::from("A.TXT"), 1),
                (String::from("B.TXT"), 2),
                (String::from("OLD"), 0)
            ]
        );
    }
}
