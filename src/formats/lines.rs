// Buffered raw-line reader.
//
// Pulls the file through a 512-byte block buffer and hands out one
// raw line at a time together with the byte offset where it starts.
// Lines end at '\n'; a '\r' just before it is dropped. A final line
// with no newline is still a line; a trailing newline adds none.

use alloc::vec::Vec;

use crate::drivers::storage::FileHandle;

const BUF_SIZE: usize = 512;

pub struct LineReader<'f> {
    file: &'f mut dyn FileHandle,
    buf: [u8; BUF_SIZE],
    len: usize,
    pos: usize,
    // file offset of buf[pos]
    offset: u32,
    eof: bool,
}

impl<'f> LineReader<'f> {
    pub fn new(file: &'f mut dyn FileHandle, start: u32) -> Result<Self, &'static str> {
        file.seek(start)?;
        Ok(Self {
            file,
            buf: [0u8; BUF_SIZE],
            len: 0,
            pos: 0,
            offset: start,
            eof: false,
        })
    }

    /// Offset of the next unread byte.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Reads the next raw line into `out`; returns its start offset, or
    /// `None` at end of file.
    pub fn next_line(&mut self, out: &mut Vec<u8>) -> Result<Option<u32>, &'static str> {
        out.clear();
        let start = self.offset;
        let mut complete = false;

        while !complete {
            if self.pos == self.len {
                if self.eof || self.fill()? == 0 {
                    break;
                }
                continue;
            }

            let chunk = &self.buf[self.pos..self.len];
            let (take, consumed) = match chunk.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    complete = true;
                    (i, i + 1)
                }
                None => (chunk.len(), chunk.len()),
            };
            out.extend_from_slice(&chunk[..take]);
            self.pos += consumed;
            self.offset += consumed as u32;
        }

        if !complete && out.is_empty() {
            return Ok(None);
        }
        if out.last() == Some(&b'\r') {
            out.pop();
        }
        Ok(Some(start))
    }

    fn fill(&mut self) -> Result<usize, &'static str> {
        let n = self.file.read(&mut self.buf)?;
        self.pos = 0;
        self.len = n;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }
}
