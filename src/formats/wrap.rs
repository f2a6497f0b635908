// Width-constrained line wrapping.
//
// Units are either one wide character (any 3-byte UTF-8 sequence,
// which covers CJK) or one space-delimited Latin word. Words never run
// into a wide character. A unit that does not fit starts a new line;
// a unit wider than the whole line sits alone and overflows.
// An empty line wraps to one blank sub-line; a line of only spaces
// wraps to nothing.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::fonts::TextMetrics;

#[inline]
fn is_wide_lead(b: u8) -> bool {
    (0xE0..=0xEF).contains(&b)
}

pub fn wrap_text_lines<M>(raw: &str, max_width: u32, measure: &M) -> Vec<String>
where
    M: TextMetrics + ?Sized,
{
    if raw.is_empty() {
        // paragraph break
        return vec![String::new()];
    }

    let bytes = raw.as_bytes();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut candidate = String::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (unit, separated) = if is_wide_lead(bytes[pos]) {
            let unit = &raw[pos..pos + 3];
            pos += 3;
            (unit, false)
        } else {
            let end = bytes[pos..]
                .iter()
                .position(|&b| b == b' ' || is_wide_lead(b))
                .map_or(bytes.len(), |i| pos + i);
            let word = &raw[pos..end];
            pos = end;
            if bytes.get(pos) == Some(&b' ') {
                pos += 1;
            }
            // runs of spaces collapse to the single separator
            if word.is_empty() {
                continue;
            }
            (word, true)
        };

        candidate.clear();
        candidate.push_str(&current);
        if separated && !current.is_empty() {
            candidate.push(' ');
        }
        candidate.push_str(unit);

        if measure.string_width(&candidate) <= max_width {
            core::mem::swap(&mut current, &mut candidate);
        } else {
            if !current.is_empty() {
                lines.push(core::mem::take(&mut current));
            }
            current.push_str(unit);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
