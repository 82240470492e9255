//! Line-aligned splitting of the input into byte ranges for parallel workers
//!
//! Every range starts at offset 0 or immediately after a `\n`, so no line is
//! split between two workers and the ranges tile `[0, len)` exactly.

use crate::constants::{BOUNDARY_SCAN_BLOCK, LINE_TERMINATOR};
use memchr::{memchr, memchr_iter};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::debug;

/// A contiguous byte range of the input handled by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Plan up to `chunk_count` line-aligned ranges over an input of `len` bytes.
///
/// Ranges are never smaller than `min_chunk_bytes` except the last one, and
/// each boundary is moved forward to just past the next line terminator.
pub fn plan_chunks<R: Read + Seek>(
    reader: &mut R,
    len: u64,
    chunk_count: usize,
    min_chunk_bytes: u64,
) -> io::Result<Vec<ByteRange>> {
    if len == 0 {
        return Ok(Vec::new());
    }

    let chunk_count = chunk_count.max(1) as u64;
    let target = len.div_ceil(chunk_count).max(min_chunk_bytes.max(1));

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < len {
        let tentative = start + target;
        let end = if tentative >= len {
            len
        } else {
            // Scanning from tentative - 1 keeps a boundary that already sits after '\n'
            find_line_end(reader, tentative - 1, len)?
        };
        ranges.push(ByteRange {
            index: ranges.len(),
            start,
            end,
        });
        start = end;
    }

    debug!(
        "Planned {} chunks over {} bytes (target {} bytes each)",
        ranges.len(),
        len,
        target
    );
    Ok(ranges)
}

/// Offset just past the first `\n` at or after `from`, or `len` if there is none
fn find_line_end<R: Read + Seek>(reader: &mut R, from: u64, len: u64) -> io::Result<u64> {
    reader.seek(SeekFrom::Start(from))?;
    let mut block = vec![0u8; BOUNDARY_SCAN_BLOCK];
    let mut offset = from;

    while offset < len {
        let read = reader.read(&mut block)?;
        if read == 0 {
            break;
        }
        if let Some(position) = memchr(LINE_TERMINATOR, &block[..read]) {
            return Ok((offset + position as u64 + 1).min(len));
        }
        offset += read as u64;
    }

    Ok(len)
}

/// Count line terminators in `[0, end)`, i.e. the number of lines before a chunk
pub fn count_lines_before<R: Read + Seek>(reader: &mut R, end: u64) -> io::Result<u64> {
    reader.seek(SeekFrom::Start(0))?;
    let mut limited = reader.take(end);
    let mut block = vec![0u8; BOUNDARY_SCAN_BLOCK];
    let mut lines = 0u64;

    loop {
        let read = limited.read(&mut block)?;
        if read == 0 {
            break;
        }
        lines += memchr_iter(LINE_TERMINATOR, &block[..read]).count() as u64;
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn plan(data: &str, chunks: usize, min_chunk: u64) -> Vec<ByteRange> {
        let mut cursor = Cursor::new(data.as_bytes());
        plan_chunks(&mut cursor, data.len() as u64, chunks, min_chunk).unwrap()
    }

    fn assert_tiles_and_aligned(data: &str, ranges: &[ByteRange]) {
        let bytes = data.as_bytes();
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(bytes.len() as u64));

        for (i, range) in ranges.iter().enumerate() {
            assert_eq!(range.index, i);
            assert!(!range.is_empty());
            if range.start > 0 {
                assert_eq!(bytes[range.start as usize - 1], b'\n', "range {i} not aligned");
            }
        }
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_empty_input_has_no_chunks() {
        assert!(plan("", 4, 1).is_empty());
    }

    #[test]
    fn test_chunks_are_line_aligned_and_cover_input() {
        let data = "Rome;12.0\nOslo;-3.5\nPalmerston North;23.2\nNuuk;-10.5\nAbha;1.0\n";
        for workers in 1..=8 {
            let ranges = plan(data, workers, 1);
            assert_tiles_and_aligned(data, &ranges);
            assert!(ranges.len() <= workers.max(1));
        }
    }

    #[test]
    fn test_no_line_is_split_or_repeated() {
        let data = "A;1.0\nBB;2.0\nCCC;3.0\nDDDD;4.0\nEEEEE;5.0\nF;6.0\n";
        let ranges = plan(data, 3, 1);

        let mut lines = Vec::new();
        for range in &ranges {
            let chunk = &data[range.start as usize..range.end as usize];
            assert!(chunk.ends_with('\n'));
            lines.extend(chunk.lines());
        }
        assert_eq!(lines, data.lines().collect::<Vec<_>>());
    }

    #[test]
    fn test_min_chunk_size_limits_chunk_count() {
        let data = "A;1.0\n".repeat(100);
        let ranges = plan(&data, 16, 200);
        assert!(ranges.len() <= 3);
        assert_tiles_and_aligned(&data, &ranges);
    }

    #[test]
    fn test_input_without_trailing_newline() {
        let data = "A;1.0\nB;2.0\nC;3.0";
        let ranges = plan(data, 2, 1);
        assert_tiles_and_aligned(data, &ranges);
        assert!(data[ranges.last().unwrap().start as usize..].ends_with("C;3.0"));
    }

    #[test]
    fn test_single_long_line_stays_in_one_chunk() {
        let data = format!("{};1.0\n", "x".repeat(500));
        let ranges = plan(&data, 4, 1);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].len(), data.len() as u64);
    }

    #[test]
    fn test_count_lines_before() {
        let data = "A;1.0\nB;2.0\nC;3.0\n";
        let mut cursor = Cursor::new(data.as_bytes());
        assert_eq!(count_lines_before(&mut cursor, 0).unwrap(), 0);
        assert_eq!(count_lines_before(&mut cursor, 6).unwrap(), 1);
        assert_eq!(count_lines_before(&mut cursor, 12).unwrap(), 2);
        assert_eq!(count_lines_before(&mut cursor, data.len() as u64).unwrap(), 3);
    }
}
