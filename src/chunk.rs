//! Chunk planning and sequential chunked reads of local files.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of parts needed to cover `size` bytes in chunks of `chunk_size`
/// bytes. The final part may be shorter than `chunk_size`; zero-byte inputs
/// need zero parts.
pub fn part_count(size: u64, chunk_size: u64) -> u64 {
    (size + chunk_size - 1) / chunk_size
}

/// Part count as the v4 mail endpoints derive it: one part per full chunk
/// plus a trailing part. Exceeds [`part_count`] by one exactly when `size`
/// is a multiple of `chunk_size` (including zero).
pub fn mail_part_count(size: u64, chunk_size: u64) -> u64 {
    size / chunk_size + 1
}

/// Reads a local file as successive chunks of up to `chunk_size` bytes.
///
/// The reader is a plain forward cursor over the file: consuming a chunk
/// advances it, and there is no rewind.
#[derive(Debug)]
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
}

impl ChunkReader {
    pub fn open(path: &Path, chunk_size: u64) -> io::Result<Self> {
        if chunk_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "chunk size must be positive",
            ));
        }
        Ok(ChunkReader {
            file: File::open(path)?,
            chunk_size: chunk_size as usize,
        })
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        // A single read may return short of a full chunk before EOF.
        while filled < buf.len() {
            let n = self.file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}
