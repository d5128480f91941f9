//! Block-wise journal reading
//!
//! Journal blocks are independent of the variable record boundaries inside
//! them, so the reader can push back an unconsumed suffix to have it read
//! again together with the next block.

use crate::error::{Result, UsnJrnlError};
use crate::logging;
use std::io::{Read, Seek, SeekFrom};

/// Default block size, matching common buffered IO defaults
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Sequential block reader over a seekable journal stream
pub struct BlockReader<R> {
    inner: R,
    block_size: usize,
    /// Bytes pushed back by the last rewind, re-read on top of the next block
    pending: usize,
    /// Set once a read came back shorter than requested
    exhausted: bool,
}

impl<R: Read + Seek> BlockReader<R> {
    pub fn new(inner: R, block_size: usize) -> Self {
        Self {
            inner,
            block_size: block_size.max(1),
            pending: 0,
            exhausted: false,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether the underlying stream has reported end of data
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Current position in the underlying stream
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Read the next block.
    ///
    /// After [`rewind`](Self::rewind) the block also carries the pushed back
    /// bytes in front, so every call returns up to `block_size` new bytes.
    /// An empty block means the stream is exhausted.
    pub fn next_block(&mut self) -> Result<Vec<u8>> {
        let requested = self.block_size + self.pending;
        self.pending = 0;

        let mut block = Vec::with_capacity(requested);
        (&mut self.inner)
            .take(requested as u64)
            .read_to_end(&mut block)?;

        if block.len() < requested {
            self.exhausted = true;
        }

        Ok(block)
    }

    /// Move the stream back by `len` bytes so they are read again
    pub fn rewind(&mut self, len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }

        let offset = i64::try_from(len)
            .map_err(|_| UsnJrnlError::InvalidConfig(format!("rewind of {} bytes", len)))?;
        let position = self.inner.seek(SeekFrom::Current(-offset))?;
        logging::log_rewind(position, len);

        self.pending += len;
        Ok(())
    }

    /// Release the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Iterator for BlockReader<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_block() {
            Ok(block) if block.is_empty() => None,
            other => Some(other),
        }
    }
}

// ============================================================================
// Padding
// ============================================================================

/// Number of leading bytes to drop from `data` as padding.
///
/// All leading zero bytes count as padding except the last `removed % 8`,
/// which are kept so the following header stays 8-byte aligned.
pub fn padding_len(data: &[u8]) -> usize {
    let removed = data.iter().take_while(|&&b| b == 0).count();
    removed - removed % 8
}

/// Strip leading zero padding, re-adding `removed % 8` zero bytes
pub fn strip_padding(data: &[u8]) -> Vec<u8> {
    data[padding_len(data)..].to_vec()
}
