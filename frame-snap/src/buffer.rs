//! Memory-backed source and sink handed to the codec engine in place of files.

use bytes::{Bytes, BytesMut};

use crate::error::{Overflow, Result, SnapError};

/// Largest up-front allocation for a sink; the buffer grows on demand up to its capacity.
const SINK_INITIAL_ALLOC: usize = 64 * 1024;

/// Input bytes plus a read cursor. `0 <= cursor <= len` always holds.
#[derive(Debug, Clone)]
pub struct ByteBufferSource {
    data: Bytes,
    cursor: usize,
}

impl ByteBufferSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Copies up to `buf.len()` bytes at the cursor into `buf`.
    ///
    /// Returns `None` once the cursor has reached the end, otherwise the number of bytes
    /// copied, which is smaller than requested when only a partial remainder is left. The
    /// cursor advances by the bytes actually copied.
    pub fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        if self.cursor >= self.data.len() {
            return None;
        }
        let n = buf.len().min(self.data.len() - self.cursor);
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor += n;
        log::trace!("source read {} bytes, cursor={}", n, self.cursor);
        Some(n)
    }
}

/// Bounded output buffer plus a write cursor. Writes past `capacity` are refused, never
/// truncated.
#[derive(Debug)]
pub struct ByteBufferSink {
    data: BytesMut,
    capacity: usize,
    overflow: Option<Overflow>,
}

impl ByteBufferSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity.min(SINK_INITIAL_ALLOC)),
            capacity,
            overflow: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written so far.
    pub fn cursor(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The first write this sink refused, if any.
    pub fn overflow(&self) -> Option<Overflow> {
        self.overflow
    }

    /// Appends `bytes` at the cursor and returns how many were accepted.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let written = self.data.len();
        if bytes.len() > self.capacity || written + bytes.len() > self.capacity {
            let overflow = Overflow {
                requested: bytes.len(),
                written,
                capacity: self.capacity,
            };
            log::error!("sink rejected write: {}", overflow);
            self.overflow.get_or_insert(overflow);
            return Err(SnapError::SinkOverflow(overflow));
        }
        self.data.extend_from_slice(bytes);
        log::trace!("sink wrote {} bytes, cursor={}", bytes.len(), self.data.len());
        Ok(bytes.len())
    }

    /// The `[0, cursor)` slice as an immutable buffer.
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}
