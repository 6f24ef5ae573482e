use std::collections::TryReserveError;

/// Default growth step, also the initial capacity of a listing buffer.
pub const DEFAULT_INCREMENT: usize = 65535;

#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("unable to grow buffer to {requested} bytes: {source}")]
    Allocation {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Owned byte storage that grows by a fixed increment whenever an append
/// would run past its capacity. Bytes already written are never moved out
/// of order or dropped by a growth step.
#[derive(Debug)]
pub struct GrowableBuffer {
    data: Vec<u8>,
    capacity: usize,
    increment: usize,
}

impl GrowableBuffer {
    pub fn new() -> GrowableBuffer {
        GrowableBuffer::with_increment(DEFAULT_INCREMENT)
    }

    /// Starts with one increment of capacity; `increment` must be non-zero.
    pub fn with_increment(increment: usize) -> GrowableBuffer {
        let increment = increment.max(1);
        GrowableBuffer {
            data: Vec::new(),
            capacity: 0,
            increment,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Makes room for `additional` more bytes, growing in whole increments.
    pub fn reserve(&mut self, additional: usize) -> Result<(), BufferError> {
        let needed = self.data.len() + additional;
        if needed <= self.capacity {
            return Ok(());
        }

        let mut target = self.capacity.max(self.increment);
        while target < needed {
            target += self.increment;
        }

        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|source| BufferError::Allocation {
                requested: target,
                source,
            })?;
        self.capacity = target;
        Ok(())
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn append_str(&mut self, s: &str) -> Result<(), BufferError> {
        self.append(s.as_bytes())
    }
}

impl Default for GrowableBuffer {
    fn default() -> GrowableBuffer {
        GrowableBuffer::new()
    }
}
