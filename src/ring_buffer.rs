//! Fixed-capacity circular buffer.
//!
//! The buffer never overwrites: when it is full the newest value is handed
//! back to the caller, who has to treat that as backpressure.
//!
//! There is no synchronisation here. Use [`crate::channel::SharedRing`] when
//! the producer and consumer run in different interrupt contexts.

use core::fmt;

/// Error returned when pushing into a full buffer.
///
/// Carries the rejected value back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Get back the value that was not pushed
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("circular buffer is full")
    }
}

/// FIFO ring of `N` elements of type `T`.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T, const N: usize> {
    storage: [T; N],
    /// Next slot to write
    head: usize,
    /// Next slot to read
    tail: usize,
    count: usize,
}

impl<T: Copy + Default, const N: usize> CircularBuffer<T, N> {
    /// Create an empty buffer with zeroed storage.
    pub fn new() -> Self {
        Self::filled(T::default())
    }

    /// Empty the buffer and zero its storage.
    pub fn clear(&mut self) {
        self.storage = [T::default(); N];
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Create an empty buffer whose storage is filled with `value`.
    ///
    /// Usable in `const` and `static` initialisers.
    pub const fn filled(value: T) -> Self {
        Self {
            storage: [value; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Push a value at the head.
    ///
    /// Returns `Err(PushError(value))` if the buffer is full; the stored
    /// values are left untouched.
    pub fn push(&mut self, value: T) -> Result<(), PushError<T>> {
        if self.count == N {
            return Err(PushError(value));
        }
        self.storage[self.head] = value;
        self.head = Self::advance(self.head);
        self.count += 1;
        Ok(())
    }

    /// Pop the oldest value.
    ///
    /// Returns `None` if the buffer is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let value = self.storage[self.tail];
        self.tail = Self::advance(self.tail);
        self.count -= 1;
        Some(value)
    }

    /// Look at the oldest value without removing it.
    pub fn peek(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.storage[self.tail])
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn is_full(&self) -> bool {
        self.count == N
    }

    /// Number of stored values
    pub const fn len(&self) -> usize {
        self.count
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    const fn advance(index: usize) -> usize {
        if index + 1 == N { 0 } else { index + 1 }
    }
}

impl<T: Copy + Default, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
