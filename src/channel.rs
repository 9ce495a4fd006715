//! Interrupt-safe ring for `no_std` environments.
//!
//! Wraps [`CircularBuffer`] in a `critical-section` mutex so a foreground
//! producer and an interrupt consumer (or the other way round) never
//! interleave their index updates. Every access is a short masked section
//! released on all exit paths.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::ring_buffer::{CircularBuffer, PushError};

/// A bounded ring shared between execution contexts.
pub struct SharedRing<T, const SIZE: usize> {
    inner: Mutex<RefCell<CircularBuffer<T, SIZE>>>,
}

impl<T: Copy, const SIZE: usize> SharedRing<T, SIZE> {
    /// Create an empty ring with storage filled with `value`.
    pub const fn filled(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(CircularBuffer::filled(value))),
        }
    }

    /// Get a producer handle for this ring.
    pub const fn producer(&self) -> Producer<'_, T, SIZE> {
        Producer { ring: self }
    }

    /// Get a consumer handle for this ring.
    ///
    /// Only one context should drain the ring.
    pub const fn consumer(&self) -> Consumer<'_, T, SIZE> {
        Consumer { ring: self }
    }

    /// Push a value.
    ///
    /// Returns `Err(PushError(value))` if the ring is full.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).push(value))
    }

    /// Pop the oldest value, `None` if the ring is empty.
    pub fn pop(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_empty())
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }
}

impl<T: Copy + Default, const SIZE: usize> SharedRing<T, SIZE> {
    /// Create an empty ring with zeroed storage.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(CircularBuffer::new())),
        }
    }

    /// Drop everything queued and zero the storage.
    pub fn clear(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }
}

impl<T: Copy + Default, const SIZE: usize> Default for SharedRing<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing end of a [`SharedRing`].
#[derive(Clone, Copy)]
pub struct Producer<'a, T, const SIZE: usize> {
    ring: &'a SharedRing<T, SIZE>,
}

impl<T: Copy, const SIZE: usize> Producer<'_, T, SIZE> {
    /// Returns `Err(PushError(value))` if the ring is full.
    pub fn push(&self, value: T) -> Result<(), PushError<T>> {
        self.ring.push(value)
    }
}

/// Reading end of a [`SharedRing`].
#[derive(Clone, Copy)]
pub struct Consumer<'a, T, const SIZE: usize> {
    ring: &'a SharedRing<T, SIZE>,
}

impl<T: Copy, const SIZE: usize> Consumer<'_, T, SIZE> {
    /// Returns `None` if the ring is empty.
    pub fn pop(&self) -> Option<T> {
        self.ring.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
