//! LED transmit engine
//!
//! Owns two frame buffers and a two-half staging buffer. `refresh` makes the
//! *next* frame current and starts the generator; from then on the reload
//! interrupts refill whichever staging half the peripheral just finished,
//! one pixel at a time, followed by the reset interval. A strip of any length
//! is sent with two pixels of staging memory.

mod shared;

pub use shared::SharedEngine;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use core::fmt;

use crate::WaveformDriver;
use crate::color::{BLACK, Rgb};
use crate::waveform::{EncodingStagingBuffer, StagingHalf, WaveformTiming};

/// Largest strip the engine addresses by default.
pub const DEFAULT_MAX_LEDS: usize = 1000;

/// Handler invoked from the reload interrupt once a frame and its reset
/// interval are out.
///
/// Runs in interrupt context and must not block.
pub trait TransferCompleteHandler {
    fn on_transfer_complete(&mut self);
}

impl<F: FnMut()> TransferCompleteHandler for F {
    fn on_transfer_complete(&mut self) {
        self();
    }
}

/// Placeholder handler type for engines without a callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallback;

impl TransferCompleteHandler for NoCallback {
    fn on_transfer_complete(&mut self) {}
}

/// Error returned by the non-blocking refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshError {
    /// The previous frame is still being sent
    Busy,
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("transfer in flight"),
        }
    }
}

/// Double-buffered WS2812 frame store and bit encoder.
///
/// `MAX_LEDS` bounds the addressable pixels; `C` is the transfer-complete
/// handler type.
pub struct TransmitEngine<D, const MAX_LEDS: usize = DEFAULT_MAX_LEDS, C = NoCallback> {
    driver: D,
    timing: WaveformTiming,

    frames: [[Rgb; MAX_LEDS]; 2],
    /// Index of the frame being (or last) sent; the other one is *next*
    current: usize,

    staging: EncodingStagingBuffer,
    /// Next pixel of `current` to stage
    cursor: usize,
    /// Pixels in the frame being sent
    led_count: usize,
    /// Which staging halves currently hold a reset refill
    reset_halves: [bool; 2],
    /// Reset refills played out so far
    reset_played: u8,

    in_flight: bool,
    /// One-shot latch, set when a transfer finishes
    finished: bool,
    on_complete: Option<C>,
}

impl<D, const MAX_LEDS: usize, C> TransmitEngine<D, MAX_LEDS, C>
where
    D: WaveformDriver,
    C: TransferCompleteHandler,
{
    /// Create an idle engine with both frames black.
    ///
    /// The completion latch starts set: an idle engine reports one finished
    /// transfer.
    pub const fn new(driver: D, timing: WaveformTiming) -> Self {
        Self {
            driver,
            timing,
            frames: [[BLACK; MAX_LEDS]; 2],
            current: 0,
            staging: EncodingStagingBuffer::new(),
            cursor: 0,
            led_count: 0,
            reset_halves: [false; 2],
            reset_played: 0,
            in_flight: false,
            finished: true,
            on_complete: None,
        }
    }

    /// Write a pixel of the next frame.
    ///
    /// Indices past `MAX_LEDS` are ignored.
    pub fn set_pixel(&mut self, index: usize, color: Rgb) {
        let next = self.next_index();
        if let Some(pixel) = self.frames[next].get_mut(index) {
            *pixel = color;
        }
    }

    /// Set the first `count` pixels of the next frame to `color`.
    pub fn set_all(&mut self, count: usize, color: Rgb) {
        for index in 0..count.min(MAX_LEDS) {
            self.set_pixel(index, color);
        }
    }

    /// Read a pixel of the next frame, black if out of range.
    pub fn get_pixel(&self, index: usize) -> Rgb {
        self.frames[self.next_index()]
            .get(index)
            .copied()
            .unwrap_or(BLACK)
    }

    /// Read a pixel of the frame on the wire (or last sent).
    pub fn current_pixel(&self, index: usize) -> Rgb {
        self.frames[self.current]
            .get(index)
            .copied()
            .unwrap_or(BLACK)
    }

    /// Check if a transfer is in flight
    pub const fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Swap frames and start sending the first `led_count` pixels.
    ///
    /// Returns `Err(RefreshError::Busy)` without touching anything while the
    /// previous transfer is in flight. `led_count` is clamped to `MAX_LEDS`.
    pub fn try_refresh(&mut self, led_count: usize) -> Result<(), RefreshError> {
        if self.in_flight {
            return Err(RefreshError::Busy);
        }

        self.current = self.next_index();
        // Keep the next frame in step with what is being sent
        self.frames[self.next_index()] = self.frames[self.current];

        self.led_count = led_count.min(MAX_LEDS);
        self.cursor = 0;
        self.reset_played = 0;
        self.in_flight = true;
        self.finished = false;

        self.refill(StagingHalf::First);
        self.refill(StagingHalf::Second);

        #[cfg(feature = "esp32-log")]
        println!("[TransmitEngine.refresh] sending {} pixels", self.led_count);

        self.driver.start(self.staging.as_slice());
        Ok(())
    }

    /// Take the completion latch.
    ///
    /// Returns `true` once per finished transfer. Single consumer only.
    pub fn transfer_complete(&mut self) -> bool {
        core::mem::replace(&mut self.finished, false)
    }

    /// Register the transfer-complete handler, replacing any previous one.
    pub fn set_transfer_complete_callback(&mut self, callback: C) {
        self.on_complete = Some(callback);
    }

    /// Half-transfer interrupt: the first half has been played.
    pub fn on_half_transfer(&mut self) {
        self.on_half_played(StagingHalf::First);
    }

    /// Full-transfer interrupt: the second half has been played.
    pub fn on_transfer_complete(&mut self) {
        self.on_half_played(StagingHalf::Second);
    }

    /// Pixels in the frame being (or last) sent
    pub const fn led_count(&self) -> usize {
        self.led_count
    }

    pub const fn timing(&self) -> &WaveformTiming {
        &self.timing
    }

    /// Staging buffer as the peripheral reads it
    pub const fn staging(&self) -> &EncodingStagingBuffer {
        &self.staging
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    const fn next_index(&self) -> usize {
        self.current ^ 1
    }

    /// The peripheral has moved past `half`: refill it, or end the
    /// transfer once enough reset refills have been played.
    fn on_half_played(&mut self, half: StagingHalf) {
        if !self.in_flight {
            return;
        }
        if self.reset_halves[half.index()] {
            self.reset_played = self.reset_played.saturating_add(1);
        }
        if self.reset_played < self.timing.reset_refills {
            self.refill(half);
            return;
        }

        self.driver.stop();
        self.in_flight = false;
        self.finished = true;

        #[cfg(feature = "esp32-log")]
        println!("[TransmitEngine] transfer complete ({} pixels)", self.led_count);

        if let Some(callback) = self.on_complete.as_mut() {
            callback.on_transfer_complete();
        }
    }

    /// Stage the next pixel, or a reset refill once the frame is exhausted.
    fn refill(&mut self, half: StagingHalf) {
        let is_reset = self.cursor >= self.led_count;
        if is_reset {
            self.staging.stage_reset(half);
        } else {
            let color = self.frames[self.current][self.cursor];
            self.staging.stage_pixel(half, color, &self.timing);
            self.cursor += 1;
        }
        self.reset_halves[half.index()] = is_reset;
    }
}
