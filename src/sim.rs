//! Host-side stand-in for the timer/DMA pair.
//!
//! [`SimulatedGenerator`] is a [`WaveformDriver`] that only remembers
//! whether it is running. [`pump_half`] then plays the DMA controller: it
//! hands the half the peripheral would stream next to a
//! [`WaveformCapture`] and raises the matching reload interrupt on the
//! engine, in the order real hardware does.

use heapless::Vec;

use crate::WaveformDriver;
use crate::color::Rgb;
use crate::engine::{TransferCompleteHandler, TransmitEngine};
use crate::waveform::{BIT_PERIOD_NS, BITS_PER_PIXEL, RESET_DUTY, StagingHalf, WaveformTiming, decode_pixel};

/// Software waveform generator
#[derive(Debug, Clone)]
pub struct SimulatedGenerator {
    running: bool,
    /// Set by `start`, cleared when the capture is told about it
    restarted: bool,
    /// Half the simulated DMA streams next
    next_half: StagingHalf,
    starts: u32,
    stops: u32,
}

impl SimulatedGenerator {
    pub const fn new() -> Self {
        Self {
            running: false,
            restarted: false,
            next_half: StagingHalf::First,
            starts: 0,
            stops: 0,
        }
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Times the engine started a transfer
    pub const fn starts(&self) -> u32 {
        self.starts
    }

    /// Times the engine stopped the generator
    pub const fn stops(&self) -> u32 {
        self.stops
    }
}

impl Default for SimulatedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformDriver for SimulatedGenerator {
    fn start(&mut self, _staging: &[u8]) {
        self.running = true;
        self.restarted = true;
        self.next_half = StagingHalf::First;
        self.starts += 1;
    }

    fn stop(&mut self) {
        self.running = false;
        self.stops += 1;
    }
}

/// Decoded view of everything a simulated strip received.
///
/// Holds the pixels of the transfer in progress (or the last one) and counts
/// the reset slots that followed them.
#[derive(Debug, Clone)]
pub struct WaveformCapture<const CAP: usize> {
    pixels: Vec<Rgb, CAP>,
    reset_slots: usize,
    /// Pixels after the reset started; a correct stream has none
    late_pixels: usize,
    malformed: usize,
    dropped: usize,
    transfers: usize,
}

impl<const CAP: usize> WaveformCapture<CAP> {
    pub const fn new() -> Self {
        Self {
            pixels: Vec::new(),
            reset_slots: 0,
            late_pixels: 0,
            malformed: 0,
            dropped: 0,
            transfers: 0,
        }
    }

    /// Forget the previous transfer.
    pub fn begin_transfer(&mut self) {
        self.pixels.clear();
        self.reset_slots = 0;
        self.late_pixels = 0;
        self.malformed = 0;
        self.dropped = 0;
        self.transfers += 1;
    }

    /// Record one staging half as it leaves the generator.
    pub fn record(&mut self, slots: &[u8; BITS_PER_PIXEL], timing: &WaveformTiming) {
        if slots.iter().all(|&duty| duty == RESET_DUTY) {
            self.reset_slots += 1;
            return;
        }
        let Some(color) = decode_pixel(slots, timing) else {
            self.malformed += 1;
            return;
        };
        if self.reset_slots > 0 {
            self.late_pixels += 1;
        }
        if self.pixels.push(color).is_err() {
            self.dropped += 1;
        }
    }

    /// Pixels decoded from the current transfer
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    /// One-pixel reset refills seen after the pixels
    pub const fn reset_slots(&self) -> usize {
        self.reset_slots
    }

    /// Low time following the pixels in nanoseconds
    pub const fn reset_time_ns(&self) -> u64 {
        (self.reset_slots * BITS_PER_PIXEL) as u64 * BIT_PERIOD_NS as u64
    }

    pub const fn late_pixels(&self) -> usize {
        self.late_pixels
    }

    /// Slots that decoded to neither bit value
    pub const fn malformed(&self) -> usize {
        self.malformed
    }

    /// Pixels that did not fit into `CAP`
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Transfers observed since creation
    pub const fn transfers(&self) -> usize {
        self.transfers
    }
}

impl<const CAP: usize> Default for WaveformCapture<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream one staging half and raise its interrupt.
///
/// Returns `false` without doing anything when the generator is stopped.
pub fn pump_half<const MAX_LEDS: usize, C, const CAP: usize>(
    engine: &mut TransmitEngine<SimulatedGenerator, MAX_LEDS, C>,
    capture: &mut WaveformCapture<CAP>,
) -> bool
where
    C: TransferCompleteHandler,
{
    let generator = engine.driver_mut();
    if !generator.running {
        return false;
    }
    if core::mem::replace(&mut generator.restarted, false) {
        capture.begin_transfer();
    }
    let half = generator.next_half;
    generator.next_half = match half {
        StagingHalf::First => StagingHalf::Second,
        StagingHalf::Second => StagingHalf::First,
    };

    let slots = *engine.staging().half(half);
    capture.record(&slots, engine.timing());

    match half {
        StagingHalf::First => engine.on_half_transfer(),
        StagingHalf::Second => engine.on_transfer_complete(),
    }
    true
}

/// Pump until the engine stops the generator.
///
/// Returns the number of halves streamed.
pub fn pump_until_idle<const MAX_LEDS: usize, C, const CAP: usize>(
    engine: &mut TransmitEngine<SimulatedGenerator, MAX_LEDS, C>,
    capture: &mut WaveformCapture<CAP>,
) -> usize
where
    C: TransferCompleteHandler,
{
    let mut halves = 0;
    while pump_half(engine, capture) {
        halves += 1;
    }
    halves
}
