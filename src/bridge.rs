//! Glue between a parser and the transmit engine.

use crate::WaveformDriver;
use crate::color::Rgb;
use crate::engine::{SharedEngine, TransferCompleteHandler};
use crate::ingest::IngestHandler;

/// How many pixels a frame boundary refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshLength {
    /// Always send this many pixels
    Fixed(usize),
    /// Send as many pixels as the frame carried
    Received,
}

/// Feeds parsed pixels into the next frame and refreshes at frame end.
///
/// Install it as the parser's handler. `frame_complete` blocks until the
/// previous frame is out, so the reload interrupt must be able to preempt
/// the context the parser runs in.
pub struct StripBridge<'a, D, const MAX_LEDS: usize, C> {
    engine: &'a SharedEngine<D, MAX_LEDS, C>,
    length: RefreshLength,
    frames: u32,
}

impl<'a, D, const MAX_LEDS: usize, C> StripBridge<'a, D, MAX_LEDS, C>
where
    D: WaveformDriver,
    C: TransferCompleteHandler,
{
    pub const fn new(engine: &'a SharedEngine<D, MAX_LEDS, C>, length: RefreshLength) -> Self {
        Self {
            engine,
            length,
            frames: 0,
        }
    }

    /// Frames handed to the engine so far
    pub const fn frames(&self) -> u32 {
        self.frames
    }
}

impl<D, const MAX_LEDS: usize, C> IngestHandler for StripBridge<'_, D, MAX_LEDS, C>
where
    D: WaveformDriver,
    C: TransferCompleteHandler,
{
    fn color_updated(&mut self, index: usize, color: Rgb) {
        self.engine.set_pixel(index, color);
    }

    fn frame_complete(&mut self, pixel_count: usize) {
        let led_count = match self.length {
            RefreshLength::Fixed(count) => count,
            RefreshLength::Received => pixel_count,
        };
        self.engine.refresh(led_count);
        self.frames = self.frames.wrapping_add(1);
    }
}
