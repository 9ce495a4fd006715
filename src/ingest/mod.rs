//! Pixel stream parsers
//!
//! Both parsers consume one byte at a time from an interrupt handler and
//! report pixels through an [`IngestHandler`]. They differ only in how a
//! frame ends: [`Ws2801Parser`] waits for an out-of-band edge, while
//! [`AdalightParser`] reads an in-band header with the pixel count.

mod adalight;
mod ws2801;

pub use adalight::{ADALIGHT_MAGIC, AdalightParser, CHECKSUM_KEY};
pub use ws2801::Ws2801Parser;

use embassy_time::{Duration, Instant};

use crate::color::{BLACK, Rgb};

/// Gap between two bytes after which a parser starts over.
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_millis(10);

/// Receiver of parsed pixels.
///
/// Called synchronously from the byte (or edge) interrupt; implementations
/// must not block.
pub trait IngestHandler {
    /// A pixel has been fully received
    fn color_updated(&mut self, index: usize, color: Rgb);

    /// The frame has ended after `pixel_count` pixels
    fn frame_complete(&mut self, pixel_count: usize);
}

impl<H: IngestHandler + ?Sized> IngestHandler for &mut H {
    fn color_updated(&mut self, index: usize, color: Rgb) {
        (**self).color_updated(index, color);
    }

    fn frame_complete(&mut self, pixel_count: usize) {
        (**self).frame_complete(pixel_count);
    }
}

/// What the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingHeaderByte1,
    AwaitingHeaderByte2,
    AwaitingHeaderByte3,
    AwaitingLengthHi,
    AwaitingLengthLo,
    AwaitingChecksum,
    AwaitingGreen,
    AwaitingRed,
    AwaitingBlue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelChannel {
    Green,
    Red,
    Blue,
}

/// Rebuilds pixels from G, R, B byte triples.
#[derive(Debug, Clone)]
struct PixelAccumulator {
    channel: PixelChannel,
    pending: Rgb,
    index: usize,
}

impl PixelAccumulator {
    const fn new() -> Self {
        Self {
            channel: PixelChannel::Green,
            pending: BLACK,
            index: 0,
        }
    }

    /// Feed one byte.
    ///
    /// Returns the pixel index and color once its blue byte arrives.
    fn push(&mut self, byte: u8) -> Option<(usize, Rgb)> {
        match self.channel {
            PixelChannel::Green => {
                self.pending.g = byte;
                self.channel = PixelChannel::Red;
                None
            }
            PixelChannel::Red => {
                self.pending.r = byte;
                self.channel = PixelChannel::Blue;
                None
            }
            PixelChannel::Blue => {
                self.pending.b = byte;
                self.channel = PixelChannel::Green;
                let pixel = (self.index, core::mem::replace(&mut self.pending, BLACK));
                self.index += 1;
                Some(pixel)
            }
        }
    }

    /// Drop the partial pixel and go back to pixel zero.
    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Pixels completed since the last reset
    const fn index(&self) -> usize {
        self.index
    }

    const fn state(&self) -> ParserState {
        match self.channel {
            PixelChannel::Green => ParserState::AwaitingGreen,
            PixelChannel::Red => ParserState::AwaitingRed,
            PixelChannel::Blue => ParserState::AwaitingBlue,
        }
    }
}

/// Inactivity detector over byte arrival times.
#[derive(Debug, Clone, Copy)]
struct ByteGap {
    last: Option<Instant>,
}

impl ByteGap {
    const fn new() -> Self {
        Self { last: None }
    }

    /// Record a byte at `now`, returning whether it came after a gap longer
    /// than [`INACTIVITY_TIMEOUT`].
    fn expired(&mut self, now: Instant) -> bool {
        let expired = self
            .last
            .is_some_and(|last| now.saturating_duration_since(last) > INACTIVITY_TIMEOUT);
        self.last = Some(now);
        expired
    }
}
