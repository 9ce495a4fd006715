//! Header-framed (Adalight) stream parser.
//!
//! Wire format:
//!
//! ```text
//! 'A' 'd' 'a' count_hi count_lo checksum (G R B) * count
//! ```
//!
//! where `checksum = count_hi ^ count_lo ^ 0x55`. A count of zero still
//! carries one pixel. Anything that does not form a valid header is skipped
//! one byte at a time.

#[cfg(feature = "esp32-log")]
use esp_println::println;

use embassy_time::Instant;

use super::{ByteGap, IngestHandler, ParserState, PixelAccumulator};
use crate::serial::{ByteHandler, ByteSink};

/// Magic bytes opening every frame; also sent once as the start-up greeting.
pub const ADALIGHT_MAGIC: [u8; 3] = *b"Ada";

/// XOR key of the header checksum.
pub const CHECKSUM_KEY: u8 = 0x55;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStep {
    /// Matched this many magic bytes
    Magic(usize),
    LengthHi,
    LengthLo(u8),
    Checksum(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header(HeaderStep),
    Pixels,
}

const HEADER_START: Phase = Phase::Header(HeaderStep::Magic(0));

/// Header-framed pixel stream parser
#[derive(Debug, Clone)]
pub struct AdalightParser<H> {
    phase: Phase,
    pixels: PixelAccumulator,
    gap: ByteGap,
    /// Pixel count of the last accepted header
    declared_len: u16,
    /// Pixels past this index are consumed but not reported
    max_pixels: usize,
    frame_ready: bool,
    handler: Option<H>,
}

impl<H: IngestHandler> AdalightParser<H> {
    /// Create a parser without a handler.
    pub const fn new() -> Self {
        Self {
            phase: HEADER_START,
            pixels: PixelAccumulator::new(),
            gap: ByteGap::new(),
            declared_len: 0,
            max_pixels: usize::MAX,
            frame_ready: false,
            handler: None,
        }
    }

    /// Create a parser reporting to `handler`.
    pub const fn with_handler(handler: H) -> Self {
        Self {
            phase: HEADER_START,
            pixels: PixelAccumulator::new(),
            gap: ByteGap::new(),
            declared_len: 0,
            max_pixels: usize::MAX,
            frame_ready: false,
            handler: Some(handler),
        }
    }

    /// Stop reporting pixels at or past `max_pixels`.
    ///
    /// Frames declaring more pixels are still consumed to the end so the
    /// parser stays aligned with the stream.
    #[must_use]
    pub const fn with_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// Send the start-up greeting the host waits for.
    pub fn announce<S: ByteSink + ?Sized>(sink: &mut S) {
        for byte in ADALIGHT_MAGIC {
            sink.send(byte);
        }
    }

    /// Register the handler, replacing any previous one.
    pub fn set_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    pub fn take_handler(&mut self) -> Option<H> {
        self.handler.take()
    }

    pub const fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    pub fn handler_mut(&mut self) -> Option<&mut H> {
        self.handler.as_mut()
    }

    /// Handle one received byte.
    ///
    /// A byte arriving more than [`super::INACTIVITY_TIMEOUT`] after the
    /// previous one throws away any partial header or frame first.
    pub fn on_byte(&mut self, byte: u8, now: Instant) {
        if self.gap.expired(now) {
            #[cfg(feature = "esp32-log")]
            if self.phase != HEADER_START {
                println!("[AdalightParser] byte gap, waiting for header");
            }
            self.phase = HEADER_START;
            self.pixels.reset();
        }

        match self.phase {
            Phase::Header(step) => self.on_header_byte(step, byte),
            Phase::Pixels => self.on_pixel_byte(byte),
        }
    }

    fn on_header_byte(&mut self, step: HeaderStep, byte: u8) {
        match step {
            HeaderStep::Magic(matched) if byte == ADALIGHT_MAGIC[matched] => {
                self.phase = if matched + 1 == ADALIGHT_MAGIC.len() {
                    Phase::Header(HeaderStep::LengthHi)
                } else {
                    Phase::Header(HeaderStep::Magic(matched + 1))
                };
            }
            HeaderStep::Magic(_) => {
                // The mismatching byte may itself open a header
                let matched = usize::from(byte == ADALIGHT_MAGIC[0]);
                self.phase = Phase::Header(HeaderStep::Magic(matched));
            }
            HeaderStep::LengthHi => {
                self.phase = Phase::Header(HeaderStep::LengthLo(byte));
            }
            HeaderStep::LengthLo(hi) => {
                let len = u16::from_be_bytes([hi, byte]);
                self.phase = Phase::Header(HeaderStep::Checksum(len));
            }
            HeaderStep::Checksum(len) => {
                let [hi, lo] = len.to_be_bytes();
                if byte != hi ^ lo ^ CHECKSUM_KEY {
                    #[cfg(feature = "esp32-log")]
                    println!("[AdalightParser] bad checksum {:#04x} for {} pixels", byte, len);
                    self.phase = HEADER_START;
                    return;
                }

                self.declared_len = len;
                self.pixels.reset();
                self.phase = Phase::Pixels;
            }
        }
    }

    fn on_pixel_byte(&mut self, byte: u8) {
        let Some((index, color)) = self.pixels.push(byte) else {
            return;
        };
        if index < self.max_pixels {
            if let Some(handler) = self.handler.as_mut() {
                handler.color_updated(index, color);
            }
        }
        // A frame always carries at least one pixel
        let received = self.pixels.index();
        if received >= usize::from(self.declared_len).max(1) {
            self.finish_frame(received);
        }
    }

    fn finish_frame(&mut self, received: usize) {
        self.phase = HEADER_START;
        self.pixels.reset();
        self.frame_ready = true;

        if let Some(handler) = self.handler.as_mut() {
            handler.frame_complete(received);
        }
    }

    /// Pixel count announced by the last accepted header
    pub const fn declared_len(&self) -> u16 {
        self.declared_len
    }

    /// Take the frame latch, `true` once per completed frame.
    pub fn frame_complete(&mut self) -> bool {
        core::mem::replace(&mut self.frame_ready, false)
    }

    pub const fn state(&self) -> ParserState {
        match self.phase {
            Phase::Header(HeaderStep::Magic(0)) => ParserState::AwaitingHeaderByte1,
            Phase::Header(HeaderStep::Magic(1)) => ParserState::AwaitingHeaderByte2,
            Phase::Header(HeaderStep::Magic(_)) => ParserState::AwaitingHeaderByte3,
            Phase::Header(HeaderStep::LengthHi) => ParserState::AwaitingLengthHi,
            Phase::Header(HeaderStep::LengthLo(_)) => ParserState::AwaitingLengthLo,
            Phase::Header(HeaderStep::Checksum(_)) => ParserState::AwaitingChecksum,
            Phase::Pixels => self.pixels.state(),
        }
    }
}

impl<H: IngestHandler> Default for AdalightParser<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: IngestHandler> ByteHandler for AdalightParser<H> {
    fn on_byte(&mut self, byte: u8, now: Instant) {
        AdalightParser::on_byte(self, byte, now);
    }
}
