//! Clocked-slave (WS2801 style) stream parser.
//!
//! The master clocks G, R, B triples with no framing at all; the end of a
//! frame is signalled by the chip-select line rising, delivered separately
//! through [`Ws2801Parser::on_frame_edge`].

#[cfg(feature = "esp32-log")]
use esp_println::println;

use embassy_time::Instant;

use super::{ByteGap, IngestHandler, ParserState, PixelAccumulator};
use crate::serial::ByteHandler;

/// Edge-terminated pixel stream parser
#[derive(Debug, Clone)]
pub struct Ws2801Parser<H> {
    pixels: PixelAccumulator,
    gap: ByteGap,
    /// Pixels received before the last edge
    last_frame_len: usize,
    /// One-shot latch set by the edge
    frame_ready: bool,
    handler: Option<H>,
}

impl<H: IngestHandler> Ws2801Parser<H> {
    /// Create a parser without a handler.
    pub const fn new() -> Self {
        Self {
            pixels: PixelAccumulator::new(),
            gap: ByteGap::new(),
            last_frame_len: 0,
            frame_ready: false,
            handler: None,
        }
    }

    /// Create a parser reporting to `handler`.
    pub const fn with_handler(handler: H) -> Self {
        Self {
            pixels: PixelAccumulator::new(),
            gap: ByteGap::new(),
            last_frame_len: 0,
            frame_ready: false,
            handler: Some(handler),
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
    /// previous one starts a new pixel at index zero.
    pub fn on_byte(&mut self, byte: u8, now: Instant) {
        if self.gap.expired(now) {
            #[cfg(feature = "esp32-log")]
            println!("[Ws2801Parser] byte gap, restarting at pixel 0");
            self.pixels.reset();
        }

        if let Some((index, color)) = self.pixels.push(byte) {
            if let Some(handler) = self.handler.as_mut() {
                handler.color_updated(index, color);
            }
        }
    }

    /// Handle the rising chip-select edge that ends a frame.
    pub fn on_frame_edge(&mut self) {
        self.last_frame_len = self.pixels.index();
        self.pixels.reset();
        self.frame_ready = true;

        if let Some(handler) = self.handler.as_mut() {
            handler.frame_complete(self.last_frame_len);
        }
    }

    /// Pixels received before the last frame edge
    pub const fn last_frame_len(&self) -> usize {
        self.last_frame_len
    }

    /// Take the frame latch, `true` once per edge.
    pub fn frame_complete(&mut self) -> bool {
        core::mem::replace(&mut self.frame_ready, false)
    }

    pub const fn state(&self) -> ParserState {
        self.pixels.state()
    }

    /// Pixels completed in the current frame
    pub const fn pixel_index(&self) -> usize {
        self.pixels.index()
    }
}

impl<H: IngestHandler> Default for Ws2801Parser<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: IngestHandler> ByteHandler for Ws2801Parser<H> {
    fn on_byte(&mut self, byte: u8, now: Instant) {
        Ws2801Parser::on_byte(self, byte, now);
    }
}
