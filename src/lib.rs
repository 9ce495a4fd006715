#![no_std]
//! Serial pixel stream to WS2812 bridge.
//!
//! Bytes arrive one at a time from a UART or clocked-slave peripheral and go
//! through one of the [`ingest`] parsers; parsed pixels land in the *next*
//! frame of a [`TransmitEngine`], which streams the *current* frame out as a
//! duty-cycle waveform through a [`WaveformDriver`].
//!
//! ```ignore
//! static ENGINE: SharedEngine<MyTimerDma> =
//!     SharedEngine::new(TransmitEngine::new(MyTimerDma::new(), WS2812_72MHZ));
//!
//! let bridge = StripBridge::new(&ENGINE, RefreshLength::Received);
//! let mut parser = AdalightParser::with_handler(bridge);
//!
//! // UART receive interrupt
//! parser.on_byte(byte, Instant::now());
//!
//! // DMA interrupts
//! ENGINE.on_half_transfer();
//! ENGINE.on_transfer_complete();
//! ```

pub mod bridge;
pub mod channel;
pub mod color;
pub mod engine;
pub mod ingest;
pub mod ring_buffer;
pub mod serial;
pub mod sim;
pub mod waveform;

pub use bridge::{RefreshLength, StripBridge};
pub use channel::SharedRing;
pub use engine::{RefreshError, SharedEngine, TransferCompleteHandler, TransmitEngine};
pub use ingest::{AdalightParser, IngestHandler, ParserState, Ws2801Parser};
pub use ring_buffer::{CircularBuffer, PushError};
pub use serial::{ByteHandler, ByteSink, SerialLink, SerialPort};
pub use waveform::{EncodingStagingBuffer, WS2812_72MHZ, WaveformTiming};

pub use color::{Hsv, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract waveform generator
///
/// Implement this trait for a PWM timer whose compare register is reloaded
/// by a circular DMA channel (or anything that behaves like one).
pub trait WaveformDriver {
    /// Start streaming `staging` in a loop, one duty value per bit period.
    ///
    /// The implementation must raise the engine's `on_half_transfer` after
    /// the first half has been played and `on_transfer_complete` after the
    /// second, every lap. `staging` stays valid and is rewritten in place
    /// while the generator runs.
    fn start(&mut self, staging: &[u8]);

    /// Stop the generator and hold the line low.
    fn stop(&mut self);
}
