//! Interrupt-driven byte link.
//!
//! Received bytes are forwarded to a [`ByteHandler`] (one of the parsers);
//! outgoing bytes go straight to the data register when it is free and
//! otherwise wait in a [`SharedRing`] drained by the transmit-ready
//! interrupt.

use embassy_time::Instant;

use crate::channel::SharedRing;

/// Size of the outbound queue used by the default link.
pub const DEFAULT_TX_CAPACITY: usize = 256;

/// Anything bytes can be written to.
pub trait ByteSink {
    fn send(&mut self, byte: u8);

    fn send_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.send(byte);
        }
    }
}

/// Consumer of received bytes, called from the receive interrupt.
pub trait ByteHandler {
    fn on_byte(&mut self, byte: u8, now: Instant);
}

/// Register-level access to a UART.
pub trait SerialPort {
    /// Check if the transmit data register can take a byte
    fn is_tx_empty(&self) -> bool;

    /// Write the transmit data register
    fn write(&mut self, byte: u8);

    /// Enable or disable the transmit-ready interrupt
    fn set_tx_interrupt(&mut self, enabled: bool);
}

/// UART with a queued transmitter and a pluggable receive handler.
pub struct SerialLink<P, R, const TX: usize = DEFAULT_TX_CAPACITY> {
    port: P,
    tx_queue: SharedRing<u8, TX>,
    receiver: Option<R>,
}

impl<P: SerialPort, R: ByteHandler, const TX: usize> SerialLink<P, R, TX> {
    pub const fn new(port: P) -> Self {
        Self {
            port,
            tx_queue: SharedRing::filled(0),
            receiver: None,
        }
    }

    /// Register the receive handler, replacing any previous one.
    pub fn set_receive_handler(&mut self, receiver: R) {
        self.receiver = Some(receiver);
    }

    pub const fn receive_handler(&self) -> Option<&R> {
        self.receiver.as_ref()
    }

    pub fn receive_handler_mut(&mut self) -> Option<&mut R> {
        self.receiver.as_mut()
    }

    /// Receive interrupt: forward the byte.
    pub fn on_receive(&mut self, byte: u8, now: Instant) {
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.on_byte(byte, now);
        }
    }

    /// Transmit-ready interrupt: move one queued byte to the port.
    pub fn on_tx_ready(&mut self) {
        critical_section::with(|_| {
            if self.port.is_tx_empty() {
                if let Some(byte) = self.tx_queue.pop() {
                    self.port.write(byte);
                }
            }
            if self.tx_queue.is_empty() {
                self.port.set_tx_interrupt(false);
            }
        });
    }

    /// Bytes waiting for the transmitter
    pub fn pending(&self) -> usize {
        self.tx_queue.len()
    }

    pub const fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

impl<P: SerialPort, R: ByteHandler, const TX: usize> ByteSink for SerialLink<P, R, TX> {
    /// Queue one byte. Dropped if the queue is full.
    ///
    /// The idle check, the write or push and the interrupt enable run in one
    /// critical section; the interrupt is enabled after the byte is queued.
    fn send(&mut self, byte: u8) {
        critical_section::with(|_| {
            if self.port.is_tx_empty() && self.tx_queue.is_empty() {
                self.port.write(byte);
            } else {
                let _ = self.tx_queue.push(byte);
            }
            self.port.set_tx_interrupt(true);
        });
    }
}
