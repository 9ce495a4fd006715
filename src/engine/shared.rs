use core::cell::RefCell;

use critical_section::Mutex;

use super::{RefreshError, TransferCompleteHandler, TransmitEngine};
use crate::WaveformDriver;
use crate::color::Rgb;

/// A [`TransmitEngine`] shared between foreground code and its interrupts.
///
/// Every call runs inside a critical section, so a frame swap can never
/// interleave with a reload interrupt and the completion latch is read and
/// cleared with interrupts masked. Keep it in a `static` and call the
/// `on_*` methods from the DMA interrupt handler.
pub struct SharedEngine<D, const MAX_LEDS: usize = { super::DEFAULT_MAX_LEDS }, C = super::NoCallback> {
    inner: Mutex<RefCell<TransmitEngine<D, MAX_LEDS, C>>>,
}

impl<D, const MAX_LEDS: usize, C> SharedEngine<D, MAX_LEDS, C>
where
    D: WaveformDriver,
    C: TransferCompleteHandler,
{
    pub const fn new(engine: TransmitEngine<D, MAX_LEDS, C>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(engine)),
        }
    }

    /// Run `f` on the engine inside a critical section.
    pub fn lock<R>(&self, f: impl FnOnce(&mut TransmitEngine<D, MAX_LEDS, C>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.inner.borrow_ref_mut(cs)))
    }

    pub fn set_pixel(&self, index: usize, color: Rgb) {
        self.lock(|engine| engine.set_pixel(index, color));
    }

    pub fn set_all(&self, count: usize, color: Rgb) {
        self.lock(|engine| engine.set_all(count, color));
    }

    pub fn get_pixel(&self, index: usize) -> Rgb {
        self.lock(|engine| engine.get_pixel(index))
    }

    pub fn is_busy(&self) -> bool {
        self.lock(|engine| engine.is_busy())
    }

    /// Non-blocking refresh, see [`TransmitEngine::try_refresh`].
    pub fn try_refresh(&self, led_count: usize) -> Result<(), RefreshError> {
        self.lock(|engine| engine.try_refresh(led_count))
    }

    /// Swap frames and start sending, waiting for the previous transfer.
    ///
    /// Busy-polls until the reload interrupt has finished the frame in
    /// flight; the wait is bounded by one frame plus its reset interval. The
    /// check and the swap happen in the same critical section. Must not be
    /// called from an interrupt that preempts the reload interrupt.
    pub fn refresh(&self, led_count: usize) {
        while self.try_refresh(led_count).is_err() {
            core::hint::spin_loop();
        }
    }

    /// Take the completion latch with interrupts masked.
    pub fn transfer_complete(&self) -> bool {
        self.lock(|engine| engine.transfer_complete())
    }

    /// Register the transfer-complete handler, replacing any previous one.
    ///
    /// The handler runs with the engine locked and must not call back into
    /// this `SharedEngine`.
    pub fn set_transfer_complete_callback(&self, callback: C) {
        self.lock(|engine| engine.set_transfer_complete_callback(callback));
    }

    /// Call from the DMA half-transfer interrupt.
    pub fn on_half_transfer(&self) {
        self.lock(|engine| engine.on_half_transfer());
    }

    /// Call from the DMA transfer-complete interrupt.
    pub fn on_transfer_complete(&self) {
        self.lock(|engine| engine.on_transfer_complete());
    }
}
