//! WS2812 bit encoding for a duty-cycle waveform generator.
//!
//! Every output bit is one period of the generator. The duty value written
//! for that period decides whether the LED reads a `1` (long high pulse) or a
//! `0` (short high pulse). Bits go out green, red, blue, MSB first.

use crate::color::Rgb;

/// Output bits per pixel (8 per channel).
pub const BITS_PER_PIXEL: usize = 24;

/// Total duty slots in the staging buffer (two pixels).
pub const STAGING_LEN: usize = 2 * BITS_PER_PIXEL;

/// Duty written during the reset (latch) interval.
pub const RESET_DUTY: u8 = 0;

/// Length of one output bit, 800 kHz.
pub const BIT_PERIOD_NS: u32 = 1250;

/// Minimum low time that latches a frame into the strip.
pub const RESET_TIME_US: u32 = 60;

/// `1` bit high time as a fraction of the period (57/90).
const ONE_HIGH_NUM: u32 = 57;
/// `0` bit high time as a fraction of the period (34/90).
const ZERO_HIGH_NUM: u32 = 34;
const HIGH_DENOM: u32 = 90;

/// Timing for a generator clocked at 72 MHz: 90 ticks per bit.
pub const WS2812_72MHZ: WaveformTiming = WaveformTiming::for_timer_clock(72_000_000);

/// Duty values and reset length for one timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformTiming {
    /// Generator ticks per output bit
    pub period_ticks: u16,
    /// Duty for a `1` bit
    pub one_high: u8,
    /// Duty for a `0` bit
    pub zero_high: u8,
    /// Number of one-pixel refills of [`RESET_DUTY`] after the last pixel
    pub reset_refills: u8,
}

impl WaveformTiming {
    /// Derive the duty values for a generator running at `timer_hz`.
    ///
    /// The period must fit the 8-bit duty slots, so `timer_hz` may not exceed
    /// roughly 204 MHz. Evaluated in a `const` this fails the build instead.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_timer_clock(timer_hz: u32) -> Self {
        let period = (timer_hz as u64 * BIT_PERIOD_NS as u64 / 1_000_000_000) as u32;
        assert!(period > 0 && period <= u8::MAX as u32 + 1, "timer clock out of range");

        let one_high = (period * ONE_HIGH_NUM + HIGH_DENOM / 2) / HIGH_DENOM;
        let zero_high = (period * ZERO_HIGH_NUM + HIGH_DENOM / 2) / HIGH_DENOM;

        let refill_ns = BIT_PERIOD_NS * BITS_PER_PIXEL as u32;
        let reset_refills = (RESET_TIME_US * 1000).div_ceil(refill_ns);

        Self {
            period_ticks: period as u16,
            one_high: one_high as u8,
            zero_high: zero_high as u8,
            reset_refills: reset_refills as u8,
        }
    }

    /// Auto-reload register value for an up-counting timer.
    pub const fn auto_reload(&self) -> u16 {
        self.period_ticks - 1
    }

    /// Duty value for one bit
    #[inline]
    pub const fn duty(&self, bit: bool) -> u8 {
        if bit { self.one_high } else { self.zero_high }
    }
}

impl Default for WaveformTiming {
    fn default() -> Self {
        WS2812_72MHZ
    }
}

/// Which half of the staging buffer an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingHalf {
    First,
    Second,
}

impl StagingHalf {
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Two one-pixel halves streamed to the generator in a circle.
///
/// While the peripheral plays one half, the engine rewrites the other.
#[derive(Debug, Clone)]
pub struct EncodingStagingBuffer {
    halves: [[u8; BITS_PER_PIXEL]; 2],
}

impl EncodingStagingBuffer {
    pub const fn new() -> Self {
        Self {
            halves: [[RESET_DUTY; BITS_PER_PIXEL]; 2],
        }
    }

    /// Duty slots of one half
    pub const fn half(&self, half: StagingHalf) -> &[u8; BITS_PER_PIXEL] {
        &self.halves[half.index()]
    }

    /// The whole buffer as the peripheral sees it.
    pub fn as_slice(&self) -> &[u8] {
        self.halves.as_flattened()
    }

    /// Stage one pixel into `half`.
    pub fn stage_pixel(&mut self, half: StagingHalf, color: Rgb, timing: &WaveformTiming) {
        encode_pixel(&mut self.halves[half.index()], color, timing);
    }

    /// Stage one refill of the reset interval into `half`.
    pub fn stage_reset(&mut self, half: StagingHalf) {
        self.halves[half.index()] = [RESET_DUTY; BITS_PER_PIXEL];
    }
}

impl Default for EncodingStagingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a color into 24 duty values, G then R then B, MSB first.
pub fn encode_pixel(slots: &mut [u8; BITS_PER_PIXEL], color: Rgb, timing: &WaveformTiming) {
    for (chunk, channel) in slots.chunks_exact_mut(8).zip([color.g, color.r, color.b]) {
        for (bit, duty) in chunk.iter_mut().enumerate() {
            *duty = timing.duty(channel & (0x80_u8 >> bit) != 0);
        }
    }
}

/// Read a color back from 24 duty values.
///
/// Returns `None` if any slot holds neither the `1` nor the `0` duty.
pub fn decode_pixel(slots: &[u8; BITS_PER_PIXEL], timing: &WaveformTiming) -> Option<Rgb> {
    let mut channels = [0u8; 3];
    for (channel, chunk) in channels.iter_mut().zip(slots.chunks_exact(8)) {
        for &duty in chunk {
            let bit = match duty {
                d if d == timing.one_high => 1,
                d if d == timing.zero_high => 0,
                _ => return None,
            };
            *channel = (*channel << 1) | bit;
        }
    }
    let [g, r, b] = channels;
    Some(Rgb { r, g, b })
}
