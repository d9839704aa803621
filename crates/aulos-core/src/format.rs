#![forbid(unsafe_code)]

use std::fmt;

/// Immutable description of a PCM stream: channel count, bit depth, rate.
///
/// # Invariants
/// - `channels > 0`, `sample_bits` is a positive multiple of 8,
///   `sample_rate > 0`
/// - therefore `bytes_per_frame() > 0`
///
/// All byte offsets crossing the engine are multiples of `bytes_per_frame()`
/// ("frame-aligned") except where explicitly marked raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_bits: u16,
    pub sample_rate: u32,
}

impl AudioFormat {
    /// Create a format, validating the frame-size invariant.
    ///
    /// # Panics
    ///
    /// Panics when any component is zero or `sample_bits` is not a multiple
    /// of 8; a format that cannot address whole frames is unusable.
    #[must_use]
    pub fn new(channels: u16, sample_bits: u16, sample_rate: u32) -> Self {
        assert!(channels > 0, "channels must be non-zero");
        assert!(
            sample_bits > 0 && sample_bits % 8 == 0,
            "sample_bits must be a positive multiple of 8"
        );
        assert!(sample_rate > 0, "sample_rate must be non-zero");
        Self {
            channels,
            sample_bits,
            sample_rate,
        }
    }

    /// Size of one frame (one sample per channel) in bytes.
    #[must_use]
    pub fn bytes_per_frame(&self) -> u64 {
        u64::from(self.channels) * u64::from(self.sample_bits / 8)
    }

    /// Playback rate in bytes per second.
    #[must_use]
    pub fn bytes_per_second(&self) -> u64 {
        self.bytes_per_frame() * u64::from(self.sample_rate)
    }

    /// Round a byte count down to the nearest frame boundary.
    #[must_use]
    pub fn align(&self, bytes: u64) -> u64 {
        bytes - bytes % self.bytes_per_frame()
    }

    /// Round a byte count up to the nearest frame boundary.
    #[must_use]
    pub fn align_ceil(&self, bytes: u64) -> u64 {
        let frame = self.bytes_per_frame();
        bytes.div_ceil(frame) * frame
    }

    /// Round a signed byte offset toward zero to a frame boundary.
    ///
    /// Used for drift deltas, which carry a sign.
    #[must_use]
    pub fn align_signed(&self, bytes: i64) -> i64 {
        let frame = self.bytes_per_frame() as i64;
        bytes - bytes % frame
    }

    /// Whether `bytes` lies on a frame boundary.
    #[must_use]
    pub fn is_frame_aligned(&self, bytes: u64) -> bool {
        bytes % self.bytes_per_frame() == 0
    }

    /// Convert a duration in seconds to a frame-aligned byte count.
    ///
    /// Negative inputs are treated as zero; fractional frames are truncated.
    #[must_use]
    #[expect(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    #[expect(clippy::cast_possible_truncation)]
    pub fn duration_to_bytes(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        self.align((seconds * self.bytes_per_second() as f64) as u64)
    }

    /// Convert a byte count to a duration in seconds (raw, no alignment).
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn bytes_to_duration(&self, bytes: u64) -> f64 {
        bytes as f64 / self.bytes_per_second() as f64
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} channels, {} bit",
            self.sample_rate, self.channels, self.sample_bits
        )
    }
}
