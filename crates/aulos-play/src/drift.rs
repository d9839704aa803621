//! Rolling measurement of audio-clock vs. master-clock divergence.

use std::time::Duration;

use aulos_core::AudioFormat;

/// Samples averaged before a minor correction is applied.
const WINDOW: usize = 8;

/// Correction decision for one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriftCorrection {
    /// Signed, frame-aligned byte offset. Positive: audio runs ahead of
    /// the master clock. Zero: leave playback alone.
    pub bytes: i64,
    /// Resynchronize hard instead of creeping.
    pub critical: bool,
}

/// Hysteretic drift estimator.
///
/// Minor drift must fill the whole sample window before any correction is
/// returned, so a single noisy reading never triggers an adjustment.
/// Critical drift bypasses the window entirely: waiting eight ticks with
/// a quarter second of desync would be audible.
#[derive(Clone, Debug)]
pub struct DriftEstimator {
    critical_bytes: u64,
    format: AudioFormat,
    len: usize,
    minor_bytes: u64,
    next: usize,
    samples: [i64; WINDOW],
}

impl DriftEstimator {
    #[must_use]
    pub fn new(format: AudioFormat, critical: Duration, minor: Duration) -> Self {
        Self {
            critical_bytes: format.duration_to_bytes(critical.as_secs_f64()),
            format,
            len: 0,
            minor_bytes: format.duration_to_bytes(minor.as_secs_f64()),
            next: 0,
            samples: [0; WINDOW],
        }
    }

    /// Feed one observation and decide on a correction.
    ///
    /// `audio_time` is the stream position implied by the voice's reported
    /// progress; `master_time` is the expected stream position. Both in
    /// seconds.
    #[expect(clippy::cast_possible_truncation)]
    pub fn update(&mut self, audio_time: f64, master_time: f64) -> DriftCorrection {
        let delta = (audio_time - master_time) * self.format.bytes_per_second() as f64;
        let delta = self.format.align_signed(delta as i64);

        if delta.unsigned_abs() >= self.critical_bytes {
            // Hard desync: creep-correcting from here would take seconds.
            self.reset();
            return DriftCorrection {
                bytes: delta,
                critical: true,
            };
        }

        self.push(delta);
        if self.len == WINDOW {
            let mean = self.samples.iter().sum::<i64>() / WINDOW as i64;
            let mean = self.format.align_signed(mean);
            if mean.unsigned_abs() > self.minor_bytes {
                return DriftCorrection {
                    bytes: mean,
                    critical: false,
                };
            }
        }

        DriftCorrection::default()
    }

    /// Forget all samples (after a clear, a seek, or a hard resync).
    pub fn reset(&mut self) {
        self.len = 0;
        self.next = 0;
        self.samples = [0; WINDOW];
    }

    fn push(&mut self, sample: i64) {
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % WINDOW;
        self.len = (self.len + 1).min(WINDOW);
    }
}
