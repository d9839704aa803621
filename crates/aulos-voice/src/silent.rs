//! Headless voice backend: consumes audio at the real-time rate without
//! emitting sound.

use std::time::{Duration, Instant};

use aulos_core::AudioFormat;
use tracing::trace;

use crate::voice::Voice;

/// A [`Voice`] that plays into nothing at the format's real-time rate.
///
/// Used when no audio device is available (servers, CI) and for soak
/// tests: timing behavior matches a real backend, including a bounded ring
/// capacity and frame-aligned partial writes.
///
/// During an underrun the wall clock keeps running but the reported
/// position stays clamped at the end of written data; the position is
/// reanchored there, so playback resumes at the real-time rate instead of
/// jumping once fresh data arrives, the same recovery a hardware ring
/// exhibits when it loops over silence.
#[derive(Debug)]
pub struct SilentVoice {
    capacity: u64,
    format: AudioFormat,
    /// Bytes played as of the last reanchor point.
    played: u64,
    /// When playback was last resumed; `None` while paused.
    playing_since: Option<Instant>,
    written: u64,
}

impl SilentVoice {
    /// Create a silent voice holding `capacity` worth of audio.
    #[must_use]
    pub fn new(format: AudioFormat, capacity: Duration) -> Self {
        let capacity = format
            .align_ceil(format.duration_to_bytes(capacity.as_secs_f64()))
            .max(format.bytes_per_frame());
        Self {
            capacity,
            format,
            played: 0,
            playing_since: None,
            written: 0,
        }
    }

    /// Ring capacity in bytes (frame-aligned).
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn elapsed_bytes(&self) -> u64 {
        self.playing_since.map_or(0, |since| {
            self.format
                .align(self.format.duration_to_bytes(since.elapsed().as_secs_f64()))
        })
    }

    fn position(&self) -> u64 {
        (self.played + self.elapsed_bytes()).min(self.written)
    }
}

impl Voice for SilentVoice {
    fn write(&mut self, data: &[u8]) -> usize {
        let free = self.capacity - (self.written - self.position());
        let accepted = self.format.align(free.min(data.len() as u64)) as usize;
        self.written += accepted as u64;
        accepted
    }

    fn reported_play_position(&mut self) -> u64 {
        let position = self.position();
        if position == self.written {
            // Underrun (or fully drained): reanchor so the clock does not
            // race ahead of the data.
            self.played = position;
            if self.playing_since.is_some() {
                self.playing_since = Some(Instant::now());
            }
        }
        position
    }

    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
            trace!(written = self.written, "silent voice playing");
        }
    }

    fn pause(&mut self) {
        if self.playing_since.is_some() {
            self.played = self.position();
            self.playing_since = None;
            trace!(played = self.played, "silent voice paused");
        }
    }

    fn flush(&mut self) {
        self.played = 0;
        self.written = 0;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }
}
