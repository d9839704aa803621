//! Deterministic voice for engine tests: playback progress is advanced
//! manually instead of by a clock.

use aulos_core::AudioFormat;

use crate::voice::{Cone, Voice, VoiceNotification};

/// A [`Voice`] whose play position only moves when the test says so.
///
/// Captures every written byte and counts control calls, so state-machine
/// tests can assert on exactly what the engine did.
pub struct ManualVoice {
    capacity: u64,
    /// Every byte ever accepted, in write order.
    pub data: Vec<u8>,
    format: AudioFormat,
    pub flush_calls: u32,
    notifications: (
        kanal::Sender<VoiceNotification>,
        Option<kanal::Receiver<VoiceNotification>>,
    ),
    pub pause_calls: u32,
    pub play_calls: u32,
    played: u64,
    pub volume: f32,
    pub pitch: f32,
    pub position_3d: [f32; 3],
    pub cone: Cone,
}

impl ManualVoice {
    /// A manual voice with effectively unbounded capacity.
    #[must_use]
    pub fn new(format: AudioFormat) -> Self {
        Self::with_capacity(format, u64::MAX)
    }

    /// A manual voice accepting at most `capacity` buffered bytes.
    #[must_use]
    pub fn with_capacity(format: AudioFormat, capacity: u64) -> Self {
        let (tx, rx) = kanal::bounded(8);
        Self {
            capacity,
            data: Vec::new(),
            format,
            flush_calls: 0,
            notifications: (tx, Some(rx)),
            pause_calls: 0,
            play_calls: 0,
            played: 0,
            volume: 1.0,
            pitch: 1.0,
            position_3d: [0.0; 3],
            cone: Cone::default(),
        }
    }

    /// Advance the reported play position by `bytes`, clamped to the data
    /// actually written.
    pub fn advance_play(&mut self, bytes: u64) {
        self.played = (self.played + bytes).min(self.data.len() as u64);
    }

    /// Simulate a native underflow callback.
    pub fn push_underflow(&self) {
        let _ = self.notifications.0.try_send(VoiceNotification::Underflow);
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.data.len() as u64
    }
}

impl Voice for ManualVoice {
    fn write(&mut self, data: &[u8]) -> usize {
        let free = self.capacity.saturating_sub(self.written() - self.played);
        let accepted = self.format.align(free.min(data.len() as u64)) as usize;
        self.data.extend_from_slice(&data[..accepted]);
        accepted
    }

    fn reported_play_position(&mut self) -> u64 {
        self.played
    }

    fn play(&mut self) {
        self.play_calls += 1;
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
    }

    fn flush(&mut self) {
        self.flush_calls += 1;
        self.data.clear();
        self.played = 0;
    }

    fn take_notifications(&mut self) -> Option<kanal::Receiver<VoiceNotification>> {
        self.notifications.1.take()
    }

    fn set_volume(&mut self, gain: f32) {
        self.volume = gain;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn set_position(&mut self, position: [f32; 3]) {
        self.position_3d = position;
    }

    fn set_cone(&mut self, cone: Cone) {
        self.cone = cone;
    }
}
