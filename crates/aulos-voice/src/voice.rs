//! The playback-buffer contract implemented by every platform backend.

/// Directional cone parameters forwarded to spatializing backends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cone {
    /// Inner angle in degrees: full gain inside.
    pub inner_angle: f32,
    /// Outer angle in degrees: `outer_gain` outside.
    pub outer_angle: f32,
    /// Gain applied outside the outer angle.
    pub outer_gain: f32,
}

impl Default for Cone {
    fn default() -> Self {
        Self {
            inner_angle: 360.0,
            outer_angle: 360.0,
            outer_gain: 1.0,
        }
    }
}

/// Message enqueued by a backend's native audio callback.
///
/// Native callbacks never run engine logic directly: they push one of
/// these onto a bounded channel, and the scheduler tick drains it. That
/// keeps the engine's locks out of whatever lock the native audio API
/// holds while calling back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceNotification {
    /// The backend consumed a buffer segment of this many bytes.
    Consumed(u64),
    /// The backend ran out of queued data mid-stream.
    Underflow,
}

/// The OS/hardware ring buffer that actually emits sound.
///
/// One implementation per platform backend (DirectSound, OpenAL,
/// PulseAudio, XAudio2, silent); the synchronization engine never branches
/// on backend identity.
///
/// Byte counts are raw at this boundary, but implementations must accept
/// and report whole frames only: the value returned by [`write`] and
/// [`reported_play_position`] is always a multiple of the frame size the
/// voice was created with.
///
/// [`write`]: Voice::write
/// [`reported_play_position`]: Voice::reported_play_position
pub trait Voice: Send {
    /// Append bytes to the ring buffer.
    ///
    /// Returns how many bytes were accepted: a frame-aligned prefix of
    /// `data`, shorter than `data.len()` when the buffer is full.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Total bytes the backend reports as played since the last
    /// [`flush`](Voice::flush).
    ///
    /// May briefly lag (never lead) the truth; the engine clamps it into
    /// its own cursor window.
    fn reported_play_position(&mut self) -> u64;

    /// Resume (or start) playback.
    fn play(&mut self);

    /// Pause playback, keeping buffered data and the play position.
    fn pause(&mut self);

    /// Drop all buffered data and reset the play position to zero.
    fn flush(&mut self);

    /// Hand out the native-callback notification channel, if the backend
    /// has one. Called once by the engine at player construction.
    fn take_notifications(&mut self) -> Option<kanal::Receiver<VoiceNotification>> {
        None
    }

    // Spatialization pass-through. Backends without positional audio
    // ignore these; the engine forwards values unmodified.

    fn set_volume(&mut self, _gain: f32) {}

    fn set_pitch(&mut self, _pitch: f32) {}

    fn set_position(&mut self, _position: [f32; 3]) {}

    fn set_cone(&mut self, _cone: Cone) {}
}
