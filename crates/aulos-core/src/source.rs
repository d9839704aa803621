//! Contracts consumed by the synchronization engine.

use crate::{errors::SyncResult, format::AudioFormat, packet::AudioPacket};

/// A lazily-pulled stream of PCM packets, the decoder side of the engine.
///
/// A source feeds exactly one player at a time; claiming is enforced by the
/// layer that owns sources, not here. Reads are expected to be fast
/// in-memory decode steps: the engine calls `get_audio_data` from its
/// scheduler tick and never tolerates blocking I/O behind it.
pub trait Source: Send {
    /// Pull up to `max_bytes` of PCM.
    ///
    /// Returns `None` only at true end of stream. Packets may be shorter
    /// (or, for imprecise sources, longer) than requested; their payload
    /// must be frame-aligned.
    fn get_audio_data(&mut self, max_bytes: usize) -> Option<AudioPacket>;

    /// Whether this source honors `max_bytes` exactly.
    ///
    /// Imprecise sources are wrapped in a `PrecisionAdapter` by the engine;
    /// the flag exists so callers can skip the wrapper's carry buffer when
    /// the source already guarantees exact reads.
    fn is_precise(&self) -> bool {
        false
    }

    /// Reposition the stream to `timestamp` seconds.
    ///
    /// Fails with [`SyncError::NotSeekable`] when unsupported; the stream
    /// position is unchanged on failure.
    ///
    /// [`SyncError::NotSeekable`]: crate::SyncError::NotSeekable
    fn seek(&mut self, timestamp: f64) -> SyncResult<()>;

    /// The fixed PCM format of every packet this source produces.
    fn audio_format(&self) -> AudioFormat;
}

/// External reference clock that playback is kept in sync with.
///
/// Reports the expected stream position in seconds, typically the
/// presentation clock of whatever owns the playback (a video clock, a
/// game simulation clock). When no master clock is attached to a player,
/// drift correction is disabled.
pub trait MasterClock: Send + Sync {
    /// Current master time in seconds.
    fn master_time(&self) -> f64;
}
