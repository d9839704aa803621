#![forbid(unsafe_code)]

/// Notifications published by a player on its event bus.
///
/// Dispatched on the scheduler thread in playback-position order;
/// subscribers must treat them as asynchronous notifications, not
/// synchronous return values.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    /// Playback consumed the final byte of the stream.
    EndOfStream,
    /// A named marker embedded by the source reached the play position.
    Marker { name: String, position: f64 },
    /// An application-defined event reached the play position.
    Custom { id: u64, position: f64 },
    /// The voice ran dry while the stream still has data. Recoverable:
    /// playback resumes automatically once fresh data arrives.
    Underrun,
}
