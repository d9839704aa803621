//! PCM packets and the stream events embedded in them.

/// What an [`Event`] announces when playback reaches its stream position.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    /// The stream is over; no data follows this position.
    EndOfStream,
    /// A named position marker embedded by the source.
    Marker(String),
    /// An application-defined payload passed through opaquely.
    Custom(u64),
}

/// A timestamped event carried inside an [`AudioPacket`].
///
/// `timestamp` is in source-relative seconds. Immutable once queued.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: f64,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, timestamp: f64) -> Self {
        Self { kind, timestamp }
    }

    /// A named marker at `timestamp`.
    #[must_use]
    pub fn marker<S: Into<String>>(name: S, timestamp: f64) -> Self {
        Self::new(EventKind::Marker(name.into()), timestamp)
    }

    /// An end-of-stream event at `timestamp`.
    #[must_use]
    pub fn end_of_stream(timestamp: f64) -> Self {
        Self::new(EventKind::EndOfStream, timestamp)
    }
}

/// One decoded PCM packet handed over by a `Source`.
///
/// # Invariants
/// - `data.len()` is a multiple of the source format's frame size
/// - produced once and consumed exactly once: ownership moves into the
///   engine, which may slice the payload incrementally
///
/// `timestamp`/`duration` describe where the packet sits in the source's
/// own timeline; they are advisory and stripped once the payload becomes
/// byte-accurate inside the engine. `events` survive that stripping.
#[derive(Clone, Debug, Default)]
pub struct AudioPacket {
    pub data: Vec<u8>,
    pub timestamp: f64,
    pub duration: f64,
    pub events: Vec<Event>,
}

impl AudioPacket {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
