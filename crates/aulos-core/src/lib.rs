//! # Aulos Core
//!
//! Leaf value types and contracts for the aulos playback engine:
//!
//! - [`AudioFormat`] - PCM format with byte/frame alignment arithmetic
//! - [`AudioPacket`] / [`Event`] - decoded payloads and embedded events
//! - [`Source`] - contract for decoders feeding the engine
//! - [`MasterClock`] - external reference clock for drift correction
//! - [`SyncError`] - shared error taxonomy

#![forbid(unsafe_code)]

mod errors;
mod format;
mod packet;
mod source;

pub use errors::{SyncError, SyncResult};
pub use format::AudioFormat;
pub use packet::{AudioPacket, Event, EventKind};
pub use source::{MasterClock, Source};
