//! # Aulos Play
//!
//! The playback synchronization engine: keeps a hardware ring buffer fed
//! from a lazily-decoded PCM source, tracks logical playback position in
//! bytes, corrects drift against an external master clock, and dispatches
//! stream events in position order.
//!
//! ## Architecture
//!
//! - [`AudioBackend`] - explicit engine handle, owns the scheduler
//! - [`Player`] - one playback: cursors, event queue, drift state, voice
//! - [`PrecisionAdapter`] - byte-exact reads over imprecise sources
//! - [`DriftEstimator`] - rolling audio-clock vs. master-clock divergence
//! - [`Scheduler`] - background thread ticking all active players
//!
//! ## Target API
//!
//! ```ignore
//! use aulos_play::{AudioBackend, PlayConfig};
//! use aulos_voice::SilentVoice;
//!
//! let backend = AudioBackend::new(PlayConfig::default());
//! let player = backend.create_player(source, voice);
//!
//! let mut events = player.events();
//! player.prefill()?;
//! player.play();
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         PlayerEvent::EndOfStream => break,
//!         PlayerEvent::Marker { name, position } => on_marker(name, position),
//!         _ => {}
//!     }
//! }
//! ```

#![forbid(unsafe_code)]

mod backend;
mod config;
mod drift;
mod player;
mod precision;
mod scheduler;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::AudioBackend;
pub use config::PlayConfig;
pub use drift::{DriftCorrection, DriftEstimator};
pub use player::{PlaybackState, Player};
pub use precision::{AdaptedChunk, PrecisionAdapter};
pub use scheduler::Scheduler;

// Re-export the leaf types the public API is spoken in.
pub use aulos_core::{
    AudioFormat, AudioPacket, Event, EventKind, MasterClock, Source, SyncError, SyncResult,
};
pub use aulos_events::{EventBus, EventQueue, PlayerEvent, ScheduledEvent};
pub use aulos_voice::{Cone, SilentVoice, Voice, VoiceNotification};
