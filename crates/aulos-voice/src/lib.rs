//! # Aulos Voice
//!
//! The playback-buffer contract of the aulos engine and its headless
//! backend:
//!
//! - [`Voice`] - narrow ring-buffer trait implemented per platform backend
//! - [`VoiceNotification`] - message-passing bridge for native callbacks
//! - [`SilentVoice`] - real-time backend that emits no sound
//! - [`mock::ManualVoice`] - deterministic voice for tests (feature
//!   `test-utils`)

#![forbid(unsafe_code)]

mod silent;
mod voice;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use silent::SilentVoice;
pub use voice::{Cone, Voice, VoiceNotification};
