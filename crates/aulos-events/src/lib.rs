#![forbid(unsafe_code)]

//! Cursor-ordered event dispatch and per-player notification bus.

mod bus;
mod event;
mod queue;

pub use bus::EventBus;
pub use event::PlayerEvent;
pub use queue::{EventQueue, ScheduledEvent};
