//! Explicit engine handle: construct once at startup, pass by reference.

use std::sync::Arc;

use aulos_core::{MasterClock, Source};
use aulos_voice::Voice;
use tracing::info;

use crate::{
    config::PlayConfig,
    player::{Player, PlayerCore},
    scheduler::Scheduler,
};

/// The audio engine handle.
///
/// Owns the scheduler thread and vends [`Player`]s. Lifecycle is explicit:
/// created here, torn down by [`shutdown`](Self::shutdown) or drop. There
/// is no module-level audio context and no import-time side effect.
pub struct AudioBackend {
    config: PlayConfig,
    scheduler: Scheduler,
}

impl AudioBackend {
    #[must_use]
    pub fn new(config: PlayConfig) -> Self {
        let scheduler = Scheduler::new(config.tick_interval);
        info!(tick = ?config.tick_interval, "audio backend started");
        Self { config, scheduler }
    }

    #[must_use]
    pub fn config(&self) -> &PlayConfig {
        &self.config
    }

    /// Number of players currently driven by the scheduler.
    #[must_use]
    pub fn active_players(&self) -> usize {
        self.scheduler.active_players()
    }

    /// Create a player for `source` feeding `voice`.
    ///
    /// The player starts idle and unregistered; [`Player::play`] registers
    /// it with the scheduler. Without a master clock, drift correction is
    /// disabled.
    #[must_use]
    pub fn create_player(&self, source: Box<dyn Source>, voice: Box<dyn Voice>) -> Player {
        Player::new(
            PlayerCore::new(source, voice, None, self.config.clone()),
            self.scheduler.handle(),
        )
    }

    /// Create a player kept in sync with `clock`.
    #[must_use]
    pub fn create_synced_player(
        &self,
        source: Box<dyn Source>,
        voice: Box<dyn Voice>,
        clock: Arc<dyn MasterClock>,
    ) -> Player {
        Player::new(
            PlayerCore::new(source, voice, Some(clock), self.config.clone()),
            self.scheduler.handle(),
        )
    }

    /// Stop the scheduler thread. Existing players keep their state but
    /// are no longer ticked.
    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        info!("audio backend stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::{thread::sleep, time::Duration};

    use aulos_core::AudioFormat;
    use aulos_events::PlayerEvent;
    use aulos_voice::SilentVoice;

    use super::*;
    use crate::testing::ConstantSource;

    fn mono16() -> AudioFormat {
        AudioFormat::new(1, 16, 44100)
    }

    fn backend() -> AudioBackend {
        AudioBackend::new(PlayConfig::default().with_tick_interval(Duration::from_millis(5)))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    #[test]
    fn plays_a_finite_stream_to_completion() {
        init_tracing();
        let backend = backend();
        // 50 ms of audio.
        let source = ConstantSource::finite(mono16(), 0, 4410);
        let voice = SilentVoice::new(mono16(), Duration::from_secs(1));
        let player = backend.create_player(Box::new(source), Box::new(voice));

        let mut events = player.events();
        player.prefill().unwrap();
        player.play();
        assert_eq!(backend.active_players(), 1);

        // Generous budget: CI schedulers stall.
        let mut saw_eos = false;
        for _ in 0..100 {
            sleep(Duration::from_millis(10));
            while let Ok(event) = events.try_recv() {
                if event == PlayerEvent::EndOfStream {
                    saw_eos = true;
                }
            }
            if saw_eos {
                break;
            }
        }
        assert!(saw_eos, "expected an end-of-stream event");

        let played = player.time();
        assert!(
            (played - 0.05).abs() < 1e-6,
            "expected 50 ms played, got {played}"
        );
    }

    #[test]
    fn dropping_the_player_releases_its_scheduler_slot() {
        let backend = backend();
        let source = ConstantSource::endless(mono16(), 0);
        let voice = SilentVoice::new(mono16(), Duration::from_secs(1));
        let player = backend.create_player(Box::new(source), Box::new(voice));
        player.play();
        assert_eq!(backend.active_players(), 1);

        drop(player);
        // The scheduler may hold a strong handle for the duration of one
        // tick; give it a moment to let go.
        for _ in 0..100 {
            if backend.active_players() == 0 {
                break;
            }
            sleep(Duration::from_millis(5));
        }
        assert_eq!(backend.active_players(), 0);
    }

    #[test]
    fn shutdown_stops_ticking_but_keeps_player_state() {
        let mut backend = backend();
        let source = ConstantSource::endless(mono16(), 0);
        let voice = SilentVoice::new(mono16(), Duration::from_secs(1));
        let player = backend.create_player(Box::new(source), Box::new(voice));
        player.play();
        sleep(Duration::from_millis(50));
        backend.shutdown();

        let time_at_shutdown = player.time();
        assert!(time_at_shutdown >= 0.0);
        // No further work() ticks advance the cursor set.
        sleep(Duration::from_millis(30));
        assert!((player.time() - time_at_shutdown).abs() < 1e-9);
    }
}
