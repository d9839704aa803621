//! Per-playback synchronization core and its public handle.
//!
//! [`PlayerCore`] owns the cursors, the adapted source, the drift
//! estimator, the event queue, and the voice; [`Player`] is the
//! mutex-wrapped handle the application holds while the scheduler drives
//! `work()` in the background.

use std::sync::Arc;

use aulos_core::{
    AudioFormat, Event, EventKind, MasterClock, Source, SyncError, SyncResult,
};
use aulos_events::{EventBus, EventQueue, PlayerEvent, ScheduledEvent};
use aulos_voice::{Cone, Voice, VoiceNotification};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::{
    config::PlayConfig,
    drift::{DriftCorrection, DriftEstimator},
    precision::PrecisionAdapter,
    scheduler::SchedulerHandle,
};

/// Playback state of a player.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaybackState {
    /// Created, never started.
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

/// The per-playback state machine.
///
/// Exclusively owns its cursor set, event queue, drift estimator, and
/// voice handle. The source is held behind the [`PrecisionAdapter`] and
/// may be swapped for gapless playback; it is never shared between two
/// cores at once.
pub(crate) struct PlayerCore {
    adapter: PrecisionAdapter,
    buffer_cursor: u64,
    bus: EventBus,
    clock: Option<Arc<dyn MasterClock>>,
    /// Net bytes artificially inserted (positive) or dropped (negative)
    /// by drift correction. Subtracting it from a raw cursor yields the
    /// stream position actually perceived by the listener.
    compensated_bytes: i64,
    config: PlayConfig,
    drift: DriftEstimator,
    /// Stream cursor at which `EndOfStream` fires, once scheduled.
    eos_pending: Option<u64>,
    eos_done: bool,
    events: EventQueue,
    format: AudioFormat,
    /// Source time corresponding to cursor zero; event timestamps are
    /// mapped through it.
    last_seek_time: f64,
    notifications: Option<kanal::Receiver<VoiceNotification>>,
    play_cursor: u64,
    prefilled: bool,
    /// Bytes the voice declined on a previous push, retried before any
    /// new pull.
    staged: Vec<u8>,
    state: PlaybackState,
    underrun: bool,
    voice: Box<dyn Voice>,
    write_cursor: u64,
}

impl PlayerCore {
    pub(crate) fn new(
        source: Box<dyn Source>,
        mut voice: Box<dyn Voice>,
        clock: Option<Arc<dyn MasterClock>>,
        config: PlayConfig,
    ) -> Self {
        let adapter = PrecisionAdapter::new(source);
        let format = adapter.format();
        let notifications = voice.take_notifications();
        Self {
            adapter,
            buffer_cursor: 0,
            bus: EventBus::new(config.event_channel_capacity),
            clock,
            compensated_bytes: 0,
            drift: DriftEstimator::new(format, config.desync_critical, config.desync_minor),
            config,
            eos_pending: None,
            eos_done: false,
            events: EventQueue::new(),
            format,
            last_seek_time: 0.0,
            notifications,
            play_cursor: 0,
            prefilled: false,
            staged: Vec::new(),
            state: PlaybackState::Idle,
            underrun: false,
            voice,
            write_cursor: 0,
        }
    }

    /// One synchronization tick. Called by the scheduler, and once
    /// synchronously by [`prefill`](Self::prefill). Never blocks on I/O.
    pub(crate) fn work(&mut self) {
        // 1. Native-callback notifications first: they may report an
        //    underflow this tick has to react to.
        self.drain_notifications();

        // 2. Advance the play cursor from the voice's report, clamped into
        //    the valid window so a misreporting backend cannot break the
        //    cursor invariant.
        let reported = self.voice.reported_play_position();
        self.play_cursor = self.play_cursor.max(reported.min(self.write_cursor));

        // 3. Dispatch events the perceived cursor has passed, in order.
        let perceived = self.perceived_play_cursor();
        for entry in self.events.dispatch_up_to(perceived) {
            self.publish(entry);
        }

        // 4. Release fully-played data.
        self.buffer_cursor = self.play_cursor;

        // 5. End of stream: report it once everything queued has drained.
        if let Some(eos_cursor) = self.eos_pending
            && perceived >= eos_cursor
        {
            self.eos_pending = None;
            self.eos_done = true;
            debug!(cursor = eos_cursor, "end of stream drained");
            self.bus.publish(PlayerEvent::EndOfStream);
        }

        // 6. Detect a voice underrun (recoverable: the voice plays silence
        //    until fresh data arrives).
        let buffered = self.write_cursor - self.play_cursor;
        if self.state == PlaybackState::Playing
            && buffered == 0
            && self.write_cursor > 0
            && !self.adapter.is_exhausted()
        {
            self.note_underrun();
        }

        // 7. Refill when the backlog drops below the comfort threshold.
        //    Staged bytes flow first; after exhaustion only the staged
        //    remainder still moves, never a new pull.
        let ideal = self.ideal_bytes();
        let can_pull = self.eos_pending.is_none() && !self.eos_done;
        let pushed = if !self.staged.is_empty() {
            self.flush_staged()
        } else if can_pull && buffered < ideal * 2 / 3 {
            self.refill(ideal - buffered)
        } else {
            0
        };
        if pushed > 0 && self.underrun && self.state == PlaybackState::Playing {
            // The voice may have stalled at the end of its data; kick it
            // back into motion.
            self.voice.play();
            self.underrun = false;
            debug!("resumed voice after underrun");
        }

        debug_assert!(
            self.buffer_cursor <= self.play_cursor && self.play_cursor <= self.write_cursor,
            "cursor invariant violated: {} <= {} <= {}",
            self.buffer_cursor,
            self.play_cursor,
            self.write_cursor
        );
    }

    /// Push one ideal-buffer's worth of data before the first `play()`.
    pub(crate) fn prefill(&mut self) -> SyncResult<()> {
        if self.state != PlaybackState::Idle {
            return Err(SyncError::InvalidState {
                state: self.state.name(),
            });
        }
        if self.prefilled {
            return Err(SyncError::InvalidState {
                state: "already prefilled",
            });
        }
        self.prefilled = true;
        trace!("prefilling");
        self.work();
        Ok(())
    }

    pub(crate) fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        debug!(from = self.state.name(), "play");
        self.state = PlaybackState::Playing;
        self.underrun = false;
        self.voice.play();
    }

    /// Idempotent: stopping a paused or idle player changes nothing.
    pub(crate) fn stop(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        debug!("stop");
        self.voice.pause();
        self.state = PlaybackState::Paused;
    }

    /// Reset cursors, queued events, buffered data, and correction state.
    /// Only allowed while not playing.
    pub(crate) fn clear(&mut self) -> SyncResult<()> {
        if self.state == PlaybackState::Playing {
            return Err(SyncError::InvalidState { state: "playing" });
        }
        debug!("clear");
        self.voice.flush();
        self.adapter.reset();
        self.drift.reset();
        self.events.clear();
        self.buffer_cursor = 0;
        self.play_cursor = 0;
        self.write_cursor = 0;
        self.compensated_bytes = 0;
        self.eos_pending = None;
        self.eos_done = false;
        self.prefilled = false;
        self.staged.clear();
        self.underrun = false;
        Ok(())
    }

    /// Reposition the source, then clear. On `NotSeekable` nothing has
    /// changed, including the playback position.
    pub(crate) fn seek(&mut self, timestamp: f64) -> SyncResult<()> {
        if self.state == PlaybackState::Playing {
            return Err(SyncError::InvalidState { state: "playing" });
        }
        self.adapter.seek(timestamp)?;
        self.clear()?;
        self.last_seek_time = timestamp;
        debug!(timestamp, "seek");
        Ok(())
    }

    /// Swap the source for gapless/queued playback. The new source must
    /// carry an identical format; rejected before any state mutation.
    pub(crate) fn set_source(&mut self, source: Box<dyn Source>) -> SyncResult<()> {
        let actual = source.audio_format();
        if actual != self.format {
            return Err(SyncError::FormatMismatch {
                expected: self.format,
                actual,
            });
        }
        self.adapter.swap_source(source);
        self.eos_pending = None;
        self.eos_done = false;
        debug!("source swapped");
        Ok(())
    }

    /// Perceived playback position in seconds since the last clear.
    pub(crate) fn time(&self) -> f64 {
        self.format.bytes_to_duration(self.perceived_play_cursor())
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.bus.subscribe()
    }

    fn drain_notifications(&mut self) {
        let mut underflow = false;
        if let Some(rx) = self.notifications.as_ref() {
            while let Ok(Some(notification)) = rx.try_recv() {
                match notification {
                    VoiceNotification::Consumed(bytes) => trace!(bytes, "voice consumed"),
                    VoiceNotification::Underflow => underflow = true,
                }
            }
        }
        if underflow && self.state == PlaybackState::Playing && !self.adapter.is_exhausted() {
            self.note_underrun();
        }
    }

    fn note_underrun(&mut self) {
        if self.underrun {
            return;
        }
        self.underrun = true;
        warn!(
            write_cursor = self.write_cursor,
            "voice underrun, waiting for fresh data"
        );
        self.bus.publish(PlayerEvent::Underrun);
    }

    /// Pull up to `gap` bytes (drift-adjusted) and push them to the voice.
    /// Returns the bytes actually accepted this tick.
    fn refill(&mut self, gap: u64) -> usize {
        // Staged bytes drained before any pull; anything else would
        // reorder the stream.
        debug_assert!(self.staged.is_empty());

        let want = gap;
        let mut drop_bytes: u64 = 0;
        let mut pad_bytes: u64 = 0;

        if self.state == PlaybackState::Playing
            && let Some(correction) = self.measure_drift()
        {
            let step = self
                .format
                .duration_to_bytes(self.config.correction_step.as_secs_f64());
            if correction.bytes > 0 {
                // Audio runs fast: prepend a repeated first frame, slowing
                // apparent progress without an audible click.
                pad_bytes = self.format.align(correction.bytes.unsigned_abs().min(step));
            } else {
                // Audio runs late: skip ahead by dropping from the front
                // of the fresh data. The whole overshoot when critical,
                // one step when creeping.
                let behind = correction.bytes.unsigned_abs();
                let limit = if correction.critical {
                    behind
                } else {
                    behind.min(step)
                };
                drop_bytes = self.format.align(limit);
            }
        }

        // The stream coordinate where this chunk's content begins. Taken
        // before this tick's compensation so event cursors stay exact
        // under correction maneuvers.
        let base = self.perceived_cursor_of(self.write_cursor);

        #[expect(clippy::cast_possible_truncation)]
        let requested = (want + drop_bytes) as usize;
        let Some(chunk) = self.adapter.pull(requested) else {
            self.mark_end_of_stream();
            return 0;
        };

        self.register_events(base, chunk.events);

        let mut data = chunk.data;
        if drop_bytes > 0 && !data.is_empty() {
            #[expect(clippy::cast_possible_truncation)]
            let dropped = (drop_bytes.min(self.format.align(data.len() as u64))) as usize;
            data.drain(..dropped);
            self.compensated_bytes -= dropped as i64;
            debug!(dropped, "dropped audio to catch up with the master clock");
        }
        if pad_bytes > 0 && !data.is_empty() {
            data = self.pad_front(data, pad_bytes);
        }

        if self.adapter.is_exhausted() && self.adapter.buffered() == 0 {
            // The source ran dry inside this pull; what we hold is the
            // tail of the stream.
            let pushed = self.push_to_voice(data);
            self.mark_end_of_stream();
            return pushed;
        }

        self.push_to_voice(data)
    }

    fn flush_staged(&mut self) -> usize {
        let accepted = self.voice.write(&self.staged);
        debug_assert!(self.format.is_frame_aligned(accepted as u64));
        self.staged.drain(..accepted);
        self.write_cursor += accepted as u64;
        accepted
    }

    fn push_to_voice(&mut self, mut data: Vec<u8>) -> usize {
        if data.is_empty() {
            return 0;
        }
        let accepted = self.voice.write(&data);
        debug_assert!(self.format.is_frame_aligned(accepted as u64));
        self.write_cursor += accepted as u64;
        if accepted < data.len() {
            self.staged = data.split_off(accepted);
            trace!(staged = self.staged.len(), "voice full, staging remainder");
        }
        accepted
    }

    /// Prepend `pad_bytes` of the chunk's first frame, repeated. A
    /// constant signal is inaudible as a discontinuity.
    #[expect(clippy::cast_possible_truncation)]
    fn pad_front(&mut self, data: Vec<u8>, pad_bytes: u64) -> Vec<u8> {
        let frame = self.format.bytes_per_frame() as usize;
        let frames = pad_bytes as usize / frame;
        if frames == 0 {
            return data;
        }
        let first = &data[..frame];
        let mut padded = Vec::with_capacity(frames * frame + data.len());
        for _ in 0..frames {
            padded.extend_from_slice(first);
        }
        self.compensated_bytes += padded.len() as i64;
        debug!(
            padded = padded.len(),
            "inserted padding to fall back to the master clock"
        );
        padded.extend_from_slice(&data);
        padded
    }

    fn mark_end_of_stream(&mut self) {
        if self.eos_pending.is_some() || self.eos_done {
            return;
        }
        let cursor = self.perceived_cursor_of(self.write_cursor + self.staged.len() as u64);
        trace!(cursor, "source exhausted, scheduling end of stream");
        self.eos_pending = Some(cursor);
    }

    fn measure_drift(&mut self) -> Option<DriftCorrection> {
        let clock = self.clock.as_ref()?;
        let audio_time =
            self.last_seek_time + self.format.bytes_to_duration(self.perceived_play_cursor());
        let correction = self.drift.update(audio_time, clock.master_time());
        (correction.bytes != 0).then_some(correction)
    }

    fn register_events(&mut self, base: u64, events: Vec<Event>) {
        for event in events {
            let offset = self
                .format
                .duration_to_bytes(event.timestamp - self.last_seek_time);
            self.events.schedule(base + offset, event);
        }
    }

    fn publish(&mut self, entry: ScheduledEvent) {
        let position = self.last_seek_time + self.format.bytes_to_duration(entry.cursor);
        let event = match entry.event.kind {
            EventKind::EndOfStream => PlayerEvent::EndOfStream,
            EventKind::Marker(name) => PlayerEvent::Marker { name, position },
            EventKind::Custom(id) => PlayerEvent::Custom { id, position },
        };
        trace!(?event, cursor = entry.cursor, "dispatching event");
        self.bus.publish(event);
    }

    fn perceived_play_cursor(&self) -> u64 {
        self.perceived_cursor_of(self.play_cursor)
    }

    #[expect(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn perceived_cursor_of(&self, raw: u64) -> u64 {
        (raw as i64 - self.compensated_bytes).max(0) as u64
    }

    fn ideal_bytes(&self) -> u64 {
        self.format
            .duration_to_bytes(self.config.ideal_buffer.as_secs_f64())
            .max(self.format.bytes_per_frame())
    }
}

/// Handle to one playback, driven by the scheduler in the background.
///
/// Dropping the player releases its voice; the scheduler prunes the dead
/// handle on its next tick.
pub struct Player {
    core: Arc<Mutex<PlayerCore>>,
    scheduler: SchedulerHandle,
}

impl Player {
    pub(crate) fn new(core: PlayerCore, scheduler: SchedulerHandle) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
            scheduler,
        }
    }

    /// Push one ideal buffer of data before the first [`play`](Self::play)
    /// so playback starts without an audible gap. Allowed only while idle.
    pub fn prefill(&self) -> SyncResult<()> {
        self.core.lock().prefill()
    }

    /// Start or resume playback and register with the scheduler.
    pub fn play(&self) {
        self.core.lock().play();
        self.scheduler.register(Arc::downgrade(&self.core));
    }

    /// Pause playback and unregister from the scheduler. Idempotent.
    pub fn stop(&self) {
        self.core.lock().stop();
        self.scheduler.unregister(&Arc::downgrade(&self.core));
    }

    /// Reset cursors, queued events, and buffered data, as a seek does.
    /// Not allowed while playing.
    pub fn clear(&self) -> SyncResult<()> {
        self.core.lock().clear()
    }

    /// Reposition the source and clear. Not allowed while playing; on
    /// [`SyncError::NotSeekable`] the playback position is unchanged.
    pub fn seek(&self, timestamp: f64) -> SyncResult<()> {
        self.core.lock().seek(timestamp)
    }

    /// Swap in a new source of identical format without disturbing
    /// playback state (gapless/queued playback).
    pub fn set_source(&self, source: Box<dyn Source>) -> SyncResult<()> {
        self.core.lock().set_source(source)
    }

    /// Perceived playback position in seconds since the last clear.
    pub fn time(&self) -> f64 {
        self.core.lock().time()
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().state()
    }

    /// Subscribe to this player's notifications. Events arrive on the
    /// scheduler thread; treat them as asynchronous.
    pub fn events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.core.lock().subscribe()
    }

    // Spatialization pass-through, forwarded unmodified to the voice.

    pub fn set_volume(&self, gain: f32) {
        self.core.lock().voice.set_volume(gain);
    }

    pub fn set_pitch(&self, pitch: f32) {
        self.core.lock().voice.set_pitch(pitch);
    }

    pub fn set_position(&self, position: [f32; 3]) {
        self.core.lock().voice.set_position(position);
    }

    pub fn set_cone(&self, cone: Cone) {
        self.core.lock().voice.set_cone(cone);
    }
}

#[cfg(test)]
#[path = "player_tests.rs"]
mod player_tests;
