//! State-machine tests for [`PlayerCore`], driven tick by tick with a
//! manually-advanced voice.

use std::{sync::Arc, time::Duration};

use aulos_core::{AudioFormat, AudioPacket, Event, MasterClock, SyncError};
use aulos_events::PlayerEvent;
use aulos_voice::{Voice, VoiceNotification, mock::ManualVoice};
use parking_lot::Mutex;
use tokio::sync::broadcast::Receiver;

use super::{PlaybackState, PlayerCore};
use crate::{
    config::PlayConfig,
    testing::{ConstantSource, ScriptedSource, TestClock},
};

/// Test voice shared between the core (as `Box<dyn Voice>`) and the test
/// (to advance playback and inspect calls).
#[derive(Clone)]
struct SharedVoice(Arc<Mutex<ManualVoice>>);

impl SharedVoice {
    fn new(format: AudioFormat) -> Self {
        Self(Arc::new(Mutex::new(ManualVoice::new(format))))
    }

    fn with_capacity(format: AudioFormat, capacity: u64) -> Self {
        Self(Arc::new(Mutex::new(ManualVoice::with_capacity(
            format, capacity,
        ))))
    }

    fn advance(&self, bytes: u64) {
        self.0.lock().advance_play(bytes);
    }

    fn push_underflow(&self) {
        self.0.lock().push_underflow();
    }

    fn written(&self) -> u64 {
        self.0.lock().written()
    }

    fn data(&self) -> Vec<u8> {
        self.0.lock().data.clone()
    }

    fn play_calls(&self) -> u32 {
        self.0.lock().play_calls
    }

    fn pause_calls(&self) -> u32 {
        self.0.lock().pause_calls
    }

    fn flush_calls(&self) -> u32 {
        self.0.lock().flush_calls
    }
}

impl Voice for SharedVoice {
    fn write(&mut self, data: &[u8]) -> usize {
        self.0.lock().write(data)
    }

    fn reported_play_position(&mut self) -> u64 {
        self.0.lock().reported_play_position()
    }

    fn play(&mut self) {
        self.0.lock().play();
    }

    fn pause(&mut self) {
        self.0.lock().pause();
    }

    fn flush(&mut self) {
        self.0.lock().flush();
    }

    fn take_notifications(&mut self) -> Option<kanal::Receiver<VoiceNotification>> {
        self.0.lock().take_notifications()
    }
}

fn mono16() -> AudioFormat {
    AudioFormat::new(1, 16, 44100)
}

fn small_buffer_config() -> PlayConfig {
    // 10 ms ideal buffer keeps refills coming every simulated tick.
    PlayConfig::default().with_ideal_buffer(Duration::from_millis(10))
}

fn packets(sizes: &[usize]) -> Vec<AudioPacket> {
    sizes
        .iter()
        .map(|&size| AudioPacket::new(vec![0xAA; size]))
        .collect()
}

fn drain(rx: &mut Receiver<PlayerEvent>) -> Vec<PlayerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn assert_cursor_invariant(core: &PlayerCore) {
    assert!(
        core.buffer_cursor <= core.play_cursor && core.play_cursor <= core.write_cursor,
        "cursor invariant violated: {} <= {} <= {}",
        core.buffer_cursor,
        core.play_cursor,
        core.write_cursor
    );
}

#[test]
fn finite_stream_dispatches_exactly_one_eos_at_total_cursor() {
    let voice = SharedVoice::new(mono16());
    let source = ScriptedSource::new(mono16(), packets(&[4096, 4096, 1000]));
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    let mut events = core.subscribe();

    core.play();
    core.work();
    assert_eq!(core.write_cursor, 9192);

    // Drain halfway: nothing fires yet.
    voice.advance(4096);
    core.work();
    assert!(drain(&mut events).is_empty());

    // Drain the rest: exactly one end-of-stream, at cursor 9192.
    voice.advance(5096);
    core.work();
    assert_eq!(drain(&mut events), [PlayerEvent::EndOfStream]);
    assert!((core.time() - 9192.0 / 88200.0).abs() < 1e-9);

    // Further ticks stay silent.
    core.work();
    core.work();
    assert!(drain(&mut events).is_empty());
}

#[test]
fn cursor_invariant_holds_across_ticks() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );

    core.play();
    for advance in [0u64, 100, 882, 2, 0, 400, 10_000] {
        voice.advance(advance);
        core.work();
        assert_cursor_invariant(&core);
    }
}

#[test]
fn stop_twice_is_the_same_as_once() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );

    core.play();
    core.stop();
    core.stop();
    assert_eq!(core.state(), PlaybackState::Paused);
    assert_eq!(voice.pause_calls(), 1);
}

#[test]
fn stop_while_idle_is_a_no_op() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    core.stop();
    assert_eq!(core.state(), PlaybackState::Idle);
    assert_eq!(voice.pause_calls(), 0);
}

#[test]
fn clear_resets_time_and_resumes_from_source_position() {
    let voice = SharedVoice::new(mono16());
    let first = AudioPacket::new(vec![0xAA; 4096]);
    let second = AudioPacket::new(vec![0xBB; 4096]);
    let source = ScriptedSource::new(mono16(), vec![first, second]);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );

    core.play();
    core.work();
    voice.advance(442);
    core.work();
    assert!(core.time() > 0.0);

    core.stop();
    core.clear().unwrap();
    assert_eq!(core.time(), 0.0);
    assert_eq!(core.write_cursor, 0);
    assert_eq!(voice.flush_calls(), 1);

    // Resuming pulls the source's next packet, not the pre-clear bytes:
    // everything the voice now receives comes from the second packet.
    core.play();
    core.work();
    assert!(voice.written() > 0);
    assert!(voice.data().iter().all(|&byte| byte == 0xBB));
}

#[test]
fn clear_while_playing_is_rejected() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    core.play();
    assert!(matches!(
        core.clear(),
        Err(SyncError::InvalidState { state: "playing" })
    ));
}

#[test]
fn set_source_with_mismatched_format_is_rejected_and_playback_continues() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0xAA);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );
    core.play();
    core.work();
    let written_before = voice.written();

    let mismatched = ConstantSource::endless(AudioFormat::new(2, 16, 48000), 0xBB);
    assert!(matches!(
        core.set_source(Box::new(mismatched)),
        Err(SyncError::FormatMismatch { .. })
    ));

    // The old source keeps feeding the voice, unaffected.
    voice.advance(882);
    core.work();
    assert!(voice.written() > written_before);
    assert!(voice.data().iter().all(|&byte| byte == 0xAA));
}

#[test]
fn set_source_resumes_after_exhaustion() {
    let voice = SharedVoice::new(mono16());
    let source = ScriptedSource::new(mono16(), packets(&[882]));
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );
    core.play();
    core.work();
    // Exhaustion is discovered on the first pull that comes up empty.
    voice.advance(442);
    core.work();
    assert!(core.eos_pending.is_some());

    core.set_source(Box::new(ConstantSource::endless(mono16(), 0x55)))
        .unwrap();
    assert!(core.eos_pending.is_none());

    voice.advance(882);
    core.work();
    assert!(core.write_cursor > 882, "fresh source should refill");
}

#[test]
fn underrun_is_reported_and_recovers_with_fresh_data() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );
    let mut events = core.subscribe();

    core.play();
    core.work();
    let play_calls_before = voice.play_calls();

    // The voice consumes everything between two ticks.
    voice.advance(core.write_cursor);
    core.work();

    assert!(drain(&mut events).contains(&PlayerEvent::Underrun));
    assert!(!core.underrun, "refill should clear the underrun flag");
    assert_eq!(
        voice.play_calls(),
        play_calls_before + 1,
        "the voice must be re-triggered after an underrun"
    );
}

#[test]
fn native_underflow_notification_reports_underrun() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    let mut events = core.subscribe();

    core.play();
    core.work();
    voice.push_underflow();
    core.work();
    assert!(drain(&mut events).contains(&PlayerEvent::Underrun));
}

#[test]
fn critical_drift_behind_drops_data_immediately() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let clock = Arc::new(TestClock::new());
    clock.set(10.0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        Some(clock as Arc<dyn MasterClock>),
        PlayConfig::default(),
    );

    core.play();
    core.work();

    assert!(core.compensated_bytes < 0, "dropping must be recorded");
    // The perceived position jumps to the master clock.
    assert!((core.time() - 10.0).abs() < 0.05);
}

#[test]
fn minor_drift_ahead_pads_after_the_window_fills() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 7);
    let clock = Arc::new(TestClock::new());
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        Some(clock.clone() as Arc<dyn MasterClock>),
        small_buffer_config(),
    );

    core.play();
    // The master clock stays at zero while audio advances 10 ms per tick,
    // so the rolling window slowly fills with "ahead" samples.
    for _ in 0..12 {
        core.work();
        voice.advance(882);
        assert_cursor_invariant(&core);
    }

    assert!(
        core.compensated_bytes > 0,
        "padding must be recorded, got {}",
        core.compensated_bytes
    );
    // Padding repeats the first frame of real data, never silence from
    // nowhere: every written byte is still the source's fill value.
    assert!(voice.data().iter().all(|&byte| byte == 7));
}

#[test]
fn prefill_is_only_allowed_once_and_only_while_idle() {
    let voice = SharedVoice::new(mono16());
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );

    core.prefill().unwrap();
    assert!(core.write_cursor > 0, "prefill must push data");
    assert_eq!(core.state(), PlaybackState::Idle);
    assert!(core.prefill().is_err());

    core.play();
    assert!(matches!(
        core.prefill(),
        Err(SyncError::InvalidState { state: "playing" })
    ));
}

#[test]
fn markers_dispatch_in_order_with_stream_positions() {
    let voice = SharedVoice::new(mono16());
    let packet = AudioPacket::new(vec![0; 4410]).with_events(vec![
        Event::marker("a", 0.010),
        Event::marker("b", 0.030),
    ]);
    let source = ScriptedSource::new(mono16(), vec![packet]);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    let mut events = core.subscribe();

    core.play();
    core.work();

    voice.advance(mono16().duration_to_bytes(0.020));
    core.work();
    let first = drain(&mut events);
    assert_eq!(first.len(), 1);
    assert!(
        matches!(&first[0], PlayerEvent::Marker { name, position } if name == "a" && (position - 0.010).abs() < 1e-6)
    );

    voice.advance(mono16().duration_to_bytes(0.040));
    core.work();
    let second = drain(&mut events);
    // The end-of-stream lands in the same tick, after the marker.
    assert!(
        matches!(&second[0], PlayerEvent::Marker { name, .. } if name == "b")
    );
    assert_eq!(second[1], PlayerEvent::EndOfStream);
}

#[test]
fn seek_rebases_event_timestamps() {
    let voice = SharedVoice::new(mono16());
    let packet = AudioPacket::new(vec![0; 4410]).with_events(vec![Event::marker("hook", 1.020)]);
    let source = ScriptedSource::new(mono16(), vec![packet]);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );
    let mut events = core.subscribe();

    core.seek(1.0).unwrap();
    core.play();
    core.work();
    voice.advance(mono16().duration_to_bytes(0.025));
    core.work();

    let dispatched = drain(&mut events);
    assert!(
        matches!(&dispatched[0], PlayerEvent::Marker { name, position } if name == "hook" && (position - 1.020).abs() < 1e-6)
    );
}

#[test]
fn seek_on_unseekable_source_changes_nothing() {
    let voice = SharedVoice::new(mono16());
    let source = ScriptedSource::new(mono16(), packets(&[4096])).unseekable();
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        PlayConfig::default(),
    );

    core.play();
    core.work();
    voice.advance(100);
    core.work();
    let time_before = core.time();
    let write_before = core.write_cursor;

    core.stop();
    assert!(matches!(core.seek(3.0), Err(SyncError::NotSeekable)));
    assert!((core.time() - time_before).abs() < 1e-9);
    assert_eq!(core.write_cursor, write_before);
    assert_eq!(voice.flush_calls(), 0);
}

#[test]
fn voice_backpressure_stages_and_retries() {
    let voice = SharedVoice::with_capacity(mono16(), 100);
    let source = ConstantSource::endless(mono16(), 0);
    let mut core = PlayerCore::new(
        Box::new(source),
        Box::new(voice.clone()),
        None,
        small_buffer_config(),
    );

    core.play();
    core.work();
    assert_eq!(core.write_cursor, 100);
    assert_eq!(core.staged.len(), 782);
    assert_cursor_invariant(&core);

    // As the voice drains, staged bytes flow in whole frames.
    let mut guard = 0;
    while core.write_cursor < 882 {
        voice.advance(100);
        core.work();
        assert_cursor_invariant(&core);
        guard += 1;
        assert!(guard < 50, "staged bytes never drained");
    }
    assert!(core.staged.is_empty());
}
