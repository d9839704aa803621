//! Example: drive a synthetic tone through the silent backend.
//!
//! This demonstrates the engine wiring:
//! - implement `Source` for a decoder-like PCM producer
//! - create an `AudioBackend` and a player over a `SilentVoice`
//! - prefill, play, and watch position-ordered events arrive
//!
//! Run with:
//! ```
//! cargo run -p aulos-play --example silent_playback
//! ```

use std::{f64::consts::TAU, time::Duration};

use aulos_play::{
    AudioBackend, AudioFormat, AudioPacket, Event, PlayConfig, PlayerEvent, SilentVoice, Source,
    SyncResult,
};
use tracing::info;

/// A 440 Hz tone rendered on demand, with a marker every half second.
struct ToneSource {
    format: AudioFormat,
    position: u64,
    total: u64,
}

impl ToneSource {
    fn new(format: AudioFormat, duration: Duration) -> Self {
        Self {
            format,
            position: 0,
            total: format.duration_to_bytes(duration.as_secs_f64()),
        }
    }
}

impl Source for ToneSource {
    fn get_audio_data(&mut self, max_bytes: usize) -> Option<AudioPacket> {
        if self.position >= self.total {
            return None;
        }
        let len = self
            .format
            .align(max_bytes as u64)
            .min(self.total - self.position);
        let rate = f64::from(self.format.sample_rate);

        let mut data = Vec::with_capacity(len as usize);
        for frame in 0..len / 2 {
            let t = (self.position / 2 + frame) as f64 / rate;
            let value = ((TAU * 440.0 * t).sin() * f64::from(i16::MAX)) as i16;
            data.extend_from_slice(&value.to_le_bytes());
        }

        let timestamp = self.format.bytes_to_duration(self.position);
        let end = self.format.bytes_to_duration(self.position + len);

        // Pin a marker to every half-second boundary this packet crosses.
        let mut events = Vec::new();
        let mut mark = (timestamp * 2.0).ceil() / 2.0;
        while mark < end {
            if mark > 0.0 {
                events.push(Event::marker(format!("{mark:.1}s"), mark));
            }
            mark += 0.5;
        }

        self.position += len;
        Some(
            AudioPacket::new(data)
                .with_timestamp(timestamp)
                .with_duration(end - timestamp)
                .with_events(events),
        )
    }

    fn is_precise(&self) -> bool {
        true
    }

    fn seek(&mut self, timestamp: f64) -> SyncResult<()> {
        self.position = self.format.duration_to_bytes(timestamp).min(self.total);
        Ok(())
    }

    fn audio_format(&self) -> AudioFormat {
        self.format
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let format = AudioFormat::new(1, 16, 44100);
    let backend = AudioBackend::new(PlayConfig::default());
    let source = ToneSource::new(format, Duration::from_secs(2));
    let voice = SilentVoice::new(format, Duration::from_secs(1));

    let player = backend.create_player(Box::new(source), Box::new(voice));
    let mut events = player.events();

    player.prefill().expect("freshly created player is idle");
    player.play();

    loop {
        match events.blocking_recv() {
            Ok(PlayerEvent::EndOfStream) => {
                info!(time = player.time(), "end of stream");
                break;
            }
            Ok(event) => info!(?event, time = player.time(), "event"),
            Err(_) => break,
        }
    }
}
