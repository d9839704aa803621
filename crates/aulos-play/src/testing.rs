//! Scripted sources and clocks for exercising the engine without a
//! decoder or real time.

use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
};

use aulos_core::{AudioFormat, AudioPacket, MasterClock, Source, SyncError, SyncResult};

/// A source replaying a fixed script of packets, ignoring requested sizes
/// (the worst-case imprecise source).
pub struct ScriptedSource {
    format: AudioFormat,
    packets: VecDeque<AudioPacket>,
    seekable: bool,
    /// Every seek target received, newest last.
    pub seeks: Vec<f64>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(format: AudioFormat, packets: Vec<AudioPacket>) -> Self {
        Self {
            format,
            packets: packets.into(),
            seekable: true,
            seeks: Vec::new(),
        }
    }

    /// Make `seek` fail with `NotSeekable`.
    #[must_use]
    pub fn unseekable(mut self) -> Self {
        self.seekable = false;
        self
    }
}

impl Source for ScriptedSource {
    fn get_audio_data(&mut self, _max_bytes: usize) -> Option<AudioPacket> {
        self.packets.pop_front()
    }

    fn seek(&mut self, timestamp: f64) -> SyncResult<()> {
        if !self.seekable {
            return Err(SyncError::NotSeekable);
        }
        self.seeks.push(timestamp);
        Ok(())
    }

    fn audio_format(&self) -> AudioFormat {
        self.format
    }
}

/// An endless source delivering exactly what is asked for, filled with a
/// constant byte value.
pub struct ConstantSource {
    fill: u8,
    format: AudioFormat,
    /// Total bytes handed out so far.
    pub produced: u64,
    /// Remaining bytes before end of stream; `None` for endless.
    remaining: Option<u64>,
}

impl ConstantSource {
    #[must_use]
    pub fn endless(format: AudioFormat, fill: u8) -> Self {
        Self {
            fill,
            format,
            produced: 0,
            remaining: None,
        }
    }

    /// A source that ends after `total` bytes.
    #[must_use]
    pub fn finite(format: AudioFormat, fill: u8, total: u64) -> Self {
        Self {
            fill,
            format,
            produced: 0,
            remaining: Some(format.align(total)),
        }
    }
}

impl Source for ConstantSource {
    #[expect(clippy::cast_possible_truncation)]
    fn get_audio_data(&mut self, max_bytes: usize) -> Option<AudioPacket> {
        let len = self.format.align(max_bytes as u64);
        let len = match &mut self.remaining {
            None => len,
            Some(0) => return None,
            Some(remaining) => {
                let len = len.min(*remaining);
                *remaining -= len;
                len
            }
        };
        self.produced += len;
        Some(AudioPacket::new(vec![self.fill; len as usize]))
    }

    fn is_precise(&self) -> bool {
        true
    }

    fn seek(&mut self, _timestamp: f64) -> SyncResult<()> {
        Ok(())
    }

    fn audio_format(&self) -> AudioFormat {
        self.format
    }
}

/// A master clock set explicitly by the test, in microseconds.
#[derive(Debug, Default)]
pub struct TestClock {
    micros: AtomicU64,
}

impl TestClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set(&self, seconds: f64) {
        self.micros
            .store((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
    }
}

impl MasterClock for TestClock {
    #[expect(clippy::cast_precision_loss)]
    fn master_time(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}
