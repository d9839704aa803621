//! Exact-size reads over sources that cannot guarantee them.

use std::collections::VecDeque;

use aulos_core::{AudioFormat, Event, Source, SyncResult};
use tracing::{trace, warn};

/// Base request size when refilling the carry buffer.
const MIN_REQUEST: usize = 4096;
/// Headroom added to the gap so a well-behaved source closes it in one read.
const REQUEST_SLACK: usize = 16;
/// Growth cap relative to the starting request size.
const MAX_GROWTH: usize = 4;
/// Consecutive empty packets tolerated before the source is declared
/// exhausted. Defends against decoders that emit empty packets without
/// ever signaling end-of-stream.
const MAX_EMPTY_READS: u32 = 4;

/// A byte-exact slice of audio pulled through a [`PrecisionAdapter`],
/// with the events of every source packet consumed along the way.
#[derive(Debug, Default)]
pub struct AdaptedChunk {
    pub data: Vec<u8>,
    pub events: Vec<Event>,
}

/// Turns an imprecise [`Source`] into one that never over-delivers.
///
/// `pull(n)` returns at most `n` bytes and comes up short only when the
/// source is truly exhausted. Shortfalls are covered by retrying the
/// source with geometrically growing request sizes, accumulating into an
/// internal carry buffer that is sliced exactly per call.
///
/// Per-packet timestamp/duration metadata is stripped (irrelevant once
/// the stream is byte-accurate); embedded events are forwarded unchanged
/// with the next returned chunk.
pub struct PrecisionAdapter {
    buffer: VecDeque<u8>,
    empty_reads: u32,
    events: Vec<Event>,
    exhausted: bool,
    format: AudioFormat,
    source: Box<dyn Source>,
}

impl PrecisionAdapter {
    #[must_use]
    pub fn new(source: Box<dyn Source>) -> Self {
        Self {
            buffer: VecDeque::new(),
            empty_reads: 0,
            events: Vec::new(),
            exhausted: false,
            format: source.audio_format(),
            source,
        }
    }

    /// Format of the wrapped source.
    #[must_use]
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Whether the wrapped source has reported (or been declared) done.
    /// Buffered bytes may still remain to be pulled.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Bytes sitting in the carry buffer.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pull exactly `requested` bytes.
    ///
    /// Returns fewer bytes only when the source is exhausted, and `None`
    /// only once both the source and the carry buffer are empty.
    pub fn pull(&mut self, requested: usize) -> Option<AdaptedChunk> {
        self.fill(requested);

        if self.buffer.is_empty() && self.exhausted {
            // Events from trailing empty packets must not be lost.
            if self.events.is_empty() {
                return None;
            }
            return Some(AdaptedChunk {
                data: Vec::new(),
                events: std::mem::take(&mut self.events),
            });
        }

        let take = requested.min(self.buffer.len());
        let data: Vec<u8> = self.buffer.drain(..take).collect();
        Some(AdaptedChunk {
            data,
            events: std::mem::take(&mut self.events),
        })
    }

    /// Forget buffered data, pending events, and the exhaustion verdict.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.empty_reads = 0;
        self.events.clear();
        self.exhausted = false;
    }

    /// Reposition the wrapped source. The carry buffer is untouched; the
    /// caller clears it (via [`reset`](Self::reset)) when the seek lands.
    pub fn seek(&mut self, timestamp: f64) -> SyncResult<()> {
        self.source.seek(timestamp)
    }

    /// Swap the wrapped source, keeping buffered bytes from the old one so
    /// queued playback stays gapless. Format equality is the caller's
    /// contract.
    pub fn swap_source(&mut self, source: Box<dyn Source>) -> Box<dyn Source> {
        self.empty_reads = 0;
        self.exhausted = false;
        std::mem::replace(&mut self.source, source)
    }

    fn fill(&mut self, requested: usize) {
        if self.exhausted || self.buffer.len() >= requested {
            return;
        }

        let gap = requested - self.buffer.len();
        let mut request = MIN_REQUEST.max(gap + REQUEST_SLACK);
        let cap = request * MAX_GROWTH;

        while self.buffer.len() < requested && !self.exhausted {
            let Some(packet) = self.source.get_audio_data(request) else {
                trace!(buffered = self.buffer.len(), "source exhausted");
                self.exhausted = true;
                break;
            };

            let len = self.aligned_len(packet.len());
            self.events.extend(packet.events);

            if len == 0 {
                self.empty_reads += 1;
                if self.empty_reads >= MAX_EMPTY_READS {
                    warn!(
                        empty_reads = self.empty_reads,
                        "source keeps returning empty packets, declaring it exhausted"
                    );
                    self.exhausted = true;
                }
            } else {
                self.empty_reads = 0;
                self.buffer.extend(&packet.data[..len]);
            }

            if len < request {
                // Starved: grow the next request so short-reading sources
                // are not hammered with tiny calls.
                request = (request * 2).min(cap);
            }
        }
    }

    /// Frame-align a packet length. A partial frame is a contract
    /// violation by the source: fail fast in debug builds, clamp in
    /// release so cursors stay aligned instead of silently corrupting.
    fn aligned_len(&self, len: usize) -> usize {
        debug_assert!(
            self.format.is_frame_aligned(len as u64),
            "source delivered a partial audio frame ({len} bytes, {} per frame)",
            self.format.bytes_per_frame()
        );
        self.format.align(len as u64) as usize
    }
}
