//! Streaming frame extraction from the raw bus byte stream.
//!
//! The TCP-to-serial bridge delivers bytes in arbitrary chunks with no
//! relation to frame boundaries. [`FrameExtractor::feed`] accepts chunks of
//! any size (including empty, e.g. on a read timeout), buffers partial data,
//! and emits every complete `AA 55 .. 0D 0D` span in trailer order.
//!
//! Guarantees:
//!
//! - chunking invariance: any split of the same byte stream yields the same
//!   frames in the same order
//! - a frame is emitted only once its trailer marker has arrived
//! - only structurally valid spans become frames; under-length or
//!   odd-length spans between markers are dropped and counted
//! - the internal buffer is bounded; an over-long unterminated span is
//!   dropped and counted rather than growing without limit

use crate::constants::{FRAME_HEADER, FRAME_TRAILER, MAX_UNTERMINATED_SPAN};
use crate::frame::Frame;

/// Incremental frame extractor that handles partial reads.
///
/// Feed bytes via [`FrameExtractor::feed`] and collect complete frames.
/// Never blocks, never errors; malformed spans are dropped and tallied in
/// [`FrameExtractor::dropped_spans`].
#[derive(Debug)]
pub struct FrameExtractor {
    buf: Vec<u8>,
    max_span: usize,
    dropped_spans: u64,
}

impl FrameExtractor {
    /// Creates an extractor with the default buffer bound.
    pub fn new() -> Self {
        Self::with_max_span(MAX_UNTERMINATED_SPAN)
    }

    /// Creates an extractor that drops unterminated spans longer than
    /// `max_span` bytes.
    pub fn with_max_span(max_span: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_span,
            dropped_spans: 0,
        }
    }

    /// Feeds one chunk and returns every frame completed by it, in the
    /// order their trailers were observed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.buf, &FRAME_HEADER) else {
                // No header anywhere. Keep only a tail that could still be
                // the first byte of a split header marker.
                let keep = FRAME_HEADER.len().saturating_sub(1);
                if self.buf.len() > keep {
                    self.buf.drain(..self.buf.len() - keep);
                }
                break;
            };

            // Bytes before the header can never start a frame.
            if start > 0 {
                self.buf.drain(..start);
            }

            match find(&self.buf[FRAME_HEADER.len()..], &FRAME_TRAILER) {
                Some(rel) => {
                    let end = FRAME_HEADER.len() + rel + FRAME_TRAILER.len();
                    let bytes: Vec<u8> = self.buf.drain(..end).collect();
                    match Frame::from_bytes(bytes) {
                        Ok(frame) => frames.push(frame),
                        Err(err) => {
                            // Under-length or odd-length span between valid
                            // markers. Line noise; drop it and keep scanning
                            // so it never reaches classification.
                            self.dropped_spans += 1;
                            log::warn!("dropped malformed span: {err}");
                        }
                    }
                }
                None => {
                    // Header with no trailer yet: frame still incomplete.
                    if self.buf.len() > self.max_span {
                        self.dropped_spans += 1;
                        log::warn!(
                            "frame too long: dropping {} unterminated bytes",
                            self.buf.len()
                        );
                        // Drop the stale header so the scan can resync on
                        // the next header in the stream.
                        self.buf.drain(..FRAME_HEADER.len());
                        continue;
                    }
                    break;
                }
            }
        }

        frames
    }

    /// Number of spans discarded so far (over-long or malformed).
    pub fn dropped_spans(&self) -> u64 {
        self.dropped_spans
    }

    /// True if partial data is buffered awaiting more bytes.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// First index of `needle` in `haystack`, if any.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
