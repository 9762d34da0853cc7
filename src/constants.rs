//! Application-wide constants for buscribe.
//!
//! This module centralizes the wire markers, timing defaults, and classifier
//! thresholds so they are discoverable in one place. Constants are grouped
//! by domain with documentation explaining their purpose.
//!
//! # Categories
//!
//! - **Wire format**: frame markers and structural minimums
//! - **Capture timing**: phase window durations and poll intervals
//! - **Classifier**: acceptance thresholds

use std::time::Duration;

// ============================================================================
// Wire format
// ============================================================================

/// Frame header marker. Every bus frame starts with these two bytes.
pub const FRAME_HEADER: [u8; 2] = [0xAA, 0x55];

/// Frame trailer marker. Every bus frame ends with these two bytes.
pub const FRAME_TRAILER: [u8; 2] = [0x0D, 0x0D];

/// Minimum total frame length in bytes, markers included.
///
/// Shorter spans bounded by the markers exist on a noisy line but never
/// carry a complete device/room/command layout.
pub const MIN_FRAME_LEN: usize = 10;

/// Maximum bytes retained while waiting for a trailer marker.
///
/// A header with no trailer would otherwise grow the reassembly buffer
/// without limit. Spans longer than this are dropped and tallied.
pub const MAX_UNTERMINATED_SPAN: usize = 4096;

/// Read size per transport poll.
///
/// Matches the bridge's typical burst size; one poll drains several frames.
pub const READ_CHUNK_SIZE: usize = 4096;

// ============================================================================
// Capture timing
// ============================================================================

/// Default duration of a baseline (quiet) window.
pub const BASELINE_WINDOW: Duration = Duration::from_secs(5);

/// Default duration of an action (stimulated) window.
///
/// The operator has this long to press the wallpad button once.
pub const ACTION_WINDOW: Duration = Duration::from_secs(5);

/// Default rest between an action window and the next baseline.
///
/// Lets echo traffic from the previous stimulus die down before the next
/// baseline is sampled.
pub const INTER_PHASE_REST: Duration = Duration::from_secs(2);

/// Per-read transport timeout inside a phase window.
///
/// Strictly smaller than any window duration, so a phase deadline is
/// honored within one poll interval even with zero traffic.
pub const READ_POLL_TIMEOUT: Duration = Duration::from_millis(100);

// ============================================================================
// Classifier
// ============================================================================

/// Trials a candidate must appear in before it is accepted outright.
///
/// A unique top candidate below this pooled frequency yields a `Weak`
/// verdict that needs operator confirmation or another trial.
pub const MIN_POOLED_FREQUENCY: usize = 2;

/// How many tied candidates an `Ambiguous` verdict surfaces for manual
/// disambiguation.
pub const AMBIGUOUS_TOP_N: usize = 3;

/// Default number of trials per logical command (capture + verification).
pub const DEFAULT_TRIALS: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_smaller_than_windows() {
        // Phase deadlines must be honored within one poll interval.
        assert!(READ_POLL_TIMEOUT < BASELINE_WINDOW);
        assert!(READ_POLL_TIMEOUT < ACTION_WINDOW);
        assert!(READ_POLL_TIMEOUT < INTER_PHASE_REST);
    }

    #[test]
    fn test_markers_fit_minimum_length() {
        assert!(FRAME_HEADER.len() + FRAME_TRAILER.len() <= MIN_FRAME_LEN);
        assert!(MIN_FRAME_LEN <= MAX_UNTERMINATED_SPAN);
    }

    #[test]
    fn test_classifier_thresholds_sane() {
        assert!(MIN_POOLED_FREQUENCY >= 2);
        assert!(AMBIGUOUS_TOP_N >= 1);
        assert!(DEFAULT_TRIALS >= 1);
    }
}
