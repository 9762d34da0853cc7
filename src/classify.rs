//! Differential classification of capture trials.
//!
//! Given repeated baseline/action trial pairs for one logical command, this
//! module isolates the frame the stimulus caused from ambient bus chatter:
//!
//! 1. Per trial, a frame is a *candidate* when it occurs more often in the
//!    action window than in the baseline window. This catches both frames
//!    never seen at baseline and periodic frames re-emitted by the action.
//! 2. Candidates are pooled across trials by the number of *distinct trials*
//!    they appeared in, not by raw occurrence count.
//! 3. A verdict is derived from the pooled table; ties are never broken
//!    silently.
//!
//! Classification is defined purely over opaque byte sequences — decoding
//! plays no part in it.
//!
//! Known heuristic limit: an ambient frame whose emission rate happens to
//! rise during unrelated action windows can become a candidate for more
//! than one logical command. The repeated-trial pooling suppresses this in
//! practice but nothing forbids it.

use std::collections::HashMap;

use crate::constants::{AMBIGUOUS_TOP_N, MIN_POOLED_FREQUENCY};
use crate::frame::Frame;

/// One baseline window immediately followed by one action window.
///
/// Frame order within each window is arrival order; candidate extraction
/// preserves the action window's first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Trial {
    /// Frames observed during the quiet window.
    pub baseline: Vec<Frame>,
    /// Frames observed while the operator triggered the action.
    pub action: Vec<Frame>,
}

impl Trial {
    /// Creates a trial from its two observation windows.
    pub fn new(baseline: Vec<Frame>, action: Vec<Frame>) -> Self {
        Self { baseline, action }
    }

    /// Frames whose action-window count exceeds their baseline-window
    /// count, in first-seen action order, each listed once.
    pub fn candidates(&self) -> Vec<&Frame> {
        let mut baseline_counts: HashMap<&Frame, usize> = HashMap::new();
        for frame in &self.baseline {
            *baseline_counts.entry(frame).or_insert(0) += 1;
        }
        let mut action_counts: HashMap<&Frame, usize> = HashMap::new();
        for frame in &self.action {
            *action_counts.entry(frame).or_insert(0) += 1;
        }

        let mut out: Vec<&Frame> = Vec::new();
        for frame in &self.action {
            if out.contains(&frame) {
                continue;
            }
            let acted = action_counts.get(frame).copied().unwrap_or(0);
            let quiet = baseline_counts.get(frame).copied().unwrap_or(0);
            if acted > quiet {
                out.push(frame);
            }
        }
        out
    }
}

/// Outcome of classifying one logical command's trials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A unique top candidate recurred across enough trials.
    Success {
        /// The command's definitive byte sequence.
        canonical: Frame,
    },

    /// A unique top candidate appeared in only one trial. The caller must
    /// run another trial or obtain explicit operator confirmation before
    /// accepting it.
    Weak {
        /// The unconfirmed candidate.
        candidate: Frame,
    },

    /// Two or more candidates tied at the top pooled frequency. Ranked by
    /// first-seen order and truncated for operator disambiguation; never
    /// auto-selected.
    Ambiguous {
        /// Tied candidates, stable first-seen order, at most
        /// [`AMBIGUOUS_TOP_N`] entries.
        ranked: Vec<Frame>,
    },

    /// No trial produced any candidate — no repeatable new frame.
    Failed,
}

/// Classifies a logical command from its trials.
///
/// Defined for any trial count ≥ 1; the standard workflow runs two (first
/// occurrence plus verification occurrence).
pub fn classify(trials: &[Trial]) -> Verdict {
    // Pooled frequency = number of distinct trials a candidate appeared in.
    // first_seen preserves discovery order across the whole session for
    // stable ambiguity ranking.
    let mut pooled: HashMap<&Frame, usize> = HashMap::new();
    let mut first_seen: Vec<&Frame> = Vec::new();

    for trial in trials {
        for frame in trial.candidates() {
            *pooled.entry(frame).or_insert(0) += 1;
            if !first_seen.contains(&frame) {
                first_seen.push(frame);
            }
        }
    }

    if pooled.is_empty() {
        return Verdict::Failed;
    }

    let top = pooled.values().copied().max().unwrap_or(0);
    let mut leaders: Vec<&Frame> = first_seen
        .iter()
        .copied()
        .filter(|f| pooled.get(f) == Some(&top))
        .collect();

    if leaders.len() > 1 {
        leaders.truncate(AMBIGUOUS_TOP_N);
        return Verdict::Ambiguous {
            ranked: leaders.into_iter().cloned().collect(),
        };
    }

    let leader = leaders[0].clone();
    if top >= MIN_POOLED_FREQUENCY {
        Verdict::Success { canonical: leader }
    } else {
        Verdict::Weak { candidate: leader }
    }
}
