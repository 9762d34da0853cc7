//! Capture session state machine.
//!
//! One session captures the canonical frame(s) for one logical command (or
//! an ON/OFF pair) by sequencing baseline and action windows:
//!
//! ```text
//! Idle → Baseline → Action → Rest → Baseline(2) → Action(2) → Classifying
//!      → { Validated | Ambiguous | Failed }
//! ```
//!
//! Phase transitions are driven by elapsed wall-clock time on a monotonic
//! clock, never by frame arrival — a window always completes on schedule
//! even with zero traffic. Between transport polls the session checks a
//! shared cancellation flag; tripping it abandons the whole session, which
//! is the only supported cancellation granularity.
//!
//! Failure paths are recoverable by construction: every non-success verdict
//! surfaces an explicit operator decision (`Retry`/`Abandon`/`Choose`/…)
//! and retries run as a loop over fresh trial lists, never by re-entering
//! session code recursively. Nothing outside the catalog is mutated across
//! attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::catalog::CatalogEntry;
use crate::classify::{classify, Trial, Verdict};
use crate::config::Config;
use crate::constants::READ_POLL_TIMEOUT;
use crate::extractor::FrameExtractor;
use crate::frame::Frame;
use crate::operator::{
    AmbiguousDecision, FailureDecision, Operator, VerifyDecision, WeakDecision,
};
use crate::transport::Transport;

/// Timing knobs for one session, taken from [`Config`] or set directly in
/// tests.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Baseline (quiet) window length.
    pub baseline_window: Duration,
    /// Action (stimulated) window length.
    pub action_window: Duration,
    /// Rest between phases.
    pub rest_window: Duration,
    /// Trials per logical command.
    pub trials: usize,
    /// Per-read transport timeout; must stay below the window lengths.
    pub poll_timeout: Duration,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            baseline_window: config.baseline_window(),
            action_window: config.action_window(),
            rest_window: config.rest_window(),
            trials: config.trials.max(1),
            poll_timeout: READ_POLL_TIMEOUT,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every logical sub-command reached a validated canonical frame; the
    /// entry is ready for the catalog (pending the caller's upsert).
    Validated(CatalogEntry),
    /// The operator abandoned the session (or cancelled it); no catalog
    /// mutation follows.
    Abandoned,
}

/// Drives capture sessions over a transport and an operator boundary.
pub struct SessionRunner<'a, T: Transport, O: Operator> {
    transport: &'a mut T,
    operator: &'a mut O,
    settings: SessionSettings,
    cancel: Arc<AtomicBool>,
    extractor: FrameExtractor,
}

impl<'a, T: Transport, O: Operator> SessionRunner<'a, T, O> {
    /// Creates a runner. `cancel` is checked between transport polls; once
    /// set, the running session resolves to [`SessionOutcome::Abandoned`].
    pub fn new(
        transport: &'a mut T,
        operator: &'a mut O,
        settings: SessionSettings,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            operator,
            settings,
            cancel,
            extractor: FrameExtractor::new(),
        }
    }

    /// Captures a single-action command (degenerate pair, `off: null`).
    pub fn run_single(&mut self, name: &str) -> Result<SessionOutcome> {
        loop {
            let Some(canonical) = self.capture_command(name, "trigger the action")? else {
                return Ok(SessionOutcome::Abandoned);
            };
            match self.verify(&[&canonical])? {
                None => return Ok(SessionOutcome::Abandoned),
                Some(Verification::Verified) => {
                    return Ok(SessionOutcome::Validated(CatalogEntry::new(
                        &canonical, None, true,
                    )));
                }
                Some(Verification::Unverified) => {
                    return Ok(SessionOutcome::Validated(CatalogEntry::new(
                        &canonical, None, false,
                    )));
                }
                Some(Verification::RetryFromBaseline) => {
                    log::info!("session for {name:?} restarted from baseline");
                }
            }
        }
    }

    /// Captures an ON/OFF pair as one outer session.
    ///
    /// Both logical commands must independently validate before the entry
    /// is produced; abandoning either abandons the whole session.
    pub fn run_paired(&mut self, name: &str) -> Result<SessionOutcome> {
        loop {
            let Some(on) = self.capture_command(&format!("{name} ON"), "switch the device ON")?
            else {
                return Ok(SessionOutcome::Abandoned);
            };
            let Some(off) = self.capture_command(&format!("{name} OFF"), "switch the device OFF")?
            else {
                return Ok(SessionOutcome::Abandoned);
            };
            if on == off {
                self.operator.notify(
                    "ON and OFF resolved to the same frame; the device likely uses a toggle command.",
                );
            }
            match self.verify(&[&on, &off])? {
                None => return Ok(SessionOutcome::Abandoned),
                Some(Verification::Verified) => {
                    return Ok(SessionOutcome::Validated(CatalogEntry::new(
                        &on,
                        Some(&off),
                        true,
                    )));
                }
                Some(Verification::Unverified) => {
                    return Ok(SessionOutcome::Validated(CatalogEntry::new(
                        &on,
                        Some(&off),
                        false,
                    )));
                }
                Some(Verification::RetryFromBaseline) => {
                    log::info!("paired session for {name:?} restarted from baseline");
                }
            }
        }
    }

    /// Captures one logical command through trials and classification.
    ///
    /// Returns the canonical frame, or `None` when the operator abandoned
    /// (or the cancel flag tripped). Retries build a fresh trial list each
    /// attempt.
    fn capture_command(&mut self, label: &str, stimulus: &str) -> Result<Option<Frame>> {
        'attempt: loop {
            let mut trials = Vec::with_capacity(self.settings.trials);
            for n in 1..=self.settings.trials {
                let Some(trial) = self.run_trial(label, stimulus, n)? else {
                    return Ok(None);
                };
                trials.push(trial);
            }

            loop {
                match classify(&trials) {
                    Verdict::Success { canonical } => {
                        self.operator
                            .notify(&format!("Validated {label}: {canonical}"));
                        return Ok(Some(canonical));
                    }
                    Verdict::Weak { candidate } => match self.operator.resolve_weak(&candidate)? {
                        WeakDecision::Accept => {
                            log::info!("weak candidate for {label:?} accepted by operator");
                            return Ok(Some(candidate));
                        }
                        WeakDecision::ExtraTrial => {
                            let Some(trial) =
                                self.run_trial(label, stimulus, trials.len() + 1)?
                            else {
                                return Ok(None);
                            };
                            trials.push(trial);
                        }
                        WeakDecision::Abandon => return Ok(None),
                    },
                    Verdict::Ambiguous { ranked } => {
                        match self.operator.resolve_ambiguous(&ranked)? {
                            AmbiguousDecision::Choose(i) => {
                                let chosen = ranked
                                    .get(i)
                                    .cloned()
                                    .ok_or_else(|| {
                                        anyhow::anyhow!("chosen index {i} out of range")
                                    })?;
                                log::info!("operator chose candidate {i} for {label:?}");
                                return Ok(Some(chosen));
                            }
                            AmbiguousDecision::Retry => continue 'attempt,
                            AmbiguousDecision::Abandon => return Ok(None),
                        }
                    }
                    Verdict::Failed => match self.operator.resolve_failure()? {
                        FailureDecision::Retry => continue 'attempt,
                        FailureDecision::Abandon => return Ok(None),
                    },
                }
            }
        }
    }

    /// Runs one baseline + action trial, then the inter-phase rest so echo
    /// traffic from the stimulus dies down before the next baseline is
    /// sampled. `None` means cancelled.
    fn run_trial(&mut self, label: &str, stimulus: &str, number: usize) -> Result<Option<Trial>> {
        self.operator.notify(&format!(
            "[{label}, trial {number}] Baseline first: leave everything untouched."
        ));
        self.operator.wait_ready("Ready for the quiet window?")?;
        let Some(baseline) = self.collect_window(self.settings.baseline_window)? else {
            return Ok(None);
        };
        self.operator
            .notify(&format!("Baseline done: {} frames.", baseline.len()));

        self.operator.notify(&format!(
            "[{label}, trial {number}] Now {stimulus}, once, within the capture window."
        ));
        self.operator.wait_ready("Ready to act?")?;
        let Some(action) = self.collect_window(self.settings.action_window)? else {
            return Ok(None);
        };
        self.operator
            .notify(&format!("Action window done: {} frames.", action.len()));

        if !self.rest()? {
            return Ok(None);
        }

        Ok(Some(Trial::new(baseline, action)))
    }

    /// Replays `frames` on the bus and asks the operator about the effect.
    ///
    /// Returns `None` when the cancel flag trips mid-verification; the
    /// session then resolves to abandoned, never to an unverified entry.
    fn verify(&mut self, frames: &[&Frame]) -> Result<Option<Verification>> {
        if !self
            .operator
            .confirm("Replay the captured frame(s) to verify the effect?")?
        {
            return Ok(Some(Verification::Unverified));
        }

        for (i, frame) in frames.iter().enumerate() {
            if i > 0 && !self.rest()? {
                return Ok(None);
            }
            self.operator.notify(&format!("Transmitting: {frame}"));
            self.transport.write_all(frame.as_bytes())?;
        }
        if self.cancelled() {
            return Ok(None);
        }

        match self.operator.resolve_verification()? {
            VerifyDecision::Confirmed => Ok(Some(Verification::Verified)),
            VerifyDecision::RetryFromBaseline => Ok(Some(Verification::RetryFromBaseline)),
            VerifyDecision::PersistUnverified => Ok(Some(Verification::Unverified)),
        }
    }

    /// Collects frames for one fixed-duration window. `None` on cancel.
    fn collect_window(&mut self, window: Duration) -> Result<Option<Vec<Frame>>> {
        let deadline = Instant::now() + window;
        let mut frames = Vec::new();
        loop {
            if self.cancelled() {
                return Ok(None);
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let timeout = self.settings.poll_timeout.min(deadline - now);
            let chunk = self.transport.read_chunk(timeout)?;
            frames.extend(self.extractor.feed(&chunk));
        }
        Ok(Some(frames))
    }

    /// Waits out the inter-phase rest while draining (and discarding) bus
    /// traffic, so echoes of the previous stimulus don't leak into the next
    /// window. Returns false on cancel.
    fn rest(&mut self) -> Result<bool> {
        self.operator
            .notify("Resting to let echo traffic die down.");
        Ok(self.collect_window(self.settings.rest_window)?.map(|dropped| {
            if !dropped.is_empty() {
                log::debug!("discarded {} frames during rest", dropped.len());
            }
        })
        .is_some())
    }

    fn cancelled(&self) -> bool {
        let hit = self.cancel.load(Ordering::Relaxed);
        if hit {
            log::info!("session cancelled by operator signal");
        }
        hit
    }
}

/// Internal verification sub-phase result.
enum Verification {
    Verified,
    Unverified,
    RetryFromBaseline,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config_clamp_trials() {
        let mut config = Config::default();
        config.trials = 0;
        let settings = SessionSettings::from(&config);
        assert_eq!(settings.trials, 1);
        assert!(settings.poll_timeout < settings.baseline_window);
    }
}
