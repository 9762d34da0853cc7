//! Operator-interaction boundary.
//!
//! The capture state machine never talks to stdin/stdout directly; every
//! prompt, confirmation, and disambiguation goes through the [`Operator`]
//! trait. Decisions are explicit values — the session loops on them instead
//! of re-entering itself, and nothing is ever auto-selected on the
//! operator's behalf.
//!
//! [`ConsoleOperator`] is the interactive implementation. Confirmation
//! points block for human-scale intervals with no timeout; invalid input is
//! re-prompted, never fatal.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use crate::frame::Frame;

/// Decision after a `Weak` verdict (unique candidate, one trial only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeakDecision {
    /// Accept the candidate on the operator's authority.
    Accept,
    /// Run one additional trial and re-classify.
    ExtraTrial,
    /// Discard this session.
    Abandon,
}

/// Decision after an `Ambiguous` verdict (tied candidates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguousDecision {
    /// Use the ranked candidate at this index.
    Choose(usize),
    /// Discard these trials and start a fresh session.
    Retry,
    /// Discard this session.
    Abandon,
}

/// Decision after a `Failed` verdict (no repeatable new frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Start a fresh session for the same command.
    Retry,
    /// Discard this session.
    Abandon,
}

/// Decision after replaying the canonical frame(s) for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyDecision {
    /// The real-world effect occurred; mark the entry verified.
    Confirmed,
    /// Effect did not occur: discard this session and recapture.
    RetryFromBaseline,
    /// Effect did not occur: store the entry anyway with `verified=false`.
    PersistUnverified,
}

/// The session's view of the human at the keyboard.
pub trait Operator {
    /// Shows a progress/instruction line.
    fn notify(&mut self, message: &str);

    /// Blocks until the operator signals readiness for the next phase.
    fn wait_ready(&mut self, prompt: &str) -> Result<()>;

    /// Asks a yes/no question.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;

    /// Resolves a weak verdict for `candidate`.
    fn resolve_weak(&mut self, candidate: &Frame) -> Result<WeakDecision>;

    /// Resolves an ambiguous verdict among `ranked` candidates. A returned
    /// `Choose(i)` is always a valid index into `ranked`.
    fn resolve_ambiguous(&mut self, ranked: &[Frame]) -> Result<AmbiguousDecision>;

    /// Resolves a failed verdict.
    fn resolve_failure(&mut self) -> Result<FailureDecision>;

    /// Asks whether the replayed command had its real-world effect.
    fn resolve_verification(&mut self) -> Result<VerifyDecision>;
}

/// Interactive [`Operator`] over stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl ConsoleOperator {
    /// Creates a console operator.
    pub fn new() -> Self {
        Self
    }

    fn read_line(prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }
}

impl Operator for ConsoleOperator {
    fn notify(&mut self, message: &str) {
        println!("{message}");
    }

    fn wait_ready(&mut self, prompt: &str) -> Result<()> {
        Self::read_line(&format!("{prompt} [press Enter] "))?;
        Ok(())
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        loop {
            match Self::read_line(&format!("{prompt} (y/n): "))?.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer y or n."),
            }
        }
    }

    fn resolve_weak(&mut self, candidate: &Frame) -> Result<WeakDecision> {
        println!("Candidate seen in only one trial:");
        println!("  {candidate}");
        loop {
            let answer = Self::read_line("[a]ccept anyway, [t]ry one more trial, a[b]andon: ")?;
            match answer.to_lowercase().as_str() {
                "a" => return Ok(WeakDecision::Accept),
                "t" => return Ok(WeakDecision::ExtraTrial),
                "b" => return Ok(WeakDecision::Abandon),
                _ => println!("Please answer a, t, or b."),
            }
        }
    }

    fn resolve_ambiguous(&mut self, ranked: &[Frame]) -> Result<AmbiguousDecision> {
        println!("Multiple candidates tied; pick the right one:");
        for (i, frame) in ranked.iter().enumerate() {
            println!("  {}. {frame}", i + 1);
        }
        loop {
            let answer =
                Self::read_line(&format!("1-{}, [r]etry, or a[b]andon: ", ranked.len()))?;
            match answer.to_lowercase().as_str() {
                "r" => return Ok(AmbiguousDecision::Retry),
                "b" => return Ok(AmbiguousDecision::Abandon),
                other => match other.parse::<usize>() {
                    Ok(n) if (1..=ranked.len()).contains(&n) => {
                        return Ok(AmbiguousDecision::Choose(n - 1));
                    }
                    _ => println!("Please pick 1-{}, r, or b.", ranked.len()),
                },
            }
        }
    }

    fn resolve_failure(&mut self) -> Result<FailureDecision> {
        println!("No repeatable new frame was observed.");
        loop {
            let answer = Self::read_line("[r]etry with a fresh session, or a[b]andon: ")?;
            match answer.to_lowercase().as_str() {
                "r" => return Ok(FailureDecision::Retry),
                "b" => return Ok(FailureDecision::Abandon),
                _ => println!("Please answer r or b."),
            }
        }
    }

    fn resolve_verification(&mut self) -> Result<VerifyDecision> {
        loop {
            let answer = Self::read_line(
                "Did the device respond? [y]es, [r]ecapture from baseline, [s]tore unverified: ",
            )?;
            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(VerifyDecision::Confirmed),
                "r" => return Ok(VerifyDecision::RetryFromBaseline),
                "s" => return Ok(VerifyDecision::PersistUnverified),
                _ => println!("Please answer y, r, or s."),
            }
        }
    }
}
