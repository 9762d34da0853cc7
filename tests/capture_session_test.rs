//! End-to-end capture session tests over a scripted transport/operator.
//!
//! The bus is replaced by an in-memory transport whose per-window chunk
//! scripts are loaded each time the session asks the operator for
//! readiness, so every phase sees exactly the traffic the test intends.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use buscribe::catalog::CatalogStore;
use buscribe::frame::Frame;
use buscribe::operator::{
    AmbiguousDecision, FailureDecision, Operator, VerifyDecision, WeakDecision,
};
use buscribe::session::{SessionOutcome, SessionRunner, SessionSettings};
use buscribe::transport::Transport;
use tempfile::TempDir;

/// Chunks delivered during one collect window.
type WindowScript = Vec<Vec<u8>>;

/// In-memory transport: reads pop the shared chunk queue, writes are
/// recorded. An empty queue sleeps out the poll timeout like a real
/// timed-out socket read. `trip_on_write` simulates a Ctrl-C arriving
/// while a frame is being replayed.
struct ScriptedBus {
    current: Rc<RefCell<VecDeque<Vec<u8>>>>,
    sent: Rc<RefCell<Vec<Vec<u8>>>>,
    trip_on_write: Option<Arc<AtomicBool>>,
}

impl Transport for ScriptedBus {
    fn read_chunk(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        match self.current.borrow_mut().pop_front() {
            Some(chunk) => Ok(chunk),
            None => {
                std::thread::sleep(timeout);
                Ok(Vec::new())
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent.borrow_mut().push(bytes.to_vec());
        if let Some(flag) = &self.trip_on_write {
            flag.store(true, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Scripted operator: each readiness prompt loads the next window script
/// into the bus; decisions pop from pre-seeded queues (default: abandon /
/// decline, so an unscripted prompt can't loop a test forever).
struct ScriptedOperator {
    windows: VecDeque<WindowScript>,
    current: Rc<RefCell<VecDeque<Vec<u8>>>>,
    confirms: VecDeque<bool>,
    weak: VecDeque<WeakDecision>,
    ambiguous: VecDeque<AmbiguousDecision>,
    failures: VecDeque<FailureDecision>,
    verifications: VecDeque<VerifyDecision>,
    notices: Vec<String>,
}

impl Operator for ScriptedOperator {
    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn wait_ready(&mut self, _prompt: &str) -> Result<()> {
        let script = self.windows.pop_front().unwrap_or_default();
        *self.current.borrow_mut() = script.into_iter().collect();
        Ok(())
    }

    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(self.confirms.pop_front().unwrap_or(false))
    }

    fn resolve_weak(&mut self, _candidate: &Frame) -> Result<WeakDecision> {
        Ok(self.weak.pop_front().unwrap_or(WeakDecision::Abandon))
    }

    fn resolve_ambiguous(&mut self, _ranked: &[Frame]) -> Result<AmbiguousDecision> {
        Ok(self
            .ambiguous
            .pop_front()
            .unwrap_or(AmbiguousDecision::Abandon))
    }

    fn resolve_failure(&mut self) -> Result<FailureDecision> {
        Ok(self.failures.pop_front().unwrap_or(FailureDecision::Abandon))
    }

    fn resolve_verification(&mut self) -> Result<VerifyDecision> {
        Ok(self
            .verifications
            .pop_front()
            .unwrap_or(VerifyDecision::PersistUnverified))
    }
}

/// Builds a paired bus + operator sharing one chunk queue.
fn rig(windows: Vec<WindowScript>) -> (ScriptedBus, ScriptedOperator) {
    let current = Rc::new(RefCell::new(VecDeque::new()));
    let bus = ScriptedBus {
        current: Rc::clone(&current),
        sent: Rc::new(RefCell::new(Vec::new())),
        trip_on_write: None,
    };
    let operator = ScriptedOperator {
        windows: windows.into_iter().collect(),
        current,
        confirms: VecDeque::new(),
        weak: VecDeque::new(),
        ambiguous: VecDeque::new(),
        failures: VecDeque::new(),
        verifications: VecDeque::new(),
        notices: Vec::new(),
    };
    (bus, operator)
}

fn settings() -> SessionSettings {
    SessionSettings {
        baseline_window: Duration::from_millis(20),
        action_window: Duration::from_millis(20),
        rest_window: Duration::from_millis(5),
        trials: 2,
        poll_timeout: Duration::from_millis(1),
    }
}

/// A light frame with the given room and command bytes.
fn frame_bytes(room: u8, command: u8) -> Vec<u8> {
    vec![
        0xAA, 0x55, 0x30, 0xBC, 0x00, 0x0E, room, command, 0x65, 0x00, 0x0D, 0x0D,
    ]
}

fn hex(bytes: &[u8]) -> String {
    Frame::from_bytes(bytes.to_vec()).unwrap().to_hex()
}

/// Full paired workflow: two trials per logical command, ambient traffic in
/// every window, verification replay confirmed, entry persisted and
/// reloaded intact.
#[test]
fn test_paired_capture_validates_verifies_and_persists() {
    let ambient = frame_bytes(0x00, 0x3A);
    let on = frame_bytes(0x01, 0x01);
    let off = frame_bytes(0x01, 0x00);

    // ON trials then OFF trials: baseline, action, baseline, action each.
    // The second ON action window splits its frame across two chunks to
    // exercise stream reassembly mid-session.
    let mut on_split_a = on.clone();
    let on_split_b = on_split_a.split_off(5);
    let windows = vec![
        vec![ambient.clone()],
        vec![ambient.clone(), on.clone()],
        vec![ambient.clone(), ambient.clone()],
        vec![ambient.clone(), on_split_a, on_split_b, ambient.clone()],
        vec![ambient.clone()],
        vec![off.clone(), ambient.clone()],
        vec![],
        vec![off.clone()],
    ];

    let (mut bus, mut operator) = rig(windows);
    operator.confirms.push_back(true); // replay to verify
    operator.verifications.push_back(VerifyDecision::Confirmed);
    let sent = Rc::clone(&bus.sent);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_paired("living_room_light").unwrap();

    let SessionOutcome::Validated(entry) = outcome else {
        panic!("expected validated outcome");
    };
    assert_eq!(entry.on, hex(&on));
    assert_eq!(entry.off.as_deref(), Some(hex(&off).as_str()));
    assert!(entry.verified);

    // Both logical sub-commands reported validation to the operator.
    let validations = operator
        .notices
        .iter()
        .filter(|n| n.starts_with("Validated"))
        .count();
    assert_eq!(validations, 2);

    // Verification replayed exactly the two canonical frames, in order.
    assert_eq!(*sent.borrow(), vec![on.clone(), off.clone()]);

    // Persist and reload through the store.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.json");
    let mut store = CatalogStore::load(&path).unwrap();
    store.upsert("living_room_light", entry.clone()).unwrap();
    let reloaded = CatalogStore::load(&path).unwrap();
    assert_eq!(reloaded.get("living_room_light"), Some(&entry));
    let (on_frame, off_frame) = entry.frames().unwrap();
    assert_eq!(on_frame.as_bytes(), &on[..]);
    assert_eq!(off_frame.unwrap().as_bytes(), &off[..]);
}

/// A failed first attempt retries as a fresh session after the explicit
/// operator decision, then validates. Declining the replay stores the
/// entry unverified.
#[test]
fn test_failed_verdict_retries_with_fresh_session() {
    let ambient = frame_bytes(0x00, 0x3A);
    let on = frame_bytes(0x02, 0x01);

    let windows = vec![
        // Attempt 1: action windows show nothing new.
        vec![ambient.clone()],
        vec![ambient.clone()],
        vec![],
        vec![],
        // Attempt 2: candidate in both action windows.
        vec![ambient.clone()],
        vec![on.clone()],
        vec![],
        vec![ambient.clone(), on.clone()],
    ];

    let (mut bus, mut operator) = rig(windows);
    operator.failures.push_back(FailureDecision::Retry);
    operator.confirms.push_back(false); // skip verification replay

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_single("kitchen_light").unwrap();

    let SessionOutcome::Validated(entry) = outcome else {
        panic!("expected validated outcome");
    };
    assert_eq!(entry.on, hex(&on));
    assert_eq!(entry.off, None);
    assert!(!entry.verified);
}

/// A weak verdict plus an extra-trial decision appends one more trial and
/// re-classifies into success.
#[test]
fn test_weak_verdict_extra_trial_reaches_success() {
    let on = frame_bytes(0x03, 0x01);

    let windows = vec![
        // Trial 1: candidate appears.
        vec![],
        vec![on.clone()],
        // Trial 2: nothing (pooled frequency stays 1 -> Weak).
        vec![],
        vec![],
        // Extra trial after the operator asks for one.
        vec![],
        vec![on.clone()],
    ];

    let (mut bus, mut operator) = rig(windows);
    operator.weak.push_back(WeakDecision::ExtraTrial);
    operator.confirms.push_back(false);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_single("fan_toggle").unwrap();

    let SessionOutcome::Validated(entry) = outcome else {
        panic!("expected validated outcome");
    };
    assert_eq!(entry.on, hex(&on));
}

/// Tied candidates surface as ambiguous; the operator's manual choice is
/// honored, never auto-selected.
#[test]
fn test_ambiguous_verdict_operator_chooses() {
    let first = frame_bytes(0x04, 0x01);
    let second = frame_bytes(0x04, 0x02);

    let windows = vec![
        vec![first.clone(), second.clone()],
        vec![first.clone(), second.clone()],
    ]
    .into_iter()
    .flat_map(|action| vec![vec![], action])
    .collect();

    let (mut bus, mut operator) = rig(windows);
    operator.ambiguous.push_back(AmbiguousDecision::Choose(1));
    operator.confirms.push_back(false);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_single("gas_valve_close").unwrap();

    let SessionOutcome::Validated(entry) = outcome else {
        panic!("expected validated outcome");
    };
    assert_eq!(entry.on, hex(&second));
}

/// Abandoning after a failed verdict ends the session without a catalog
/// entry.
#[test]
fn test_abandon_produces_no_entry() {
    let windows = vec![vec![], vec![], vec![], vec![]];
    let (mut bus, mut operator) = rig(windows);
    operator.failures.push_back(FailureDecision::Abandon);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    assert_eq!(
        runner.run_single("nothing").unwrap(),
        SessionOutcome::Abandoned
    );
}

/// A cancel arriving mid-verification abandons the session outright; it
/// must never degrade into an unverified-but-stored entry.
#[test]
fn test_cancel_during_verification_abandons_not_persists() {
    let on = frame_bytes(0x06, 0x01);
    let off = frame_bytes(0x06, 0x00);

    let windows = vec![
        vec![],
        vec![on.clone()],
        vec![],
        vec![on.clone()],
        vec![],
        vec![off.clone()],
        vec![],
        vec![off.clone()],
    ];

    let (mut bus, mut operator) = rig(windows);
    operator.confirms.push_back(true); // replay to verify
    let cancel = Arc::new(AtomicBool::new(false));
    // Ctrl-C lands while the first frame is being replayed.
    bus.trip_on_write = Some(Arc::clone(&cancel));

    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), Arc::clone(&cancel));
    assert_eq!(
        runner.run_paired("bedroom_light").unwrap(),
        SessionOutcome::Abandoned
    );
}

/// The rest phase runs after each action window, not between a baseline and
/// its action window, so stimulus echoes settle before the next baseline.
#[test]
fn test_rest_follows_action_window() {
    let on = frame_bytes(0x07, 0x01);
    let windows = vec![vec![], vec![on.clone()], vec![], vec![on.clone()]];

    let (mut bus, mut operator) = rig(windows);
    operator.confirms.push_back(false);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_single("curtain").unwrap();
    assert!(matches!(outcome, SessionOutcome::Validated(_)));

    let notices = &operator.notices;
    let pos = |needle: &str| {
        notices
            .iter()
            .position(|n| n.contains(needle))
            .unwrap_or_else(|| panic!("no notice containing {needle:?}"))
    };

    // Baseline runs straight into the action prompt with no rest between.
    let baseline_done = pos("Baseline done");
    let action_prompt = pos("Now ");
    assert!(baseline_done < action_prompt);
    assert!(!notices[baseline_done..action_prompt]
        .iter()
        .any(|n| n.contains("Resting")));

    // The first rest sits between the first action window and the second
    // trial's baseline.
    let action_done = pos("Action window done");
    let rest = pos("Resting");
    let second_baseline = notices
        .iter()
        .enumerate()
        .filter(|(_, n)| n.contains("Baseline first"))
        .nth(1)
        .map(|(i, _)| i)
        .unwrap();
    assert!(action_done < rest && rest < second_baseline);
}

/// The cancel flag abandons the session at the next poll boundary.
#[test]
fn test_cancel_flag_abandons_session() {
    let (mut bus, mut operator) = rig(vec![vec![], vec![]]);
    let cancel = Arc::new(AtomicBool::new(true));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    assert_eq!(
        runner.run_single("cancelled").unwrap(),
        SessionOutcome::Abandoned
    );
}

/// Rejecting the physical verification with "retry from baseline" discards
/// the attempt entirely and captures again from scratch.
#[test]
fn test_verification_rejection_recaptures_from_baseline() {
    let stale = frame_bytes(0x05, 0x01);
    let fresh = frame_bytes(0x05, 0x02);

    let windows = vec![
        // Attempt 1 validates `stale`.
        vec![],
        vec![stale.clone()],
        vec![],
        vec![stale.clone()],
        // Attempt 2 (after RetryFromBaseline) validates `fresh`.
        vec![],
        vec![fresh.clone()],
        vec![],
        vec![fresh.clone()],
    ];

    let (mut bus, mut operator) = rig(windows);
    operator.confirms.push_back(true);
    operator
        .verifications
        .push_back(VerifyDecision::RetryFromBaseline);
    operator.confirms.push_back(true);
    operator.verifications.push_back(VerifyDecision::Confirmed);
    let sent = Rc::clone(&bus.sent);

    let cancel = Arc::new(AtomicBool::new(false));
    let mut runner = SessionRunner::new(&mut bus, &mut operator, settings(), cancel);
    let outcome = runner.run_single("outlet").unwrap();

    let SessionOutcome::Validated(entry) = outcome else {
        panic!("expected validated outcome");
    };
    assert_eq!(entry.on, hex(&fresh));
    assert!(entry.verified);
    assert_eq!(*sent.borrow(), vec![stale, fresh]);
}
