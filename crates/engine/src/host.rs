//! Host boundary - notifications out, policy in
//!
//! The engine reports every player-visible effect to its host and asks it
//! whether to tick, whether timing is authoritative and which action comes
//! next. Every method has a default so a host implements only what it uses.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use duoblock_core::types::{GameAction, TurnKind};
use duoblock_core::{OutgoingAttack, Piece};

/// Callbacks and policy queries from the engine
pub trait Host: Send {
    fn did_move(&mut self) {}
    fn did_turn(&mut self, kind: TurnKind) {
        let _ = kind;
    }
    fn did_kick(&mut self) {}
    fn did_fall(&mut self) {}
    fn did_drop(&mut self, rows: i32) {
        let _ = rows;
    }
    fn did_collide(&mut self) {}
    fn did_enter(&mut self, piece: &Piece) {
        let _ = piece;
    }
    fn did_lock(&mut self) {}
    fn did_clear(&mut self, rows: u32) {
        let _ = rows;
    }
    fn did_use_reserve(&mut self) {}
    fn did_level_up(&mut self, level: u32) {
        let _ = level;
    }
    fn did_end_action_cycle(&mut self, cycle: u64) {
        let _ = cycle;
    }
    fn did_lose(&mut self) {}
    fn has_outgoing_attack(&mut self, attack: OutgoingAttack) {
        let _ = attack;
    }

    /// False when the game is replayed or simulated and delays do not apply
    fn should_use_timing_system(&self) -> bool {
        true
    }

    fn should_tick(&self) -> bool {
        true
    }

    /// Next externally buffered action
    fn dequeue_action(&mut self) -> Option<GameAction> {
        None
    }

    /// Whether the engine may start `cycle`; networked hosts wait for peers here
    fn is_synchronized(&self, cycle: u64) -> bool {
        let _ = cycle;
        true
    }

    fn begin_action_cycle(&mut self, cycle: u64) {
        let _ = cycle;
    }
}

/// Host that accepts every default
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {}

/// A notification seen by [`RecordingHost`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Moved,
    Turned(TurnKind),
    Kicked,
    Fell,
    Dropped(i32),
    Collided,
    Entered,
    Locked,
    Cleared(u32),
    UsedReserve,
    LeveledUp(u32),
    EndedActionCycle(u64),
    Lost,
    Attacked(OutgoingAttack),
}

#[derive(Debug, Default)]
struct Recording {
    events: Vec<HostEvent>,
    actions: VecDeque<GameAction>,
    /// Cycles at or beyond this wait in synchronizing
    hold_cycle: Option<u64>,
}

/// Host that records notifications and replays scripted actions.
///
/// Clones share one recording, so a test keeps a clone to inspect what the
/// engine reported.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    inner: Arc<Mutex<Recording>>,
    use_timing: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            use_timing: true,
        }
    }

    /// A host whose engine ignores every delay
    pub fn without_timing() -> Self {
        Self {
            inner: Arc::default(),
            use_timing: false,
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Recording) -> R) -> R {
        // a poisoned recording only means a test already panicked
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn push_action(&self, action: GameAction) {
        self.with(|r| r.actions.push_back(action));
    }

    /// Hold the engine in synchronizing from `cycle` on
    pub fn hold_at_cycle(&self, cycle: Option<u64>) {
        self.with(|r| r.hold_cycle = cycle);
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.with(|r| r.events.clone())
    }

    pub fn count(&self, event: HostEvent) -> usize {
        self.with(|r| r.events.iter().filter(|&&e| e == event).count())
    }

    pub fn clear(&self) {
        self.with(|r| r.events.clear());
    }

    fn record(&self, event: HostEvent) {
        self.with(|r| r.events.push(event));
    }
}

impl Host for RecordingHost {
    fn did_move(&mut self) {
        self.record(HostEvent::Moved);
    }

    fn did_turn(&mut self, kind: TurnKind) {
        self.record(HostEvent::Turned(kind));
    }

    fn did_kick(&mut self) {
        self.record(HostEvent::Kicked);
    }

    fn did_fall(&mut self) {
        self.record(HostEvent::Fell);
    }

    fn did_drop(&mut self, rows: i32) {
        self.record(HostEvent::Dropped(rows));
    }

    fn did_collide(&mut self) {
        self.record(HostEvent::Collided);
    }

    fn did_enter(&mut self, _piece: &Piece) {
        self.record(HostEvent::Entered);
    }

    fn did_lock(&mut self) {
        self.record(HostEvent::Locked);
    }

    fn did_clear(&mut self, rows: u32) {
        self.record(HostEvent::Cleared(rows));
    }

    fn did_use_reserve(&mut self) {
        self.record(HostEvent::UsedReserve);
    }

    fn did_level_up(&mut self, level: u32) {
        self.record(HostEvent::LeveledUp(level));
    }

    fn did_end_action_cycle(&mut self, cycle: u64) {
        self.record(HostEvent::EndedActionCycle(cycle));
    }

    fn did_lose(&mut self) {
        self.record(HostEvent::Lost);
    }

    fn has_outgoing_attack(&mut self, attack: OutgoingAttack) {
        self.record(HostEvent::Attacked(attack));
    }

    fn should_use_timing_system(&self) -> bool {
        self.use_timing
    }

    fn dequeue_action(&mut self) -> Option<GameAction> {
        self.with(|r| r.actions.pop_front())
    }

    fn is_synchronized(&self, cycle: u64) -> bool {
        self.with(|r| r.hold_cycle.map_or(true, |hold| cycle < hold))
    }
}
