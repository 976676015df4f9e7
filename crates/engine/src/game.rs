//! Game module - the tick state machine
//!
//! [`Game::advance`] drives a nested state machine:
//!
//! ```text
//! Initializing -> Synchronizing -> Preparing -> Entering -> Falling
//!      -> Progression { ComponentsUnlock -> ComponentsFall -> ComponentsLock
//!                       [-> TriggeredMetamorphosis] -> ChunksUnlock
//!                       -> ChunksFall -> ChunksLock -> Clear }
//!      -> EndingCycle -> Synchronizing ...
//! ```
//!
//! Every state has a handler returning a [`Transition`]. The loop in
//! `advance` applies at most one buffered action per iteration, then one
//! transition, and stops when a handler waits on a guard, the game is lost,
//! or a significant event is pending acknowledgement.
//!
//! Pushed rows, dropped blocks and cleared rows all go through the chunk
//! half of progression so gravity settles whatever they leave floating.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use arrayvec::ArrayVec;
use log::{debug, trace, warn};

use duoblock_core::types::{
    block, DropKind, GameAction, GameEvents, Period, ProgressionState, State, Trigger, MAX_COLS,
    NEXT_LOOKAHEAD, PANES,
};
use duoblock_core::{
    Attack, Bag, Clear, Collision, CoreError, GravityResolver, GravityStrategy, Grid,
    IncomingAttack, Kick, Level, Lock, Metamorphosis, Offset, Piece, Rotation, RowsAdded, Score,
    Special, Timing, TriggerSink, Triggers, Valleys,
};

use crate::config::GameConfig;
use crate::host::Host;
use crate::slice::{BlocksSlice, SliceProjector};
use crate::state::GameState;

/// The coarse lock shared between a simulation thread and readers
pub type SharedGame = Arc<Mutex<Game>>;

/// Every rule collaborator, fixed at build time
pub(crate) struct Systems {
    pub collision: Box<dyn Collision>,
    pub rotation: Box<dyn Rotation>,
    pub kick: Box<dyn Kick>,
    pub lock: Box<dyn Lock>,
    pub clear: Box<dyn Clear>,
    pub timing: Box<dyn Timing>,
    pub score: Box<dyn Score>,
    pub level: Box<dyn Level>,
    pub attack: Box<dyn Attack>,
    pub valleys: Box<dyn Valleys>,
    pub bag: Box<dyn Bag>,
    pub metamorphosis: Box<dyn Metamorphosis>,
    pub special: Box<dyn Special>,
    pub triggers: Box<dyn Triggers>,
    pub host: Box<dyn Host>,
}

/// What a state handler did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Work done; move to the given state
    To(State),
    /// Work done; the handler already left the state where it should be
    Stay,
    /// A guard is unmet; resume on a later `advance`
    Wait,
}

/// A running game
pub struct Game {
    pub(crate) config: GameConfig,
    pub(crate) state: GameState,
    pub(crate) systems: Systems,
    pub(crate) resolver: GravityResolver,
    pub(crate) projector: SliceProjector,
    pub(crate) actions: VecDeque<GameAction>,
    pub(crate) sink: TriggerSink,
    pub(crate) columns: ArrayVec<i32, MAX_COLS>,
    /// Chromatic flags re-indexed past the rows a monochrome clear removed
    pub(crate) collapsed_flags: Vec<u8>,
}

/// Entry placement: horizontally centred, top row flush with the grid top
pub fn entry_offset(piece: &Piece, rows: usize, cols: usize) -> Offset {
    match piece.bounds() {
        Some(b) => Offset::new(
            (cols as i32 - b.width()) / 2 - b.min_col,
            rows as i32 - 1 - b.max_row,
        ),
        None => Offset::default(),
    }
}

impl Game {
    pub(crate) fn from_parts(config: GameConfig, state: GameState, systems: Systems) -> Self {
        let strategy = GravityStrategy::select(systems.lock.as_ref());
        let (rows, cols) = (config.rows, config.cols);
        debug!(
            "game built: {}x{} grid, {} gravity, {:?} reserve",
            cols,
            rows,
            strategy.as_str(),
            config.reserve_behavior
        );
        Self {
            resolver: GravityResolver::new(strategy, rows, cols),
            projector: SliceProjector::new(rows, cols),
            actions: VecDeque::with_capacity(16),
            sink: TriggerSink::new(),
            columns: ArrayVec::new(),
            collapsed_flags: vec![0; rows],
            config,
            state,
            systems,
        }
    }

    pub fn into_shared(self) -> SharedGame {
        Arc::new(Mutex::new(self))
    }

    // ---- accessors ----

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn period(&self) -> Period {
        self.state.period
    }

    pub fn current_state(&self) -> State {
        self.state.state
    }

    pub fn grid(&self) -> &Grid {
        &self.state.grid
    }

    /// The falling piece; empty between cycles
    pub fn piece(&self) -> &Piece {
        &self.state.piece
    }

    pub fn offset(&self) -> Offset {
        self.state.offset
    }

    pub fn next_pieces(&self) -> &[Piece] {
        &self.state.next
    }

    pub fn reserve_pieces(&self) -> &[Piece] {
        &self.state.reserve[..self.state.reserve_len()]
    }

    pub fn score(&self) -> u64 {
        self.systems.score.score()
    }

    pub fn rows_cleared(&self) -> u32 {
        self.systems.score.rows_cleared()
    }

    pub fn level(&self) -> u32 {
        self.systems.level.level()
    }

    pub fn cycle(&self) -> u64 {
        self.state.cycle
    }

    pub fn events_last_tick(&self) -> GameEvents {
        self.state.events_last_tick
    }

    /// Significant events waiting for [`Game::acknowledge_events`]
    pub fn pending_events(&self) -> GameEvents {
        self.state.unacknowledged
    }

    pub fn gravity_strategy(&self) -> GravityStrategy {
        self.resolver.strategy()
    }

    pub fn is_lost(&self) -> bool {
        self.state.period == Period::Lost
    }

    pub fn draw_history(&self) -> &[u32] {
        self.systems.bag.history()
    }

    // ---- control ----

    /// Leave prestart; `advance` does nothing before this
    pub fn start(&mut self) {
        if self.state.period == Period::Prestart {
            self.state.period = Period::Ongoing;
            debug!("game started");
        }
    }

    pub fn queue_action(&mut self, action: GameAction) {
        self.actions.push_back(action);
    }

    /// Release the tick loop after an animation finished
    pub fn acknowledge_events(&mut self) {
        self.state.unacknowledged = GameEvents::empty();
    }

    /// Hand an attack from an opponent to the attack rules
    pub fn queue_incoming_attack(&mut self, attack: IncomingAttack) {
        self.systems.attack.queue_incoming(attack);
    }

    /// Render-ready view of the current state
    pub fn slice(&mut self) -> BlocksSlice<'_> {
        self.projector
            .project(&self.state, self.systems.collision.as_ref())
    }

    /// Advance the clock by `seconds` and run transitions until one waits.
    ///
    /// Returns whether anything happened, including the passage of time.
    pub fn advance(&mut self, seconds: f64) -> Result<bool, CoreError> {
        if self.state.period != Period::Ongoing || !self.systems.host.should_tick() {
            return Ok(false);
        }

        self.state.events_last_tick = GameEvents::empty();
        let mut changed = false;
        if seconds > 0.0 {
            self.state.seconds += seconds;
            self.systems.timing.tick(seconds);
            self.systems.attack.tick(seconds);
            changed = true;
        }

        while self.is_running() {
            let acted = match self.dequeue_action() {
                Some(action) => {
                    self.apply_action(action)?;
                    true
                }
                None => false,
            };
            if !self.is_running() {
                changed |= acted;
                break;
            }
            match self.step()? {
                Transition::Wait if !acted => break,
                _ => changed = true,
            }
        }
        Ok(changed)
    }

    fn is_running(&self) -> bool {
        self.state.period == Period::Ongoing && self.state.unacknowledged.is_empty()
    }

    fn dequeue_action(&mut self) -> Option<GameAction> {
        self.actions
            .pop_front()
            .or_else(|| self.systems.host.dequeue_action())
    }

    /// Apply one player action; false when it was refused or blocked
    pub fn apply_action(&mut self, action: GameAction) -> Result<bool, CoreError> {
        use duoblock_core::types::TurnKind;

        trace!("action {}", action.as_str());
        match action {
            GameAction::MoveLeft => self.move_left(),
            GameAction::MoveRight => self.move_right(),
            GameAction::TurnCw(lean) => self.turn(TurnKind::Cw, lean),
            GameAction::TurnCcw(lean) => self.turn(TurnKind::Ccw, lean),
            GameAction::Turn180(lean) => self.turn(TurnKind::Half, lean),
            GameAction::Flip(lean) => self.turn(TurnKind::Flip, lean),
            GameAction::Fall => self.soft_fall(),
            GameAction::Drop => self.hard_drop(),
            GameAction::UseReserve(lean) => self.use_reserve(lean),
        }
    }

    /// Run exactly one transition, ignoring the period and pending events.
    /// Hosts normally call [`Game::advance`].
    pub fn step(&mut self) -> Result<Transition, CoreError> {
        let transition = match self.state.state {
            State::Initializing => self.initialize()?,
            State::Synchronizing => self.synchronize(),
            State::Preparing => self.prepare()?,
            State::Entering => self.enter()?,
            State::Falling => self.fall_by_gravity(),
            State::Progression(stage) => match stage {
                ProgressionState::ComponentsUnlock => self.unlock_components(),
                ProgressionState::ComponentsFall => self.fall_components()?,
                ProgressionState::ComponentsLock => self.lock_components()?,
                ProgressionState::TriggeredMetamorphosis => self.triggered_metamorphosis(),
                ProgressionState::ChunksUnlock => self.unlock_chunks(),
                ProgressionState::ChunksFall => self.fall_chunks()?,
                ProgressionState::ChunksLock => self.lock_chunks()?,
                ProgressionState::Clear => self.clear_rows(),
            },
            State::EndingCycle => self.end_cycle(),
        };
        if let Transition::To(next) = transition {
            trace!("{:?} -> {:?}", self.state.state, next);
            self.state.state = next;
        }
        Ok(transition)
    }

    // ---- helpers shared with actions and reserve ----

    pub(crate) fn timing_allows(&self, gate: impl Fn(&dyn Timing) -> bool) -> bool {
        !self.systems.host.should_use_timing_system() || gate(self.systems.timing.as_ref())
    }

    pub(crate) fn fire(&mut self, events: GameEvents) {
        self.state.events_last_tick |= events;
        let animated = events & GameEvents::animated();
        if !animated.is_empty() {
            self.state.last_animated = animated;
        }
        self.state.unacknowledged |= events & self.config.significant_events;
    }

    pub(crate) fn is_grounded(&self) -> bool {
        self.systems.collision.collides(
            &self.state.grid,
            &self.state.piece,
            self.state.offset.translated(0, -1),
        )
    }

    pub(crate) fn lose(&mut self) {
        self.state.period = Period::Lost;
        self.systems.host.did_lose();
        self.fire(GameEvents::LOST);
        debug!(
            "game lost in cycle {} with score {}",
            self.state.cycle,
            self.systems.score.score()
        );
    }

    /// Draw a new piece into next-queue `slot`, in preview orientation
    pub(crate) fn refill_next(&mut self, slot: usize) -> Result<(), CoreError> {
        let kind = self.systems.bag.draw();
        let piece = &mut self.state.next[slot];
        self.systems.rotation.prepare(piece, kind)?;
        self.systems.rotation.turn_minimum_horizontal_profile(piece)
    }

    /// Move the front of the next queue into `piece`, refilling the queue
    pub(crate) fn promote_next(&mut self) -> Result<(), CoreError> {
        self.state.piece.take_values_from(&self.state.next[0]);
        self.systems.rotation.turn_0(&mut self.state.piece)?;
        self.state.next.rotate_left(1);
        self.refill_next(NEXT_LOOKAHEAD - 1)?;
        self.fire(GameEvents::QUEUE_CHANGED);
        Ok(())
    }

    pub(crate) fn place_for_entry(&mut self) {
        self.state.offset = entry_offset(&self.state.piece, self.state.rows(), self.state.cols());
        self.systems.timing.did_prepare();
    }

    /// Apply every trigger pushed during the last notification
    pub(crate) fn pull_triggers(&mut self) {
        let pulled = std::mem::take(&mut self.sink);
        for trigger in pulled {
            self.pull_trigger(trigger);
        }
    }

    /// Act on a rule effect requested from outside the state machine
    pub fn pull_trigger(&mut self, trigger: Trigger) {
        trace!("trigger {:?}", trigger);
        match trigger {
            Trigger::CancelLock => self.state.lock_cancelled = true,
            Trigger::UnlockBestColumn => {
                if let Some((col, row)) = self.systems.valleys.best_column(&self.state.grid) {
                    self.queue_unlock_column(col, row);
                }
            }
            Trigger::UnlockColumnAbove { col, row } => self.queue_unlock_column(col, row),
            Trigger::DropBlocks { kind, count } => {
                self.state.blocks_for_valleys[kind.index()] += count;
            }
            Trigger::ActivateMetamorphosisAfterLock => {
                self.state.metamorphosis_after_lock = Some(true);
            }
            Trigger::DeactivateMetamorphosisAfterLock => {
                self.state.metamorphosis_after_lock = Some(false);
            }
            Trigger::ActivateMetamorphosisBeforeEndCycle => {
                self.state.metamorphosis_before_end_cycle = Some(true);
            }
            Trigger::DeactivateMetamorphosisBeforeEndCycle => {
                self.state.metamorphosis_before_end_cycle = Some(false);
            }
        }
    }

    fn queue_unlock_column(&mut self, col: i32, row: i32) {
        if self.state.unlock_columns.len() < MAX_COLS {
            self.state.unlock_columns.push((col, row));
        } else {
            warn!("unlock column queue full, dropping column {}", col);
        }
    }

    fn metamorphose(&mut self, activate: bool) {
        self.state.grid_before.copy_from(&self.state.grid);
        if self
            .systems
            .metamorphosis
            .metamorphosize(activate, &mut self.state.grid)
        {
            self.fire(GameEvents::METAMORPHOSIZED);
        }
    }

    fn enter_progression(&mut self, first: ProgressionState, after: State) -> Transition {
        self.state.state_after_progression = after;
        Transition::To(State::Progression(first))
    }

    // ---- state handlers ----

    fn initialize(&mut self) -> Result<Transition, CoreError> {
        self.systems.special.initialize();

        self.state.grid_before.copy_from(&self.state.grid);
        let rows = self
            .systems
            .attack
            .prefill_displacement(&mut self.state.grid);
        if rows > 0 {
            self.state.rows_pushed = rows;
            self.systems.score.did_add_rows(rows);
            self.fire(GameEvents::DISPLACED);
        }

        for slot in 0..NEXT_LOOKAHEAD {
            self.refill_next(slot)?;
        }
        self.systems.timing.set_level(self.systems.level.level());
        self.fire(GameEvents::QUEUE_CHANGED);
        Ok(Transition::To(State::Synchronizing))
    }

    fn synchronize(&mut self) -> Transition {
        let cycle = self.state.cycle;
        if !self.systems.host.is_synchronized(cycle) {
            return Transition::Wait;
        }
        self.systems.attack.dequeue_incoming(cycle);
        self.systems.score.start_cycle();
        self.systems.host.begin_action_cycle(cycle);
        self.state.clear_cascade = -1;
        self.state.rows_pushed = 0;
        self.state.end_cycle_notified = false;
        Transition::To(State::Preparing)
    }

    /// Apply one pending attack effect, or bring in the next piece
    fn prepare(&mut self) -> Result<Transition, CoreError> {
        if self.systems.attack.has_level_change() {
            let delta = self.systems.attack.unleash_level_change();
            let level = self.systems.level.change_level(delta);
            self.systems.timing.set_level(level);
            debug!("level changed by {} to {}", delta, level);
            return Ok(Transition::Stay);
        }
        if self.systems.attack.has_displacement_accel() {
            self.systems.attack.unleash_displacement_accel();
            return Ok(Transition::Stay);
        }
        if self.systems.attack.has_garbage_rows() {
            self.state.grid_before.copy_from(&self.state.grid);
            let added = self
                .systems
                .attack
                .unleash_garbage_rows(&mut self.state.grid);
            return Ok(self.rows_added(added, GameEvents::GARBAGE_ADDED));
        }
        if self.systems.attack.has_push_rows() {
            self.state.grid_before.copy_from(&self.state.grid);
            let added = self.systems.attack.unleash_push_rows(&mut self.state.grid);
            return Ok(self.rows_added(added, GameEvents::ROWS_PUSHED));
        }
        if self.systems.attack.has_displace_rows() {
            self.state.grid_before.copy_from(&self.state.grid);
            let added = self
                .systems
                .attack
                .unleash_displace_rows(&mut self.state.grid);
            return Ok(self.rows_added(added, GameEvents::DISPLACED));
        }
        if self.systems.attack.has_drop_blocks() {
            let total = self
                .systems
                .attack
                .unleash_drop_blocks(&mut self.state.blocks_for_valleys);
            debug!("{} garbage blocks queued for dropping", total);
            return Ok(self.enter_progression(ProgressionState::ChunksUnlock, State::Preparing));
        }

        self.promote_next()?;
        self.place_for_entry();
        Ok(Transition::To(State::Entering))
    }

    fn rows_added(&mut self, added: RowsAdded, event: GameEvents) -> Transition {
        self.state.rows_pushed += added.rows;
        self.systems.score.did_add_rows(added.rows);
        self.fire(event);
        if added.overflow {
            self.lose();
            return Transition::Wait;
        }
        self.enter_progression(ProgressionState::ChunksUnlock, State::Preparing)
    }

    fn enter(&mut self) -> Result<Transition, CoreError> {
        if !self.timing_allows(|t| t.can_enter()) {
            return Ok(Transition::Wait);
        }
        let collision = self.systems.collision.as_ref();
        let s = &self.state;
        if !collision.within(&s.grid, &s.piece, s.offset) {
            debug!("piece {:?} does not fit the field at entry", s.piece.kind);
            self.lose();
            return Ok(Transition::Wait);
        }
        if collision.collides(&s.grid, &s.piece, s.offset) {
            // the piece stays where it tried to enter
            self.lose();
            return Ok(Transition::Wait);
        }

        self.systems.timing.did_enter();
        self.systems.attack.did_enter(&self.state.piece);
        self.systems
            .triggers
            .did_enter(&self.state.piece, self.state.offset, &mut self.sink);
        self.pull_triggers();
        self.systems.score.did_enter(&self.state.piece);
        self.systems.host.did_enter(&self.state.piece);
        self.fire(GameEvents::ENTERED);
        self.state.state = State::Falling;

        if self.state.reserve_queued {
            self.state.reserve_queued = false;
            let lean = self.state.reserve_queued_lean;
            self.use_reserve(lean)?;
        }
        Ok(Transition::Stay)
    }

    fn fall_by_gravity(&mut self) -> Transition {
        if self.state.piece.is_empty() {
            return Transition::To(State::EndingCycle);
        }
        if self.is_grounded() {
            if !self.timing_allows(|t| t.can_lock()) {
                return Transition::Wait;
            }
            return self.enter_progression(ProgressionState::ComponentsUnlock, State::EndingCycle);
        }
        if !self.timing_allows(|t| t.can_fall()) {
            return Transition::Wait;
        }
        self.state.offset.y -= 1;
        self.systems.timing.did_fall();
        self.systems.score.did_fall(false);
        self.systems.host.did_fall();
        self.fire(GameEvents::FELL);
        Transition::Stay
    }

    fn unlock_components(&mut self) -> Transition {
        self.systems
            .triggers
            .will_lock(&self.state.piece, self.state.offset, &mut self.sink);
        self.pull_triggers();

        let state = &mut self.state;
        let pool = &mut state.components;
        pool.count =
            self.systems
                .lock
                .unlock_piece(&state.piece, state.offset, &mut pool.pieces, &mut pool.offsets);
        pool.mark_original();
        trace!("piece split into {} components", pool.count);
        Transition::To(State::Progression(ProgressionState::ComponentsFall))
    }

    fn fall_components(&mut self) -> Result<Transition, CoreError> {
        let state = &mut self.state;
        let pool = &mut state.components;
        let n = pool.count;
        self.resolver.resolve(
            self.systems.collision.as_ref(),
            self.systems.lock.as_ref(),
            &state.grid,
            &pool.pieces[..n],
            &mut pool.offsets[..n],
        )?;
        let distance = pool.max_fall();
        self.systems.score.did_components_fall(n, distance);
        if distance > 0 {
            self.fire(GameEvents::COMPONENTS_FELL);
        }
        Ok(Transition::To(State::Progression(
            ProgressionState::ComponentsLock,
        )))
    }

    fn lock_components(&mut self) -> Result<Transition, CoreError> {
        if self.state.lock_cancelled {
            self.state.lock_cancelled = false;
            self.systems.timing.did_lock();
            debug!("lock cancelled by trigger");
        } else {
            let use_timing = self.systems.host.should_use_timing_system();
            let state = &mut self.state;
            let pool = &state.components;
            for i in 0..pool.count {
                match self
                    .systems
                    .lock
                    .lock(&mut state.grid, &pool.pieces[i], pool.offsets[i])
                {
                    Ok(()) => {}
                    Err(err) if err.is_orientation_conflict() && !use_timing => {
                        warn!("component lock conflict ignored: {}", err);
                    }
                    Err(err) => return Err(err),
                }
            }

            self.systems.timing.did_lock();
            self.systems.score.did_lock(&self.state.piece);
            self.systems.attack.did_lock(&self.state.piece);
            self.systems
                .triggers
                .did_lock(&self.state.piece, self.state.offset, &mut self.sink);
            self.pull_triggers();
            self.systems.host.did_lock();
            self.fire(GameEvents::LOCKED);
        }
        self.state.piece.reset(0, 0);

        let next = if self.state.metamorphosis_after_lock.is_some() {
            ProgressionState::TriggeredMetamorphosis
        } else {
            ProgressionState::ChunksUnlock
        };
        Ok(Transition::To(State::Progression(next)))
    }

    fn triggered_metamorphosis(&mut self) -> Transition {
        if let Some(activate) = self.state.metamorphosis_after_lock.take() {
            self.metamorphose(activate);
        }
        Transition::To(State::Progression(ProgressionState::ChunksUnlock))
    }

    fn unlock_chunks(&mut self) -> Transition {
        // dropped blocks go first so they always find room in the pool
        self.state.chunks.count = 0;
        if self.drop_blocks() {
            self.fire(GameEvents::BLOCKS_DROPPED);
        }

        let state = &mut self.state;
        let pool = &mut state.chunks;
        let lock = self.systems.lock.as_mut();
        let mut count = lock.unlock_grid(
            &mut state.grid,
            &mut pool.pieces,
            &mut pool.offsets,
            pool.count,
        );
        for &(col, row) in state.unlock_columns.iter() {
            count = lock.unlock_column_above(
                &mut state.grid,
                col,
                row,
                &mut pool.pieces,
                &mut pool.offsets,
                count,
            );
        }
        state.unlock_columns.clear();
        pool.count = count;
        pool.mark_original();
        state.grid_before.copy_from(&state.grid);
        trace!("{} chunks unlocked", count);

        if count == 0 {
            Transition::To(State::Progression(ProgressionState::Clear))
        } else {
            Transition::To(State::Progression(ProgressionState::ChunksFall))
        }
    }

    /// Add pending garbage blocks to the chunk pool as single linked cells
    /// stacked above the chosen columns; returns whether any were added
    fn drop_blocks(&mut self) -> bool {
        if !self.state.blocks_pending() {
            return false;
        }
        let rows = self.state.rows() as i32;
        let capacity = self.state.chunks.capacity();
        let mut stacked = [0i32; MAX_COLS];
        let mut dropped = false;

        for kind in DropKind::ORDER {
            let pending = self.state.blocks_for_valleys[kind.index()];
            if pending == 0 {
                continue;
            }
            self.systems
                .valleys
                .columns(&self.state.grid, kind, &mut self.columns);
            if self.columns.is_empty() {
                continue;
            }

            let mut placed = 0u32;
            while placed < pending && self.state.chunks.count < capacity {
                let col = self.columns[placed as usize % self.columns.len()];
                let slot = self.state.chunks.count;
                let piece = &mut self.state.chunks.pieces[slot];
                piece.reset(1, 1);
                for pane in 0..PANES {
                    piece.set(pane, 0, 0, block::pane_code(pane));
                }
                let height = &mut stacked[col as usize % MAX_COLS];
                self.state.chunks.offsets[slot] = Offset::new(col, rows + *height);
                *height += 1;
                self.state.chunks.count += 1;
                placed += 1;
            }
            self.state.blocks_for_valleys[kind.index()] -= placed;
            dropped |= placed > 0;
        }
        dropped
    }

    fn fall_chunks(&mut self) -> Result<Transition, CoreError> {
        let state = &mut self.state;
        let pool = &mut state.chunks;
        let n = pool.count;
        self.resolver.resolve(
            self.systems.collision.as_ref(),
            self.systems.lock.as_ref(),
            &state.grid,
            &pool.pieces[..n],
            &mut pool.offsets[..n],
        )?;
        let distance = pool.max_fall();
        self.systems.score.did_chunks_fall(n, distance);
        if distance > 0 {
            self.fire(GameEvents::CHUNKS_FELL);
        }
        Ok(Transition::To(State::Progression(ProgressionState::ChunksLock)))
    }

    fn lock_chunks(&mut self) -> Result<Transition, CoreError> {
        let state = &mut self.state;
        let pool = &state.chunks;
        for i in 0..pool.count {
            self.systems
                .lock
                .lock(&mut state.grid, &pool.pieces[i], pool.offsets[i])?;
        }

        // a full pool that moved may have left groups behind
        let chunks = &self.state.chunks;
        let saturated = chunks.count >= chunks.capacity() && chunks.max_fall() > 0;
        if saturated || self.state.blocks_pending() {
            Ok(Transition::To(State::Progression(ProgressionState::ChunksUnlock)))
        } else {
            Ok(Transition::To(State::Progression(ProgressionState::Clear)))
        }
    }

    fn clear_rows(&mut self) -> Transition {
        let state = &mut self.state;
        let monochrome = self
            .systems
            .clear
            .clearable_monochrome(&state.grid, &mut state.monochrome_flags);
        let chromatic = self
            .systems
            .clear
            .clearable(&state.grid, &mut state.clear_flags);
        if !monochrome && !chromatic {
            state.clear_pending = false;
            return Transition::To(state.state_after_progression);
        }

        if !self.state.clear_pending {
            self.state.clear_pending = true;
            self.systems.timing.did_begin_clear();
        }
        if !self.timing_allows(|t| t.can_clear()) {
            return Transition::Wait;
        }
        self.state.clear_pending = false;

        let state = &mut self.state;
        let clear = self.systems.clear.as_ref();
        // a monochrome clear takes the whole row
        for (flag, &mono) in state.clear_flags.iter_mut().zip(state.monochrome_flags.iter()) {
            if mono != 0 {
                *flag = 0;
            }
        }

        state.grid_before.copy_from(&state.grid);
        state.grid_inverse_clear.copy_from(&state.grid);
        for row in 0..state.grid.rows() {
            let mono = state.monochrome_flags[row];
            if mono != 0 {
                clear.inverse_clear_monochrome(&mut state.grid_inverse_clear, row, mono);
            } else {
                clear.inverse_clear(&mut state.grid_inverse_clear, row, state.clear_flags[row]);
            }
        }
        clear.clear_monochrome(&mut state.grid, &state.monochrome_flags);
        // rows above a monochrome row have already dropped with it
        let collapsed = &mut self.collapsed_flags;
        collapsed.fill(0);
        let surviving = state
            .clear_flags
            .iter()
            .zip(state.monochrome_flags.iter())
            .filter(|&(_, &mono)| mono == 0)
            .map(|(&flag, _)| flag);
        for (slot, flag) in collapsed.iter_mut().zip(surviving) {
            *slot = flag;
        }
        clear.clear(&mut state.grid, &collapsed[..]);

        let chromatic_rows = state.clear_flags.iter().filter(|&&f| f != 0).count() as u32;
        let monochrome_rows = state.monochrome_flags.iter().filter(|&&f| f != 0).count() as u32;
        let rows = chromatic_rows + monochrome_rows;
        state.clear_cascade += 1;
        let cascade = state.clear_cascade;

        self.systems
            .attack
            .did_clear(cascade, chromatic_rows, monochrome_rows);
        self.systems.triggers.did_clear(cascade, rows, &mut self.sink);
        self.pull_triggers();
        self.systems.score.did_clear(
            cascade,
            &self.state.clear_flags,
            &self.state.monochrome_flags,
        );
        self.systems.special.did_clear(rows);
        self.systems.timing.did_clear();
        self.systems.host.did_clear(rows);
        debug!(
            "cleared {} rows ({} monochrome), cascade {}",
            rows, monochrome_rows, cascade
        );
        self.fire(GameEvents::CLEARED);
        Transition::To(State::Progression(ProgressionState::ChunksUnlock))
    }

    fn end_cycle(&mut self) -> Transition {
        if self.systems.level.should_level_up(self.systems.score.as_ref()) {
            self.systems.level.level_up();
            let level = self.systems.level.level();
            self.systems.timing.set_level(level);
            self.systems.triggers.did_level_up(level, &mut self.sink);
            self.pull_triggers();
            self.systems.score.did_level_up(level);
            self.systems.host.did_level_up(level);
            self.fire(GameEvents::LEVEL_UP);
            debug!("level up to {}", level);
            return Transition::Stay;
        }

        if !self.state.end_cycle_notified {
            self.state.end_cycle_notified = true;
            self.systems.triggers.will_end_cycle(&mut self.sink);
            self.pull_triggers();
            if !self.state.unlock_columns.is_empty() || self.state.blocks_pending() {
                return self.enter_progression(ProgressionState::ChunksUnlock, State::EndingCycle);
            }
        }

        if let Some(activate) = self.state.metamorphosis_before_end_cycle.take() {
            self.metamorphose(activate);
            return Transition::Stay;
        }

        self.state.grid_before.copy_from(&self.state.grid);
        let outcome = self
            .systems
            .metamorphosis
            .end_cycle(&mut self.state.grid);
        if outcome.changed() {
            self.fire(GameEvents::METAMORPHOSIZED);
        }

        while let Some(attack) = self.systems.attack.take_outgoing() {
            self.systems.host.has_outgoing_attack(attack);
        }
        self.systems.attack.end_cycle(self.state.cycle);
        self.systems.score.end_cycle();
        self.state.used_reserve = false;
        self.state.cycle += 1;
        self.systems.host.did_end_action_cycle(self.state.cycle);
        self.fire(GameEvents::ACTION_CYCLE_ENDED);
        debug!(
            "cycle {} ended, score {}",
            self.state.cycle,
            self.systems.score.score()
        );
        Transition::To(State::Synchronizing)
    }
}
