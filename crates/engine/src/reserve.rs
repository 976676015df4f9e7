//! Reserve ("hold") handling
//!
//! The reserve is a small FIFO of pieces kept in their preview orientation.
//! How a use exchanges pieces depends on [`ReserveBehavior`]:
//!
//! - `Swap`: the falling piece and the reserve front trade places; the new
//!   piece keeps falling from the same position.
//! - `SwapReenter`: as `Swap`, but the new piece enters again from the top.
//! - `Insert`: the reserve front comes out, the falling piece goes to the back.
//! - `InsertReenter`: as `Insert`, the released piece enters from the top.
//! - `Special`: spends a special charge instead.
//!
//! With an empty reserve the swap behaviors store the falling piece and end
//! the cycle; the insert behaviors store it and bring in the next piece.
//!
//! A use attempted while nothing is falling is queued for the next entry,
//! except `Insert`, which rotates the upcoming piece immediately.

use log::debug;

use duoblock_core::types::{
    GameEvents, Lean, Period, PieceKind, ReserveBehavior, State, NEXT_LOOKAHEAD,
};
use duoblock_core::{CoreError, Piece, SpecialUse};

use crate::game::{entry_offset, Game};
use crate::state::GameState;

/// Take the reserve front out into `target`, leaving the rest compacted
fn take_front(reserve: &mut [Piece], target: &mut Piece) {
    target.take_values_from(&reserve[0]);
    reserve[0].reset(0, 0);
    reserve.rotate_left(1);
}

impl Game {
    pub fn can_use_reserve(&self) -> bool {
        let s = &self.state;
        s.period == Period::Ongoing
            && s.state != State::Initializing
            && !s.used_reserve
            && !s.reserve_queued
            && (self.config.reserve_behavior != ReserveBehavior::Special
                || self.systems.special.has_charge())
    }

    /// Use the reserve, returning whether anything happened or was queued
    pub fn use_reserve(&mut self, lean: Lean) -> Result<bool, CoreError> {
        if !self.can_use_reserve() {
            return Ok(false);
        }
        let behavior = self.config.reserve_behavior;
        let falling = self.state.state == State::Falling && !self.state.piece.is_empty();

        if !falling {
            if behavior == ReserveBehavior::Insert {
                return self.insert_upcoming();
            }
            self.state.reserve_queued = true;
            self.state.reserve_queued_lean = lean;
            debug!("reserve use queued until the next entry");
            return Ok(true);
        }

        if self.state.reserve_len() == 0 {
            match behavior {
                ReserveBehavior::Swap | ReserveBehavior::SwapReenter => {
                    return self.stash_falling();
                }
                ReserveBehavior::Insert | ReserveBehavior::InsertReenter => {
                    return self.stash_and_promote();
                }
                ReserveBehavior::Special => {}
            }
        }
        match behavior {
            ReserveBehavior::Swap => self.swap_in_place(lean),
            ReserveBehavior::Insert => self.insert_in_place(lean),
            ReserveBehavior::SwapReenter => self.swap_reenter(),
            ReserveBehavior::InsertReenter => self.insert_reenter(),
            ReserveBehavior::Special => self.use_special(),
        }
    }

    /// Empty reserve: the falling piece goes in and the cycle ends
    fn stash_falling(&mut self) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        s.reserve[0].take_values_from(&s.piece);
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[0])?;
        self.state.piece.reset(0, 0);
        let stored = self.state.exchange.kind;
        self.finish_reserve_use(stored, None, GameEvents::RESERVE_CHANGED);
        self.state.state = State::EndingCycle;
        Ok(true)
    }

    /// Empty reserve under the insert behaviors: the falling piece goes in
    /// and the upcoming piece enters from the top in its place
    fn stash_and_promote(&mut self) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        push_back(s)?;
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[0])?;
        self.promote_next()?;
        self.place_for_entry();
        self.state.state = State::Entering;
        let (stored, released) = (self.state.exchange.kind, self.state.piece.kind);
        self.finish_reserve_use(stored, released, GameEvents::RESERVE_CHANGED);
        Ok(true)
    }

    /// Try the piece now in `state.piece` at the current offset, kicking if
    /// allowed. On failure the outgoing piece in `exchange` is restored.
    fn settle_exchanged(&mut self, lean: Lean) -> Result<bool, CoreError> {
        self.systems.rotation.turn_0(&mut self.state.piece)?;
        let s = &self.state;
        if !self.systems.collision.collides(&s.grid, &s.piece, s.offset) {
            return Ok(true);
        }
        let can_kick = self.timing_allows(|t| t.can_kick(&self.state.piece));
        if can_kick {
            let mut candidate = self.state.offset;
            if self.systems.kick.kick(
                self.systems.collision.as_ref(),
                &self.state.grid,
                &self.state.piece,
                &mut candidate,
                lean.bias(),
            ) {
                self.state.offset = candidate;
                return Ok(true);
            }
        }
        let s = &mut self.state;
        s.piece.take_values_from(&s.exchange);
        self.systems.host.did_collide();
        self.fire(GameEvents::COLLIDED);
        debug!("reserve exchange blocked");
        Ok(false)
    }

    fn swap_in_place(&mut self, lean: Lean) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        s.piece.take_values_from(&s.reserve[0]);
        if !self.settle_exchanged(lean)? {
            return Ok(false);
        }
        let s = &mut self.state;
        s.reserve[0].take_values_from(&s.exchange);
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[0])?;
        let (stored, released) = (self.state.exchange.kind, self.state.piece.kind);
        self.finish_reserve_use(stored, released, GameEvents::RESERVE_CHANGED);
        Ok(true)
    }

    fn insert_in_place(&mut self, lean: Lean) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        s.piece.take_values_from(&s.reserve[0]);
        if !self.settle_exchanged(lean)? {
            return Ok(false);
        }
        self.commit_insert()?;
        let (stored, released) = (self.state.exchange.kind, self.state.piece.kind);
        self.finish_reserve_use(stored, released, GameEvents::RESERVE_CHANGED);
        Ok(true)
    }

    /// Drop the reserve front (already copied out) and append `exchange`
    fn commit_insert(&mut self) -> Result<(), CoreError> {
        let s = &mut self.state;
        s.reserve[0].reset(0, 0);
        s.reserve.rotate_left(1);
        push_back(s)?;
        let back = s.reserve_len() - 1;
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[back])
    }

    fn swap_reenter(&mut self) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        s.piece.take_values_from(&s.reserve[0]);
        s.reserve[0].take_values_from(&s.exchange);
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[0])?;
        self.reenter()?;
        let (stored, released) = (self.state.exchange.kind, self.state.piece.kind);
        self.finish_reserve_use(stored, released, GameEvents::RESERVE_CHANGED);
        Ok(true)
    }

    fn insert_reenter(&mut self) -> Result<bool, CoreError> {
        let s = &mut self.state;
        s.exchange.take_values_from(&s.piece);
        s.piece.take_values_from(&s.reserve[0]);
        self.commit_insert()?;
        self.reenter()?;
        let (stored, released) = (self.state.exchange.kind, self.state.piece.kind);
        self.finish_reserve_use(stored, released, GameEvents::RESERVE_CHANGED);
        Ok(true)
    }

    fn use_special(&mut self) -> Result<bool, CoreError> {
        match self.systems.special.use_charge() {
            Some(SpecialUse::InsertReenter(kind)) => {
                let s = &mut self.state;
                s.exchange.take_values_from(&s.piece);
                if s.reserve_len() == s.reserve.len() {
                    // full: the oldest reserve piece is discarded
                    s.reserve[0].reset(0, 0);
                    s.reserve.rotate_left(1);
                }
                push_back(s)?;
                let back = s.reserve_len() - 1;
                self.systems
                    .rotation
                    .turn_minimum_horizontal_profile(&mut self.state.reserve[back])?;
                self.systems.rotation.prepare(&mut self.state.piece, kind)?;
                self.reenter()?;
                let stored = self.state.exchange.kind;
                self.finish_reserve_use(stored, Some(kind), GameEvents::RESERVE_CHANGED);
                Ok(true)
            }
            Some(SpecialUse::Attack) => {
                self.systems.attack.issue_special_attack();
                self.state.exchange.reset(0, 0);
                self.finish_reserve_use(None, None, GameEvents::empty());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Put `piece` back at the top in spawn orientation
    fn reenter(&mut self) -> Result<(), CoreError> {
        self.systems.rotation.turn_0(&mut self.state.piece)?;
        self.place_for_entry();
        self.state.state = State::Entering;
        Ok(())
    }

    /// `Insert` while nothing falls: rotate the upcoming piece with the reserve
    fn insert_upcoming(&mut self) -> Result<bool, CoreError> {
        let entering = self.state.state == State::Entering && !self.state.piece.is_empty();
        let had_reserve = self.state.reserve_len() > 0;
        let s = &mut self.state;

        if entering {
            s.exchange.take_values_from(&s.piece);
            if had_reserve {
                take_front(&mut s.reserve, &mut s.piece);
            }
        } else {
            s.exchange.take_values_from(&s.next[0]);
            if had_reserve {
                take_front(&mut s.reserve, &mut s.next[0]);
            }
        }
        push_back(&mut self.state)?;
        let back = self.state.reserve_len() - 1;
        self.systems
            .rotation
            .turn_minimum_horizontal_profile(&mut self.state.reserve[back])?;

        match (entering, had_reserve) {
            (true, true) => {
                self.systems.rotation.turn_0(&mut self.state.piece)?;
                self.state.offset =
                    entry_offset(&self.state.piece, self.state.rows(), self.state.cols());
            }
            (true, false) => {
                self.promote_next()?;
                self.state.offset =
                    entry_offset(&self.state.piece, self.state.rows(), self.state.cols());
            }
            (false, true) => {
                self.systems
                    .rotation
                    .turn_minimum_horizontal_profile(&mut self.state.next[0])?;
            }
            (false, false) => {
                self.state.next.rotate_left(1);
                self.refill_next(NEXT_LOOKAHEAD - 1)?;
            }
        }

        let stored = self.state.exchange.kind;
        let released = if entering {
            self.state.piece.kind
        } else {
            self.state.next[0].kind
        };
        self.finish_reserve_use(
            stored,
            released,
            GameEvents::RESERVE_CHANGED | GameEvents::QUEUE_CHANGED,
        );
        Ok(true)
    }

    fn finish_reserve_use(
        &mut self,
        stored: Option<PieceKind>,
        released: Option<PieceKind>,
        events: GameEvents,
    ) {
        self.systems.bag.note_reserve(stored, released);
        self.state.used_reserve = true;
        self.systems.triggers.did_use_reserve(
            &self.state.exchange,
            &self.state.piece,
            &mut self.sink,
        );
        self.pull_triggers();
        self.systems
            .score
            .did_use_reserve(&self.state.exchange, &self.state.piece);
        self.systems.attack.did_use_reserve();
        self.systems.timing.did_enter();
        self.systems.host.did_use_reserve();
        self.fire(events | GameEvents::RESERVE_USED);
        debug!(
            "reserve used ({:?}): stored {:?}, released {:?}",
            self.config.reserve_behavior, stored, released
        );
    }
}

/// Append `exchange` at the first free reserve slot
fn push_back(state: &mut GameState) -> Result<(), CoreError> {
    let len = state.reserve_len();
    if len >= state.reserve.len() {
        return Err(CoreError::IllegalState("reserve is full".into()));
    }
    state.reserve[len].take_values_from(&state.exchange);
    Ok(())
}
