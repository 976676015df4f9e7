//! Player actions on the falling piece
//!
//! Every action is refused (returns `Ok(false)`) unless a piece is falling
//! and the timing system allows it. Blocked moves fire `COLLIDED`.

use log::trace;

use duoblock_core::types::{GameEvents, Lean, Period, State, TurnKind};
use duoblock_core::{turn_piece, CoreError, TurnSystems};

use crate::game::Game;

impl Game {
    fn piece_in_play(&self) -> bool {
        self.state.period == Period::Ongoing
            && self.state.state == State::Falling
            && !self.state.piece.is_empty()
    }

    fn collided(&mut self) {
        self.systems.host.did_collide();
        self.fire(GameEvents::COLLIDED);
    }

    pub fn move_left(&mut self) -> Result<bool, CoreError> {
        self.shift(-1)
    }

    pub fn move_right(&mut self) -> Result<bool, CoreError> {
        self.shift(1)
    }

    fn shift(&mut self, dx: i32) -> Result<bool, CoreError> {
        if !self.piece_in_play() || !self.timing_allows(|t| t.can_move()) {
            return Ok(false);
        }
        let target = self.state.offset.translated(dx, 0);
        if self
            .systems
            .collision
            .collides(&self.state.grid, &self.state.piece, target)
        {
            self.collided();
            return Ok(false);
        }

        self.state.offset = target;
        let grounded = self.is_grounded();
        self.systems.timing.did_move(grounded);
        self.systems.host.did_move();
        self.fire(GameEvents::MOVED);
        Ok(true)
    }

    pub fn turn_cw(&mut self, lean: Lean) -> Result<bool, CoreError> {
        self.turn(TurnKind::Cw, lean)
    }

    pub fn turn_ccw(&mut self, lean: Lean) -> Result<bool, CoreError> {
        self.turn(TurnKind::Ccw, lean)
    }

    pub fn turn_180(&mut self, lean: Lean) -> Result<bool, CoreError> {
        self.turn(TurnKind::Half, lean)
    }

    pub fn flip(&mut self, lean: Lean) -> Result<bool, CoreError> {
        self.turn(TurnKind::Flip, lean)
    }

    /// Turn in place, then kick toward `lean`; a failed turn leaves the piece
    /// exactly as it was
    pub(crate) fn turn(&mut self, kind: TurnKind, lean: Lean) -> Result<bool, CoreError> {
        let allowed = match kind {
            TurnKind::Flip => self.timing_allows(|t| t.can_flip()),
            _ => self.timing_allows(|t| t.can_turn()),
        };
        if !self.piece_in_play() || !allowed {
            return Ok(false);
        }

        let can_kick = {
            let piece = &self.state.piece;
            self.timing_allows(|t| t.can_kick(piece))
        };
        let systems = TurnSystems {
            collision: self.systems.collision.as_ref(),
            kick: self.systems.kick.as_ref(),
            rotation: self.systems.rotation.as_ref(),
        };
        let outcome = turn_piece(
            systems,
            &self.state.grid,
            &mut self.state.piece,
            &mut self.state.offset,
            kind,
            lean,
            can_kick,
        )?;
        trace!("turn {:?} with lean {:?}: {:?}", kind, lean, outcome);
        if !outcome.changed() {
            self.collided();
            return Ok(false);
        }

        let grounded = self.is_grounded();
        self.systems.timing.did_turn(grounded);
        self.systems
            .triggers
            .did_turn(&self.state.piece, self.state.offset, &mut self.sink);
        self.pull_triggers();
        self.systems.host.did_turn(kind);
        self.fire(if kind == TurnKind::Flip {
            GameEvents::FLIPPED
        } else {
            GameEvents::TURNED
        });

        if outcome.moved() {
            self.systems.timing.did_kick();
            self.systems
                .triggers
                .did_kick(&self.state.piece, self.state.offset, &mut self.sink);
            self.pull_triggers();
            self.systems.host.did_kick();
            self.fire(GameEvents::KICKED);
        }
        Ok(true)
    }

    /// Fall one row ahead of gravity
    pub fn soft_fall(&mut self) -> Result<bool, CoreError> {
        if !self.piece_in_play() || !self.timing_allows(|t| t.can_move()) {
            return Ok(false);
        }
        if self.is_grounded() {
            self.collided();
            return Ok(false);
        }
        self.state.offset.y -= 1;
        self.systems.timing.did_soft_fall();
        self.systems.score.did_fall(true);
        self.systems.host.did_fall();
        self.fire(GameEvents::FELL);
        Ok(true)
    }

    /// Move straight to the resting position; locking still waits for gravity
    pub fn hard_drop(&mut self) -> Result<bool, CoreError> {
        if !self.piece_in_play() || !self.timing_allows(|t| t.can_drop()) {
            return Ok(false);
        }
        let rows = self
            .systems
            .collision
            .space_below(&self.state.grid, &self.state.piece, self.state.offset, true)
            .max(0);
        self.state.offset.y -= rows;
        self.systems.timing.did_drop();
        self.systems.score.did_drop(rows);
        self.systems.host.did_drop(rows);
        self.fire(GameEvents::DROPPED);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GameBuilder;
    use crate::config::GameConfig;
    use crate::host::{HostEvent, RecordingHost};
    use duoblock_core::types::{GameEvents, Lean, State};
    use duoblock_core::{Collision, Offset};
    use duoblock_rules::StandardCollision;

    fn falling_game() -> (crate::Game, RecordingHost) {
        let host = RecordingHost::without_timing();
        let mut game = GameBuilder::new(GameConfig::default())
            .host(Box::new(host.clone()))
            .build()
            .unwrap();
        game.start();
        while game.current_state() != State::Falling {
            game.step().unwrap();
        }
        (game, host)
    }

    #[test]
    fn test_actions_refused_before_falling() {
        let mut game = GameBuilder::new(GameConfig::default()).build().unwrap();
        game.start();
        assert!(!game.move_left().unwrap());
        assert!(!game.hard_drop().unwrap());
    }

    #[test]
    fn test_move_until_wall_collides() {
        let (mut game, host) = falling_game();
        let mut moves = 0;
        while game.move_left().unwrap() {
            moves += 1;
            assert!(moves < 10);
        }
        assert!(moves > 0);
        assert_eq!(host.count(HostEvent::Collided), 1);
        assert!(game.state().events_last_tick.contains(GameEvents::COLLIDED));
    }

    #[test]
    fn test_hard_drop_lands_on_floor() {
        let (mut game, host) = falling_game();
        assert!(game.hard_drop().unwrap());
        let bounds = game.piece().bounds().unwrap();
        assert_eq!(game.offset().y + bounds.min_row, 0);
        assert!(matches!(host.events().last(), Some(HostEvent::Dropped(rows)) if *rows > 0));
        assert!(!game.soft_fall().unwrap());
    }

    #[test]
    fn test_turn_changes_rotation_or_reverts_cleanly() {
        let (mut game, _) = falling_game();
        let before = (game.piece().clone(), game.offset());
        if game.turn_cw(Lean::None).unwrap() {
            assert!(!StandardCollision.collides(game.grid(), game.piece(), game.offset()));
        } else {
            assert_eq!(game.piece(), &before.0);
            assert_eq!(game.offset(), before.1);
        }
    }

    #[test]
    fn test_soft_fall_moves_one_row() {
        let (mut game, host) = falling_game();
        let Offset { y, .. } = game.offset();
        assert!(game.soft_fall().unwrap());
        assert_eq!(game.offset().y, y - 1);
        assert_eq!(host.count(HostEvent::Fell), 1);
    }
}
