//! Game construction
//!
//! Every collaborator defaults to the standard rule set configured from the
//! [`GameConfig`]; setters replace individual subsystems. The gravity
//! strategy is chosen once in [`GameBuilder::build`] from the lock rules.

use log::info;

use duoblock_core::{
    Attack, Bag, Clear, Collision, CoreError, Grid, Kick, Level, Lock, Metamorphosis, Rotation,
    Score, Special, Timing, Triggers, Valleys,
};
use duoblock_rules::{
    NoTriggers, PaneSwapMetamorphosis, SevenBag, StandardAttack, StandardClear, StandardCollision,
    StandardKick, StandardLevel, StandardLock, StandardRotation, StandardScore, StandardSpecial,
    StandardTiming, StandardValleys,
};

use crate::config::GameConfig;
use crate::game::{Game, Systems};
use crate::host::{Host, NullHost};
use crate::state::GameState;

/// Assembles a [`Game`]
#[derive(Default)]
pub struct GameBuilder {
    config: GameConfig,
    grid: Option<Grid>,
    collision: Option<Box<dyn Collision>>,
    rotation: Option<Box<dyn Rotation>>,
    kick: Option<Box<dyn Kick>>,
    lock: Option<Box<dyn Lock>>,
    clear: Option<Box<dyn Clear>>,
    timing: Option<Box<dyn Timing>>,
    score: Option<Box<dyn Score>>,
    level: Option<Box<dyn Level>>,
    attack: Option<Box<dyn Attack>>,
    valleys: Option<Box<dyn Valleys>>,
    bag: Option<Box<dyn Bag>>,
    metamorphosis: Option<Box<dyn Metamorphosis>>,
    special: Option<Box<dyn Special>>,
    triggers: Option<Box<dyn Triggers>>,
    host: Option<Box<dyn Host>>,
}

impl GameBuilder {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Start from a prepared grid instead of an empty one
    pub fn grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn collision(mut self, collision: Box<dyn Collision>) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn rotation(mut self, rotation: Box<dyn Rotation>) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn kick(mut self, kick: Box<dyn Kick>) -> Self {
        self.kick = Some(kick);
        self
    }

    pub fn lock(mut self, lock: Box<dyn Lock>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn clear(mut self, clear: Box<dyn Clear>) -> Self {
        self.clear = Some(clear);
        self
    }

    pub fn timing(mut self, timing: Box<dyn Timing>) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn score(mut self, score: Box<dyn Score>) -> Self {
        self.score = Some(score);
        self
    }

    pub fn level(mut self, level: Box<dyn Level>) -> Self {
        self.level = Some(level);
        self
    }

    pub fn attack(mut self, attack: Box<dyn Attack>) -> Self {
        self.attack = Some(attack);
        self
    }

    pub fn valleys(mut self, valleys: Box<dyn Valleys>) -> Self {
        self.valleys = Some(valleys);
        self
    }

    pub fn bag(mut self, bag: Box<dyn Bag>) -> Self {
        self.bag = Some(bag);
        self
    }

    pub fn metamorphosis(mut self, metamorphosis: Box<dyn Metamorphosis>) -> Self {
        self.metamorphosis = Some(metamorphosis);
        self
    }

    pub fn special(mut self, special: Box<dyn Special>) -> Self {
        self.special = Some(special);
        self
    }

    pub fn triggers(mut self, triggers: Box<dyn Triggers>) -> Self {
        self.triggers = Some(triggers);
        self
    }

    pub fn host(mut self, host: Box<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Result<Game, CoreError> {
        let config = self.config;
        config.validate()?;
        let (rows, cols) = (config.rows, config.cols);

        let mut state = GameState::new(rows, cols);
        if let Some(grid) = self.grid {
            if grid.rows() != rows || grid.cols() != cols {
                return Err(CoreError::Config(format!(
                    "grid is {}x{}, configured {}x{}",
                    grid.cols(),
                    grid.rows(),
                    cols,
                    rows
                )));
            }
            state.grid = grid;
        }

        let timing = self.timing.unwrap_or_else(|| {
            let mut timing = StandardTiming::new(config.timing);
            timing.set_level(config.start_level);
            Box::new(timing)
        });
        let systems = Systems {
            collision: self.collision.unwrap_or_else(|| Box::new(StandardCollision)),
            rotation: self.rotation.unwrap_or_else(|| Box::new(StandardRotation)),
            kick: self.kick.unwrap_or_else(|| Box::new(StandardKick)),
            lock: self
                .lock
                .unwrap_or_else(|| Box::new(StandardLock::new(rows, cols))),
            clear: self.clear.unwrap_or_else(|| Box::new(StandardClear)),
            timing,
            score: self.score.unwrap_or_else(|| Box::new(StandardScore::new())),
            level: self.level.unwrap_or_else(|| {
                Box::new(StandardLevel::new(config.start_level, config.rows_per_level))
            }),
            attack: self.attack.unwrap_or_else(|| {
                Box::new(StandardAttack::new(config.seed, config.displacement))
            }),
            valleys: self
                .valleys
                .unwrap_or_else(|| Box::new(StandardValleys::new(config.seed))),
            bag: self.bag.unwrap_or_else(|| Box::new(SevenBag::new(config.seed))),
            metamorphosis: self.metamorphosis.unwrap_or_else(|| {
                Box::new(PaneSwapMetamorphosis::new(config.metamorphosis_period))
            }),
            special: self.special.unwrap_or_else(|| {
                Box::new(StandardSpecial::new(
                    config.special_rows_per_charge,
                    config.special_mode,
                ))
            }),
            triggers: self.triggers.unwrap_or_else(|| Box::new(NoTriggers)),
            host: self.host.unwrap_or_else(|| Box::new(NullHost)),
        };

        info!(
            "building {}x{} game with seed {} and {:?} reserve",
            cols, rows, config.seed, config.reserve_behavior
        );
        Ok(Game::from_parts(config, state, systems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duoblock_core::types::{Period, State};
    use duoblock_core::GravityStrategy;

    #[test]
    fn test_defaults_build() {
        let game = GameBuilder::new(GameConfig::default()).build().unwrap();
        assert_eq!(game.period(), Period::Prestart);
        assert_eq!(game.current_state(), State::Initializing);
        assert_eq!(game.grid().rows(), 20);
        assert_eq!(game.gravity_strategy(), GravityStrategy::select(&StandardLock::new(20, 8)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GameConfig {
            rows: 1,
            ..GameConfig::default()
        };
        assert!(matches!(
            GameBuilder::new(config).build(),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_grid_dimensions_must_match() {
        let result = GameBuilder::new(GameConfig::default())
            .grid(Grid::new(10, 8))
            .build();
        assert!(matches!(result, Err(CoreError::Config(_))));

        let mut grid = Grid::new(20, 8);
        grid.set(0, 0, 0, 1);
        let game = GameBuilder::new(GameConfig::default())
            .grid(grid.clone())
            .build()
            .unwrap();
        assert_eq!(game.grid(), &grid);
    }
}
