//! Timing module - delays gating entry, fall, lock and clear
//!
//! All delays are in seconds and every timer advances in [`Timing::tick`].
//!
//! | Delay | Default | Reset by |
//! |-------|---------|----------|
//! | entry | 0.1 s | `did_prepare` |
//! | fall | level table, 1.0 s at level 0 | `did_enter`, `did_fall` |
//! | lock | 0.45 s | `did_fall`, grounded moves/turns (up to 15) |
//! | clear | 0.18 s | `did_begin_clear` |

use serde::{Deserialize, Serialize};

use duoblock_core::{CoreError, Persist, Piece, Timing};

/// Fall delay per level in seconds; beyond the table the floor applies
pub const FALL_DELAYS: [f64; 9] = [1.0, 0.8, 0.65, 0.5, 0.4, 0.32, 0.25, 0.2, 0.16];

/// Timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub entry_delay: f64,
    pub lock_delay: f64,
    pub lock_reset_limit: u8,
    pub clear_delay: f64,
    pub fall_delay_floor: f64,
    /// Soft falls run this many times faster than gravity
    pub soft_fall_multiplier: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            entry_delay: 0.1,
            lock_delay: 0.45,
            lock_reset_limit: 15,
            clear_delay: 0.18,
            fall_delay_floor: 0.12,
            soft_fall_multiplier: 10.0,
        }
    }
}

impl TimingConfig {
    /// Gravity delay at `level`
    pub fn fall_delay(&self, level: u32) -> f64 {
        FALL_DELAYS
            .get(level as usize)
            .copied()
            .unwrap_or(self.fall_delay_floor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Timers {
    entry: f64,
    fall: f64,
    lock: f64,
    clear: f64,
    lock_resets: u8,
    forced_lock: bool,
    level: u32,
}

/// Delay-driven timing
#[derive(Debug, Clone)]
pub struct StandardTiming {
    config: TimingConfig,
    timers: Timers,
}

impl StandardTiming {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            timers: Timers::default(),
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }
}

impl Default for StandardTiming {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

impl Persist for StandardTiming {
    fn save_blob(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(&self.timers)?)
    }

    fn restore_blob(&mut self, blob: Option<&[u8]>) -> Result<(), CoreError> {
        if let Some(bytes) = blob {
            self.timers = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }
}

impl Timing for StandardTiming {
    fn tick(&mut self, seconds: f64) {
        let t = &mut self.timers;
        t.entry += seconds;
        t.fall += seconds;
        t.lock += seconds;
        t.clear += seconds;
    }

    fn set_level(&mut self, level: u32) {
        self.timers.level = level;
    }

    fn can_enter(&self) -> bool {
        self.timers.entry >= self.config.entry_delay
    }

    fn can_move(&self) -> bool {
        true
    }

    fn can_turn(&self) -> bool {
        true
    }

    fn can_flip(&self) -> bool {
        true
    }

    fn can_kick(&self, _piece: &Piece) -> bool {
        true
    }

    fn can_fall(&self) -> bool {
        self.timers.fall >= self.config.fall_delay(self.timers.level)
    }

    fn can_lock(&self) -> bool {
        self.timers.forced_lock || self.timers.lock >= self.config.lock_delay
    }

    fn can_clear(&self) -> bool {
        self.timers.clear >= self.config.clear_delay
    }

    fn can_drop(&self) -> bool {
        true
    }

    fn did_prepare(&mut self) {
        self.timers.entry = 0.0;
    }

    fn did_enter(&mut self) {
        let t = &mut self.timers;
        t.fall = 0.0;
        t.lock = 0.0;
        t.lock_resets = 0;
        t.forced_lock = false;
    }

    fn did_move(&mut self, grounded: bool) {
        if grounded && self.timers.lock_resets < self.config.lock_reset_limit {
            self.timers.lock = 0.0;
            self.timers.lock_resets += 1;
        }
    }

    fn did_turn(&mut self, grounded: bool) {
        self.did_move(grounded);
    }

    fn did_kick(&mut self) {}

    fn did_fall(&mut self) {
        self.timers.fall = 0.0;
        self.timers.lock = 0.0;
    }

    fn did_soft_fall(&mut self) {
        // a soft fall counts as a fraction of a gravity step
        let step = self.config.fall_delay(self.timers.level);
        let credit = step - step / self.config.soft_fall_multiplier.max(1.0);
        self.timers.fall = 0.0f64.max(self.timers.fall - credit);
        self.timers.lock = 0.0;
    }

    fn did_drop(&mut self) {
        self.timers.forced_lock = true;
    }

    fn did_lock(&mut self) {
        self.timers.forced_lock = false;
    }

    fn did_begin_clear(&mut self) {
        self.timers.clear = 0.0;
    }

    fn did_clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_delay_table() {
        let config = TimingConfig::default();
        assert_eq!(config.fall_delay(0), 1.0);
        assert_eq!(config.fall_delay(8), 0.16);
        assert_eq!(config.fall_delay(30), 0.12);
    }

    #[test]
    fn test_fall_waits_for_delay() {
        let mut timing = StandardTiming::default();
        timing.did_enter();
        timing.tick(0.5);
        assert!(!timing.can_fall());
        timing.tick(0.5);
        assert!(timing.can_fall());
        timing.did_fall();
        assert!(!timing.can_fall());
    }

    #[test]
    fn test_grounded_moves_reset_lock_until_limit() {
        let mut timing = StandardTiming::new(TimingConfig {
            lock_reset_limit: 2,
            ..TimingConfig::default()
        });
        timing.did_enter();
        for _ in 0..2 {
            timing.tick(0.4);
            timing.did_move(true);
            assert!(!timing.can_lock());
        }
        timing.tick(0.4);
        timing.did_move(true);
        timing.tick(0.1);
        assert!(timing.can_lock());
    }

    #[test]
    fn test_drop_forces_lock() {
        let mut timing = StandardTiming::default();
        timing.did_enter();
        assert!(!timing.can_lock());
        timing.did_drop();
        assert!(timing.can_lock());
        timing.did_lock();
        assert!(!timing.can_lock());
    }

    #[test]
    fn test_blob_roundtrip_keeps_timers() {
        let mut timing = StandardTiming::default();
        timing.tick(0.3);
        timing.set_level(4);
        let blob = timing.save_blob().unwrap();
        let mut restored = StandardTiming::default();
        restored.restore_blob(Some(&blob)).unwrap();
        assert!(restored.can_enter());
        assert_eq!(restored.timers, timing.timers);
    }
}
