//! Triggers module - mode-specific rules hooked into the state machine
//!
//! [`NoTriggers`] is the plain game. [`ScriptedTriggers`] fires preset
//! [`Trigger`]s once at chosen notifications, which is how puzzle modes and
//! tests inject "cancel this lock" or "unlock the best column" without the
//! engine knowing what they mean.

use serde::{Deserialize, Serialize};

use duoblock_core::types::Trigger;
use duoblock_core::{CoreError, Offset, Persist, Piece, TriggerSink, Triggers};

/// No mode rules
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTriggers;

impl Persist for NoTriggers {}

impl Triggers for NoTriggers {}

/// Notification a scripted trigger waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerHook {
    DidEnter,
    WillLock,
    DidLock,
    DidClear,
    WillEndCycle,
}

/// One-shot triggers fired in script order
#[derive(Debug, Clone, Default)]
pub struct ScriptedTriggers {
    script: Vec<(TriggerHook, Trigger)>,
}

impl ScriptedTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `trigger` the next time `hook` is notified
    pub fn on(mut self, hook: TriggerHook, trigger: Trigger) -> Self {
        self.script.push((hook, trigger));
        self
    }

    pub fn pending(&self) -> usize {
        self.script.len()
    }

    fn fire(&mut self, hook: TriggerHook, out: &mut TriggerSink) {
        let mut i = 0;
        while i < self.script.len() && !out.is_full() {
            if self.script[i].0 == hook {
                let (_, trigger) = self.script.remove(i);
                out.push(trigger);
            } else {
                i += 1;
            }
        }
    }
}

impl Persist for ScriptedTriggers {
    fn save_blob(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(&self.script)?)
    }

    fn restore_blob(&mut self, blob: Option<&[u8]>) -> Result<(), CoreError> {
        if let Some(bytes) = blob {
            self.script = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }
}

impl Triggers for ScriptedTriggers {
    fn did_enter(&mut self, _piece: &Piece, _offset: Offset, out: &mut TriggerSink) {
        self.fire(TriggerHook::DidEnter, out);
    }

    fn will_lock(&mut self, _piece: &Piece, _offset: Offset, out: &mut TriggerSink) {
        self.fire(TriggerHook::WillLock, out);
    }

    fn did_lock(&mut self, _piece: &Piece, _offset: Offset, out: &mut TriggerSink) {
        self.fire(TriggerHook::DidLock, out);
    }

    fn did_clear(&mut self, _cascade: i32, _rows: u32, out: &mut TriggerSink) {
        self.fire(TriggerHook::DidClear, out);
    }

    fn will_end_cycle(&mut self, out: &mut TriggerSink) {
        self.fire(TriggerHook::WillEndCycle, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_triggers_fire_once() {
        let mut triggers = ScriptedTriggers::new()
            .on(TriggerHook::WillLock, Trigger::CancelLock)
            .on(TriggerHook::WillEndCycle, Trigger::UnlockBestColumn);
        let piece = Piece::empty();
        let mut out = TriggerSink::new();

        triggers.did_lock(&piece, Offset::default(), &mut out);
        assert!(out.is_empty());

        triggers.will_lock(&piece, Offset::default(), &mut out);
        assert_eq!(out.as_slice(), &[Trigger::CancelLock]);
        out.clear();
        triggers.will_lock(&piece, Offset::default(), &mut out);
        assert!(out.is_empty());
        assert_eq!(triggers.pending(), 1);
    }

    #[test]
    fn test_script_survives_save() {
        let triggers = ScriptedTriggers::new().on(TriggerHook::DidClear, Trigger::UnlockBestColumn);
        let blob = triggers.save_blob().unwrap();
        let mut restored = ScriptedTriggers::new();
        restored.restore_blob(Some(&blob)).unwrap();
        let mut out = TriggerSink::new();
        restored.did_clear(0, 1, &mut out);
        assert_eq!(out.as_slice(), &[Trigger::UnlockBestColumn]);
    }
}
