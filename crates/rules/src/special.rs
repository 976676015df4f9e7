//! Special module - charges earned by clearing rows

use serde::{Deserialize, Serialize};

use duoblock_core::types::{PieceKind, Shape, Variant};
use duoblock_core::{CoreError, Persist, Special, SpecialUse};

/// Rows per charge when none is configured
pub const DEFAULT_ROWS_PER_CHARGE: u32 = 8;

/// What spending a charge does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecialMode {
    /// A linked I piece re-enters in place of the falling one
    #[default]
    InsertReenter,
    Attack,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SpecialState {
    charges: u32,
    progress: u32,
}

/// One charge per `rows_per_charge` rows cleared
#[derive(Debug, Clone)]
pub struct StandardSpecial {
    rows_per_charge: u32,
    mode: SpecialMode,
    state: SpecialState,
}

impl StandardSpecial {
    pub fn new(rows_per_charge: u32, mode: SpecialMode) -> Self {
        Self {
            rows_per_charge: rows_per_charge.max(1),
            mode,
            state: SpecialState::default(),
        }
    }

    pub fn charges(&self) -> u32 {
        self.state.charges
    }
}

impl Default for StandardSpecial {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS_PER_CHARGE, SpecialMode::default())
    }
}

impl Persist for StandardSpecial {
    fn save_blob(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec(&self.state)?)
    }

    fn restore_blob(&mut self, blob: Option<&[u8]>) -> Result<(), CoreError> {
        if let Some(bytes) = blob {
            self.state = serde_json::from_slice(bytes)?;
        }
        Ok(())
    }
}

impl Special for StandardSpecial {
    fn initialize(&mut self) {
        self.state = SpecialState::default();
    }

    fn has_charge(&self) -> bool {
        self.state.charges > 0
    }

    fn use_charge(&mut self) -> Option<SpecialUse> {
        if self.state.charges == 0 {
            return None;
        }
        self.state.charges -= 1;
        Some(match self.mode {
            SpecialMode::InsertReenter => {
                SpecialUse::InsertReenter(PieceKind::new(Shape::I, Variant::Linked))
            }
            SpecialMode::Attack => SpecialUse::Attack,
        })
    }

    fn did_clear(&mut self, rows: u32) {
        self.state.progress += rows;
        self.state.charges += self.state.progress / self.rows_per_charge;
        self.state.progress %= self.rows_per_charge;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charges_accrue_from_rows() {
        let mut special = StandardSpecial::new(4, SpecialMode::InsertReenter);
        special.initialize();
        assert!(!special.has_charge());
        special.did_clear(3);
        assert!(!special.has_charge());
        special.did_clear(6);
        assert_eq!(special.charges(), 2);
    }

    #[test]
    fn test_use_charge_by_mode() {
        let mut special = StandardSpecial::new(1, SpecialMode::InsertReenter);
        assert_eq!(special.use_charge(), None);
        special.did_clear(1);
        assert_eq!(
            special.use_charge(),
            Some(SpecialUse::InsertReenter(PieceKind::new(Shape::I, Variant::Linked)))
        );
        assert!(!special.has_charge());

        let mut special = StandardSpecial::new(1, SpecialMode::Attack);
        special.did_clear(1);
        assert_eq!(special.use_charge(), Some(SpecialUse::Attack));
    }
}
