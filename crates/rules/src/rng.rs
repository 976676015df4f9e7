//! RNG module - seeded randomness and the 7-bag piece source
//!
//! Shapes come from a "7-bag": one of each shape, shuffled, drawn until
//! empty, then refilled. The pane variant of every drawn piece comes from the
//! same generator, so one seed fixes the whole sequence.

use serde::{Deserialize, Serialize};

use duoblock_core::types::{PieceKind, Shape, Variant};
use duoblock_core::{Bag, CoreError, Persist};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // high bits of an LCG are the well-mixed ones
        (self.next_u32() >> 16) % max
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Relative weights of the pane variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantWeights {
    pub pane0: u32,
    pub pane1: u32,
    pub linked: u32,
}

impl Default for VariantWeights {
    fn default() -> Self {
        Self {
            pane0: 2,
            pane1: 2,
            linked: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BagState {
    bag: [Shape; 7],
    bag_index: usize,
    rng: SimpleRng,
    history: Vec<u32>,
    reserved: Vec<u32>,
}

/// 7-bag piece generator with draw history
#[derive(Debug, Clone)]
pub struct SevenBag {
    weights: VariantWeights,
    state: BagState,
}

impl SevenBag {
    /// Create a new bag with the given seed
    pub fn new(seed: u32) -> Self {
        Self::with_weights(seed, VariantWeights::default())
    }

    pub fn with_weights(seed: u32, weights: VariantWeights) -> Self {
        let mut bag = Self {
            weights,
            state: BagState {
                bag: Shape::ALL,
                bag_index: 0,
                rng: SimpleRng::new(seed),
                history: vec![0; PieceKind::COUNT],
                reserved: vec![0; PieceKind::COUNT],
            },
        };
        bag.refill();
        bag
    }

    /// Generate a new shuffled bag
    fn refill(&mut self) {
        self.state.bag = Shape::ALL;
        self.state.rng.shuffle(&mut self.state.bag);
        self.state.bag_index = 0;
    }

    fn draw_variant(&mut self) -> Variant {
        let w = self.weights;
        let total = w.pane0 + w.pane1 + w.linked;
        let roll = self.state.rng.next_range(total.max(1));
        if roll < w.pane0 {
            Variant::Pane0
        } else if roll < w.pane0 + w.pane1 {
            Variant::Pane1
        } else {
            Variant::Linked
        }
    }

    /// Pieces currently held out of the visible queues, per kind
    pub fn reserved(&self) -> &[u32] {
        &self.state.reserved
    }
}

impl Persist for SevenBag {
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

impl Bag for SevenBag {
    fn draw(&mut self) -> PieceKind {
        if self.state.bag_index >= self.state.bag.len() {
            self.refill();
        }
        let shape = self.state.bag[self.state.bag_index];
        self.state.bag_index += 1;
        let kind = PieceKind::new(shape, self.draw_variant());
        self.state.history[kind.index()] += 1;
        kind
    }

    fn note_reserve(&mut self, stored: Option<PieceKind>, released: Option<PieceKind>) {
        if let Some(kind) = stored {
            self.state.reserved[kind.index()] += 1;
        }
        if let Some(kind) = released {
            let slot = &mut self.state.reserved[kind.index()];
            *slot = slot.saturating_sub(1);
        }
    }

    fn history(&self) -> &[u32] {
        &self.state.history
    }
}
