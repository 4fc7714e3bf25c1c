#![no_std]

extern crate alloc;

use core::time::Duration;
use serde::{Deserialize, Serialize};

pub use board::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use generator::*;
pub use path::*;
pub use tile::*;
pub use types::*;

mod board;
mod engine;
mod error;
mod events;
mod generator;
mod path;
mod tile;
mod types;

/// Scoring knobs consumed by the engine; only the shape is fixed, every
/// constant is tunable.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Score of a straight (zero-turn) match.
    pub base: u32,
    /// Added per direction change of the connecting path.
    pub per_turn: u32,
    /// Added per combo level beyond the first.
    pub combo_bonus: u32,
    /// Added when the match lands within `quick_window` of the previous one.
    pub quick_bonus: u32,
    pub quick_window: Duration,
}

impl ScoreConfig {
    pub const DEFAULT: Self = Self {
        base: 100,
        per_turn: 50,
        combo_bonus: 25,
        quick_bonus: 50,
        quick_window: Duration::from_secs(3),
    };
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Grid shape `(rows, cols)` including the always-empty border ring.
    pub size: Coord2,
    /// How many distinct tile kinds the generator deals.
    pub kinds: u8,
    pub max_turns: u8,
    /// How long a confirmed match stays on the board (path display) before
    /// [`BoardEngine::update`] may remove it.
    pub resolve_delay: Duration,
    pub scoring: ScoreConfig,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, kinds: u8) -> Self {
        Self {
            size,
            kinds,
            max_turns: MAX_TURNS,
            resolve_delay: Duration::from_secs(1),
            scoring: ScoreConfig::DEFAULT,
        }
    }

    pub fn new(size: Coord2, kinds: u8) -> Result<Self> {
        let config = Self::new_unchecked(size, kinds);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (rows, cols) = self.size;
        if rows < 4 || cols < 4 {
            return Err(GameError::BoardTooSmall);
        }

        let interior = self.interior_cells();
        if interior % 2 != 0 {
            return Err(GameError::OddInterior);
        }
        if self.kinds == 0 || self.kinds as CellCount > interior / 2 {
            return Err(GameError::InvalidKindCount);
        }

        Ok(())
    }

    /// Playable area inside the border ring.
    pub const fn interior_size(&self) -> Coord2 {
        (self.size.0.saturating_sub(2), self.size.1.saturating_sub(2))
    }

    pub const fn interior_cells(&self) -> CellCount {
        let (rows, cols) = self.interior_size();
        mult(rows, cols)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    pub const fn small() -> Self {
        Self::new_unchecked((6, 6), 4)
    }

    pub const fn classic() -> Self {
        Self::new_unchecked((10, 18), 32)
    }
}
