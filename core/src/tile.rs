use serde::{Deserialize, Serialize};

/// Symbol identity two tiles must share to be matchable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKind(pub u8);

/// Occupancy of one grid position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    Empty,
    Normal,
    /// A normal tile the player has tentatively chosen; pathing treats it like
    /// `Normal`, presentation and the selection protocol tell them apart.
    Selected,
}

impl CellState {
    pub const fn is_occupied(self) -> bool {
        matches!(self, Self::Normal | Self::Selected)
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::Empty
    }
}

/// One grid position; `kind` is meaningless while the cell is empty.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: TileKind,
    pub state: CellState,
}

impl Cell {
    pub const EMPTY: Self = Self {
        kind: TileKind(0),
        state: CellState::Empty,
    };

    pub const fn normal(kind: TileKind) -> Self {
        Self {
            kind,
            state: CellState::Normal,
        }
    }

    pub const fn is_empty(self) -> bool {
        matches!(self.state, CellState::Empty)
    }

    pub const fn is_normal(self) -> bool {
        matches!(self.state, CellState::Normal)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}
