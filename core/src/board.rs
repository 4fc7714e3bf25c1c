use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Play grid: a fixed-size cell matrix whose outermost ring stays empty so
/// paths may route around the play area. Owned and mutated exclusively by the
/// engine; everyone else sees `&Board`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
}

impl Board {
    pub(crate) fn empty(size: Coord2) -> Self {
        Self {
            cells: Array2::default(size.to_nd_index()),
        }
    }

    /// Wraps an explicit cell layout, checking the border and pair-parity
    /// invariants. Meant for engineered layouts in tests and for restoring a
    /// saved board.
    pub fn from_cells(cells: Array2<Cell>) -> Result<Self> {
        let dim = cells.dim();
        if dim.0 > Coord::MAX as usize || dim.1 > Coord::MAX as usize {
            return Err(GameError::InvalidBoardShape);
        }

        let board = Self { cells };
        board.validate()?;
        Ok(board)
    }

    pub fn validate(&self) -> Result<()> {
        let (rows, cols) = self.size();
        if rows < 4 || cols < 4 {
            return Err(GameError::BoardTooSmall);
        }

        let mut kind_counts = [0 as CellCount; 256];
        for coords in self.iter_coords() {
            let cell = self[coords];
            if cell.state.is_occupied() {
                if self.is_border(coords) {
                    return Err(GameError::OccupiedBorder);
                }
                kind_counts[cell.kind.0 as usize] += 1;
            }
        }

        if kind_counts.iter().any(|&count| count % 2 != 0) {
            return Err(GameError::UnpairedTiles);
        }

        Ok(())
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.cells.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len().try_into().unwrap()
    }

    pub fn in_bounds(&self, coords: Coord2) -> bool {
        let size = self.size();
        coords.0 < size.0 && coords.1 < size.1
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if self.in_bounds(coords) {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn is_border(&self, coords: Coord2) -> bool {
        let (rows, cols) = self.size();
        coords.0 == 0 || coords.0 == rows - 1 || coords.1 == 0 || coords.1 == cols - 1
    }

    pub fn cell_at(&self, coords: Coord2) -> Cell {
        self.cells[coords.to_nd_index()]
    }

    /// All positions, row-major.
    pub fn iter_coords(&self) -> impl Iterator<Item = Coord2> + use<> {
        let (rows, cols) = self.size();
        (0..rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }

    /// Positions of `Normal` tiles, row-major. This is the enumeration order
    /// behind pair scans and the reshuffle reassignment.
    pub fn iter_normal(&self) -> impl Iterator<Item = Coord2> + '_ {
        self.iter_coords().filter(|&coords| self[coords].is_normal())
    }

    pub fn remaining_tiles(&self) -> CellCount {
        self.cells
            .iter()
            .filter(|cell| cell.state.is_occupied())
            .count()
            .try_into()
            .unwrap()
    }

    pub fn is_cleared(&self) -> bool {
        self.remaining_tiles() == 0
    }

    /// Walkable for pathing purposes: empty, or the path's own destination.
    pub(crate) fn is_walkable(&self, coords: Coord2, target: Coord2) -> bool {
        coords == target || self[coords].is_empty()
    }

    pub(crate) fn place(&mut self, coords: Coord2, cell: Cell) {
        self.cells[coords.to_nd_index()] = cell;
    }

    pub(crate) fn set_state(&mut self, coords: Coord2, state: CellState) {
        self.cells[coords.to_nd_index()].state = state;
    }

    pub(crate) fn set_kind(&mut self, coords: Coord2, kind: TileKind) {
        self.cells[coords.to_nd_index()].kind = kind;
    }
}

impl core::ops::Index<Coord2> for Board {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[coords.to_nd_index()]
    }
}
