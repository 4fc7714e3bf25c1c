use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board too small for a playable interior")]
    BoardTooSmall,
    #[error("Interior cell count must be even")]
    OddInterior,
    #[error("Tile kind count must fit the interior pair count")]
    InvalidKindCount,
    #[error("Board shape does not match the configuration")]
    InvalidBoardShape,
    #[error("Border cells must stay empty")]
    OccupiedBorder,
    #[error("Tiles of some kind do not come in pairs")]
    UnpairedTiles,
}

pub type Result<T> = core::result::Result<T, GameError>;
