use crate::*;
pub use random::*;

mod random;

/// Builds the tile layout for a fresh level.
pub trait BoardGenerator {
    fn generate(self, config: &GameConfig) -> Result<Board>;
}
