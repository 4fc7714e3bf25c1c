use alloc::vec::Vec;

use super::*;

/// Seeded generation: a paired tile pool is shuffled uniformly (Fisher-Yates)
/// and dealt row-major over the interior cells; the border ring stays empty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RandomBoardGenerator {
    seed: u64,
}

impl RandomBoardGenerator {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(self, config: &GameConfig) -> Result<Board> {
        use rand::prelude::*;

        config.validate()?;

        let mut pool = build_pool(config);
        let mut rng = SmallRng::seed_from_u64(self.seed);
        pool.shuffle(&mut rng);

        let (rows, cols) = config.size;
        let mut board = Board::empty(config.size);
        let mut deal = pool.into_iter();
        for row in 1..rows - 1 {
            for col in 1..cols - 1 {
                let kind = deal.next().expect("pool covers the interior exactly");
                board.place((row, col), Cell::normal(kind));
            }
        }

        log::debug!(
            "generated {}x{} board with {} kinds, seed {}",
            rows,
            cols,
            config.kinds,
            self.seed
        );
        Ok(board)
    }
}

/// Tile multiset for the interior: one pair per entry, kinds dealt round-robin
/// so every kind count stays even.
fn build_pool(config: &GameConfig) -> Vec<TileKind> {
    let pairs = config.interior_cells() / 2;
    let mut pool = Vec::with_capacity(config.interior_cells() as usize);
    for pair in 0..pairs {
        let kind = TileKind((pair % config.kinds as CellCount) as u8);
        pool.push(kind);
        pool.push(kind);
    }
    pool
}
