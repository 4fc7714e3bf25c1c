use alloc::vec::Vec;
use core::time::Duration;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// How many random reshuffles are attempted on a deadlocked board before the
/// engine gives up and regenerates a whole fresh layout.
pub const MAX_RESHUFFLE_ATTEMPTS: usize = 16;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineState {
    Ready,
    Active,
    Cleared,
}

impl EngineState {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub const fn is_cleared(self) -> bool {
        matches!(self, Self::Cleared)
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::Ready
    }
}

/// Re-entrancy interlock: a confirmed match waits out its path-display delay
/// before the tiles actually leave the board.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Phase {
    Idle,
    Resolving { since: Duration, pair: (Coord2, Coord2) },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SelectOutcome {
    /// Out of bounds, not a normal tile, mid-resolution, or game over.
    Ignored,
    Selected,
    Deselected,
    Mismatch,
    Matched { score: u32, turns: u8 },
}

impl SelectOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum UpdateOutcome {
    NoChange,
    /// The resolving pair left the board and play continues.
    Removed,
    /// The resolving pair left the board and it is now empty.
    Cleared,
    /// Removal left no connectable pair; the remaining kinds were reshuffled.
    Reshuffled,
}

impl UpdateOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Owns the board for one level and serializes everything that happens when
/// the player clicks a tile: the selection protocol, match resolution,
/// scoring, and deadlock recovery.
///
/// The engine never reads a clock; callers pass `now` (any monotonic duration
/// since an arbitrary epoch) into [`select_tile`](Self::select_tile) and
/// [`update`](Self::update).
#[derive(Clone, Debug)]
pub struct BoardEngine {
    config: GameConfig,
    board: Board,
    finder: PathFinder,
    selected: Option<Coord2>,
    phase: Phase,
    state: EngineState,
    score: u32,
    combo: u32,
    last_match_at: Option<Duration>,
    events: Vec<BoardEvent>,
    rng: SmallRng,
}

impl BoardEngine {
    pub fn new(config: GameConfig, seed: u64) -> Result<Self> {
        let board = RandomBoardGenerator::new(seed).generate(&config)?;
        Self::with_board(config, board, seed)
    }

    /// Starts from an explicit layout (engineered boards in tests, restored
    /// saves). The layout must match the configured shape and satisfy the
    /// border and pair-parity invariants.
    pub fn with_board(config: GameConfig, board: Board, seed: u64) -> Result<Self> {
        config.validate()?;
        if board.size() != config.size {
            return Err(GameError::InvalidBoardShape);
        }
        board.validate()?;

        Ok(Self {
            finder: PathFinder::with_max_turns(config.size, config.max_turns),
            board,
            config,
            selected: None,
            phase: Phase::Idle,
            state: EngineState::Ready,
            score: 0,
            combo: 0,
            last_match_at: None,
            events: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn selected(&self) -> Option<Coord2> {
        self.selected
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.phase, Phase::Resolving { .. })
    }

    /// Drains the queued notifications in emission order.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        core::mem::take(&mut self.events)
    }

    /// The sole mutating entry point for player input. Illegal input is a
    /// silent no-op reported as [`SelectOutcome::Ignored`].
    pub fn select_tile(&mut self, coords: Coord2, now: Duration) -> SelectOutcome {
        use SelectOutcome::*;

        if self.state.is_cleared() || self.is_resolving() || !self.board.in_bounds(coords) {
            return Ignored;
        }

        match self.selected {
            None => {
                if !self.board[coords].is_normal() {
                    return Ignored;
                }
                self.board.set_state(coords, CellState::Selected);
                self.selected = Some(coords);
                self.mark_started();
                self.events.push(BoardEvent::SelectionStarted { at: coords });
                Selected
            }
            // selecting the first tile again is a cancel
            Some(first) if first == coords => {
                self.board.set_state(coords, CellState::Normal);
                self.selected = None;
                Deselected
            }
            Some(first) => {
                if !self.board[coords].is_normal() {
                    return Ignored;
                }
                self.selected = None;

                // handles both mismatch reasons: different kinds and no path
                match self.finder.path_turns(&self.board, first, coords) {
                    Some(turns) => {
                        let score = self.match_score(turns, now);
                        self.score += score;
                        self.last_match_at = Some(now);
                        self.board.set_state(coords, CellState::Selected);
                        self.phase = Phase::Resolving {
                            since: now,
                            pair: (first, coords),
                        };
                        log::debug!(
                            "match {:?} / {:?}: {} turns, +{} score",
                            first,
                            coords,
                            turns,
                            score
                        );
                        self.events.push(BoardEvent::MatchResolved {
                            pair: (first, coords),
                            score,
                            turns,
                        });
                        Matched { score, turns }
                    }
                    None => {
                        self.board.set_state(first, CellState::Normal);
                        self.combo = 0;
                        self.events.push(BoardEvent::MismatchResolved {
                            pair: (first, coords),
                        });
                        Mismatch
                    }
                }
            }
        }
    }

    /// Cooperative tick: once the resolve delay has elapsed, removes the
    /// matched pair, then checks victory and deadlock. `SelectTile` stays
    /// rejected until this runs to completion.
    pub fn update(&mut self, now: Duration) -> UpdateOutcome {
        use UpdateOutcome::*;

        let Phase::Resolving { since, pair } = self.phase else {
            return NoChange;
        };
        if now
            .checked_sub(since)
            .is_none_or(|waited| waited < self.config.resolve_delay)
        {
            return NoChange;
        }

        self.phase = Phase::Idle;
        self.board.set_state(pair.0, CellState::Empty);
        self.board.set_state(pair.1, CellState::Empty);
        log::debug!("removed pair {:?} / {:?}", pair.0, pair.1);

        if self.board.is_cleared() {
            self.state = EngineState::Cleared;
            self.events.push(BoardEvent::BoardCleared { score: self.score });
            return Cleared;
        }

        if !self.finder.has_connectable_pair(&self.board) {
            self.reshuffle();
            return Reshuffled;
        }

        Removed
    }

    /// Whether any legal match remains; the negative answer is a deadlock.
    pub fn has_connectable_pair(&mut self) -> bool {
        self.finder.has_connectable_pair(&self.board)
    }

    /// First connectable pair in scan order, for hint collaborators; does not
    /// mutate the grid.
    pub fn hint_pair(&mut self) -> Option<(Coord2, Coord2)> {
        self.finder.first_connectable_pair(&self.board)
    }

    /// Path geometry between two cells for presentation collaborators.
    pub fn path_between(&mut self, a: Coord2, b: Coord2) -> Vec<Coord2> {
        self.finder.path(&self.board, a, b)
    }

    /// Rebuilds the board for a new level. The cumulative score is kept; the
    /// selection, combo, and timing state start over.
    pub fn reset(&mut self, seed: u64) -> Result<()> {
        self.board = RandomBoardGenerator::new(seed).generate(&self.config)?;
        self.rng = SmallRng::seed_from_u64(seed);
        self.selected = None;
        self.phase = Phase::Idle;
        self.state = EngineState::Ready;
        self.combo = 0;
        self.last_match_at = None;
        self.events.clear();
        Ok(())
    }

    fn mark_started(&mut self) {
        if self.state.is_ready() {
            self.state = EngineState::Active;
        }
    }

    /// Base score rises with path turns; consecutive matches add a flat combo
    /// bonus and a quick follow-up match earns an extra one.
    fn match_score(&mut self, turns: u8, now: Duration) -> u32 {
        let scoring = self.config.scoring;
        let mut score = scoring.base + scoring.per_turn * turns as u32;

        self.combo += 1;
        if self.combo > 1 {
            score += (self.combo - 1) * scoring.combo_bonus;
        }

        if let Some(last) = self.last_match_at {
            if now
                .checked_sub(last)
                .is_some_and(|gap| gap < scoring.quick_window)
            {
                score += scoring.quick_bonus;
            }
        }

        score
    }

    /// Redistributes the remaining kinds over their current positions until the
    /// board is solvable again, regenerating a fresh layout as a last resort.
    fn reshuffle(&mut self) {
        self.combo = 0;

        let tiles: Vec<Coord2> = self.board.iter_normal().collect();
        let mut kinds: Vec<TileKind> = tiles.iter().map(|&pos| self.board[pos].kind).collect();

        for attempt in 0..MAX_RESHUFFLE_ATTEMPTS {
            kinds.shuffle(&mut self.rng);
            for (&pos, &kind) in tiles.iter().zip(kinds.iter()) {
                self.board.set_kind(pos, kind);
            }

            if self.finder.has_connectable_pair(&self.board) {
                log::debug!("deadlock reshuffle succeeded on attempt {}", attempt + 1);
                self.events
                    .push(BoardEvent::DeadlockReshuffled { regenerated: false });
                return;
            }
        }

        log::warn!(
            "board still deadlocked after {} reshuffles, regenerating",
            MAX_RESHUFFLE_ATTEMPTS
        );
        let seed = self.rng.random();
        self.board = RandomBoardGenerator::new(seed)
            .generate(&self.config)
            .expect("config was validated at construction");
        self.events
            .push(BoardEvent::DeadlockReshuffled { regenerated: true });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    const T0: Duration = Duration::ZERO;

    fn layout(size: Coord2, tiles: &[(Coord2, u8)]) -> Board {
        let mut cells = Array2::from_elem(size.to_nd_index(), Cell::EMPTY);
        for &(pos, kind) in tiles {
            cells[pos.to_nd_index()] = Cell::normal(TileKind(kind));
        }
        Board::from_cells(cells).unwrap()
    }

    fn engine(tiles: &[(Coord2, u8)]) -> BoardEngine {
        let config = GameConfig::new((6, 6), 4).unwrap();
        BoardEngine::with_board(config, layout((6, 6), tiles), 7).unwrap()
    }

    fn resolve(engine: &mut BoardEngine, now: Duration) -> UpdateOutcome {
        engine.update(now + engine.config().resolve_delay)
    }

    #[test]
    fn straight_match_removes_both_tiles() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0), ((3, 1), 1), ((3, 4), 1)]);

        assert_eq!(engine.select_tile((1, 1), T0), SelectOutcome::Selected);
        assert_eq!(engine.state(), EngineState::Active);

        let outcome = engine.select_tile((1, 4), T0);
        assert_eq!(outcome, SelectOutcome::Matched { score: 100, turns: 0 });
        assert!(engine.is_resolving());

        assert_eq!(resolve(&mut engine, T0), UpdateOutcome::Removed);
        assert!(engine.board()[(1, 1)].is_empty());
        assert!(engine.board()[(1, 4)].is_empty());
        assert_eq!(engine.score(), 100);
    }

    #[test]
    fn mismatch_reverts_both_tiles() {
        let mut engine = engine(&[((1, 1), 0), ((1, 2), 1), ((4, 1), 0), ((4, 2), 1)]);

        engine.select_tile((1, 1), T0);
        assert_eq!(engine.select_tile((1, 2), T0), SelectOutcome::Mismatch);

        assert!(engine.board()[(1, 1)].is_normal());
        assert!(engine.board()[(1, 2)].is_normal());
        assert_eq!(engine.selected(), None);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.combo(), 0);
    }

    #[test]
    fn unreachable_same_kind_pair_is_a_mismatch() {
        // same kind, but the second tile is boxed in on all four sides
        let mut engine = engine(&[
            ((1, 1), 0),
            ((3, 3), 0),
            ((2, 3), 1),
            ((4, 3), 1),
            ((3, 2), 2),
            ((3, 4), 2),
        ]);

        engine.select_tile((1, 1), T0);
        assert_eq!(engine.select_tile((3, 3), T0), SelectOutcome::Mismatch);
        assert!(engine.board()[(1, 1)].is_normal());
    }

    #[test]
    fn reselecting_the_first_tile_cancels() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0)]);

        assert_eq!(engine.select_tile((1, 1), T0), SelectOutcome::Selected);
        assert_eq!(engine.select_tile((1, 1), T0), SelectOutcome::Deselected);

        assert!(engine.board()[(1, 1)].is_normal());
        assert_eq!(engine.selected(), None);

        // the protocol is back at its initial state
        assert_eq!(engine.select_tile((1, 1), T0), SelectOutcome::Selected);
    }

    #[test]
    fn illegal_selections_are_ignored() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0)]);

        assert_eq!(engine.select_tile((9, 9), T0), SelectOutcome::Ignored);
        assert_eq!(engine.select_tile((0, 0), T0), SelectOutcome::Ignored);
        assert_eq!(engine.select_tile((2, 2), T0), SelectOutcome::Ignored);
        assert_eq!(engine.state(), EngineState::Ready);
    }

    #[test]
    fn input_is_rejected_while_resolving() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0), ((3, 1), 1), ((3, 4), 1)]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 4), T0);
        assert_eq!(engine.select_tile((3, 1), T0), SelectOutcome::Ignored);

        // before the delay elapses nothing moves
        assert_eq!(engine.update(Duration::from_millis(300)), UpdateOutcome::NoChange);
        assert!(engine.board()[(1, 1)].state.is_occupied());

        assert_eq!(resolve(&mut engine, T0), UpdateOutcome::Removed);
        assert_eq!(engine.select_tile((3, 1), T0), SelectOutcome::Selected);
    }

    #[test]
    fn clearing_the_board_wins_once() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0)]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 4), T0);
        assert_eq!(resolve(&mut engine, T0), UpdateOutcome::Cleared);

        assert_eq!(engine.state(), EngineState::Cleared);
        assert!(engine.board().is_cleared());

        let events = engine.take_events();
        let wins = events
            .iter()
            .filter(|event| matches!(event, BoardEvent::BoardCleared { .. }))
            .count();
        assert_eq!(wins, 1);

        // terminal: no further input, no further updates
        assert_eq!(engine.select_tile((1, 1), T0), SelectOutcome::Ignored);
        assert_eq!(resolve(&mut engine, T0), UpdateOutcome::NoChange);
    }

    #[test]
    fn combo_and_quick_match_raise_the_score() {
        let mut engine = engine(&[((1, 1), 0), ((1, 2), 0), ((3, 1), 1), ((3, 2), 1)]);

        engine.select_tile((1, 1), T0);
        assert_eq!(
            engine.select_tile((1, 2), T0),
            SelectOutcome::Matched { score: 100, turns: 0 }
        );
        let after_first = resolve(&mut engine, T0);
        assert_eq!(after_first, UpdateOutcome::Removed);

        // second match two seconds later: combo 2 (+25) and quick match (+50)
        let t1 = Duration::from_secs(2);
        engine.select_tile((3, 1), t1);
        assert_eq!(
            engine.select_tile((3, 2), t1),
            SelectOutcome::Matched { score: 175, turns: 0 }
        );
        assert_eq!(engine.combo(), 2);
        assert_eq!(engine.score(), 275);
    }

    #[test]
    fn slow_follow_up_match_earns_no_quick_bonus() {
        let mut engine = engine(&[((1, 1), 0), ((1, 2), 0), ((3, 1), 1), ((3, 2), 1)]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 2), T0);
        resolve(&mut engine, T0);

        let t1 = Duration::from_secs(10);
        engine.select_tile((3, 1), t1);
        assert_eq!(
            engine.select_tile((3, 2), t1),
            SelectOutcome::Matched { score: 125, turns: 0 }
        );
    }

    #[test]
    fn mismatch_resets_the_combo() {
        let mut engine = engine(&[
            ((1, 1), 0),
            ((1, 2), 0),
            ((3, 1), 1),
            ((3, 2), 1),
            ((4, 1), 2),
            ((4, 4), 3),
            ((2, 4), 2),
            ((1, 4), 3),
        ]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 2), T0);
        resolve(&mut engine, T0);
        assert_eq!(engine.combo(), 1);

        let t1 = Duration::from_secs(1);
        engine.select_tile((3, 1), t1);
        engine.select_tile((4, 1), t1); // different kinds
        assert_eq!(engine.combo(), 0);

        // next match scores as a fresh combo, quick bonus still applies
        engine.select_tile((3, 1), t1);
        assert_eq!(
            engine.select_tile((3, 2), t1),
            SelectOutcome::Matched { score: 150, turns: 0 }
        );
    }

    #[test]
    fn deadlock_after_removal_triggers_reshuffle() {
        // removing the kind-2 pair leaves the 2x2 pinwheel, which has no
        // connectable pair until its kinds are redistributed
        let mut engine = engine(&[
            ((1, 1), 0),
            ((2, 2), 0),
            ((1, 2), 1),
            ((2, 1), 1),
            ((4, 1), 2),
            ((4, 4), 2),
        ]);

        engine.select_tile((4, 1), T0);
        assert!(matches!(
            engine.select_tile((4, 4), T0),
            SelectOutcome::Matched { .. }
        ));
        assert_eq!(resolve(&mut engine, T0), UpdateOutcome::Reshuffled);

        // occupancy is untouched, only kinds moved, and the board is solvable
        let remaining: Vec<Coord2> = engine.board().iter_normal().collect();
        assert_eq!(remaining, [(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert!(engine.has_connectable_pair());
        assert_eq!(engine.combo(), 0);

        let events = engine.take_events();
        assert!(events
            .iter()
            .any(|event| matches!(event, BoardEvent::DeadlockReshuffled { .. })));
    }

    #[test]
    fn reshuffle_preserves_the_kind_multiset() {
        let mut engine = engine(&[
            ((1, 1), 0),
            ((2, 2), 0),
            ((1, 2), 1),
            ((2, 1), 1),
            ((4, 1), 2),
            ((4, 4), 2),
        ]);

        engine.select_tile((4, 1), T0);
        engine.select_tile((4, 4), T0);
        resolve(&mut engine, T0);

        let mut counts = [0u16; 256];
        for pos in engine.board().iter_normal().collect::<Vec<_>>() {
            counts[engine.board()[pos].kind.0 as usize] += 1;
        }
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 2);
    }

    #[test]
    fn events_are_emitted_in_order_and_drained() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0)]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 4), T0);
        resolve(&mut engine, T0);

        let events = engine.take_events();
        assert!(matches!(events[0], BoardEvent::SelectionStarted { at: (1, 1) }));
        assert!(matches!(
            events[1],
            BoardEvent::MatchResolved { turns: 0, score: 100, .. }
        ));
        assert!(matches!(events[2], BoardEvent::BoardCleared { score: 100 }));
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn reset_builds_a_fresh_level_and_keeps_the_score() {
        let mut engine = engine(&[((1, 1), 0), ((1, 4), 0)]);

        engine.select_tile((1, 1), T0);
        engine.select_tile((1, 4), T0);
        resolve(&mut engine, T0);
        assert_eq!(engine.state(), EngineState::Cleared);

        engine.reset(21).unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.score(), 100);
        assert_eq!(engine.combo(), 0);
        assert_eq!(
            engine.board().remaining_tiles(),
            engine.config().interior_cells()
        );
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn with_board_rejects_shape_mismatch() {
        let config = GameConfig::new((6, 6), 4).unwrap();
        let board = layout((6, 8), &[((1, 1), 0), ((1, 2), 0)]);

        assert_eq!(
            BoardEngine::with_board(config, board, 0).err(),
            Some(GameError::InvalidBoardShape)
        );
    }
}
