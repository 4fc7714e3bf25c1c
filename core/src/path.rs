use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;
use ndarray::Array2;

use crate::*;

/// Default bound on direction changes along a connecting path: at most a
/// three-segment orthogonal route.
pub const MAX_TURNS: u8 = 2;

#[derive(Copy, Clone, Debug, PartialEq)]
struct SearchNode {
    pos: Coord2,
    dir: Dir,
    turns: u8,
}

/// Back-pointer for path reconstruction; `dir` is `None` for states seeded
/// directly out of the start cell.
#[derive(Copy, Clone, Debug)]
struct ParentLink {
    pos: Coord2,
    dir: Option<Dir>,
}

/// Turn-bounded connectivity search over a board snapshot.
///
/// A search state is `(position, incoming direction)` with the turn counter
/// riding along. The turn counter is deliberately not part of the dedup key:
/// the first path found is shortest by steps, not necessarily minimal in
/// turns, which is all the match rule needs.
///
/// The struct only holds reusable search buffers; the board is borrowed per
/// call and never retained.
#[derive(Clone, Debug)]
pub struct PathFinder {
    max_turns: u8,
    parents: Array2<[Option<ParentLink>; 4]>,
    queue: VecDeque<SearchNode>,
}

impl PathFinder {
    pub fn new(size: Coord2) -> Self {
        Self::with_max_turns(size, MAX_TURNS)
    }

    pub fn with_max_turns(size: Coord2, max_turns: u8) -> Self {
        Self {
            max_turns,
            parents: Array2::default(size.to_nd_index()),
            queue: VecDeque::new(),
        }
    }

    /// Whether a path within the turn budget connects `a` to `b`. A malformed
    /// pair (same position, kind mismatch, unoccupied endpoint, out of bounds)
    /// is a defined "no", not an error.
    pub fn can_connect(&mut self, board: &Board, a: Coord2, b: Coord2) -> bool {
        self.run(board, a, b).is_some()
    }

    /// Ordered cell positions from `a` to `b` inclusive, each consecutive pair
    /// one orthogonal step apart; empty when unconnected.
    pub fn path(&mut self, board: &Board, a: Coord2, b: Coord2) -> Vec<Coord2> {
        match self.run(board, a, b) {
            Some(end) => self.rebuild(a, end),
            None => Vec::new(),
        }
    }

    /// Direction changes of the discovered path, `None` when unconnected.
    pub fn path_turns(&mut self, board: &Board, a: Coord2, b: Coord2) -> Option<u8> {
        self.run(board, a, b).map(|end| end.turns)
    }

    /// Whether any same-kind pair of normal tiles is still connectable; the
    /// negative answer is the deadlock condition.
    pub fn has_connectable_pair(&mut self, board: &Board) -> bool {
        self.first_connectable_pair(board).is_some()
    }

    /// First connectable same-kind pair in row-major enumeration order; backs
    /// the hint feature.
    pub fn first_connectable_pair(&mut self, board: &Board) -> Option<(Coord2, Coord2)> {
        let tiles: Vec<Coord2> = board.iter_normal().collect();
        for (i, &a) in tiles.iter().enumerate() {
            for &b in &tiles[i + 1..] {
                if board[a].kind != board[b].kind {
                    continue;
                }
                if self.run(board, a, b).is_some() {
                    return Some((a, b));
                }
            }
        }
        None
    }

    fn valid_pair(board: &Board, a: Coord2, b: Coord2) -> bool {
        if a == b || !board.in_bounds(a) || !board.in_bounds(b) {
            return false;
        }
        let (cell_a, cell_b) = (board[a], board[b]);
        cell_a.state.is_occupied() && cell_b.state.is_occupied() && cell_a.kind == cell_b.kind
    }

    fn run(&mut self, board: &Board, a: Coord2, b: Coord2) -> Option<SearchNode> {
        if !Self::valid_pair(board, a, b) {
            return None;
        }

        let bounds = board.size();
        self.reset(bounds);

        for dir in Dir::ALL {
            let Some(pos) = dir.step(a, bounds) else { continue };
            if !board.is_walkable(pos, b) {
                continue;
            }
            self.parents[pos.to_nd_index()][dir.index()] = Some(ParentLink { pos: a, dir: None });
            self.queue.push_back(SearchNode { pos, dir, turns: 0 });
        }

        while let Some(cur) = self.queue.pop_front() {
            if cur.pos == b {
                log::trace!("connected {:?} -> {:?} in {} turns", a, b, cur.turns);
                return Some(cur);
            }

            for dir in Dir::ALL {
                let turns = if dir == cur.dir {
                    cur.turns
                } else {
                    cur.turns.saturating_add(1)
                };
                if turns > self.max_turns {
                    continue;
                }

                let Some(pos) = dir.step(cur.pos, bounds) else { continue };
                if self.parents[pos.to_nd_index()][dir.index()].is_some() {
                    continue;
                }
                if !board.is_walkable(pos, b) {
                    continue;
                }

                self.parents[pos.to_nd_index()][dir.index()] = Some(ParentLink {
                    pos: cur.pos,
                    dir: Some(cur.dir),
                });
                self.queue.push_back(SearchNode { pos, dir, turns });
            }
        }

        None
    }

    /// Clears the search buffers, reallocating only when the board shape
    /// changed since the previous query.
    fn reset(&mut self, size: Coord2) {
        if self.parents.dim() != (size.0 as usize, size.1 as usize) {
            self.parents = Array2::default(size.to_nd_index());
        } else {
            self.parents.fill([None; 4]);
        }
        self.queue.clear();
    }

    fn rebuild(&self, a: Coord2, end: SearchNode) -> Vec<Coord2> {
        let mut path = vec![end.pos];
        let (mut pos, mut dir) = (end.pos, end.dir);
        loop {
            let link = self.parents[pos.to_nd_index()][dir.index()]
                .expect("every dequeued state has a parent");
            match link.dir {
                Some(prev) => {
                    path.push(link.pos);
                    pos = link.pos;
                    dir = prev;
                }
                None => break,
            }
        }
        path.push(a);
        path.reverse();
        path
    }
}
