use std::cmp::Ordering;

use crate::coverage::grid::{Node, OccupancyGrid};
use crate::coverage::math::DIAGONAL_COST;

/// Heading of a node reached by no move yet (the search start).
pub(super) const NO_HEADING: u8 = u8::MAX;

/// Marker for "no parent" in flattened parent arrays.
pub(super) const NO_PARENT: usize = usize::MAX;

/// The eight grid moves: four cardinals first, then diagonals.
pub(super) const MOVES: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[inline]
pub(super) fn move_cost(dx: isize, dy: isize, cell_size: f32) -> f32 {
    if dx != 0 && dy != 0 {
        DIAGONAL_COST * cell_size
    } else {
        cell_size
    }
}

/// Target of a move from `from` by `(dx, dy)`, or `None` when the target is
/// blocked or the move would slip diagonally past a wall corner.
///
/// The rule is symmetric, so the same test serves the backward search that
/// builds goal potentials.
#[inline]
pub(super) fn step(grid: &OccupancyGrid, from: Node, dx: isize, dy: isize) -> Option<Node> {
    let (x, y) = (from.x as isize, from.y as isize);
    let (nx, ny) = (x + dx, y + dy);
    if grid.is_blocked_at(nx, ny) {
        return None;
    }
    if dx != 0 && dy != 0 && (grid.is_blocked_at(x + dx, y) || grid.is_blocked_at(x, y + dy)) {
        return None;
    }
    Some(Node::new(nx as usize, ny as usize))
}

/// Open-set entry. Ordered so `BinaryHeap` pops the lowest cost first,
/// with the cell index as a deterministic tie-break.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(super) struct State {
    pub cost: f32,
    pub index: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
