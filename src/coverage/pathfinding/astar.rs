use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use std::collections::BinaryHeap;

use super::potential::PotentialField;
use super::types::{move_cost, step, State, MOVES, NO_HEADING, NO_PARENT};
use crate::coverage::grid::{Node, OccupancyGrid};
use crate::coverage::math::UNREACHABLE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum SearchFailure {
    /// Open set ran dry without reaching the goal.
    Exhausted,
    /// Gave up after `max_expansions` closed nodes.
    Budget,
}

/// 8-connected A* from `start` to `field.goal()`.
///
/// `turn_cost` (world units) is charged whenever a move changes heading
/// relative to the move that reached the current cell, which favours long
/// straight legs over staircases of equal length. The potential field is the
/// heuristic; cells it marks unreachable are never pushed.
///
/// Returns the cell sequence from `start` to the goal, inclusive.
pub(super) fn find_path(
    grid: &OccupancyGrid,
    start: Node,
    field: &PotentialField,
    turn_cost: f32,
    max_expansions: usize,
) -> Result<Vec<Node>, SearchFailure> {
    let goal = field.goal();
    let cells = grid.cell_count();
    let cell_size = grid.cell_size();

    let mut g_score = vec![UNREACHABLE; cells];
    let mut parent = vec![NO_PARENT; cells];
    let mut heading = vec![NO_HEADING; cells];
    let mut closed = FixedBitSet::with_capacity(cells);
    let mut open_set = BinaryHeap::new();

    let start_idx = grid.get_index(start);
    let goal_idx = grid.get_index(goal);
    g_score[start_idx] = 0.0;
    open_set.push(State {
        cost: field.at_index(start_idx),
        index: start_idx,
    });

    let mut expansions = 0usize;
    while let Some(State { index: current, .. }) = open_set.pop() {
        if closed.contains(current) {
            continue;
        }
        if current == goal_idx {
            return Ok(reconstruct(grid, &parent, current));
        }
        closed.insert(current);

        expansions += 1;
        if expansions > max_expansions {
            warn!(
                "[PATHFINDING] A* exceeded {} expansions from {:?} to {:?}",
                max_expansions, start, goal
            );
            return Err(SearchFailure::Budget);
        }

        let node = grid.node_at(current);
        let g = g_score[current];
        for (dir, &(dx, dy)) in MOVES.iter().enumerate() {
            let Some(next) = step(grid, node, dx, dy) else {
                continue;
            };
            let ni = grid.get_index(next);
            if closed.contains(ni) {
                continue;
            }
            let h = field.at_index(ni);
            if !h.is_finite() {
                continue;
            }

            let mut tentative = g + move_cost(dx, dy, cell_size);
            if heading[current] != NO_HEADING && heading[current] as usize != dir {
                tentative += turn_cost;
            }
            if tentative < g_score[ni] {
                g_score[ni] = tentative;
                parent[ni] = current;
                heading[ni] = dir as u8;
                open_set.push(State {
                    cost: tentative + h,
                    index: ni,
                });
            }
        }
    }

    Err(SearchFailure::Exhausted)
}

fn reconstruct(grid: &OccupancyGrid, parent: &[usize], mut current: usize) -> Vec<Node> {
    let mut cells = vec![grid.node_at(current)];
    while parent[current] != NO_PARENT {
        current = parent[current];
        cells.push(grid.node_at(current));
    }
    cells.reverse();
    cells
}
