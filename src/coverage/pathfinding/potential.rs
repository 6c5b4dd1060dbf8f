use bevy::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

use super::types::{move_cost, step, State, MOVES};
use crate::coverage::grid::{GridVersion, Node, OccupancyGrid};
use crate::coverage::math::UNREACHABLE;

/// Exact cost-to-goal for every cell of one grid, in world units.
///
/// Built by a backward Dijkstra from the goal over the same move set the
/// forward search uses, so it is both an admissible A* heuristic and a
/// reachability oracle: an infinite value means no route exists.
#[derive(Clone, Debug)]
pub struct PotentialField {
    goal: Node,
    width: usize,
    cost: Vec<f32>,
}

impl PotentialField {
    pub fn build(grid: &OccupancyGrid, goal: Node) -> Self {
        let mut cost = vec![UNREACHABLE; grid.cell_count()];
        if !grid.is_blocked(goal) {
            let cell_size = grid.cell_size();
            let mut heap = BinaryHeap::new();
            let goal_idx = grid.get_index(goal);
            cost[goal_idx] = 0.0;
            heap.push(State { cost: 0.0, index: goal_idx });

            while let Some(State { cost: c, index }) = heap.pop() {
                if c > cost[index] {
                    continue;
                }
                let node = grid.node_at(index);
                for &(dx, dy) in &MOVES {
                    let Some(next) = step(grid, node, dx, dy) else {
                        continue;
                    };
                    let ni = grid.get_index(next);
                    let candidate = c + move_cost(dx, dy, cell_size);
                    if candidate < cost[ni] {
                        cost[ni] = candidate;
                        heap.push(State { cost: candidate, index: ni });
                    }
                }
            }
        }

        Self {
            goal,
            width: grid.width(),
            cost,
        }
    }

    pub fn goal(&self) -> Node {
        self.goal
    }

    #[inline]
    pub fn at(&self, node: Node) -> f32 {
        self.cost
            .get(node.y * self.width + node.x)
            .copied()
            .unwrap_or(UNREACHABLE)
    }

    #[inline]
    pub(super) fn at_index(&self, index: usize) -> f32 {
        self.cost.get(index).copied().unwrap_or(UNREACHABLE)
    }
}

/// Potential fields keyed by `(grid version, goal cell)`.
///
/// Only fields for the most recent grid version are kept; inserting a field
/// for a newer version drops everything older. Within one version the oldest
/// entry is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct PotentialFieldCache {
    entries: FxHashMap<(GridVersion, Node), Arc<PotentialField>>,
    order: VecDeque<(GridVersion, Node)>,
    capacity: usize,
    current: Option<GridVersion>,
    hits: u64,
    misses: u64,
}

impl PotentialFieldCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            current: None,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_build(&mut self, grid: &OccupancyGrid, goal: Node) -> Arc<PotentialField> {
        let key = (grid.version(), goal);
        if let Some(field) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(field);
        }
        self.misses += 1;

        if self.current != Some(grid.version()) {
            if !self.entries.is_empty() {
                debug!(
                    "[PATHFINDING] Grid version {:?} -> {:?}: dropping {} cached potentials",
                    self.current,
                    grid.version(),
                    self.entries.len()
                );
            }
            self.entries.clear();
            self.order.clear();
            self.current = Some(grid.version());
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(old) => {
                    self.entries.remove(&old);
                }
                None => break,
            }
        }

        let field = Arc::new(PotentialField::build(grid, goal));
        self.entries.insert(key, Arc::clone(&field));
        self.order.push_back(key);
        field
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.current = None;
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
