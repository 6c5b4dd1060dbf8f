/// Wall-aware shortest paths over an [`OccupancyGrid`].
///
/// A query runs in four stages:
/// 1. world points → cells, snapping blocked endpoints to the nearest open cell
/// 2. goal potential (cached per grid version and goal cell)
/// 3. A* with the potential as heuristic
/// 4. line-of-sight collapse or collinear simplification of the cell path
///
/// The turn penalty makes A* prefer straight legs; with a non-zero penalty the
/// result is close to, but not guaranteed to be, the strict shortest path.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

mod astar;
mod line_of_sight;
mod potential;
mod types;


pub use line_of_sight::{has_line_of_sight, simplify_collinear};
pub use potential::{PotentialField, PotentialFieldCache};

use self::astar::{find_path, SearchFailure};
use super::config::CoverageConfig;
use super::grid::OccupancyGrid;
use super::math::{euclidean, is_finite_point, polyline_length, UNREACHABLE};

/// Result of one shortest-path query.
///
/// An unreachable pair has `distance == f32::INFINITY` and an empty path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance: f32,
    pub path: Vec<Vec2>,
}

impl Route {
    pub fn unreachable() -> Self {
        Self {
            distance: UNREACHABLE,
            path: Vec::new(),
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.distance.is_finite()
    }
}

/// Search settings plus the potential-field cache.
///
/// The only state carried between queries is the cache, and it is keyed by
/// grid version, so one `Pathfinder` can serve any number of grids.
#[derive(Resource, Debug)]
pub struct Pathfinder {
    cache: PotentialFieldCache,
    /// Fraction of a cell added per heading change.
    pub turn_penalty: f32,
    pub snap_radius: usize,
    pub max_expansions: usize,
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::from_config(&CoverageConfig::default())
    }
}

impl Pathfinder {
    pub fn from_config(config: &CoverageConfig) -> Self {
        Self {
            cache: PotentialFieldCache::new(config.potential_cache_capacity),
            turn_penalty: config.turn_penalty.max(0.0),
            snap_radius: config.snap_radius,
            max_expansions: config.max_expansions,
        }
    }

    pub fn cache(&self) -> &PotentialFieldCache {
        &self.cache
    }

    pub fn shortest_path(&mut self, grid: &OccupancyGrid, from: Vec2, to: Vec2) -> Route {
        if !is_finite_point(from) || !is_finite_point(to) {
            warn!("[PATHFINDING] Non-finite endpoint {:?} -> {:?}", from, to);
            return Route::unreachable();
        }

        let Some(start) = grid.snap_to_open(grid.world_to_grid(from), from, self.snap_radius) else {
            debug!("[PATHFINDING] No open cell within {} of start {:?}", self.snap_radius, from);
            return Route::unreachable();
        };
        let Some(goal) = grid.snap_to_open(grid.world_to_grid(to), to, self.snap_radius) else {
            debug!("[PATHFINDING] No open cell within {} of goal {:?}", self.snap_radius, to);
            return Route::unreachable();
        };

        if start == goal {
            return Route {
                distance: euclidean(from, to),
                path: vec![from, to],
            };
        }

        let field = self.cache.get_or_build(grid, goal);
        if !field.at(start).is_finite() {
            return Route::unreachable();
        }

        let turn_cost = self.turn_penalty * grid.cell_size();
        let cells = match find_path(grid, start, &field, turn_cost, self.max_expansions) {
            Ok(cells) => cells,
            Err(SearchFailure::Budget) => return Route::unreachable(),
            Err(SearchFailure::Exhausted) => {
                // The potential said reachable; this only happens if the two
                // move rules ever drift apart.
                error!("[PATHFINDING] A* exhausted between {:?} and {:?} despite finite potential", start, goal);
                return Route::unreachable();
            }
        };

        if has_line_of_sight(grid, start, goal) {
            return Route {
                distance: euclidean(from, to),
                path: vec![from, to],
            };
        }

        let centers: Vec<Vec2> = cells.iter().map(|&c| grid.grid_to_world(c)).collect();
        let mut path = simplify_collinear(&centers);
        if let Some(first) = path.first_mut() {
            *first = from;
        }
        if let Some(last) = path.last_mut() {
            *last = to;
        }
        Route {
            distance: polyline_length(&path),
            path,
        }
    }
}
