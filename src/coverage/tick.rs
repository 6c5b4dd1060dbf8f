use bevy::prelude::*;
use serde::Serialize;

use super::assignment::{assign, AssignParams, AssignmentState, PreviousAssignment};
use super::config::CoverageConfig;
use super::grid::OccupancyGrid;
use super::matrix::{DistanceMatrix, Router};
use super::pathfinding::Pathfinder;
use super::roster::{sanitize_agents, sanitize_targets, Roster, TargetId};

/// Everything one tick produces, in the shape handed to a renderer.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickOutput {
    #[serde(flatten)]
    pub assignment: AssignmentState,
    /// Active targets held at no tier, in input order.
    pub unassigned: Vec<TargetId>,
    pub matrix: DistanceMatrix,
}

/// One full recomputation: sanitize, drop stale targets, build the matrix
/// (routed when a grid is given), assign.
pub fn run_tick(
    roster: &Roster,
    previous: &PreviousAssignment,
    grid: Option<&OccupancyGrid>,
    pathfinder: &mut Pathfinder,
    config: &CoverageConfig,
) -> TickOutput {
    let agents = sanitize_agents(&roster.agents);
    let live = roster.active_targets(config.stale_target_ttl);
    let stale = roster.targets.len() - live.len();
    if stale > 0 {
        debug!("[TICK] Ignoring {} stale targets", stale);
    }
    let targets = sanitize_targets(&live);

    let router = grid.map(|grid| Router { grid, pathfinder });
    let matrix = DistanceMatrix::compute(&agents, &targets, router);
    let assignment = assign(&agents, &targets, previous, &matrix, &AssignParams::from_config(config));

    let unassigned = targets
        .iter()
        .map(|t| t.id)
        .filter(|&id| !assignment.is_covered(id))
        .collect();

    TickOutput {
        assignment,
        unassigned,
        matrix,
    }
}
