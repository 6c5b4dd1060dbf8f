use bevy::prelude::*;

pub mod assignment;
pub mod config;
pub mod error;
pub mod grid;
pub mod math;
pub mod matrix;
pub mod pathfinding;
pub mod roster;
pub mod simulation;
pub mod tick;
pub mod walls;

use config::CoverageConfigPlugin;
use simulation::CoverageSimulationPlugin;

pub use assignment::{assign, AssignParams, AssignmentState, PreviousAssignment, PriorityEntry, Role, Tier, TierMap};
pub use config::{AssignmentAlgorithm, CoverageConfig};
pub use error::{CoverageError, CoverageResult};
pub use grid::{GridVersion, Node, OccupancyGrid};
pub use matrix::{DistanceMatrix, Ranked, Router};
pub use pathfinding::{Pathfinder, Route};
pub use roster::{Agent, AgentId, Roster, Target, TargetId};
pub use tick::{run_tick, TickOutput};
pub use walls::{rasterize, vectorize, DoorGap, RasterImage, WallLayout, WallSegment};

/// Config loading plus the fixed-step coverage host.
pub struct CoveragePlugin;

impl Plugin for CoveragePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((CoverageConfigPlugin, CoverageSimulationPlugin));
    }
}
