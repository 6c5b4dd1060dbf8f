/// Headless host for the coverage engine.
///
/// This module is organized into:
/// - **resources**: grid, latest output, tick counter, history
/// - **events**: layout edits and floor-plan uploads
/// - **systems**: layout swaps and the per-tick recomputation
///
/// Every `FixedUpdate` runs, in order: apply layout messages, sync config,
/// recompute the tick from the [`Roster`](crate::coverage::roster::Roster),
/// record history.

use bevy::prelude::*;

pub mod events;
pub mod resources;
pub mod systems;

pub use events::*;
pub use resources::*;

use crate::coverage::roster::Roster;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum CoverageSet {
    Layout,
    Tick,
    Record,
}

pub struct CoverageSimulationPlugin;

impl Plugin for CoverageSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(1.0 / 10.0));

        app.init_resource::<Roster>();
        app.init_resource::<WallGrid>();
        app.init_resource::<CoverageState>();
        app.init_resource::<CoverageTick>();

        app.add_message::<LayoutChanged>();
        app.add_message::<FloorPlanUploaded>();

        app.configure_sets(FixedUpdate, (CoverageSet::Layout, CoverageSet::Tick, CoverageSet::Record).chain());

        app.add_systems(Startup, systems::init_coverage_resources);
        app.add_systems(
            FixedUpdate,
            (
                (systems::sync_config, systems::apply_layout_messages)
                    .chain()
                    .in_set(CoverageSet::Layout),
                systems::run_coverage_tick.in_set(CoverageSet::Tick),
                systems::record_history.in_set(CoverageSet::Record),
            ),
        );
    }
}
