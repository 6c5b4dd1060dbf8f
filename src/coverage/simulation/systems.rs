use bevy::prelude::*;

use super::events::{FloorPlanUploaded, LayoutChanged};
use super::resources::{AssignmentHistory, CoverageState, CoverageTick, WallGrid};
use crate::coverage::assignment::PreviousAssignment;
use crate::coverage::config::CoverageConfig;
use crate::coverage::pathfinding::Pathfinder;
use crate::coverage::roster::Roster;
use crate::coverage::tick::run_tick;
use crate::coverage::walls::{vectorize, WallLayout};

// ============================================================================
// Startup
// ============================================================================

/// Build config-dependent resources once the config is loaded.
pub fn init_coverage_resources(mut commands: Commands, config: Res<CoverageConfig>) {
    commands.insert_resource(Pathfinder::from_config(&config));
    commands.insert_resource(AssignmentHistory::with_capacity(config.history_len));
    info!(
        "[COVERAGE] Ready: algorithm {:?}, threshold {}, cell size {}",
        config.algorithm, config.reassign_threshold, config.cell_size
    );
}

/// Rebuild search settings when the config resource is replaced or edited.
pub fn sync_config(
    mut config: ResMut<CoverageConfig>,
    mut pathfinder: ResMut<Pathfinder>,
    mut history: ResMut<AssignmentHistory>,
) {
    if !config.is_changed() || config.is_added() {
        return;
    }
    if let Err(e) = config.validate() {
        error!("[COVERAGE] Rejected config edit: {}", e);
        error!("[COVERAGE] Using default CoverageConfig");
        *config.bypass_change_detection() = CoverageConfig::default();
    }
    *pathfinder = Pathfinder::from_config(&config);
    history.set_capacity(config.history_len);
    info!("[COVERAGE] Config changed; search settings rebuilt");
}

// ============================================================================
// Walls
// ============================================================================

/// Swap in the newest layout from either source. An edit and an upload in
/// the same tick resolve to the upload.
pub fn apply_layout_messages(
    mut edits: MessageReader<LayoutChanged>,
    mut uploads: MessageReader<FloorPlanUploaded>,
    config: Res<CoverageConfig>,
    mut walls: ResMut<WallGrid>,
    mut state: ResMut<CoverageState>,
) {
    let edited = edits.read().last().map(|m| m.layout.clone());
    let uploaded = uploads
        .read()
        .last()
        .map(|m| vectorize(&m.image, config.map_width, config.map_height, config.cell_size, &config.vectorize));

    let Some(layout) = uploaded.or(edited) else {
        return;
    };
    install_layout(&mut walls, layout, &config);
    state.reset_hysteresis();
}

pub fn install_layout(walls: &mut WallGrid, layout: WallLayout, config: &CoverageConfig) {
    walls.grid = if layout.is_empty() {
        None
    } else {
        Some(layout.to_grid(config))
    };
    info!(
        "[COVERAGE] Layout replaced: {} walls, {} doors ({})",
        layout.walls.len(),
        layout.doors.len(),
        if walls.grid.is_some() { "routed" } else { "straight-line" }
    );
    walls.layout = layout;
}

// ============================================================================
// Tick
// ============================================================================

pub fn run_coverage_tick(
    mut tick: ResMut<CoverageTick>,
    roster: Res<Roster>,
    config: Res<CoverageConfig>,
    walls: Res<WallGrid>,
    mut pathfinder: ResMut<Pathfinder>,
    mut state: ResMut<CoverageState>,
) {
    let output = run_tick(&roster, &state.previous, walls.grid.as_ref(), &mut pathfinder, &config);
    tick.increment();

    if !output.unassigned.is_empty() {
        debug!("[COVERAGE] Tick {}: unassigned {:?}", tick.0, output.unassigned);
    }
    crate::profile_log!(
        tick,
        "[COVERAGE] Tick {} | agents {} | targets {} | cached potentials {}",
        tick.0,
        roster.agents.len(),
        roster.targets.len(),
        pathfinder.cache().len()
    );

    state.previous = PreviousAssignment::from(&output.assignment);
    state.latest = Some(output);
}

pub fn record_history(tick: Res<CoverageTick>, state: Res<CoverageState>, mut history: ResMut<AssignmentHistory>) {
    if let Some(latest) = &state.latest {
        history.push(tick.0, latest.assignment.primary.clone());
    }
}
