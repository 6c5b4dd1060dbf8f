/// Priority assignment: distance matrix → primary/secondary/tertiary tiers.
///
/// Every tier runs the same claim → resolve → fallback pass (see
/// [`tiers`]), each layered on top of the tiers already decided this tick.
/// A target is held at most at one tier; an agent holds at most one target
/// per tier. Proximity is reported separately and ignores the tiers.
///
/// The caller threads [`PreviousAssignment`] from one tick to the next.
/// Nothing is kept in here between calls.

use bevy::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod invariants;
mod tiers;


pub use invariants::invariant_violations;

use self::tiers::{resolve_tier, TierContext};
use super::config::CoverageConfig;
use super::matrix::DistanceMatrix;
use super::roster::{Agent, AgentId, Target, TargetId};

/// `target → holding agent` for one tier.
pub type TierMap = BTreeMap<TargetId, AgentId>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Secondary,
    Tertiary,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Primary,
    Secondary,
    Tertiary,
}

impl Tier {
    pub fn role(self) -> Role {
        match self {
            Tier::Primary => Role::Primary,
            Tier::Secondary => Role::Secondary,
            Tier::Tertiary => Role::Tertiary,
        }
    }
}

/// One line of an agent's ranked target list.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityEntry {
    pub target_id: TargetId,
    pub distance: f32,
    /// 1 = nearest.
    pub rank: usize,
    pub role: Role,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentState {
    pub primary: TierMap,
    pub secondary: TierMap,
    pub tertiary: TierMap,
    /// Nearest agent per target, regardless of tiers.
    pub proximity: TierMap,
    pub agent_priorities: BTreeMap<AgentId, Vec<PriorityEntry>>,
}

impl AssignmentState {
    pub fn tier(&self, tier: Tier) -> &TierMap {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Secondary => &self.secondary,
            Tier::Tertiary => &self.tertiary,
        }
    }

    /// Tier at which `target` is held, if any.
    pub fn role_of(&self, target: TargetId) -> Role {
        [Tier::Primary, Tier::Secondary, Tier::Tertiary]
            .into_iter()
            .find(|&t| self.tier(t).contains_key(&target))
            .map_or(Role::None, Tier::role)
    }

    pub fn is_covered(&self, target: TargetId) -> bool {
        self.role_of(target) != Role::None
    }
}

/// Hysteresis input carried over from the last tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousAssignment {
    pub primary: TierMap,
    pub secondary: TierMap,
    #[serde(default)]
    pub tertiary: TierMap,
}

impl PreviousAssignment {
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty() && self.tertiary.is_empty()
    }

    pub fn clear(&mut self) {
        self.primary.clear();
        self.secondary.clear();
        self.tertiary.clear();
    }

    fn tier(&self, tier: Tier) -> &TierMap {
        match tier {
            Tier::Primary => &self.primary,
            Tier::Secondary => &self.secondary,
            Tier::Tertiary => &self.tertiary,
        }
    }
}

impl From<&AssignmentState> for PreviousAssignment {
    fn from(state: &AssignmentState) -> Self {
        Self {
            primary: state.primary.clone(),
            secondary: state.secondary.clone(),
            tertiary: state.tertiary.clone(),
        }
    }
}

/// Assignment knobs, usually taken from [`CoverageConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssignParams {
    /// `None` disables hysteresis (greedy).
    pub threshold: Option<f32>,
    pub tertiary_enabled: bool,
}

impl Default for AssignParams {
    fn default() -> Self {
        Self::from_config(&CoverageConfig::default())
    }
}

impl AssignParams {
    pub fn from_config(config: &CoverageConfig) -> Self {
        Self {
            threshold: config.effective_threshold(),
            tertiary_enabled: config.tertiary_enabled,
        }
    }
}

/// Compute this tick's tiers from `matrix`.
///
/// `agents` and `targets` fix the input order used for tie-breaking and
/// fallback; both should be the same lists the matrix was built from.
pub fn assign(
    agents: &[Agent],
    targets: &[Target],
    previous: &PreviousAssignment,
    matrix: &DistanceMatrix,
    params: &AssignParams,
) -> AssignmentState {
    let mut state = AssignmentState::default();
    if agents.is_empty() || targets.is_empty() {
        return state;
    }

    state.proximity = proximity(targets, matrix);

    let mut covered: FxHashSet<TargetId> = FxHashSet::default();
    let mut tiers = vec![Tier::Primary, Tier::Secondary];
    if params.tertiary_enabled {
        tiers.push(Tier::Tertiary);
    }
    for tier in tiers {
        let ctx = TierContext {
            tier,
            agents,
            targets,
            matrix,
            previous: previous.tier(tier),
            threshold: params.threshold,
        };
        let resolved = resolve_tier(&ctx, &covered);
        covered.extend(resolved.keys().copied());
        match tier {
            Tier::Primary => state.primary = resolved,
            Tier::Secondary => state.secondary = resolved,
            Tier::Tertiary => state.tertiary = resolved,
        }
    }

    state.agent_priorities = annotate(agents, matrix, &state);

    debug_assert!(
        invariant_violations(&state, matrix).is_empty(),
        "assignment invariants violated: {:?}",
        invariant_violations(&state, matrix)
    );
    debug!(
        "[ASSIGN] primary={} secondary={} tertiary={} of {} targets",
        state.primary.len(),
        state.secondary.len(),
        state.tertiary.len(),
        targets.len()
    );
    state
}

/// First finite entry of each target's column.
fn proximity(targets: &[Target], matrix: &DistanceMatrix) -> TierMap {
    targets
        .iter()
        .filter_map(|t| {
            let nearest = matrix.column(t.id).first()?;
            nearest.distance.is_finite().then(|| (t.id, nearest.id.clone()))
        })
        .collect()
}

fn annotate(agents: &[Agent], matrix: &DistanceMatrix, state: &AssignmentState) -> BTreeMap<AgentId, Vec<PriorityEntry>> {
    agents
        .iter()
        .map(|agent| {
            let entries = matrix
                .row(&agent.id)
                .iter()
                .enumerate()
                .map(|(i, ranked)| {
                    let role = [Tier::Primary, Tier::Secondary, Tier::Tertiary]
                        .into_iter()
                        .find(|&t| state.tier(t).get(&ranked.id) == Some(&agent.id))
                        .map_or(Role::None, Tier::role);
                    PriorityEntry {
                        target_id: ranked.id,
                        distance: ranked.distance,
                        rank: i + 1,
                        role,
                    }
                })
                .collect();
            (agent.id.clone(), entries)
        })
        .collect()
}
