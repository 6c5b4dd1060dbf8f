use rustc_hash::FxHashSet;

use super::{AssignmentState, Tier};
use crate::coverage::matrix::DistanceMatrix;

/// Every broken invariant of `state` against the matrix it came from, as
/// human-readable lines. Empty means consistent.
pub fn invariant_violations(state: &AssignmentState, matrix: &DistanceMatrix) -> Vec<String> {
    let mut out = Vec::new();

    if !matrix.is_sorted() {
        out.push("distance matrix row out of order".to_string());
    }

    let mut seen_targets = FxHashSet::default();
    for tier in [Tier::Primary, Tier::Secondary, Tier::Tertiary] {
        let mut holders = FxHashSet::default();
        for (target, agent) in state.tier(tier) {
            if !seen_targets.insert(*target) {
                out.push(format!("target {target} held at more than one tier"));
            }
            if !holders.insert(agent) {
                out.push(format!("agent {agent} holds two {tier:?} targets"));
            }
            if !matrix.distance(agent, *target).is_finite() {
                out.push(format!("{tier:?} pair {agent} -> {target} is unreachable"));
            }
        }
    }

    for (target, agent) in &state.proximity {
        match matrix.column(*target).first() {
            Some(nearest) if &nearest.id == agent => {}
            _ => out.push(format!("proximity for {target} is not the nearest agent")),
        }
    }

    out
}
