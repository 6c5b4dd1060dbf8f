use bevy::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::{Tier, TierMap};
use crate::coverage::matrix::DistanceMatrix;
use crate::coverage::roster::{Agent, AgentId, Target, TargetId};

pub(super) struct TierContext<'a> {
    pub tier: Tier,
    pub agents: &'a [Agent],
    pub targets: &'a [Target],
    pub matrix: &'a DistanceMatrix,
    pub previous: &'a TierMap,
    pub threshold: Option<f32>,
}

struct Claim {
    agent: usize,
    distance: f32,
}

/// Resolve one tier.
///
/// 1. **Claims:** every agent names the first reachable target in its row
///    that no earlier tier covers. Among equally near targets the higher
///    confidence is named first.
/// 2. **Resolve:** per target (input order) the nearest claimant still free
///    at this tier wins, ties going to input order. Hysteresis may keep the
///    previous holder instead.
/// 3. **Fallback:** targets still uncovered (input order) go to the nearest
///    reachable agent still free at this tier, with the same hysteresis.
pub(super) fn resolve_tier(ctx: &TierContext<'_>, covered: &FxHashSet<TargetId>) -> TierMap {
    let agent_index: FxHashMap<&AgentId, usize> = ctx.agents.iter().enumerate().map(|(i, a)| (&a.id, i)).collect();

    let confidences: FxHashMap<TargetId, f32> = ctx.targets.iter().map(|t| (t.id, t.confidence)).collect();
    let confidence = |id: TargetId| confidences.get(&id).copied().unwrap_or(0.0);

    let mut claims: FxHashMap<TargetId, SmallVec<[Claim; 4]>> = FxHashMap::default();
    for (i, agent) in ctx.agents.iter().enumerate() {
        let mut open = ctx
            .matrix
            .row(&agent.id)
            .iter()
            .filter(|r| r.distance.is_finite() && !covered.contains(&r.id));
        // Equally near targets: the more confident sighting, then row order.
        let first_open = open.next().map(|first| {
            open.take_while(|r| r.distance == first.distance)
                .fold(first, |best, r| if confidence(r.id) > confidence(best.id) { r } else { best })
        });
        if let Some(r) = first_open {
            claims.entry(r.id).or_default().push(Claim {
                agent: i,
                distance: r.distance,
            });
        }
    }

    let mut holding = vec![false; ctx.agents.len()];
    let mut resolved = TierMap::new();

    for target in ctx.targets {
        let Some(claimants) = claims.get_mut(&target.id) else {
            continue;
        };
        claimants.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.agent.cmp(&b.agent)));
        let Some(winner) = claimants.iter().find(|c| !holding[c.agent]) else {
            continue;
        };
        let chosen = apply_hysteresis(ctx, &agent_index, &holding, target.id, winner.agent, winner.distance);
        holding[chosen] = true;
        resolved.insert(target.id, ctx.agents[chosen].id.clone());
    }

    for target in ctx.targets {
        if covered.contains(&target.id) || resolved.contains_key(&target.id) {
            continue;
        }
        let nearest_free = ctx.matrix.column(target.id).iter().find_map(|r| {
            let i = *agent_index.get(&r.id)?;
            (r.distance.is_finite() && !holding[i]).then_some((i, r.distance))
        });
        let Some((winner, distance)) = nearest_free else {
            continue;
        };
        let chosen = apply_hysteresis(ctx, &agent_index, &holding, target.id, winner, distance);
        holding[chosen] = true;
        resolved.insert(target.id, ctx.agents[chosen].id.clone());
    }

    resolved
}

/// Keep the previous holder when switching would gain no more than the
/// threshold. The previous holder must still be present, reachable, and free
/// at this tier.
fn apply_hysteresis(
    ctx: &TierContext<'_>,
    agent_index: &FxHashMap<&AgentId, usize>,
    holding: &[bool],
    target: TargetId,
    winner: usize,
    winner_distance: f32,
) -> usize {
    let Some(prev_id) = ctx.previous.get(&target) else {
        return winner;
    };
    let Some(&prev) = agent_index.get(prev_id) else {
        return winner;
    };
    if prev == winner {
        return winner;
    }

    let prev_distance = ctx.matrix.distance(prev_id, target);
    let improvement = prev_distance - winner_distance;
    if let Some(threshold) = ctx.threshold {
        if !holding[prev] && prev_distance.is_finite() && improvement <= threshold {
            return prev;
        }
    }

    let winner_id = &ctx.agents[winner].id;
    match ctx.tier {
        Tier::Primary => info!(
            "[ASSIGN] Target {} primary: {} -> {} (improvement {:.2}, threshold {:?})",
            target, prev_id, winner_id, improvement, ctx.threshold
        ),
        tier => debug!(
            "[ASSIGN] Target {} {:?}: {} -> {} (improvement {:.2})",
            target, tier, prev_id, winner_id, improvement
        ),
    }
    winner
}
