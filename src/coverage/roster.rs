/// Responders and targets supplied by the caller each tick.
///
/// The engine keeps no identity beyond what is passed in. The [`Roster`]
/// resource is the caller-owned table the plugin reads from; the pure API
/// takes plain slices.

use bevy::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::math::is_finite_point;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        AgentId(s.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Vec2,
}

impl Agent {
    pub fn new(id: impl Into<AgentId>, x: f32, y: f32) -> Self {
        Self {
            id: id.into(),
            position: Vec2::new(x, y),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub position: Vec2,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Seconds on the caller's clock.
    pub last_seen: f64,
}

impl Target {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self {
            id: TargetId(id),
            position: Vec2::new(x, y),
            confidence: 1.0,
            last_seen: 0.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn seen_at(mut self, last_seen: f64) -> Self {
        self.last_seen = last_seen;
        self
    }
}

/// Drops agents with non-finite coordinates or repeated ids (first wins).
pub fn sanitize_agents(agents: &[Agent]) -> Vec<Agent> {
    let mut seen = FxHashSet::default();
    agents
        .iter()
        .filter(|a| {
            if !is_finite_point(a.position) {
                warn!("[ROSTER] Skipping agent '{}' with non-finite position {:?}", a.id, a.position);
                return false;
            }
            if !seen.insert(a.id.clone()) {
                warn!("[ROSTER] Skipping duplicate agent id '{}'", a.id);
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// Drops targets with non-finite coordinates or confidence, or repeated ids.
/// Confidence is clamped into `[0, 1]`.
pub fn sanitize_targets(targets: &[Target]) -> Vec<Target> {
    let mut seen = FxHashSet::default();
    targets
        .iter()
        .filter(|t| {
            if !is_finite_point(t.position) || !t.confidence.is_finite() {
                warn!("[ROSTER] Skipping target {} with non-finite data", t.id);
                return false;
            }
            if !seen.insert(t.id) {
                warn!("[ROSTER] Skipping duplicate target id {}", t.id);
                return false;
            }
            true
        })
        .map(|t| Target {
            confidence: t.confidence.clamp(0.0, 1.0),
            ..t.clone()
        })
        .collect()
}

/// Caller-owned table of live responders and sightings.
///
/// Insertion order is preserved and is the "input order" used for
/// tie-breaking everywhere downstream.
#[derive(Resource, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Roster {
    pub agents: Vec<Agent>,
    pub targets: Vec<Target>,
    /// Current time on the same clock as [`Target::last_seen`].
    pub observed_at: f64,
}

impl Roster {
    pub fn upsert_agent(&mut self, id: impl Into<AgentId>, position: Vec2) {
        let id = id.into();
        match self.agents.iter_mut().find(|a| a.id == id) {
            Some(agent) => agent.position = position,
            None => self.agents.push(Agent { id, position }),
        }
    }

    /// Updates or inserts a sighting, stamping it with `observed_at`.
    pub fn upsert_target(&mut self, id: u32, position: Vec2, confidence: f32) {
        let id = TargetId(id);
        let now = self.observed_at;
        match self.targets.iter_mut().find(|t| t.id == id) {
            Some(target) => {
                target.position = position;
                target.confidence = confidence;
                target.last_seen = now;
            }
            None => self.targets.push(Target {
                id,
                position,
                confidence,
                last_seen: now,
            }),
        }
    }

    pub fn remove_agent(&mut self, id: &AgentId) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| &a.id != id);
        before != self.agents.len()
    }

    pub fn remove_target(&mut self, id: TargetId) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t.id != id);
        before != self.targets.len()
    }

    /// Targets seen within `ttl` seconds of `observed_at`.
    pub fn active_targets(&self, ttl: f64) -> Vec<Target> {
        self.targets
            .iter()
            .filter(|t| self.observed_at - t.last_seen < ttl)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_targets_are_filtered() {
        let mut roster = Roster::default();
        roster.upsert_target(1, Vec2::new(1.0, 1.0), 0.9);
        roster.observed_at = 4.0;
        roster.upsert_target(2, Vec2::new(2.0, 2.0), 0.8);
        roster.observed_at = 6.0;

        let active: Vec<_> = roster.active_targets(5.0).into_iter().map(|t| t.id).collect();
        assert_eq!(active, vec![TargetId(2)]);
    }

    #[test]
    fn ttl_boundary_is_exclusive() {
        let roster = Roster {
            targets: vec![
                Target::new(1, 0.0, 0.0).seen_at(5.0),
                Target::new(2, 0.0, 0.0).seen_at(5.5).with_confidence(0.4),
            ],
            observed_at: 10.0,
            ..Default::default()
        };
        let active = roster.active_targets(5.0);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, TargetId(2));
        assert_eq!(active[0].confidence, 0.4);
    }

    #[test]
    fn upsert_keeps_input_order() {
        let mut roster = Roster::default();
        roster.upsert_agent("Alice", Vec2::ZERO);
        roster.upsert_agent("Bob", Vec2::ONE);
        roster.upsert_agent("Alice", Vec2::new(3.0, 3.0));
        assert_eq!(roster.agents.len(), 2);
        assert_eq!(roster.agents[0].id, AgentId::from("Alice"));
        assert_eq!(roster.agents[0].position, Vec2::new(3.0, 3.0));
        assert!(roster.remove_agent(&AgentId::from("Bob")));
        assert!(!roster.remove_agent(&AgentId::from("Bob")));
    }

    #[test]
    fn sanitize_drops_nan_and_duplicates() {
        let agents = vec![
            Agent::new("A", 0.0, 0.0),
            Agent::new("B", f32::NAN, 0.0),
            Agent::new("A", 5.0, 5.0),
        ];
        let clean = sanitize_agents(&agents);
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].position, Vec2::ZERO);

        let targets = vec![Target::new(1, 0.0, f32::INFINITY), Target::new(2, 1.0, 1.0)];
        assert_eq!(sanitize_targets(&targets).len(), 1);
    }

    #[test]
    fn sanitize_clamps_confidence() {
        let targets = vec![
            Target::new(1, 0.0, 0.0).with_confidence(1.7),
            Target::new(2, 0.0, 0.0).with_confidence(-0.2),
            Target::new(3, 0.0, 0.0).with_confidence(f32::NAN),
        ];
        let clean = sanitize_targets(&targets);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean[0].confidence, 1.0);
        assert_eq!(clean[1].confidence, 0.0);
    }
}
