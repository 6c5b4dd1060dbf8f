use bevy::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

use super::grid::OccupancyGrid;
use super::math::{euclidean, UNREACHABLE};
use super::pathfinding::Pathfinder;
use super::roster::{Agent, AgentId, Target, TargetId};

/// One entry of a sorted matrix row. `distance` may be `f32::INFINITY`,
/// which serializes to JSON `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ranked<K> {
    pub id: K,
    pub distance: f32,
}

/// Grid plus pathfinder, supplied when distances should follow walls.
pub struct Router<'a> {
    pub grid: &'a OccupancyGrid,
    pub pathfinder: &'a mut Pathfinder,
}

/// Pairwise agent/target distances, in two independently sorted views.
///
/// Rows are sorted ascending with a stable sort, so equal distances keep
/// input order. Unreachable pairs are kept as `INFINITY` and sort last.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceMatrix {
    pub by_agent: BTreeMap<AgentId, Vec<Ranked<TargetId>>>,
    pub by_target: BTreeMap<TargetId, Vec<Ranked<AgentId>>>,
    /// Waypoints per routed pair; empty when no grid was used.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<AgentId, BTreeMap<TargetId, Vec<Vec2>>>,
}

impl DistanceMatrix {
    pub fn compute(agents: &[Agent], targets: &[Target], mut router: Option<Router<'_>>) -> Self {
        let mut matrix = DistanceMatrix::default();
        let mut columns: Vec<Vec<Ranked<AgentId>>> = vec![Vec::with_capacity(agents.len()); targets.len()];

        for agent in agents {
            let mut row = Vec::with_capacity(targets.len());
            for (col, target) in targets.iter().enumerate() {
                let distance = match router.as_mut() {
                    Some(Router { grid, pathfinder }) => {
                        let route = pathfinder.shortest_path(grid, agent.position, target.position);
                        matrix
                            .paths
                            .entry(agent.id.clone())
                            .or_default()
                            .insert(target.id, route.path);
                        route.distance
                    }
                    None => euclidean(agent.position, target.position),
                };
                row.push(Ranked { id: target.id, distance });
                columns[col].push(Ranked {
                    id: agent.id.clone(),
                    distance,
                });
            }
            sort_row(&mut row);
            matrix.by_agent.insert(agent.id.clone(), row);
        }

        for (target, mut column) in targets.iter().zip(columns) {
            sort_row(&mut column);
            matrix.by_target.insert(target.id, column);
        }

        debug!(
            "[MATRIX] {} agents x {} targets ({})",
            agents.len(),
            targets.len(),
            if router.is_some() { "routed" } else { "euclidean" }
        );
        matrix
    }

    /// Straight-line distances only.
    pub fn euclidean(agents: &[Agent], targets: &[Target]) -> Self {
        Self::compute(agents, targets, None)
    }

    pub fn row(&self, agent: &AgentId) -> &[Ranked<TargetId>] {
        self.by_agent.get(agent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn column(&self, target: TargetId) -> &[Ranked<AgentId>] {
        self.by_target.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distance for one pair; `INFINITY` if the pair is unknown.
    pub fn distance(&self, agent: &AgentId, target: TargetId) -> f32 {
        self.row(agent)
            .iter()
            .find(|r| r.id == target)
            .map_or(UNREACHABLE, |r| r.distance)
    }

    pub fn path(&self, agent: &AgentId, target: TargetId) -> Option<&[Vec2]> {
        self.paths
            .get(agent)
            .and_then(|row| row.get(&target))
            .map(Vec::as_slice)
    }

    pub fn is_sorted(&self) -> bool {
        self.by_agent.values().all(|row| is_ascending(row)) && self.by_target.values().all(|col| is_ascending(col))
    }
}

fn sort_row<K>(row: &mut [Ranked<K>]) {
    row.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

fn is_ascending<K>(row: &[Ranked<K>]) -> bool {
    row.windows(2).all(|w| w[0].distance <= w[1].distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::grid::Node;

    #[test]
    fn rows_are_sorted_and_ties_keep_input_order() {
        let agents = [Agent::new("a", 0.0, 0.0), Agent::new("b", 2.0, 0.0)];
        let targets = [Target::new(1, 3.0, 0.0), Target::new(2, 1.0, 0.0), Target::new(3, -1.0, 0.0)];
        let m = DistanceMatrix::euclidean(&agents, &targets);

        let row_a: Vec<_> = m.row(&"a".into()).iter().map(|r| r.id.0).collect();
        assert_eq!(row_a, vec![2, 3, 1]);
        // Target 2 is equidistant from both agents: input order decides.
        let col: Vec<_> = m.column(TargetId(2)).iter().map(|r| r.id.0.as_str()).collect();
        assert_eq!(col, vec!["a", "b"]);
        assert!(m.is_sorted());
        assert!(m.paths.is_empty());
    }

    #[test]
    fn routed_matrix_keeps_infinite_pairs_and_paths() {
        let mut grid = OccupancyGrid::new(10, 10, 1.0);
        for i in 6..10 {
            grid.set_blocked(Node::new(i, 6), true);
            grid.set_blocked(Node::new(6, i), true);
        }
        let mut pathfinder = Pathfinder::default();
        pathfinder.snap_radius = 0;
        let agents = [Agent::new("a", 0.5, 0.5)];
        let targets = [Target::new(1, 8.5, 8.5), Target::new(2, 4.5, 0.5)];
        let m = DistanceMatrix::compute(
            &agents,
            &targets,
            Some(Router {
                grid: &grid,
                pathfinder: &mut pathfinder,
            }),
        );

        assert!(m.distance(&"a".into(), TargetId(1)).is_infinite());
        assert!((m.distance(&"a".into(), TargetId(2)) - 4.0).abs() < 1e-5);
        assert_eq!(m.row(&"a".into())[0].id, TargetId(2));
        assert_eq!(m.path(&"a".into(), TargetId(1)), Some(&[][..]));
        assert_eq!(m.path(&"a".into(), TargetId(2)).map(<[Vec2]>::len), Some(2));
        assert!(m.distance(&"ghost".into(), TargetId(2)).is_infinite());
    }
}
