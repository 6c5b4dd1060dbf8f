use bevy::prelude::*;
use warden::coverage::assignment::invariant_violations;
use warden::coverage::matrix::Router;
use warden::coverage::{
    assign, Agent, AgentId, AssignParams, CoverageConfig, DistanceMatrix, Node, OccupancyGrid, Pathfinder,
    PreviousAssignment, Target, TierMap, WallLayout,
};

const SEEDS: u64 = 16;

fn random_point(rng: &mut fastrand::Rng, config: &CoverageConfig) -> Vec2 {
    Vec2::new(rng.f32() * config.map_width, rng.f32() * config.map_height)
}

fn random_roster(rng: &mut fastrand::Rng, config: &CoverageConfig) -> (Vec<Agent>, Vec<Target>) {
    let agents = (0..rng.usize(1..6))
        .map(|i| {
            let p = random_point(rng, config);
            Agent::new(format!("agent-{i}").as_str(), p.x, p.y)
        })
        .collect();
    let targets = (0..rng.usize(1..7))
        .map(|i| {
            let p = random_point(rng, config);
            Target::new(100 + i as u32, p.x, p.y)
        })
        .collect();
    (agents, targets)
}

/// Demo room plus a sprinkling of blocked cells.
fn random_grid(rng: &mut fastrand::Rng, config: &CoverageConfig) -> OccupancyGrid {
    let mut grid = WallLayout::demo_room().to_grid(config);
    for _ in 0..rng.usize(0..120) {
        let node = Node::new(rng.usize(0..grid.width()), rng.usize(0..grid.height()));
        grid.set_blocked(node, true);
    }
    grid
}

fn routed_matrix(agents: &[Agent], targets: &[Target], grid: &OccupancyGrid, config: &CoverageConfig) -> DistanceMatrix {
    let mut pathfinder = Pathfinder::from_config(config);
    DistanceMatrix::compute(
        agents,
        targets,
        Some(Router {
            grid,
            pathfinder: &mut pathfinder,
        }),
    )
}

fn random_previous(rng: &mut fastrand::Rng, agents: &[Agent], targets: &[Target]) -> PreviousAssignment {
    let mut pick = || {
        let mut map = TierMap::new();
        for target in targets {
            if rng.bool() {
                map.insert(target.id, agents[rng.usize(0..agents.len())].id.clone());
            }
        }
        map
    };
    PreviousAssignment {
        primary: pick(),
        secondary: pick(),
        tertiary: pick(),
    }
}

#[test]
fn assignments_hold_invariants_on_random_floors() {
    let config = CoverageConfig::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let (agents, targets) = random_roster(&mut rng, &config);
        let grid = random_grid(&mut rng, &config);
        let matrix = routed_matrix(&agents, &targets, &grid, &config);
        let previous = random_previous(&mut rng, &agents, &targets);

        let state = assign(&agents, &targets, &previous, &matrix, &AssignParams::default());

        let violations = invariant_violations(&state, &matrix);
        assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        assert!(matrix.is_sorted(), "seed {seed}");
        for map in [&state.primary, &state.secondary, &state.tertiary] {
            for (target, agent) in map {
                assert!(matrix.distance(agent, *target).is_finite(), "seed {seed}");
            }
        }
    }
}

#[test]
fn routed_distance_never_beats_straight_line() {
    let config = CoverageConfig::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(1_000 + seed);
        let grid = random_grid(&mut rng, &config);
        let mut pathfinder = Pathfinder::from_config(&config);
        for _ in 0..8 {
            let (from, to) = (random_point(&mut rng, &config), random_point(&mut rng, &config));
            let route = pathfinder.shortest_path(&grid, from, to);
            if route.is_reachable() {
                assert!(
                    route.distance >= from.distance(to) - 1e-4,
                    "seed {seed}: routed {} < straight {}",
                    route.distance,
                    from.distance(to)
                );
                assert_eq!(route.path.first(), Some(&from));
                assert_eq!(route.path.last(), Some(&to));
            } else {
                assert!(route.path.is_empty());
            }
        }
    }
}

#[test]
fn search_is_deterministic() {
    let config = CoverageConfig::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(2_000 + seed);
        let grid = random_grid(&mut rng, &config);
        let (from, to) = (random_point(&mut rng, &config), random_point(&mut rng, &config));

        let mut warm = Pathfinder::from_config(&config);
        let mut cold = Pathfinder::from_config(&config);
        let first = warm.shortest_path(&grid, from, to);
        let second = warm.shortest_path(&grid, from, to);
        let third = cold.shortest_path(&grid, from, to);
        assert_eq!(first, second, "seed {seed}");
        assert_eq!(first, third, "seed {seed}");
    }
}

#[test]
fn proximity_is_independent_of_holdings() {
    let config = CoverageConfig::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(3_000 + seed);
        let (agents, targets) = random_roster(&mut rng, &config);
        let matrix = DistanceMatrix::euclidean(&agents, &targets);
        let previous = random_previous(&mut rng, &agents, &targets);

        let fresh = assign(&agents, &targets, &PreviousAssignment::default(), &matrix, &AssignParams::default());
        let sticky = assign(&agents, &targets, &previous, &matrix, &AssignParams::default());
        assert_eq!(fresh.proximity, sticky.proximity, "seed {seed}");

        for target in &targets {
            let nearest: Option<&AgentId> = matrix.column(target.id).first().map(|r| &r.id);
            assert_eq!(fresh.proximity.get(&target.id), nearest, "seed {seed}");
        }
    }
}

#[test]
fn every_target_is_covered_when_agents_suffice() {
    let config = CoverageConfig::default();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(4_000 + seed);
        let (agents, targets) = random_roster(&mut rng, &config);
        let matrix = DistanceMatrix::euclidean(&agents, &targets);
        let state = assign(&agents, &targets, &PreviousAssignment::default(), &matrix, &AssignParams::default());

        // Open floor: each tier can hand out one target per agent.
        let expected = targets.len().min(agents.len() * 3);
        let covered = targets.iter().filter(|t| state.is_covered(t.id)).count();
        assert_eq!(covered, expected, "seed {seed}");
        assert_eq!(state.primary.len(), targets.len().min(agents.len()), "seed {seed}");
    }
}
