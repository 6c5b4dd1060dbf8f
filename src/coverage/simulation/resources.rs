/// Resources owned by the coverage plugin.
///
/// The engine itself is stateless; these hold what the caller would
/// otherwise thread by hand: the current grid, last tick's output, and a
/// short history of primary maps.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::coverage::assignment::{PreviousAssignment, TierMap};
use crate::coverage::grid::OccupancyGrid;
use crate::coverage::tick::TickOutput;
use crate::coverage::walls::WallLayout;

// ============================================================================
// Tick Counter
// ============================================================================

/// Number of completed coverage ticks.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageTick(pub u64);

impl CoverageTick {
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

// ============================================================================
// Walls
// ============================================================================

/// The active wall layout and its rasterization.
///
/// `grid` is `None` until a non-empty layout arrives, in which case distances
/// are straight-line.
#[derive(Resource, Default, Debug)]
pub struct WallGrid {
    pub layout: WallLayout,
    pub grid: Option<OccupancyGrid>,
}

// ============================================================================
// Assignment State
// ============================================================================

/// Latest tick output plus the hysteresis input for the next tick.
#[derive(Resource, Default, Debug)]
pub struct CoverageState {
    pub previous: PreviousAssignment,
    pub latest: Option<TickOutput>,
}

impl CoverageState {
    /// Forget every previous holder, e.g. after the walls change.
    pub fn reset_hysteresis(&mut self) {
        self.previous.clear();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub tick: u64,
    pub primary: TierMap,
}

/// Bounded ring of recent primary maps, oldest first.
#[derive(Resource, Debug)]
pub struct AssignmentHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl Default for AssignmentHistory {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}

impl AssignmentHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    pub fn push(&mut self, tick: u64, primary: TierMap) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { tick, primary });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Number of primary holder changes across the stored window.
    pub fn reassignments(&self) -> usize {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .map(|(before, after)| {
                after
                    .primary
                    .iter()
                    .filter(|(target, agent)| before.primary.get(*target).is_some_and(|prev| prev != *agent))
                    .count()
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::roster::{AgentId, TargetId};

    fn primary(pairs: &[(u32, &str)]) -> TierMap {
        pairs.iter().map(|&(t, a)| (TargetId(t), AgentId::from(a))).collect()
    }

    #[test]
    fn history_is_bounded() {
        let mut history = AssignmentHistory::with_capacity(2);
        history.push(1, primary(&[(1, "A")]));
        history.push(2, primary(&[(1, "B")]));
        history.push(3, primary(&[(1, "B")]));
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().next().map(|e| e.tick), Some(2));
        assert_eq!(history.reassignments(), 0);
    }

    #[test]
    fn history_counts_holder_changes() {
        let mut history = AssignmentHistory::with_capacity(8);
        history.push(1, primary(&[(1, "A"), (2, "B")]));
        history.push(2, primary(&[(1, "B"), (2, "B")]));
        history.push(3, primary(&[(1, "A")]));
        assert_eq!(history.reassignments(), 2);
        assert_eq!(history.latest().map(|e| e.tick), Some(3));
    }
}
