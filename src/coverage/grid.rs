use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GRID_VERSION: AtomicU64 = AtomicU64::new(1);

/// Identity of one grid build.
///
/// Every constructed or mutated grid gets a fresh version. Caches keyed by
/// version never see stale contents: replacing the layout changes the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridVersion(pub u64);

impl GridVersion {
    fn next() -> Self {
        GridVersion(NEXT_GRID_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Node {
    pub x: usize,
    pub y: usize,
}

impl Node {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Boolean occupancy map, `true` = blocked.
///
/// The grid's origin is the world origin; cell `(x, y)` covers
/// `[x * cell_size, (x + 1) * cell_size) × [y * cell_size, (y + 1) * cell_size)`.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cell_size: f32,
    blocked: FixedBitSet,
    version: GridVersion,
}

impl OccupancyGrid {
    /// All-open grid of `width × height` cells.
    pub fn new(width: usize, height: usize, cell_size: f32) -> Self {
        Self::from_cells(width, height, cell_size, FixedBitSet::with_capacity(width * height))
    }

    /// All-open grid covering a world rectangle.
    pub fn for_world(map_width: f32, map_height: f32, cell_size: f32) -> Self {
        let (width, height) = Self::dims_for(map_width, map_height, cell_size);
        Self::new(width, height, cell_size)
    }

    /// Cell counts covering a world rectangle, rounding partial cells up.
    pub fn dims_for(map_width: f32, map_height: f32, cell_size: f32) -> (usize, usize) {
        (
            (map_width / cell_size).ceil().max(1.0) as usize,
            (map_height / cell_size).ceil().max(1.0) as usize,
        )
    }

    pub(crate) fn from_cells(width: usize, height: usize, cell_size: f32, mut blocked: FixedBitSet) -> Self {
        blocked.grow(width * height);
        Self {
            width,
            height,
            cell_size,
            blocked,
            version: GridVersion::next(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn version(&self) -> GridVersion {
        self.version
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn get_index(&self, node: Node) -> usize {
        node.y * self.width + node.x
    }

    #[inline]
    pub fn node_at(&self, index: usize) -> Node {
        Node::new(index % self.width, index / self.width)
    }

    #[inline]
    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Out-of-bounds cells count as blocked.
    #[inline]
    pub fn is_blocked(&self, node: Node) -> bool {
        if node.x >= self.width || node.y >= self.height {
            return true;
        }
        self.blocked.contains(self.get_index(node))
    }

    #[inline]
    pub fn is_blocked_at(&self, x: isize, y: isize) -> bool {
        !self.in_bounds(x, y) || self.blocked.contains(y as usize * self.width + x as usize)
    }

    /// Marks a cell and gives the grid a new identity.
    pub fn set_blocked(&mut self, node: Node, blocked: bool) {
        if node.x >= self.width || node.y >= self.height {
            return;
        }
        let idx = self.get_index(node);
        self.blocked.set(idx, blocked);
        self.version = GridVersion::next();
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.count_ones(..)
    }

    /// Floor-divides a world point by the cell size and clamps into the grid.
    pub fn world_to_grid(&self, world: Vec2) -> Node {
        let max_x = self.width.saturating_sub(1) as f32;
        let max_y = self.height.saturating_sub(1) as f32;
        let x = (world.x / self.cell_size).floor().clamp(0.0, max_x);
        let y = (world.y / self.cell_size).floor().clamp(0.0, max_y);
        Node::new(x as usize, y as usize)
    }

    pub fn grid_to_world(&self, node: Node) -> Vec2 {
        Vec2::new(
            (node.x as f32 + 0.5) * self.cell_size,
            (node.y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Nearest open cell to `node` within `radius` rings, preferring the cell
    /// whose centre is closest to `world`.
    pub fn snap_to_open(&self, node: Node, world: Vec2, radius: usize) -> Option<Node> {
        if !self.is_blocked(node) {
            return Some(node);
        }
        let (cx, cy) = (node.x as isize, node.y as isize);
        for r in 1..=radius as isize {
            let mut best: Option<(f32, Node)> = None;
            for dy in -r..=r {
                for dx in -r..=r {
                    if dx.abs() != r && dy.abs() != r {
                        continue;
                    }
                    let (x, y) = (cx + dx, cy + dy);
                    if self.is_blocked_at(x, y) {
                        continue;
                    }
                    let candidate = Node::new(x as usize, y as usize);
                    let d = self.grid_to_world(candidate).distance_squared(world);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        best = Some((d, candidate));
                    }
                }
            }
            if let Some((_, found)) = best {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_cells_round_up() {
        let grid = OccupancyGrid::for_world(12.0, 10.1, 0.25);
        assert_eq!((grid.width(), grid.height()), (48, 41));
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn world_points_clamp_into_grid() {
        let grid = OccupancyGrid::new(10, 5, 1.0);
        assert_eq!(grid.world_to_grid(Vec2::new(3.7, 2.2)), Node::new(3, 2));
        assert_eq!(grid.world_to_grid(Vec2::new(-4.0, 99.0)), Node::new(0, 4));
    }

    #[test]
    fn mutation_changes_identity() {
        let mut grid = OccupancyGrid::new(4, 4, 1.0);
        let before = grid.version();
        grid.set_blocked(Node::new(1, 1), true);
        assert_ne!(before, grid.version());
        assert!(grid.is_blocked(Node::new(1, 1)));
        assert_eq!(grid.blocked_count(), 1);
    }

    #[test]
    fn snap_finds_nearest_open_cell() {
        let mut grid = OccupancyGrid::new(5, 5, 1.0);
        for x in 0..5 {
            grid.set_blocked(Node::new(x, 2), true);
        }
        let snapped = grid.snap_to_open(Node::new(2, 2), Vec2::new(2.5, 2.9), 2);
        assert_eq!(snapped, Some(Node::new(2, 3)));
        assert_eq!(grid.snap_to_open(Node::new(2, 2), Vec2::new(2.5, 2.5), 0), None);
    }
}
