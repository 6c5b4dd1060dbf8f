use bevy::prelude::*;
use fixedbitset::FixedBitSet;

use super::{WallLayout, WallSegment};
use crate::coverage::grid::OccupancyGrid;

/// Door carve regions shrink by this many cells at each end by default.
pub const DEFAULT_DOOR_EDGE_BUFFER: f32 = 1.0;

/// Rasterize a layout into a grid covering `map_width × map_height` world units.
pub fn rasterize(layout: &WallLayout, map_width: f32, map_height: f32, cell_size: f32) -> OccupancyGrid {
    rasterize_with_buffer(layout, map_width, map_height, cell_size, DEFAULT_DOOR_EDGE_BUFFER)
}

/// Rasterize a layout, shrinking each door's carve by `door_edge_buffer` cells
/// at both ends.
///
/// # Algorithm
///
/// 1. **Walls:** sample every segment at half-cell steps and block the 3×3
///    neighbourhood of each sampled cell. A one-cell line would leak through
///    diagonal moves wherever it steps diagonally; the 3×3 stamp closes that.
/// 2. **Doors:** sample the shrunk door segment and reopen the same 3×3
///    footprint at each sample, limited to cells whose centres project inside
///    the shrunk segment. Diagonal walls stamp several cells thick along both
///    axes, so a single-axis strip would leave them sealed.
pub fn rasterize_with_buffer(
    layout: &WallLayout,
    map_width: f32,
    map_height: f32,
    cell_size: f32,
    door_edge_buffer: f32,
) -> OccupancyGrid {
    let (width, height) = OccupancyGrid::dims_for(map_width, map_height, cell_size);
    let mut canvas = Canvas {
        width,
        height,
        cells: FixedBitSet::with_capacity(width * height),
    };

    for wall in &layout.walls {
        for (x, y) in trace_cells(wall, cell_size) {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    canvas.set(x + dx, y + dy, true);
                }
            }
        }
    }

    let buffer = door_edge_buffer.max(0.0) * cell_size;
    for door in &layout.doors {
        let len = door.length();
        if len <= 2.0 * buffer {
            warn!(
                "[WALLS] Door {:?} -> {:?} is narrower than its edge buffer; nothing carved",
                door.start, door.end
            );
            continue;
        }
        let dir = (door.end - door.start) / len;
        // Stop just short of the far end so a boundary landing exactly on a
        // cell edge does not open the next cell.
        let carve = WallSegment::new(
            door.start + dir * buffer,
            door.end - dir * (buffer + cell_size * 1e-3),
        );
        let carve_len = carve.length();
        let half = cell_size * 0.5;
        let within = |x: isize, y: isize| {
            let centre = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * cell_size;
            let t = (centre - carve.start).dot(dir);
            t > -half && t < carve_len + half
        };
        for (x, y) in trace_cells(&carve, cell_size) {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if within(x + dx, y + dy) {
                        canvas.set(x + dx, y + dy, false);
                    }
                }
            }
        }
    }

    let grid = OccupancyGrid::from_cells(width, height, cell_size, canvas.cells);
    info!(
        "[WALLS] Rasterized {} walls / {} doors into {}x{} grid ({} blocked)",
        layout.walls.len(),
        layout.doors.len(),
        width,
        height,
        grid.blocked_count()
    );
    grid
}

struct Canvas {
    width: usize,
    height: usize,
    cells: FixedBitSet,
}

impl Canvas {
    fn set(&mut self, x: isize, y: isize, blocked: bool) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.cells.set(y as usize * self.width + x as usize, blocked);
    }
}

/// Cells visited by a segment sampled at half-cell steps. Points outside the
/// positive quadrant come back negative and are dropped by the canvas.
fn trace_cells(segment: &WallSegment, cell_size: f32) -> impl Iterator<Item = (isize, isize)> {
    let steps = (segment.length() / (cell_size * 0.5)).ceil().max(1.0) as usize;
    let start = segment.start;
    let delta = segment.end - segment.start;
    (0..=steps).map(move |i| {
        let p = start + delta * (i as f32 / steps as f32);
        (
            (p.x / cell_size).floor() as isize,
            (p.y / cell_size).floor() as isize,
        )
    })
}
