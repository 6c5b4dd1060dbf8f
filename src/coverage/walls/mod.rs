/// Wall layouts and their conversion to occupancy grids.
///
/// Two sources produce the same [`WallLayout`]:
/// - hand-authored segments (editor input)
/// - an uploaded floor-plan raster, traced by [`vectorize`]
///
/// Both are then stamped into an [`OccupancyGrid`] by [`rasterize`], so
/// pathing only ever sees one representation.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

mod rasterize;
mod vectorize;

#[cfg(test)]
mod tests;

pub use rasterize::{rasterize, rasterize_with_buffer};
pub use vectorize::{dilate, otsu_threshold, sample_brightness, trace_layout, vectorize, RasterImage};

use super::grid::OccupancyGrid;

/// A solid line obstacle in world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub start: Vec2,
    pub end: Vec2,
}

impl WallSegment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// A passable opening carved out of whatever wall lies beneath it.
pub type DoorGap = WallSegment;

#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WallLayout {
    pub walls: Vec<WallSegment>,
    pub doors: Vec<DoorGap>,
}

impl WallLayout {
    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    pub fn with_wall(mut self, start: Vec2, end: Vec2) -> Self {
        self.walls.push(WallSegment::new(start, end));
        self
    }

    pub fn with_door(mut self, start: Vec2, end: Vec2) -> Self {
        self.doors.push(WallSegment::new(start, end));
        self
    }

    /// The 12 × 10 demo room: a few partitions that create corners and
    /// corridors without closing any area off.
    pub fn demo_room() -> Self {
        WallLayout::default()
            .with_wall(Vec2::new(4.0, 2.0), Vec2::new(4.0, 6.0))
            .with_wall(Vec2::new(2.0, 5.0), Vec2::new(7.0, 5.0))
            .with_wall(Vec2::new(6.0, 6.5), Vec2::new(6.0, 8.0))
            .with_wall(Vec2::new(7.5, 0.5), Vec2::new(7.5, 4.0))
    }

    /// Rasterize with the grid settings from `config`.
    pub fn to_grid(&self, config: &super::config::CoverageConfig) -> OccupancyGrid {
        rasterize_with_buffer(
            self,
            config.map_width,
            config.map_height,
            config.cell_size,
            config.door_edge_buffer,
        )
    }
}
