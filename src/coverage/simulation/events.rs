/// Wall-layout messages from whatever edits or uploads floor plans.

use bevy::prelude::*;

use crate::coverage::walls::{RasterImage, WallLayout};

/// A hand-edited layout replaces the current one.
#[derive(Event, Message, Debug, Clone)]
pub struct LayoutChanged {
    pub layout: WallLayout,
}

/// A floor-plan raster to trace into a layout.
#[derive(Event, Message, Debug, Clone)]
pub struct FloorPlanUploaded {
    pub image: RasterImage,
}
