use bevy::prelude::*;

use crate::coverage::grid::{Node, OccupancyGrid};
use crate::coverage::math::collinear;

/// Bresenham walk from `a` to `b`. Every visited cell must be open, and a
/// diagonal step must not squeeze between two blocked corner cells on either
/// side, mirroring the search's move rule.
pub fn has_line_of_sight(grid: &OccupancyGrid, a: Node, b: Node) -> bool {
    let (mut x, mut y) = (a.x as isize, a.y as isize);
    let (x1, y1) = (b.x as isize, b.y as isize);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    if grid.is_blocked_at(x, y) {
        return false;
    }
    while x != x1 || y != y1 {
        let e2 = 2 * err;
        let (px, py) = (x, y);
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
        if grid.is_blocked_at(x, y) {
            return false;
        }
        if x != px && y != py && (grid.is_blocked_at(x, py) || grid.is_blocked_at(px, y)) {
            return false;
        }
    }
    true
}

/// Drops interior waypoints that lie on the straight line between their
/// neighbours.
pub fn simplify_collinear(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for window in points.windows(3) {
        let (prev, mid, next) = (out[out.len() - 1], window[1], window[2]);
        if !collinear(prev, mid, next) {
            out.push(mid);
        }
    }
    out.push(points[points.len() - 1]);
    out
}
