use bevy::prelude::*;

/// Sentinel distance for a pair with no walkable route.
pub const UNREACHABLE: f32 = f32::INFINITY;

/// Cost of a diagonal grid step relative to a cardinal one.
pub const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// Tolerance for the collinearity test used when simplifying paths.
pub const COLLINEAR_EPSILON: f32 = 1e-4;

#[inline]
pub fn euclidean(a: Vec2, b: Vec2) -> f32 {
    a.distance(b)
}

#[inline]
pub fn is_finite_point(p: Vec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Total length of a polyline. Empty and single-point lines have length zero.
pub fn polyline_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// True if `b` lies on the line through `a` and `c` (2D cross product test).
#[inline]
pub fn collinear(a: Vec2, b: Vec2, c: Vec2) -> bool {
    (b - a).perp_dot(c - b).abs() <= COLLINEAR_EPSILON
}
