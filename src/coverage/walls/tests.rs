use super::*;
use crate::coverage::config::VectorizeConfig;
use crate::coverage::grid::Node;
use crate::coverage::pathfinding::Pathfinder;
use fixedbitset::FixedBitSet;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// 40×40 px black plan with a white horizontal stroke on row 20,
/// broken by a doorway at x = 18..=23.
fn plan_with_doorway() -> RasterImage {
    let mut image = RasterImage::filled(40, 40, BLACK).unwrap();
    for x in 2..38 {
        if !(18..=23).contains(&x) {
            image.set_pixel(x, 20, WHITE);
        }
    }
    image
}

#[test]
fn diagonal_wall_is_watertight() {
    let layout = WallLayout::default().with_wall(Vec2::new(1.0, 1.0), Vec2::new(9.0, 9.0));
    let grid = rasterize(&layout, 10.0, 10.0, 1.0);

    // A diagonal step across the line needs both side cells open.
    for i in 1..9 {
        assert!(grid.is_blocked(Node::new(i, i)));
        assert!(grid.is_blocked(Node::new(i + 1, i)) || grid.is_blocked(Node::new(i, i + 1)));
    }
}

#[test]
fn door_carves_passable_gap_with_edge_buffer() {
    let layout = WallLayout::default()
        .with_wall(Vec2::new(10.5, 0.0), Vec2::new(10.5, 20.0))
        .with_door(Vec2::new(10.5, 14.0), Vec2::new(10.5, 18.0));
    let grid = rasterize(&layout, 20.0, 20.0, 1.0);

    // Carve shrinks one cell at each end: cells 15..=16 open, 14 and 17 closed.
    for x in 9..=11 {
        assert!(!grid.is_blocked(Node::new(x, 15)));
        assert!(!grid.is_blocked(Node::new(x, 16)));
        assert!(grid.is_blocked(Node::new(x, 14)));
        assert!(grid.is_blocked(Node::new(x, 17)));
    }
    assert!(grid.is_blocked(Node::new(10, 5)));
}

#[test]
fn door_opens_diagonal_wall() {
    let wall = (Vec2::new(0.0, 0.0), Vec2::new(20.0, 20.0));
    let sealed = WallLayout::default().with_wall(wall.0, wall.1);
    let with_door = sealed.clone().with_door(Vec2::new(8.0, 8.0), Vec2::new(13.0, 13.0));
    let (from, to) = (Vec2::new(15.5, 4.5), Vec2::new(4.5, 15.5));

    let mut pathfinder = Pathfinder::default();
    let closed = rasterize(&sealed, 20.0, 20.0, 1.0);
    assert!(!pathfinder.shortest_path(&closed, from, to).is_reachable());

    let open = rasterize(&with_door, 20.0, 20.0, 1.0);
    // The stamp is five cells thick along each axis; the carve must clear all of it.
    for y in 7..=13 {
        assert!(!open.is_blocked(Node::new(10, y)), "cell (10, {y}) still blocked");
    }
    let route = pathfinder.shortest_path(&open, from, to);
    assert!(route.distance.is_finite());
    assert!(route.distance >= from.distance(to));

    // Wall away from the door stays solid.
    assert!(open.is_blocked(Node::new(3, 3)));
    assert!(open.is_blocked(Node::new(17, 15)));
}

#[test]
fn door_narrower_than_buffer_is_ignored() {
    let layout = WallLayout::default()
        .with_wall(Vec2::new(0.0, 5.5), Vec2::new(10.0, 5.5))
        .with_door(Vec2::new(4.0, 5.5), Vec2::new(5.5, 5.5));
    let grid = rasterize(&layout, 10.0, 10.0, 1.0);
    for x in 0..10 {
        assert!(grid.is_blocked(Node::new(x, 5)));
    }
}

#[test]
fn walls_outside_the_map_are_clipped() {
    let layout = WallLayout::default().with_wall(Vec2::new(-5.0, -5.0), Vec2::new(-2.0, -2.0));
    let grid = rasterize(&layout, 4.0, 4.0, 1.0);
    assert_eq!(grid.blocked_count(), 0);
}

#[test]
fn otsu_separates_bimodal_histogram() {
    let mut values = vec![10u8; 60];
    values.extend(std::iter::repeat(200u8).take(40));
    let t = otsu_threshold(&values);
    assert!(t > 10 && t <= 200, "threshold {t} should split 10 from 200");
}

#[test]
fn otsu_on_uniform_input_is_floored_by_caller() {
    let values = vec![7u8; 100];
    let t = otsu_threshold(&values).max(VectorizeConfig::default().min_threshold);
    assert!(values.iter().all(|&v| v < t));
}

#[test]
fn sampling_maps_cells_onto_pixels() {
    let mut image = RasterImage::filled(3, 3, BLACK).unwrap();
    image.set_pixel(2, 2, WHITE);
    // More cells than pixels: neighbouring cells share source pixels.
    let b = sample_brightness(&image, 4, 4, 3);
    assert_eq!(b.len(), 16);
    assert_eq!(b[15], 255);
    assert_eq!(b[0], 0);
}

#[test]
fn dilate_grows_single_cell_to_block() {
    let mut mask = FixedBitSet::with_capacity(25);
    mask.insert(12);
    let grown = dilate(&mask, 5, 5);
    assert_eq!(grown.count_ones(..), 9);
    assert!(grown.contains(6) && grown.contains(18));
}

#[test]
fn blank_image_yields_open_grid() {
    let image = RasterImage::filled(32, 32, [0, 0, 0, 0]).unwrap();
    let layout = vectorize(&image, 8.0, 8.0, 0.25, &VectorizeConfig::default());
    assert!(layout.walls.is_empty());
    assert!(layout.doors.is_empty());
    assert_eq!(rasterize(&layout, 8.0, 8.0, 0.25).blocked_count(), 0);
}

#[test]
fn traced_plan_keeps_wall_and_doorway() {
    let layout = vectorize(&plan_with_doorway(), 10.0, 10.0, 0.25, &VectorizeConfig::default());

    assert_eq!(layout.walls.len(), 1, "walls: {:?}", layout.walls);
    assert_eq!(layout.doors.len(), 1, "doors: {:?}", layout.doors);

    let wall = layout.walls[0];
    assert!((wall.start.y - 5.125).abs() < 1e-4);
    assert!((wall.end.y - 5.125).abs() < 1e-4);

    let door = layout.doors[0];
    assert!((door.start.x - 4.5).abs() < 1e-4);
    assert!((door.end.x - 6.0).abs() < 1e-4);

    let grid = rasterize(&layout, 10.0, 10.0, 0.25);
    assert!(grid.is_blocked(Node::new(10, 20)));
    assert!(grid.is_blocked(Node::new(30, 20)));
    assert!(!grid.is_blocked(Node::new(20, 20)));
    // Drawn opening is 18..=23; the edge buffer keeps its first cell shut.
    assert!(grid.is_blocked(Node::new(18, 20)));
    assert!(!grid.is_blocked(Node::new(19, 20)));
}

#[test]
fn raster_buffer_size_is_validated() {
    assert!(matches!(
        RasterImage::new(2, 2, vec![0; 15]),
        Err(crate::coverage::error::CoverageError::ImageSize { expected: 16, actual: 15 })
    ));
    assert!(RasterImage::new(0, 2, vec![]).is_err());
}
