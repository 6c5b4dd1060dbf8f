use bevy::prelude::*;
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;

use super::{WallLayout, WallSegment};
use crate::coverage::config::VectorizeConfig;
use crate::coverage::error::{CoverageError, CoverageResult};
use crate::coverage::grid::OccupancyGrid;

/// An uploaded floor plan as straight RGBA8 pixels, row 0 first.
///
/// Rows map onto grid rows directly: pixel row 0 covers grid row 0. Bright
/// strokes are walls, a dark or transparent background is floor.
#[derive(Clone, Debug)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> CoverageResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoverageError::EmptyImage);
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CoverageError::ImageSize {
                expected,
                actual: rgba.len(),
            });
        }
        Ok(Self { width, height, rgba })
    }

    /// Solid image of one colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> CoverageResult<Self> {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba[i..i + 4].copy_from_slice(&rgba);
    }

    /// Alpha-weighted luma of one pixel, clamped into the image.
    fn luma(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        let [r, g, b, a] = [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]];
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        luma * (a as f32 / 255.0)
    }
}

/// Average brightness per grid cell over `samples_per_axis²` points spread
/// across the cell, so anti-aliased strokes still register.
pub fn sample_brightness(image: &RasterImage, grid_width: usize, grid_height: usize, samples_per_axis: usize) -> Vec<u8> {
    let s = samples_per_axis.max(1);
    let sx = image.width as f32 / grid_width as f32;
    let sy = image.height as f32 / grid_height as f32;
    let mut out = Vec::with_capacity(grid_width * grid_height);

    for gy in 0..grid_height {
        for gx in 0..grid_width {
            let mut total = 0.0;
            for j in 0..s {
                for i in 0..s {
                    let u = (gx as f32 + (i as f32 + 0.5) / s as f32) * sx;
                    let v = (gy as f32 + (j as f32 + 0.5) / s as f32) * sy;
                    total += image.luma(u.floor() as i64, v.floor() as i64);
                }
            }
            out.push((total / (s * s) as f32).round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

/// Otsu's method: the first brightness of the upper class that maximises
/// between-class variance. Values at or above the result are foreground.
pub fn otsu_threshold(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let mut histogram = [0u64; 256];
    for &v in values {
        histogram[v as usize] += 1;
    }

    let total = values.len() as f64;
    let sum: f64 = histogram.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();

    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    let mut best_variance = 0.0;
    let mut best = 0usize;

    for (t, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = t;
        }
    }

    (best + 1).min(255) as u8
}

/// Grows every set cell into its 8-neighbourhood.
pub fn dilate(mask: &FixedBitSet, width: usize, height: usize) -> FixedBitSet {
    let mut out = FixedBitSet::with_capacity(width * height);
    for idx in mask.ones() {
        let (x, y) = ((idx % width) as isize, (idx / width) as isize);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height {
                    out.insert(ny as usize * width + nx as usize);
                }
            }
        }
    }
    out
}

/// Full raster pipeline: sample, threshold, dilate, trace.
pub fn vectorize(
    image: &RasterImage,
    map_width: f32,
    map_height: f32,
    cell_size: f32,
    config: &VectorizeConfig,
) -> WallLayout {
    let (width, height) = OccupancyGrid::dims_for(map_width, map_height, cell_size);

    let brightness = sample_brightness(image, width, height, config.samples_per_axis);
    let threshold = otsu_threshold(&brightness).max(config.min_threshold);

    let mut raw = FixedBitSet::with_capacity(width * height);
    for (i, &b) in brightness.iter().enumerate() {
        if b >= threshold {
            raw.insert(i);
        }
    }
    debug!(
        "[WALLS] Floor plan {}x{} px -> {}x{} cells, threshold {}, {} wall cells",
        image.width(),
        image.height(),
        width,
        height,
        threshold,
        raw.count_ones(..)
    );

    let mask = dilate(&raw, width, height);
    let layout = trace_layout(&mask, width, height, cell_size, config);
    info!(
        "[WALLS] Traced floor plan into {} walls and {} doors",
        layout.walls.len(),
        layout.doors.len()
    );
    layout
}

// ============================================================================
// Run / band tracing
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// A stack of overlapping wall runs on consecutive lines.
#[derive(Clone, Copy, Debug)]
struct Band {
    first_line: usize,
    last_line: usize,
    start: usize,
    end: usize,
    last_run: (usize, usize),
}

struct LineView<'a> {
    mask: &'a FixedBitSet,
    width: usize,
    height: usize,
    axis: Axis,
}

impl LineView<'_> {
    fn lines(&self) -> usize {
        match self.axis {
            Axis::Horizontal => self.height,
            Axis::Vertical => self.width,
        }
    }

    fn span(&self) -> usize {
        match self.axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    fn is_wall(&self, line: usize, pos: usize) -> bool {
        match self.axis {
            Axis::Horizontal => self.mask.contains(line * self.width + pos),
            Axis::Vertical => self.mask.contains(pos * self.width + line),
        }
    }

    fn runs(&self, line: usize, min_len: usize) -> SmallVec<[(usize, usize); 8]> {
        let mut runs = SmallVec::new();
        let mut pos = 0;
        let span = self.span();
        while pos < span {
            if !self.is_wall(line, pos) {
                pos += 1;
                continue;
            }
            let start = pos;
            while pos < span && self.is_wall(line, pos) {
                pos += 1;
            }
            if pos - start >= min_len {
                runs.push((start, pos - 1));
            }
        }
        runs
    }
}

fn overlap_ratio(a: (usize, usize), b: (usize, usize)) -> f32 {
    let lo = a.0.max(b.0);
    let hi = a.1.min(b.1);
    if hi < lo {
        return 0.0;
    }
    let shorter = (a.1 - a.0 + 1).min(b.1 - b.0 + 1);
    (hi - lo + 1) as f32 / shorter as f32
}

fn collect_bands(view: &LineView, config: &VectorizeConfig) -> Vec<Band> {
    let mut closed = Vec::new();
    let mut open: Vec<Band> = Vec::new();

    for line in 0..view.lines() {
        let mut next_open = Vec::with_capacity(open.len());
        let mut taken = vec![false; open.len()];

        for run in view.runs(line, config.min_run_cells.max(1)) {
            let joined = open.iter().enumerate().position(|(i, band)| {
                !taken[i] && overlap_ratio(band.last_run, run) >= config.band_overlap
            });
            match joined {
                Some(i) => {
                    taken[i] = true;
                    let mut band = open[i];
                    band.last_line = line;
                    band.start = band.start.min(run.0);
                    band.end = band.end.max(run.1);
                    band.last_run = run;
                    next_open.push(band);
                }
                None => next_open.push(Band {
                    first_line: line,
                    last_line: line,
                    start: run.0,
                    end: run.1,
                    last_run: run,
                }),
            }
        }

        for (i, band) in open.into_iter().enumerate() {
            if !taken[i] {
                closed.push(band);
            }
        }
        open = next_open;
    }
    closed.extend(open);
    closed
}

/// Joins bands that sit on the same lines and are separated by a short gap,
/// so a doorway does not split one wall into two.
fn merge_collinear(mut bands: Vec<Band>, config: &VectorizeConfig) -> Vec<Band> {
    bands.sort_by_key(|b| (b.first_line, b.start));
    loop {
        let mut merged = false;
        'outer: for i in 0..bands.len() {
            for j in 0..bands.len() {
                if i == j {
                    continue;
                }
                let (a, b) = (bands[i], bands[j]);
                if b.start <= a.end {
                    continue;
                }
                let gap = b.start - a.end - 1;
                let same_lines = overlap_ratio((a.first_line, a.last_line), (b.first_line, b.last_line))
                    >= config.band_overlap;
                if same_lines && gap <= config.max_door_cells {
                    bands[i] = Band {
                        first_line: a.first_line.min(b.first_line),
                        last_line: a.last_line.max(b.last_line),
                        start: a.start,
                        end: b.end,
                        last_run: a.last_run,
                    };
                    bands.remove(j);
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            return bands;
        }
    }
}

/// Reduces a wall mask to axis-aligned wall segments plus door gaps.
///
/// Each band becomes one wall spanning its full extent along the centre
/// line. Openings on that centre line at least `min_door_cells` wide become
/// doors spanning the opening as drawn, one cell wider per side than the
/// dilated gap. Rasterizing with the default one-cell door edge buffer trims
/// a cell off each end again.
pub fn trace_layout(
    mask: &FixedBitSet,
    width: usize,
    height: usize,
    cell_size: f32,
    config: &VectorizeConfig,
) -> WallLayout {
    let mut layout = WallLayout::default();

    for axis in [Axis::Horizontal, Axis::Vertical] {
        let view = LineView { mask, width, height, axis };
        let bands = merge_collinear(collect_bands(&view, config), config);

        for band in bands {
            let centre = (band.first_line + band.last_line) / 2;
            let across = (band.first_line + band.last_line + 1) as f32 * 0.5 * cell_size;
            let along = |pos: f32| pos * cell_size;
            let point = |along_world: f32| match axis {
                Axis::Horizontal => Vec2::new(along_world, across),
                Axis::Vertical => Vec2::new(across, along_world),
            };

            layout.walls.push(WallSegment::new(
                point(along(band.start as f32 + 0.5)),
                point(along(band.end as f32 + 0.5)),
            ));

            let mut pos = band.start;
            while pos <= band.end {
                if view.is_wall(centre, pos) {
                    pos += 1;
                    continue;
                }
                let gap_start = pos;
                while pos <= band.end && !view.is_wall(centre, pos) {
                    pos += 1;
                }
                let gap_end = pos - 1;
                if gap_end + 1 - gap_start >= config.min_door_cells {
                    layout.doors.push(WallSegment::new(
                        point(along(gap_start as f32 - 1.0)),
                        point(along(gap_end as f32 + 2.0)),
                    ));
                }
            }
        }
    }
    layout
}
