//! Tile rectangle clipping.
//!
//! Finds the largest axis-aligned rectangle of fully-occupied cells
//! in a coarse centroid raster, then cuts the building set down to it
//! and re-centers on its midpoint so tiles repeat edge to edge. The
//! coarse cell size bounds the combinatorics; the raster is tiny
//! compared to the corridor grid.

use log::info;

use crate::grid::Bounds;
use crate::projection::round_mm;
use crate::scene::Building;
use crate::{Error, Result, TileConfig};

/// Maximal all-occupied rectangle, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileRect {
    pub bounds: Bounds,
    /// Occupied coarse cells inside the rectangle (its area in cells).
    pub area_cells: usize,
}

impl TileRect {
    #[inline]
    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.bounds.depth()
    }
}

/// Coarse boolean matrix, one bit per centroid cell.
struct CoarseMatrix {
    cells: Vec<bool>,
    cols: usize,
    rows: usize,
}

impl CoarseMatrix {
    fn from_centroids(buildings: &[Building], bounds: Bounds, cell: f64) -> Result<Self> {
        if !(cell > 0.0) || !cell.is_finite() {
            return Err(Error::BadCellSize(cell));
        }
        if !(bounds.width() > 0.0) || !(bounds.depth() > 0.0) {
            return Err(Error::DegenerateBounds {
                width: bounds.width(),
                depth: bounds.depth(),
            });
        }
        let cols = (bounds.width() / cell).ceil() as usize;
        let rows = (bounds.depth() / cell).ceil() as usize;
        let mut cells = vec![false; cols * rows];
        for b in buildings {
            let Some([cx, cz]) = b.centroid() else { continue };
            let c = (((cx - bounds.min_x) / cell).floor() as i64).clamp(0, cols as i64 - 1);
            let r = (((cz - bounds.min_z) / cell).floor() as i64).clamp(0, rows as i64 - 1);
            cells[r as usize * cols + c as usize] = true;
        }
        Ok(Self { cells, cols, rows })
    }

    #[inline]
    fn get(&self, col: usize, row: usize) -> bool {
        self.cells[row * self.cols + col]
    }

    /// One bounded morphological-closing pass: fill a zero cell when
    /// at least 3 of its 4 neighbors are one. Removes isolated holes
    /// that would fragment the rectangle search.
    fn close_once(&mut self) {
        let mut next = self.cells.clone();
        for r in 0..self.rows {
            for c in 0..self.cols {
                if self.get(c, r) {
                    continue;
                }
                let mut neighbors = 0;
                if c > 0 && self.get(c - 1, r) {
                    neighbors += 1;
                }
                if c + 1 < self.cols && self.get(c + 1, r) {
                    neighbors += 1;
                }
                if r > 0 && self.get(c, r - 1) {
                    neighbors += 1;
                }
                if r + 1 < self.rows && self.get(c, r + 1) {
                    neighbors += 1;
                }
                if neighbors >= 3 {
                    next[r * self.cols + c] = true;
                }
            }
        }
        self.cells = next;
    }
}

/// Cell-space rectangle, rows/cols half-open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellRect {
    col0: usize,
    col1: usize,
    row0: usize,
    row1: usize,
}

impl CellRect {
    #[inline]
    fn area(&self) -> usize {
        (self.col1 - self.col0) * (self.row1 - self.row0)
    }
}

/// Largest rectangle of ones: per-row running height histogram plus a
/// monotonic stack, amortized linear per row.
fn largest_rectangle(m: &CoarseMatrix) -> CellRect {
    let mut best = CellRect::default();
    let mut heights = vec![0usize; m.cols];

    for row in 0..m.rows {
        for col in 0..m.cols {
            heights[col] = if m.get(col, row) { heights[col] + 1 } else { 0 };
        }

        // Stack of column indices with strictly increasing heights.
        let mut stack: Vec<usize> = Vec::with_capacity(m.cols);
        for col in 0..=m.cols {
            let h = if col < m.cols { heights[col] } else { 0 };
            while let Some(&top) = stack.last() {
                if heights[top] <= h {
                    break;
                }
                stack.pop();
                let height = heights[top];
                let left = stack.last().map_or(0, |&l| l + 1);
                let candidate = CellRect {
                    col0: left,
                    col1: col,
                    row0: row + 1 - height,
                    row1: row + 1,
                };
                if candidate.area() > best.area() {
                    best = candidate;
                }
            }
            stack.push(col);
        }
    }
    best
}

/// Find the maximal fully-occupied tile rectangle.
///
/// Returns `Ok(None)` when no coarse cell is occupied at all: a
/// valid, if unhelpful, result for infeasible inputs.
pub fn find_tile_rect(
    buildings: &[Building],
    bounds: Bounds,
    cfg: &TileConfig,
) -> Result<Option<TileRect>> {
    let mut matrix = CoarseMatrix::from_centroids(buildings, bounds, cfg.coarse_cell_size)?;
    for _ in 0..cfg.closing_passes {
        matrix.close_once();
    }

    let rect = largest_rectangle(&matrix);
    if rect.area() == 0 {
        return Ok(None);
    }

    let cell = cfg.coarse_cell_size;
    let world = Bounds {
        min_x: round_mm(bounds.min_x + rect.col0 as f64 * cell),
        min_z: round_mm(bounds.min_z + rect.row0 as f64 * cell),
        max_x: round_mm(bounds.min_x + rect.col1 as f64 * cell),
        max_z: round_mm(bounds.min_z + rect.row1 as f64 * cell),
    };
    info!(
        "tile rectangle: {} x {} coarse cells, {:.1} x {:.1} m",
        rect.col1 - rect.col0,
        rect.row1 - rect.row0,
        world.width(),
        world.depth()
    );
    Ok(Some(TileRect {
        bounds: world,
        area_cells: rect.area(),
    }))
}

/// Cut the building set down to the tile: keep footprints whose
/// centroid falls inside the rectangle, then translate every vertex
/// so the rectangle midpoint becomes the origin. Tiles built this way
/// place edge to edge without manual alignment.
pub fn clip_to_rect(buildings: &[Building], rect: &TileRect) -> Vec<Building> {
    let [mid_x, mid_z] = rect.bounds.center();
    let b = rect.bounds;

    buildings
        .iter()
        .filter(|bld| {
            bld.centroid().is_some_and(|[cx, cz]| {
                cx >= b.min_x && cx < b.max_x && cz >= b.min_z && cz < b.max_z
            })
        })
        .map(|bld| Building {
            vertices: bld
                .vertices
                .iter()
                .map(|v| [round_mm(v[0] - mid_x), round_mm(v[1] - mid_z)])
                .collect(),
            height: bld.height,
            color: bld.color.clone(),
        })
        .collect()
}
