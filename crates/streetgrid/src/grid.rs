//! Occupancy raster and axis profiles.
//!
//! Footprint bounding boxes are binned into a uniform boolean grid.
//! Using boxes instead of exact polygons is deliberate: corridor
//! detection only needs "clearly not a building", not silhouettes,
//! and the box raster is a strict superset of the true footprint.

use crate::{Error, Result};
use crate::scene::Building;

/// Axis-aligned world-space rectangle, meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_z: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = [f64; 2]>) -> Option<Self> {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            min_z: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_z: f64::NEG_INFINITY,
        };
        let mut any = false;
        for [x, z] in points {
            if x.is_finite() && z.is_finite() {
                b.min_x = b.min_x.min(x);
                b.max_x = b.max_x.max(x);
                b.min_z = b.min_z.min(z);
                b.max_z = b.max_z.max(z);
                any = true;
            }
        }
        any.then_some(b)
    }

    /// Union of every footprint bbox in the scene.
    pub fn of_buildings(buildings: &[Building]) -> Option<Self> {
        Self::from_points(
            buildings
                .iter()
                .flat_map(|b| b.vertices.iter().copied()),
        )
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.max_z - self.min_z
    }

    #[inline]
    pub fn center(&self) -> [f64; 2] {
        [
            0.5 * (self.min_x + self.max_x),
            0.5 * (self.min_z + self.max_z),
        ]
    }
}

/// Uniform 2-D boolean raster of building presence.
///
/// Write-once: `rasterize` is the only constructor and nothing
/// mutates the cells afterwards. Columns index x, rows index z.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cells: Vec<bool>,
    cols: usize,
    rows: usize,
    cell_size: f64,
    bounds: Bounds,
}

impl OccupancyGrid {
    /// Bin every footprint bounding box into the grid (logical OR
    /// across footprints, monotone under insertion).
    pub fn rasterize(buildings: &[Building], bounds: Bounds, cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(Error::BadCellSize(cell_size));
        }
        if !(bounds.width() > 0.0) || !(bounds.depth() > 0.0) {
            return Err(Error::DegenerateBounds {
                width: bounds.width(),
                depth: bounds.depth(),
            });
        }

        let cols = (bounds.width() / cell_size).ceil() as usize;
        let rows = (bounds.depth() / cell_size).ceil() as usize;
        let mut grid = Self {
            cells: vec![false; cols * rows],
            cols,
            rows,
            cell_size,
            bounds,
        };

        for building in buildings {
            let Some(bbox) = building.bbox() else { continue };
            grid.mark_box(&bbox);
        }
        Ok(grid)
    }

    fn mark_box(&mut self, bbox: &Bounds) {
        let c0 = self.col_at(bbox.min_x);
        let c1 = self.col_at(bbox.max_x);
        let r0 = self.row_at(bbox.min_z);
        let r1 = self.row_at(bbox.max_z);
        for r in r0..=r1 {
            for c in c0..=c1 {
                self.cells[r * self.cols + c] = true;
            }
        }
    }

    /// Column index of a world x, clamped so exact boundary
    /// coordinates never index out of range.
    #[inline]
    pub fn col_at(&self, x: f64) -> usize {
        let c = ((x - self.bounds.min_x) / self.cell_size).floor() as i64;
        c.clamp(0, self.cols as i64 - 1) as usize
    }

    #[inline]
    pub fn row_at(&self, z: f64) -> usize {
        let r = ((z - self.bounds.min_z) / self.cell_size).floor() as i64;
        r.clamp(0, self.rows as i64 - 1) as usize
    }

    /// World x of a column's low edge.
    #[inline]
    pub fn col_to_world(&self, col: usize) -> f64 {
        self.bounds.min_x + col as f64 * self.cell_size
    }

    /// World z of a row's low edge.
    #[inline]
    pub fn row_to_world(&self, row: usize) -> f64 {
        self.bounds.min_z + row as f64 * self.cell_size
    }

    #[inline]
    pub fn is_occupied(&self, col: usize, row: usize) -> bool {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Per-column fraction of occupied rows, each in [0, 1].
    pub fn column_profile(&self) -> Vec<f64> {
        let mut profile = vec![0.0; self.cols];
        for r in 0..self.rows {
            for c in 0..self.cols {
                if self.cells[r * self.cols + c] {
                    profile[c] += 1.0;
                }
            }
        }
        let inv = 1.0 / self.rows as f64;
        for v in &mut profile {
            *v *= inv;
        }
        profile
    }

    /// Per-row fraction of occupied columns, each in [0, 1].
    pub fn row_profile(&self) -> Vec<f64> {
        let mut profile = vec![0.0; self.rows];
        for r in 0..self.rows {
            let mut occupied = 0usize;
            for c in 0..self.cols {
                if self.cells[r * self.cols + c] {
                    occupied += 1;
                }
            }
            profile[r] = occupied as f64 / self.cols as f64;
        }
        profile
    }
}
