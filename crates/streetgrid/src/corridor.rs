//! Corridor construction and intersection interrupts.
//!
//! A valley gives a clear band on one axis of the grid; the corridor
//! builder turns it into a real street by finding the band's true
//! extent along its running axis, then records interrupt intervals
//! wherever a perpendicular corridor crosses it.
//!
//! Cell-space bookkeeping lives in the internal [`CellCorridor`]
//! record; the public [`Corridor`] carries world coordinates only and
//! is converted exactly once, at the stage boundary.

use log::info;
use serde::{Deserialize, Serialize};

use crate::grid::OccupancyGrid;
use crate::projection::round_mm;
use crate::valley::{find_valleys, Valley};
use crate::DetectConfig;

/// Interrupts closer than this are merged into one interval. Dense
/// downtown crossings otherwise leave sliver gaps too small for a
/// single dash.
const INTERRUPT_MERGE_TOLERANCE: f64 = 0.1;

/// World axis a corridor runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Z,
}

/// A detected street or avenue, in world meters.
///
/// `center` is the coordinate on the perpendicular axis; `start` and
/// `end` bound the extent along the running axis. `interrupts` are
/// sorted ascending, non-overlapping, and contained in
/// `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub axis: Axis,
    pub center: f64,
    pub width: f64,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub interrupts: Vec<[f64; 2]>,
}

/// Internal working record: a valley band plus its refined extent,
/// all in grid cell indices.
#[derive(Debug, Clone, Copy)]
struct CellCorridor {
    axis: Axis,
    /// Clear band on the perpendicular axis (cell indices).
    band: Valley,
    /// Inclusive first/last clear cell along the running axis.
    extent: (usize, usize),
}

impl CellCorridor {
    /// Refine a valley into an extent by scanning the grid: a
    /// position along the running axis belongs to the corridor iff
    /// the entire perpendicular band is unoccupied there. Returns
    /// `None` when no position qualifies (the band is clear on
    /// average but blocked everywhere, e.g. a staggered block edge).
    fn refine(grid: &OccupancyGrid, axis: Axis, band: Valley) -> Option<Self> {
        let along = match axis {
            Axis::Z => grid.rows(),
            Axis::X => grid.cols(),
        };

        let mut first: Option<usize> = None;
        let mut last = 0usize;
        for pos in 0..along {
            let clear = (band.start..band.end).all(|b| match axis {
                Axis::Z => !grid.is_occupied(b, pos),
                Axis::X => !grid.is_occupied(pos, b),
            });
            if clear {
                first.get_or_insert(pos);
                last = pos;
            }
        }

        first.map(|f| Self {
            axis,
            band,
            extent: (f, last),
        })
    }

    /// One-shot conversion to the public world-space value. Extents
    /// are clamped to the world bounds (the last grid cell can
    /// overhang them because dimensions round up).
    fn to_world(self, grid: &OccupancyGrid) -> Corridor {
        let cell = grid.cell_size();
        let bounds = grid.bounds();
        let band_mid = 0.5 * (self.band.start + self.band.end) as f64;

        let (center, start, end, limit) = match self.axis {
            Axis::Z => (
                bounds.min_x + band_mid * cell,
                grid.row_to_world(self.extent.0),
                grid.row_to_world(self.extent.1 + 1),
                bounds.max_z,
            ),
            Axis::X => (
                bounds.min_z + band_mid * cell,
                grid.col_to_world(self.extent.0),
                grid.col_to_world(self.extent.1 + 1),
                bounds.max_x,
            ),
        };

        Corridor {
            axis: self.axis,
            center: round_mm(center),
            width: round_mm(self.band.len() as f64 * cell),
            start: round_mm(start),
            end: round_mm(end.min(limit)),
            interrupts: Vec::new(),
        }
    }
}

/// Detect all corridors in a grid: row valleys run along x, column
/// valleys run along z. Interrupts are accumulated across the two
/// sets before the list is returned.
pub fn detect(grid: &OccupancyGrid, cfg: &DetectConfig) -> Vec<Corridor> {
    let mut corridors = Vec::new();

    for v in find_valleys(&grid.row_profile(), cfg) {
        if let Some(c) = CellCorridor::refine(grid, Axis::X, v) {
            corridors.push(c.to_world(grid));
        }
    }
    let along_x = corridors.len();
    for v in find_valleys(&grid.column_profile(), cfg) {
        if let Some(c) = CellCorridor::refine(grid, Axis::Z, v) {
            corridors.push(c.to_world(grid));
        }
    }

    accumulate_interrupts(&mut corridors);

    info!(
        "detected {} corridors ({} along x, {} along z)",
        corridors.len(),
        along_x,
        corridors.len() - along_x
    );
    corridors
}

/// Record, on every corridor, an interrupt for each perpendicular
/// corridor crossing it: the crossing corridor's own half-width,
/// centered on its position.
///
/// The crossing test only asks whether the other corridor's *center
/// line* falls inside this one's extent (and vice versa); an
/// off-center partial overlap is not detected. Observed behavior of
/// the consuming renderer, kept as-is.
pub fn accumulate_interrupts(corridors: &mut [Corridor]) {
    let n = corridors.len();
    for i in 0..n {
        for j in 0..n {
            if corridors[i].axis == corridors[j].axis {
                continue;
            }
            let (a, b) = (&corridors[i], &corridors[j]);
            let crosses = b.center >= a.start
                && b.center <= a.end
                && a.center >= b.start
                && a.center <= b.end;
            if !crosses {
                continue;
            }
            let half = 0.5 * b.width;
            let window = [
                round_mm((b.center - half).max(a.start)),
                round_mm((b.center + half).min(a.end)),
            ];
            if window[1] > window[0] {
                corridors[i].interrupts.push(window);
            }
        }
    }

    for c in corridors.iter_mut() {
        merge_intervals(&mut c.interrupts);
    }
}

/// Sort ascending by start and merge overlapping or near-touching
/// intervals in place.
fn merge_intervals(intervals: &mut Vec<[f64; 2]>) {
    if intervals.len() < 2 {
        return;
    }
    intervals.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut merged: Vec<[f64; 2]> = Vec::with_capacity(intervals.len());
    for &iv in intervals.iter() {
        match merged.last_mut() {
            Some(last) if iv[0] <= last[1] + INTERRUPT_MERGE_TOLERANCE => {
                last[1] = last[1].max(iv[1]);
            }
            _ => merged.push(iv),
        }
    }
    *intervals = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Bounds;
    use crate::scene::Building;

    fn corridor(axis: Axis, center: f64, width: f64, start: f64, end: f64) -> Corridor {
        Corridor {
            axis,
            center,
            width,
            start,
            end,
            interrupts: Vec::new(),
        }
    }

    #[test]
    fn crossing_pair_records_half_width_windows() {
        let mut corridors = vec![
            corridor(Axis::X, 50.0, 10.0, 0.0, 200.0),
            corridor(Axis::Z, 100.0, 8.0, 0.0, 200.0),
        ];
        accumulate_interrupts(&mut corridors);
        assert_eq!(corridors[0].interrupts, vec![[96.0, 104.0]]);
        assert_eq!(corridors[1].interrupts, vec![[45.0, 55.0]]);
    }

    #[test]
    fn off_extent_crossing_records_nothing() {
        // Center line of the z corridor sits past the x corridor's end.
        let mut corridors = vec![
            corridor(Axis::X, 50.0, 10.0, 0.0, 90.0),
            corridor(Axis::Z, 100.0, 8.0, 0.0, 200.0),
        ];
        accumulate_interrupts(&mut corridors);
        assert!(corridors[0].interrupts.is_empty());
        assert!(corridors[1].interrupts.is_empty());
    }

    #[test]
    fn interrupts_are_sorted_and_merged() {
        let mut corridors = vec![
            corridor(Axis::X, 50.0, 10.0, 0.0, 200.0),
            corridor(Axis::Z, 100.0, 8.0, 0.0, 200.0),
            corridor(Axis::Z, 20.0, 6.0, 0.0, 200.0),
            corridor(Axis::Z, 106.0, 6.0, 0.0, 200.0), // window [103,109] touches [96,104]
        ];
        accumulate_interrupts(&mut corridors);
        assert_eq!(corridors[0].interrupts, vec![[17.0, 23.0], [96.0, 109.0]]);
    }

    fn block(min_x: f64, min_z: f64, max_x: f64, max_z: f64) -> Building {
        Building {
            vertices: vec![
                [min_x, min_z],
                [max_x, min_z],
                [max_x, max_z],
                [min_x, max_z],
            ],
            height: 20.0,
            color: "#666666".into(),
        }
    }

    #[test]
    fn extent_is_refined_past_coarse_valley() {
        // Two building rows leave a clear band of rows, but a third
        // building caps the corridor's east end. The valley spans the
        // full width; the refined extent must stop at the cap.
        let world = Bounds {
            min_x: 0.0,
            min_z: 0.0,
            max_x: 40.0,
            max_z: 20.0,
        };
        let buildings = vec![
            block(0.0, 0.0, 40.0, 5.9),   // south slab
            block(0.0, 14.0, 40.0, 20.0), // north slab
            block(32.0, 0.0, 40.0, 20.0), // cap across the band, east end
        ];
        let grid = OccupancyGrid::rasterize(&buildings, world, 2.0).unwrap();
        let cfg = DetectConfig {
            cell_size: 2.0,
            occupancy_threshold: 0.5,
            min_width_cells: 2,
            max_width_cells: 10,
            ..DetectConfig::default()
        };
        let corridors = detect(&grid, &cfg);
        let along_x: Vec<_> = corridors.iter().filter(|c| c.axis == Axis::X).collect();
        assert_eq!(along_x.len(), 1);
        let c = along_x[0];
        assert_eq!(c.center, 10.0);
        assert_eq!(c.width, 8.0);
        assert_eq!(c.start, 0.0);
        assert_eq!(c.end, 32.0); // stops where the cap begins
    }

    #[test]
    fn blocked_band_yields_no_corridor() {
        let world = Bounds {
            min_x: 0.0,
            min_z: 0.0,
            max_x: 20.0,
            max_z: 12.0,
        };
        // Three staggered strips keep every row of the band below
        // threshold while leaving no column fully clear, plus a solid
        // slab to close the valley.
        let buildings = vec![
            block(0.0, 0.0, 7.9, 1.9),   // row 0, cols 0-3
            block(8.0, 2.0, 13.9, 3.9),  // row 1, cols 4-6
            block(14.0, 4.0, 20.0, 5.9), // row 2, cols 7-9
            block(0.0, 6.0, 20.0, 12.0), // rows 3-5, solid
        ];
        let grid = OccupancyGrid::rasterize(&buildings, world, 2.0).unwrap();
        let cfg = DetectConfig {
            cell_size: 2.0,
            occupancy_threshold: 0.5,
            min_width_cells: 2,
            max_width_cells: 10,
            ..DetectConfig::default()
        };

        let row_valleys = find_valleys(&grid.row_profile(), &cfg);
        assert_eq!(row_valleys, vec![Valley { start: 0, end: 3 }]);
        assert!(CellCorridor::refine(&grid, Axis::X, row_valleys[0]).is_none());
    }
}
