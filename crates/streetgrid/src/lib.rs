//! streetgrid: offline street-network extraction from building
//! footprints.
//!
//! The pipeline is a pure batch transform, strictly downstream:
//!
//! ```text
//! lon/lat polygons -> projected vertices -> occupancy grid
//!   -> axis profiles -> valleys -> corridors
//!   -> (independently) tile rectangle
//!   -> dash instances
//! ```
//!
//! - [`projection`]: geographic coordinates to a local metric frame,
//!   optionally rotated onto the dominant street-grid angle.
//! - [`grid`]: bounding-box rasterization and 1-D occupancy profiles.
//! - [`valley`]: threshold + run-length street candidates.
//! - [`corridor`]: extent refinement and intersection interrupts.
//! - [`cliprect`]: largest-rectangle tile clipping.
//! - [`dashes`]: deterministic dash instance layout.
//! - [`scene`]: the JSON document consumed by the renderer.
//!
//! Every stage returns a structured, possibly-empty result; malformed
//! features are skipped and counted, degenerate geometry surfaces as
//! [`Error`], and infeasible parameters simply yield empty output.

pub mod cliprect;
pub mod corridor;
pub mod dashes;
pub mod grid;
pub mod projection;
pub mod scene;
pub mod valley;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub use corridor::{Axis, Corridor};
pub use dashes::{DashInstance, StreetLayer};
pub use grid::{Bounds, OccupancyGrid};
pub use scene::{Building, MapSettings, SceneDoc};

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("no usable footprints in input")]
    EmptyScene,

    #[error("degenerate world bounds ({width} x {depth} m)")]
    DegenerateBounds { width: f64, depth: f64 },

    #[error("cell size must be a positive finite number, got {0}")]
    BadCellSize(f64),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Corridor detection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Rasterizer cell size, meters.
    pub cell_size: f64,
    /// Profile fraction at or above which an index counts as occupied.
    pub occupancy_threshold: f64,
    /// Narrowest run accepted as a street, in cells.
    pub min_width_cells: usize,
    /// Widest run accepted as a street, in cells.
    pub max_width_cells: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            occupancy_threshold: 0.15,
            min_width_cells: 4,
            max_width_cells: 20,
        }
    }
}

/// Tile clipping tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileConfig {
    /// Coarse centroid-raster cell size, meters. Larger than the
    /// rasterizer's cell to bound the rectangle search.
    pub coarse_cell_size: f64,
    /// Morphological closing passes before the search.
    pub closing_passes: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            coarse_cell_size: 40.0,
            closing_passes: 2,
        }
    }
}

/// Dash cadence tunables, center and edge variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashConfig {
    pub center_dash_len: f64,
    pub center_gap: f64,
    pub center_width: f64,
    pub edge_dash_len: f64,
    pub edge_gap: f64,
    pub edge_width: f64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            center_dash_len: 3.0,
            center_gap: 6.0,
            center_width: 0.35,
            edge_dash_len: 3.0,
            edge_gap: 6.0,
            edge_width: 0.25,
        }
    }
}

/// Run corridor detection over a converted building set.
///
/// World bounds are the union of the footprint bounding boxes, so
/// identical input always produces an identical grid and identical
/// streets. Infeasible thresholds or width bands return an empty
/// list, not an error.
pub fn detect_streets(buildings: &[Building], cfg: &DetectConfig) -> Result<Vec<Corridor>> {
    let bounds = Bounds::of_buildings(buildings).ok_or(Error::EmptyScene)?;
    let grid = OccupancyGrid::rasterize(buildings, bounds, cfg.cell_size)?;
    Ok(corridor::detect(&grid, cfg))
}
