//! Scene document model.
//!
//! This is the wire format consumed by the rendering engine: map
//! settings, extruded building footprints, and (optionally) the
//! detected street corridors. Field names are camelCase on the wire.
//! All linear units are meters; coordinates are local-frame, centered
//! on the dataset centroid or on a tile rectangle's midpoint.

use serde::{Deserialize, Serialize};

use crate::corridor::Corridor;
use crate::grid::Bounds;

/// Global map settings for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapSettings {
    /// Ground plane extent along x, meters.
    pub width: f64,
    /// Ground plane extent along z, meters.
    pub depth: f64,
    /// Ground color, CSS hex.
    pub color: String,
    pub sky_color: String,
}

/// One extruded building footprint.
///
/// Vertices are `[x, z]` pairs in the local frame, first ring only,
/// not closed (the last vertex does not repeat the first). Immutable
/// once converted from the raw feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub vertices: Vec<[f64; 2]>,
    /// Roof height in meters. Features with zero or unparseable
    /// heights are dropped before a `Building` is ever constructed.
    pub height: f64,
    pub color: String,
}

impl Building {
    /// Axis-aligned bounding box of the footprint, or `None` for an
    /// empty or non-finite ring.
    pub fn bbox(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter().copied())
    }

    /// Footprint centroid (vertex mean), or `None` for an empty ring.
    pub fn centroid(&self) -> Option<[f64; 2]> {
        if self.vertices.is_empty() {
            return None;
        }
        let n = self.vertices.len() as f64;
        let (sx, sz) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(ax, az), v| (ax + v[0], az + v[1]));
        Some([sx / n, sz / n])
    }
}

/// The full output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDoc {
    pub map: MapSettings,

    /// Tile mode only: seamless tile extent along x.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_width: Option<f64>,

    /// Tile mode only: seamless tile extent along z.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_depth: Option<f64>,

    /// Tile mode only: rotation applied to align the street grid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_angle_deg: Option<f64>,

    pub buildings: Vec<Building>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streets: Option<Vec<Corridor>>,
}

impl SceneDoc {
    /// Install freshly detected corridors, leaving every other field
    /// untouched. Re-running detection only ever overwrites `streets`.
    pub fn replace_streets(&mut self, corridors: Vec<Corridor>) {
        self.streets = Some(corridors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corridor::Axis;

    fn doc() -> SceneDoc {
        SceneDoc {
            map: MapSettings {
                width: 100.0,
                depth: 200.0,
                color: "#333333".into(),
                sky_color: "#87ceeb".into(),
            },
            tile_width: None,
            tile_depth: None,
            grid_angle_deg: None,
            buildings: vec![Building {
                vertices: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
                height: 12.5,
                color: "#888888".into(),
            }],
            streets: None,
        }
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_string(&doc()).unwrap();
        assert!(!json.contains("tileWidth"));
        assert!(!json.contains("streets"));
        assert!(json.contains("skyColor"));
    }

    #[test]
    fn replace_streets_preserves_everything_else() {
        let mut d = doc();
        d.replace_streets(vec![Corridor {
            axis: Axis::Z,
            center: 5.0,
            width: 8.0,
            start: -50.0,
            end: 50.0,
            interrupts: vec![],
        }]);
        assert_eq!(d.buildings.len(), 1);
        assert_eq!(d.streets.as_ref().unwrap().len(), 1);

        let json = serde_json::to_string(&d).unwrap();
        let back: SceneDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn centroid_of_square() {
        let b = doc().buildings.remove(0);
        assert_eq!(b.centroid(), Some([5.0, 5.0]));
    }
}
