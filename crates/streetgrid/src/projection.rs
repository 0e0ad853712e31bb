//! Geographic to local-frame projection.
//!
//! Features arrive as lon/lat polygon rings with a roof height in
//! feet. We flatten them with an equirectangular approximation
//! anchored at the dataset centroid: cheap, and more than accurate
//! enough at city scale. An optional rotation aligns the local frame
//! with the dominant street-grid angle so the rest of the pipeline
//! can treat streets as axis-aligned.
//!
//! Output coordinates are rounded to millimetres so re-running the
//! conversion on identical input is bit-identical.

use crate::scene::Building;

/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 110_574.0;
/// Meters per degree of longitude at the equator; scaled by cos(lat).
const METERS_PER_DEG_LON_EQUATOR: f64 = 111_320.0;

const FEET_TO_METERS: f64 = 0.3048;

/// A feature as parsed from the input document, before validation.
#[derive(Debug, Clone)]
pub struct RawFeature {
    /// Outer polygon ring, `[lon, lat]` pairs. Holes are ignored
    /// upstream.
    pub ring: Vec<[f64; 2]>,
    /// Roof height in feet, if the attribute parsed as a number.
    pub height_ft: Option<f64>,
    pub color: String,
}

/// Round to the fixed sub-centimeter lattice (millimetres).
#[inline]
pub fn round_mm(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Mean lon/lat over every ring vertex of every feature.
pub fn dataset_center(features: &[RawFeature]) -> Option<[f64; 2]> {
    let mut sum_lon = 0.0;
    let mut sum_lat = 0.0;
    let mut n = 0usize;
    for f in features {
        for &[lon, lat] in &f.ring {
            if lon.is_finite() && lat.is_finite() {
                sum_lon += lon;
                sum_lat += lat;
                n += 1;
            }
        }
    }
    if n == 0 {
        return None;
    }
    Some([sum_lon / n as f64, sum_lat / n as f64])
}

/// Projects lon/lat onto a local planar metric frame.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    lon0: f64,
    lat0: f64,
    meters_per_deg_lon: f64,
    sin_a: f64,
    cos_a: f64,
}

impl Projector {
    /// `center` is `[lon, lat]` of the anchor; `angle_deg` rotates the
    /// frame so the street grid lands on the axes (0 = no rotation).
    pub fn new(center: [f64; 2], angle_deg: f64) -> Self {
        let lat0 = center[1];
        let meters_per_deg_lon =
            METERS_PER_DEG_LON_EQUATOR * lat0.to_radians().cos().abs().max(1e-6);
        let (sin_a, cos_a) = angle_deg.to_radians().sin_cos();
        Self {
            lon0: center[0],
            lat0,
            meters_per_deg_lon,
            sin_a,
            cos_a,
        }
    }

    /// Project a single lon/lat pair to local `[x, z]` meters,
    /// rotated and rounded.
    #[inline]
    pub fn project(&self, lon: f64, lat: f64) -> [f64; 2] {
        let x = (lon - self.lon0) * self.meters_per_deg_lon;
        let z = (lat - self.lat0) * METERS_PER_DEG_LAT;
        let xr = x * self.cos_a - z * self.sin_a;
        let zr = x * self.sin_a + z * self.cos_a;
        [round_mm(xr), round_mm(zr)]
    }

    /// Convert one raw feature to a building footprint.
    ///
    /// Returns `None` when the feature must be dropped: empty or
    /// non-finite ring, or a height that is missing, non-finite, or
    /// not strictly positive.
    pub fn convert(&self, feature: &RawFeature) -> Option<Building> {
        let height_ft = feature.height_ft?;
        if !height_ft.is_finite() || height_ft <= 0.0 {
            return None;
        }

        let mut vertices = Vec::with_capacity(feature.ring.len());
        for &[lon, lat] in &feature.ring {
            if !lon.is_finite() || !lat.is_finite() {
                return None;
            }
            vertices.push(self.project(lon, lat));
        }
        if vertices.len() < 3 {
            return None;
        }

        Some(Building {
            vertices,
            height: round_mm(height_ft * FEET_TO_METERS),
            color: feature.color.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(ring: Vec<[f64; 2]>, height_ft: Option<f64>) -> RawFeature {
        RawFeature {
            ring,
            height_ft,
            color: "#808080".into(),
        }
    }

    #[test]
    fn projection_is_metric_near_anchor() {
        let p = Projector::new([0.0, 0.0], 0.0);
        // One degree of latitude at the anchor.
        let [x, z] = p.project(0.0, 1.0);
        assert_eq!(x, 0.0);
        assert!((z - METERS_PER_DEG_LAT).abs() < 1e-6);
    }

    #[test]
    fn rotation_by_90_degrees_swaps_axes() {
        let p = Projector::new([0.0, 0.0], 90.0);
        let [x, z] = p.project(0.0, 1e-4); // ~11 m north
        assert!((z).abs() < 1e-3);
        assert!(x < -10.0); // north maps onto -x after a +90 rotation
    }

    #[test]
    fn invalid_heights_drop_the_feature() {
        let ring = vec![[0.0, 0.0], [1e-4, 0.0], [1e-4, 1e-4]];
        let p = Projector::new([0.0, 0.0], 0.0);
        assert!(p.convert(&feature(ring.clone(), Some(40.0))).is_some());
        assert!(p.convert(&feature(ring.clone(), Some(0.0))).is_none());
        assert!(p.convert(&feature(ring.clone(), Some(f64::NAN))).is_none());
        assert!(p.convert(&feature(ring, None)).is_none());
    }

    #[test]
    fn reprojection_is_bit_identical() {
        let ring = vec![[-74.01, 40.71], [-74.009, 40.71], [-74.009, 40.711]];
        let feats = vec![feature(ring, Some(120.0))];
        let center = dataset_center(&feats).unwrap();
        let p = Projector::new(center, 29.0);
        let a = p.convert(&feats[0]).unwrap();
        let b = p.convert(&feats[0]).unwrap();
        assert_eq!(a, b);
        // Millimetre lattice: scaling by 1000 yields whole numbers.
        for v in &a.vertices {
            assert_eq!(v[0] * 1000.0, (v[0] * 1000.0).round());
            assert_eq!(v[1] * 1000.0, (v[1] * 1000.0).round());
        }
    }
}
