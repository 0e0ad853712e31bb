use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use rayon::prelude::*;
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use streetgrid::cliprect;
use streetgrid::dashes::layout_dashes;
use streetgrid::grid::Bounds;
use streetgrid::projection::{dataset_center, Projector, RawFeature};
use streetgrid::{
    detect_streets, Building, DashConfig, DetectConfig, MapSettings, SceneDoc, TileConfig,
};

/// Default fill colors cycled across buildings without their own.
const BUILDING_COLORS: [&str; 7] = [
    "#8d99ae", "#a8a29e", "#9ca3af", "#b0a695", "#94a3b8", "#a1a1aa", "#8e9aaf",
];

#[derive(Parser, Debug, Clone)]
#[command(name = "geo2scene", version)]
struct Args {
    /// Input GeoJSON FeatureCollection of building footprints.
    #[arg(long, default_value = "footprints.geojson")]
    input: String,

    /// Output scene document path.
    #[arg(long, default_value = "scene.json")]
    output: String,

    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Recompute only the `streets` field of an existing scene
    /// document (written back in place). Skips conversion entirely.
    #[arg(long)]
    refresh_streets: Option<String>,

    /// Rasterizer cell size, meters.
    #[arg(long, default_value_t = 2.0)]
    cell_size: f64,

    /// Profile fraction at or above which a cell line counts as occupied.
    #[arg(long, default_value_t = 0.15)]
    occupancy_threshold: f64,

    /// Narrowest accepted street width, in cells.
    #[arg(long, default_value_t = 4)]
    min_width_cells: usize,

    /// Widest accepted street width, in cells.
    #[arg(long, default_value_t = 20)]
    max_width_cells: usize,

    /// Rotation applied during projection so the street grid lands on
    /// the axes (degrees, counterclockwise).
    #[arg(long, default_value_t = 0.0)]
    grid_angle_deg: f64,

    /// Clip the scene to the largest seamlessly tiling rectangle.
    #[arg(long, default_value_t = false)]
    tile: bool,

    /// Coarse cell size for the tile rectangle search, meters.
    #[arg(long, default_value_t = 40.0)]
    tile_cell_size: f64,

    /// Morphological closing passes over the coarse matrix.
    #[arg(long, default_value_t = 2)]
    tile_closing_passes: usize,

    // Dash cadence. Instances are recomputed by the renderer on every
    // load; the CLI only reports the counts the layout would produce.
    #[arg(long, default_value_t = 3.0)]
    center_dash_len: f64,
    #[arg(long, default_value_t = 6.0)]
    center_gap: f64,
    #[arg(long, default_value_t = 0.35)]
    center_width: f64,
    #[arg(long, default_value_t = 3.0)]
    edge_dash_len: f64,
    #[arg(long, default_value_t = 6.0)]
    edge_gap: f64,
    #[arg(long, default_value_t = 0.25)]
    edge_width: f64,

    #[arg(long, default_value = "#2b2b2b")]
    map_color: String,

    #[arg(long, default_value = "#87ceeb")]
    sky_color: String,
}

impl Args {
    fn detect_config(&self) -> DetectConfig {
        DetectConfig {
            cell_size: self.cell_size,
            occupancy_threshold: self.occupancy_threshold,
            min_width_cells: self.min_width_cells,
            max_width_cells: self.max_width_cells,
        }
    }

    fn dash_config(&self) -> DashConfig {
        DashConfig {
            center_dash_len: self.center_dash_len,
            center_gap: self.center_gap,
            center_width: self.center_width,
            edge_dash_len: self.edge_dash_len,
            edge_gap: self.edge_gap,
            edge_width: self.edge_width,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<serde_json::Value>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    /// Roof height in feet. The source dataset exports it as a
    /// string attribute, so accept both representations.
    height_ft: Option<serde_json::Value>,
    color: Option<String>,
}

/// Outer ring of a GeoJSON Polygon, closing duplicate stripped.
/// Anything else (missing geometry, MultiPolygon, short ring,
/// non-numeric coordinates) yields `None` and the feature is skipped.
fn outer_ring(geometry: &serde_json::Value) -> Option<Vec<[f64; 2]>> {
    let ring = geometry.get("coordinates")?.get(0)?.as_array()?;
    let mut out = Vec::with_capacity(ring.len());
    for vertex in ring {
        let pair = vertex.as_array()?;
        out.push([pair.first()?.as_f64()?, pair.get(1)?.as_f64()?]);
    }
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    (out.len() >= 3).then_some(out)
}

fn parse_height_ft(value: Option<&serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parse the feature collection into raw features, skipping and
/// counting anything without a usable polygon ring.
fn load_features(path: &str) -> Result<Vec<RawFeature>> {
    let file = File::open(path).with_context(|| format!("opening {path}"))?;
    let root: FeatureCollection =
        serde_json::from_reader(BufReader::new(file)).context("parsing feature collection")?;

    let total = root.features.len();
    let mut raw = Vec::with_capacity(total);
    for (index, feature) in root.features.iter().enumerate() {
        let Some(ring) = feature.geometry.as_ref().and_then(outer_ring) else {
            continue;
        };
        let color = feature
            .properties
            .color
            .clone()
            .unwrap_or_else(|| BUILDING_COLORS[index % BUILDING_COLORS.len()].to_string());
        raw.push(RawFeature {
            ring,
            height_ft: parse_height_ft(feature.properties.height_ft.as_ref()),
            color,
        });
    }

    let skipped = total - raw.len();
    if skipped > 0 {
        warn!("skipped {skipped} of {total} features with no usable polygon ring");
    }
    Ok(raw)
}

/// Project every feature into the local frame. Features are
/// independent, so the conversion shards cleanly across threads.
fn project_features(raw: &[RawFeature], angle_deg: f64) -> Result<Vec<Building>> {
    let center = dataset_center(raw).context("no finite coordinates in input")?;
    info!(
        "projection anchor lon {:.6} lat {:.6}, grid angle {:.1} deg",
        center[0], center[1], angle_deg
    );

    let projector = Projector::new(center, angle_deg);
    let converted: Vec<Option<Building>> =
        raw.par_iter().map(|f| projector.convert(f)).collect();

    let dropped = converted.iter().filter(|b| b.is_none()).count();
    if dropped > 0 {
        warn!("dropped {dropped} features with zero or unparseable height");
    }
    Ok(converted.into_iter().flatten().collect())
}

fn write_scene(path: &str, overwrite: bool, doc: &SceneDoc) -> Result<()> {
    if Path::new(path).exists() && !overwrite {
        bail!("{path} exists; pass --overwrite to replace it");
    }
    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    serde_json::to_writer(BufWriter::new(file), doc).context("writing scene document")?;
    Ok(())
}

/// `--refresh-streets`: recompute corridors from an existing scene's
/// buildings and overwrite only the `streets` field.
fn refresh_streets(scene_path: &str, detect_cfg: &DetectConfig, dash_cfg: &DashConfig) -> Result<()> {
    let file = File::open(scene_path).with_context(|| format!("opening {scene_path}"))?;
    let mut doc: SceneDoc =
        serde_json::from_reader(BufReader::new(file)).context("parsing scene document")?;

    let corridors = detect_streets(&doc.buildings, detect_cfg)?;
    report_dashes(&corridors, dash_cfg);
    doc.replace_streets(corridors);

    let file = File::create(scene_path).with_context(|| format!("rewriting {scene_path}"))?;
    serde_json::to_writer(BufWriter::new(file), &doc).context("writing scene document")?;
    info!(
        "refreshed streets in {scene_path}: {} corridors",
        doc.streets.as_ref().map_or(0, Vec::len)
    );
    Ok(())
}

fn report_dashes(corridors: &[streetgrid::Corridor], cfg: &DashConfig) {
    let (center, edge) = layout_dashes(corridors, cfg);
    info!(
        "dash layout: {} center and {} edge instances",
        center.len(),
        edge.len()
    );
}

fn convert(args: &Args) -> Result<()> {
    let raw = load_features(&args.input)?;
    if raw.is_empty() {
        bail!("{}: no usable features", args.input);
    }

    let mut buildings = project_features(&raw, args.grid_angle_deg)?;
    if buildings.is_empty() {
        bail!("{}: every feature was dropped", args.input);
    }
    info!("converted {} buildings", buildings.len());

    let mut tile_size: Option<(f64, f64)> = None;
    if args.tile {
        let bounds = Bounds::of_buildings(&buildings).context("empty building set")?;
        let tile_cfg = TileConfig {
            coarse_cell_size: args.tile_cell_size,
            closing_passes: args.tile_closing_passes,
        };
        match cliprect::find_tile_rect(&buildings, bounds, &tile_cfg)? {
            Some(rect) => {
                buildings = cliprect::clip_to_rect(&buildings, &rect);
                if buildings.is_empty() {
                    bail!("tile rectangle contains no building centroids");
                }
                info!(
                    "clipped to tile {:.1} x {:.1} m, {} buildings kept",
                    rect.width(),
                    rect.depth(),
                    buildings.len()
                );
                tile_size = Some((rect.width(), rect.depth()));
            }
            None => warn!("no occupied coarse cells; tile clip skipped"),
        }
    }

    let corridors = detect_streets(&buildings, &args.detect_config())?;
    report_dashes(&corridors, &args.dash_config());

    let bounds = Bounds::of_buildings(&buildings).context("empty building set")?;
    let (map_width, map_depth) = match tile_size {
        Some((w, d)) => (w, d),
        None => (bounds.width().ceil(), bounds.depth().ceil()),
    };

    let mut doc = SceneDoc {
        map: MapSettings {
            width: map_width,
            depth: map_depth,
            color: args.map_color.clone(),
            sky_color: args.sky_color.clone(),
        },
        tile_width: tile_size.map(|(w, _)| w),
        tile_depth: tile_size.map(|(_, d)| d),
        grid_angle_deg: tile_size.map(|_| args.grid_angle_deg),
        buildings,
        streets: None,
    };
    doc.replace_streets(corridors);

    write_scene(&args.output, args.overwrite, &doc)?;
    info!(
        "wrote {}: {} buildings, {} streets",
        args.output,
        doc.buildings.len(),
        doc.streets.as_ref().map_or(0, Vec::len)
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(scene_path) = &args.refresh_streets {
        return refresh_streets(scene_path, &args.detect_config(), &args.dash_config());
    }
    convert(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outer_ring_strips_closing_duplicate() {
        let geom = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(
            outer_ring(&geom),
            Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]])
        );
    }

    #[test]
    fn outer_ring_rejects_short_or_malformed() {
        assert_eq!(outer_ring(&json!({"type": "Polygon"})), None);
        assert_eq!(
            outer_ring(&json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]})),
            None
        );
        assert_eq!(
            outer_ring(&json!({"type": "Polygon", "coordinates": [[[0, "x"], [1, 1], [2, 2]]]})),
            None
        );
    }

    #[test]
    fn height_parses_numbers_and_strings() {
        assert_eq!(parse_height_ft(Some(&json!(42.5))), Some(42.5));
        assert_eq!(parse_height_ft(Some(&json!(" 120 "))), Some(120.0));
        assert_eq!(parse_height_ft(Some(&json!("n/a"))), None);
        assert_eq!(parse_height_ft(Some(&json!(null))), None);
        assert_eq!(parse_height_ft(None), None);
    }
}
