//! End-to-end pipeline checks: raster -> profiles -> valleys ->
//! corridors -> interrupts -> dashes, on small hand-built cities.

use streetgrid::corridor;
use streetgrid::dashes::layout_dashes;
use streetgrid::grid::{Bounds, OccupancyGrid};
use streetgrid::{detect_streets, Axis, Building, DashConfig, DetectConfig};

fn block(min_x: f64, min_z: f64, max_x: f64, max_z: f64) -> Building {
    Building {
        vertices: vec![
            [min_x, min_z],
            [max_x, min_z],
            [max_x, max_z],
            [min_x, max_z],
        ],
        height: 30.0,
        color: "#708090".into(),
    }
}

/// 10x10 grid at 2 m cells, one footprint over columns 0-4 for all
/// rows: the other half of the map is a single 10 m valley.
#[test]
fn half_occupied_grid_yields_one_corridor() {
    let world = Bounds {
        min_x: 0.0,
        min_z: 0.0,
        max_x: 20.0,
        max_z: 20.0,
    };
    let buildings = vec![block(0.0, 0.0, 9.9, 20.0)];
    let grid = OccupancyGrid::rasterize(&buildings, world, 2.0).unwrap();

    assert_eq!(
        grid.column_profile(),
        vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    );

    let cfg = DetectConfig {
        cell_size: 2.0,
        occupancy_threshold: 0.15,
        min_width_cells: 4,
        max_width_cells: 20,
    };
    let corridors = corridor::detect(&grid, &cfg);

    // Columns 5-9 clear: one z-running corridor over the 10 m span.
    assert_eq!(corridors.len(), 1);
    let c = &corridors[0];
    assert_eq!(c.axis, Axis::Z);
    assert_eq!(c.center, 15.0);
    assert_eq!(c.width, 10.0);
    assert_eq!((c.start, c.end), (0.0, 20.0));
    assert!(c.interrupts.is_empty());

    // Width band excluding a 5-cell run finds nothing.
    let narrow = DetectConfig {
        max_width_cells: 4,
        ..cfg
    };
    assert!(corridor::detect(&grid, &narrow).is_empty());
}

/// Four city blocks separated by two crossing 10 m streets.
#[test]
fn crossing_streets_interrupt_each_other() {
    let buildings = vec![
        block(0.0, 0.0, 19.9, 19.9),
        block(30.0, 0.0, 50.0, 19.9),
        block(0.0, 30.0, 19.9, 50.0),
        block(30.0, 30.0, 50.0, 50.0),
    ];
    let cfg = DetectConfig::default();
    let corridors = detect_streets(&buildings, &cfg).unwrap();

    assert_eq!(corridors.len(), 2);
    let along_x = &corridors[0];
    let along_z = &corridors[1];
    assert_eq!(along_x.axis, Axis::X);
    assert_eq!(along_z.axis, Axis::Z);

    for c in &corridors {
        assert_eq!(c.center, 25.0);
        assert_eq!(c.width, 10.0);
        assert_eq!((c.start, c.end), (0.0, 50.0));
        // The other street's half-width window, centered on 25.
        assert_eq!(c.interrupts, vec![[20.0, 30.0]]);
    }

    // Dashes skip the intersection: two 20 m segments per corridor.
    let dash_cfg = DashConfig::default();
    let (center, edge) = layout_dashes(&corridors, &dash_cfg);
    assert_eq!(center.len(), 2 * 2 * 2); // 2 corridors x 2 segments x 2 dashes
    assert_eq!(edge.len(), 2 * center.len());
}

/// Re-running detection on unchanged input is byte-identical.
#[test]
fn detection_is_idempotent() {
    let buildings = vec![
        block(0.0, 0.0, 19.9, 19.9),
        block(30.0, 0.0, 50.0, 19.9),
        block(0.0, 30.0, 19.9, 50.0),
        block(30.0, 30.0, 50.0, 50.0),
        block(33.3, 21.7, 41.2, 28.4), // a stray shed in the street
    ];
    let cfg = DetectConfig::default();

    let first = detect_streets(&buildings, &cfg).unwrap();
    let second = detect_streets(&buildings, &cfg).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
