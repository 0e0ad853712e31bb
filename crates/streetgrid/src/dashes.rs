//! Dash instance layout.
//!
//! Turns finished corridors plus a dash cadence into placed, oriented
//! instance transforms for center and edge lines. Instances are never
//! persisted; the renderer recomputes them on every scene load, so
//! the layout must be deterministic: corridors in order, segments in
//! order, offsets in order, left edge before right.

use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

use crate::corridor::{Axis, Corridor};
use crate::DashConfig;

/// One placed piece of repeated line geometry.
///
/// The source mesh is a unit quad running along +z; `scale` stretches
/// it to (line width, 1, dash length) and `rotation` turns it for
/// x-running corridors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashInstance {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

/// Dashes for one rebuilt scene: center line and edge line instances.
#[derive(Debug, Clone, Default)]
pub struct StreetLayer {
    center: Vec<DashInstance>,
    edge: Vec<DashInstance>,
}

impl StreetLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all prior geometry and lay out dashes for the given
    /// corridors. Owning the instances here (instead of module-level
    /// mesh references) makes reloads a plain value swap.
    pub fn rebuild(&mut self, corridors: &[Corridor], cfg: &DashConfig) {
        let (center, edge) = layout_dashes(corridors, cfg);
        self.center = center;
        self.edge = edge;
    }

    pub fn center_dashes(&self) -> &[DashInstance] {
        &self.center
    }

    pub fn edge_dashes(&self) -> &[DashInstance] {
        &self.edge
    }
}

/// Extent minus interrupts, as sorted `(start, end)` spans.
///
/// Interrupts must already be sorted ascending and non-overlapping,
/// which `accumulate_interrupts` guarantees.
pub fn clear_segments(corridor: &Corridor) -> Vec<(f64, f64)> {
    let mut segments = Vec::with_capacity(corridor.interrupts.len() + 1);
    let mut cursor = corridor.start;
    for &[a, b] in &corridor.interrupts {
        if a > cursor {
            segments.push((cursor, a));
        }
        cursor = cursor.max(b);
    }
    if cursor < corridor.end {
        segments.push((cursor, corridor.end));
    }
    segments
}

/// Dashes that fit a segment: `floor((len + gap) / (dash + gap))`.
/// A segment shorter than one dash yields zero; never negative, and
/// no partial dash is ever emitted.
#[inline]
fn dash_count(segment_len: f64, dash_len: f64, gap: f64) -> usize {
    if segment_len < dash_len {
        return 0;
    }
    ((segment_len + gap) / (dash_len + gap)).floor() as usize
}

#[inline]
fn orientation(axis: Axis) -> Quat {
    match axis {
        // x-running corridors turn the dash quad 90 degrees about
        // the vertical; z-running corridors use it as authored.
        Axis::X => Quat::from_rotation_y(FRAC_PI_2),
        Axis::Z => Quat::IDENTITY,
    }
}

#[inline]
fn place(axis: Axis, along: f64, across: f64) -> Vec3 {
    match axis {
        Axis::X => Vec3::new(along as f32, 0.0, across as f32),
        Axis::Z => Vec3::new(across as f32, 0.0, along as f32),
    }
}

/// Count-then-populate dash layout.
///
/// The first pass computes the exact instance totals so the vectors
/// are sized once; the second pass fills them in deterministic order.
pub fn layout_dashes(
    corridors: &[Corridor],
    cfg: &DashConfig,
) -> (Vec<DashInstance>, Vec<DashInstance>) {
    let mut center_total = 0usize;
    let mut edge_total = 0usize;
    for corridor in corridors {
        for (s, e) in clear_segments(corridor) {
            center_total += dash_count(e - s, cfg.center_dash_len, cfg.center_gap);
            edge_total += 2 * dash_count(e - s, cfg.edge_dash_len, cfg.edge_gap);
        }
    }

    let mut center = Vec::with_capacity(center_total);
    let mut edge = Vec::with_capacity(edge_total);

    for corridor in corridors {
        let rotation = orientation(corridor.axis);
        let center_scale = Vec3::new(
            cfg.center_width as f32,
            1.0,
            cfg.center_dash_len as f32,
        );
        let edge_scale = Vec3::new(cfg.edge_width as f32, 1.0, cfg.edge_dash_len as f32);
        let half_width = 0.5 * corridor.width;

        for (seg_start, seg_end) in clear_segments(corridor) {
            let len = seg_end - seg_start;

            let n = dash_count(len, cfg.center_dash_len, cfg.center_gap);
            let step = cfg.center_dash_len + cfg.center_gap;
            for k in 0..n {
                let along = seg_start + 0.5 * cfg.center_dash_len + k as f64 * step;
                center.push(DashInstance {
                    position: place(corridor.axis, along, corridor.center),
                    rotation,
                    scale: center_scale,
                });
            }

            let n = dash_count(len, cfg.edge_dash_len, cfg.edge_gap);
            let step = cfg.edge_dash_len + cfg.edge_gap;
            for k in 0..n {
                let along = seg_start + 0.5 * cfg.edge_dash_len + k as f64 * step;
                for side in [-half_width, half_width] {
                    edge.push(DashInstance {
                        position: place(corridor.axis, along, corridor.center + side),
                        rotation,
                        scale: edge_scale,
                    });
                }
            }
        }
    }

    debug_assert_eq!(center.len(), center_total);
    debug_assert_eq!(edge.len(), edge_total);
    (center, edge)
}
