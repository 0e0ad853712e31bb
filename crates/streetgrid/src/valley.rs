//! Valley detection on 1-D occupancy profiles.
//!
//! A valley is a maximal run of profile indices below the occupancy
//! threshold whose length fits the accepted street width band. Runs
//! that are too short are noise; runs that are too long are open
//! areas (rivers, parks), not streets.

use crate::DetectConfig;

/// Half-open index interval `[start, end)` on one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valley {
    pub start: usize,
    pub end: usize,
}

impl Valley {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Scan a profile left to right for width-band valleys.
///
/// An index counts as occupied when its fraction is `>= threshold`.
/// The scan runs one index past the end with an implicit occupied
/// sentinel so a trailing valley closes correctly.
pub fn find_valleys(profile: &[f64], cfg: &DetectConfig) -> Vec<Valley> {
    let mut valleys = Vec::new();
    let mut run_start: Option<usize> = None;

    for i in 0..=profile.len() {
        let occupied = i == profile.len() || profile[i] >= cfg.occupancy_threshold;
        match (occupied, run_start) {
            (false, None) => run_start = Some(i),
            (true, Some(start)) => {
                let v = Valley { start, end: i };
                if v.len() >= cfg.min_width_cells && v.len() <= cfg.max_width_cells {
                    valleys.push(v);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    valleys
}
