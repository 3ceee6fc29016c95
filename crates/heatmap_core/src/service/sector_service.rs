//! Sector progress aggregation.
//!
//! # Responsibility
//! - Collapse per-team activity stages of one sector into one value.
//! - Apply the pinch remap so partial progress stays visually distinct from
//!   the empty/full extremes.
//!
//! # Invariants
//! - Aggregation is pure: same sector, teams and progress give the same value.
//! - A missing team stage or an undefined stage title counts as `0.0`.
//! - A sector without activities has no value (`None`), never NaN.

use crate::model::sector::Sector;
use crate::model::team::TeamName;
use crate::repo::progress_repo::TeamProgressSource;
use log::debug;

/// Lower bound of the pinched interior range.
pub const PINCH_MIN: f64 = 0.08;
/// Upper bound of the pinched interior range.
pub const PINCH_MAX: f64 = 0.8;

/// Maps `(0, 1)` into `(min, max)` and keeps `0` and `1` exact.
pub fn pinch(min: f64, max: f64, value: f64) -> f64 {
    if value == 0.0 || value == 1.0 {
        value
    } else {
        value * (max - min) + min
    }
}

/// Computes sector progress over the currently visible teams.
#[derive(Debug, Clone, Default)]
pub struct SectorService {
    all_teams: Vec<TeamName>,
    visible_teams: Vec<TeamName>,
}

impl SectorService {
    pub fn new(all_teams: Vec<TeamName>) -> Self {
        Self {
            all_teams,
            visible_teams: Vec::new(),
        }
    }

    /// Restricts aggregation to `teams`; an empty list means every team.
    pub fn set_visible_teams(&mut self, teams: Vec<TeamName>) {
        debug!(
            "event=visible_teams module=sector status=ok count={}",
            teams.len()
        );
        self.visible_teams = teams;
    }

    /// Teams the aggregation currently runs over.
    pub fn effective_teams(&self) -> &[TeamName] {
        if self.visible_teams.is_empty() {
            &self.all_teams
        } else {
            &self.visible_teams
        }
    }

    /// Mean stage score over every (activity, team) pair, pinched.
    ///
    /// Returns `None` for a sector without activities. With activities but
    /// no teams the sector reads as `0.0`.
    pub fn sector_progress(
        &self,
        sector: &Sector,
        progress: &impl TeamProgressSource,
    ) -> Option<f64> {
        if sector.activities.is_empty() {
            return None;
        }
        let teams = self.effective_teams();
        if teams.is_empty() {
            return Some(0.0);
        }

        let mut total = 0.0;
        let mut count = 0usize;
        for activity in &sector.activities {
            for team in teams {
                total += progress
                    .team_activity_title(activity.uuid, team)
                    .and_then(|title| progress.title_score(&title))
                    .filter(|score| score.is_finite())
                    .unwrap_or(0.0);
                count += 1;
            }
        }

        let mean = (total / count as f64).clamp(0.0, 1.0);
        Some(pinch(PINCH_MIN, PINCH_MAX, mean))
    }
}
