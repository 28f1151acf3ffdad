//! Picks the chip body among the detected contours.

use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::Candidate;
use crate::processors::geometry::Polygon;

/// Ranks contours and returns the most plausible chip body.
///
/// Contours whose extent (area over minimum-box area) is below the
/// rectangularity threshold are dropped. Among the rest the largest area
/// wins; when two areas are within `area_tie_tolerance` of each other the one
/// closer to the frame center wins.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSelector<'a> {
    config: &'a PipelineConfig,
}

impl<'a> CandidateSelector<'a> {
    /// Creates a selector for the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Selects one candidate among `contours`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoPlausibleChip`] when no contour passes the
    /// rectangularity threshold (including when `contours` is empty).
    pub fn select(
        &self,
        contours: Vec<Polygon>,
        frame_width: u32,
        frame_height: u32,
    ) -> PipelineResult<Candidate> {
        let total = contours.len();
        let threshold = self.config.rectangularity_threshold;
        let mut best_extent = 0.0f32;
        let mut best: Option<Candidate> = None;

        for contour in contours {
            let candidate = Candidate::from_contour(contour, frame_width, frame_height);
            best_extent = best_extent.max(candidate.extent);

            if candidate.extent < threshold {
                debug!(
                    area = candidate.area,
                    extent = candidate.extent,
                    "candidate rejected as not rectangular"
                );
                continue;
            }

            best = match best {
                Some(current) if !self.beats(&candidate, &current) => Some(current),
                _ => Some(candidate),
            };
        }

        let Some(selected) = best else {
            return Err(PipelineError::NoPlausibleChip {
                candidates: total,
                best_extent,
                threshold,
            });
        };

        debug!(
            candidates = total,
            area = selected.area,
            extent = selected.extent,
            aspect_ratio = selected.aspect_ratio,
            center_distance = selected.center_distance,
            "candidate selected"
        );
        Ok(selected)
    }

    /// Whether `challenger` ranks strictly above `current`.
    fn beats(&self, challenger: &Candidate, current: &Candidate) -> bool {
        let larger = challenger.area.max(current.area);
        let tied = (challenger.area - current.area).abs() <= self.config.area_tie_tolerance * larger;
        if tied {
            challenger.center_distance < current.center_distance
        } else {
            challenger.area > current.area
        }
    }
}
