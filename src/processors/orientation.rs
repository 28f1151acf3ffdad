//! Oriented bounding box of the selected chip body.

use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::{Candidate, OrientedBox};
use crate::processors::geometry::{MinAreaRect, Polygon};

/// Computes the normalised minimum-area box of a contour.
#[derive(Debug, Clone, Copy)]
pub struct OrientationSolver<'a> {
    config: &'a PipelineConfig,
}

impl<'a> OrientationSolver<'a> {
    /// Creates a solver for the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Solves the box for a selected candidate.
    pub fn solve_candidate(&self, candidate: &Candidate) -> PipelineResult<OrientedBox> {
        self.solve_rect(&candidate.rect)
    }

    /// Solves the box for an arbitrary contour.
    pub fn solve(&self, contour: &Polygon) -> PipelineResult<OrientedBox> {
        self.solve_rect(&contour.min_area_rect())
    }

    fn solve_rect(&self, rect: &MinAreaRect) -> PipelineResult<OrientedBox> {
        // Contour points are border pixel centres, one pixel short of the
        // covered extent on each axis.
        let covered = MinAreaRect {
            width: rect.width + 1.0,
            height: rect.height + 1.0,
            ..*rect
        };
        let oriented = OrientedBox::from_min_area_rect(&covered);

        debug!(
            raw_angle = rect.angle,
            angle = oriented.angle,
            width = oriented.width,
            height = oriented.height,
            cx = oriented.center.x,
            cy = oriented.center.y,
            "oriented box"
        );

        let min_side = self.config.min_box_side_px;
        if oriented.min_side() < min_side {
            return Err(PipelineError::DegenerateGeometry {
                width: oriented.width,
                height: oriented.height,
                min_side,
            });
        }

        Ok(oriented)
    }
}
