//! Projection-profile refinement of the chip box.
//!
//! Leads stick out of the package body as thin, sparse structures. Once the
//! mask is levelled, every row crossing the body is almost fully foreground
//! while rows crossing only leads are not, so the body is the run of rows
//! (and columns) whose foreground count stays near the peak. How near
//! depends on the package: the profile shape tells a square QFP from a
//! long DIP, and each family gets its own cut-offs.

use std::ops::RangeInclusive;

use image::GrayImage;
use tracing::debug;

use crate::core::config::{ProfileRefinement, ThresholdSelection};
use crate::domain::{ChipBody, ForegroundMask, OrientedBox, PackageClass};
use crate::processors::geometry::Point;
use crate::utils::transform::{CropWindow, crop_window, rotate_mask, rotation_about};

/// Cut-off of the profile range used to estimate the solid body.
const CORE_RATIO: f32 = 0.90;
/// Cut-off of the profile range that still includes the leads.
const SHOULDER_RATIO: f32 = 0.50;
/// Bodies with a long/short ratio below this are square packages.
const SQUARE_ASPECT: f32 = 1.35;
/// Bodies with a long/short ratio above this are DIPs.
const DIP_ASPECT: f32 = 2.7;
/// Shoulder over core span across the short axis above which leads dominate.
const DIP_SHORT_SLOPE: f32 = 1.22;
/// Shoulder over core span along the long axis above which end leads show.
const WIDE_SOIC_LONG_SLOPE: f32 = 1.10;
/// Share of the box height in the lead band above which DIP leads are long.
const LONG_LEAD_TAIL: f32 = 0.25;

/// Tightens `oriented` to the solid body visible in `mask`.
///
/// The mask is levelled with the same rotation the crop will use, inside a
/// window of the box size plus `search_padding_px` per side. Leads leave a
/// package across its long sides, so the short axis is bounded first, from
/// the profile counted along the long axis. The long axis is then bounded
/// from counts taken only inside that band, so leads never outweigh the
/// body. The angle is kept; the refined center is mapped back to frame
/// coordinates.
///
/// When the window holds no foreground, or a refined side would be shorter
/// than `min_side`, the detected box is returned unrefined.
pub fn refine_box(
    mask: &ForegroundMask,
    oriented: &OrientedBox,
    refinement: &ProfileRefinement,
    min_side: f32,
) -> ChipBody {
    match refine(mask, oriented, refinement, min_side) {
        Some(body) => body,
        None => {
            debug!(
                width = oriented.width,
                height = oriented.height,
                "no usable profile, keeping detected box"
            );
            ChipBody::unrefined(*oriented)
        }
    }
}

fn refine(
    mask: &ForegroundMask,
    oriented: &OrientedBox,
    refinement: &ProfileRefinement,
    min_side: f32,
) -> Option<ChipBody> {
    let levelled = rotate_mask(mask.as_image(), oriented.center, oriented.angle);
    let padding = 2.0 * refinement.search_padding_px as f32;
    let window = crop_window(
        oriented.center,
        oriented.width + padding,
        oriented.height + padding,
        levelled.dimensions(),
    );

    let view = LevelledView {
        mask: &levelled,
        window,
        long_axis_vertical: oriented.height > oriented.width,
    };
    let (short_side, long_side) = if view.long_axis_vertical {
        (oriented.width, oriented.height)
    } else {
        (oriented.height, oriented.width)
    };

    let across = view.short_profile();
    let (core_start, core_end) = dominant_range(&across, CORE_RATIO)?;

    let (short_ratio, long_ratio, package) = match refinement.selection {
        ThresholdSelection::Fixed if view.long_axis_vertical => {
            (refinement.column_ratio, refinement.row_ratio, None)
        }
        ThresholdSelection::Fixed => (refinement.row_ratio, refinement.column_ratio, None),
        ThresholdSelection::ByPackage => {
            let along_core = view.long_profile(core_start..=core_end);
            let package = classify_package(&across, &along_core, short_side, long_side);
            let (height_ratio, width_ratio) = package.ratios();
            (height_ratio, width_ratio, Some(package))
        }
    };

    let (short_start, short_end) = dominant_range(&across, short_ratio)?;
    let along = view.long_profile(short_start..=short_end);
    let (long_start, long_end) = dominant_range(&along, long_ratio)?;

    let short = (short_end - short_start + 1) as f32;
    let long = (long_end - long_start + 1) as f32;
    if short.min(long) < min_side {
        debug!(short, long, min_side, "refined box below the size floor");
        return None;
    }

    let short_mid = (short_start + short_end) as f32 / 2.0;
    let long_mid = (long_start + long_end) as f32 / 2.0;
    let (width, height, dx, dy) = if view.long_axis_vertical {
        (short, long, short_mid, long_mid)
    } else {
        (long, short, long_mid, short_mid)
    };
    let levelled_center = Point::new(window.x as f32 + dx, window.y as f32 + dy);
    // Back to frame coordinates: undo the levelling rotation.
    let back = rotation_about(oriented.center, oriented.angle)
        * nalgebra::Vector3::new(levelled_center.x, levelled_center.y, 1.0);
    let center = Point::new(back.x, back.y);

    debug!(
        before_width = oriented.width,
        before_height = oriented.height,
        width,
        height,
        package = ?package,
        "profile refinement"
    );

    Some(ChipBody {
        oriented: OrientedBox {
            center,
            width,
            height,
            angle: oriented.angle,
        },
        refined: true,
        package,
    })
}

/// Picks the package family from the shape of the body profiles.
///
/// `across` has one foreground count per position along the short axis,
/// `along` one per position along the long axis. The core (90%) spans
/// estimate the body, the shoulder (50%) spans show how far leads reach.
/// `short_side` is the unrefined box side used to normalise the lead band.
pub fn classify_package(
    across: &[u32],
    along: &[u32],
    short_side: f32,
    long_side: f32,
) -> PackageClass {
    let span = |profile: &[u32], ratio: f32| {
        dominant_range(profile, ratio).map_or(0.0, |(start, end)| (end - start) as f32)
    };
    let or_side = |estimate: f32, side: f32| if estimate > 0.0 { estimate } else { side };

    let short_est = or_side(span(across, CORE_RATIO), short_side);
    let long_est = or_side(span(along, CORE_RATIO), long_side);
    let aspect = long_est / short_est;
    let short_slope = span(across, SHOULDER_RATIO) / short_est;
    let long_slope = span(along, SHOULDER_RATIO) / long_est;

    debug!(aspect, short_slope, long_slope, "package profile shape");

    if aspect < SQUARE_ASPECT {
        PackageClass::SmallSquare
    } else if aspect > DIP_ASPECT || short_slope > DIP_SHORT_SLOPE {
        if tail_ratio(across, short_side) > LONG_LEAD_TAIL {
            PackageClass::DipLongLeads
        } else {
            PackageClass::Dip
        }
    } else if long_slope > WIDE_SOIC_LONG_SLOPE {
        PackageClass::WideSoic
    } else {
        PackageClass::Soic
    }
}

/// Positions whose count lies strictly between 20% and 95% of the peak,
/// as a share of `side`.
fn tail_ratio(profile: &[u32], side: f32) -> f32 {
    let Some(max) = profile.iter().copied().max().filter(|&m| m > 0) else {
        return 0.0;
    };
    if side <= 0.0 {
        return 0.0;
    }
    let max = max as f32;
    let tail = profile
        .iter()
        .filter(|&&v| {
            let v = v as f32 / max;
            v > 0.2 && v < 0.95
        })
        .count();
    tail as f32 / side
}

/// The search window of a levelled mask, addressed by long and short axis.
struct LevelledView<'a> {
    mask: &'a GrayImage,
    window: CropWindow,
    long_axis_vertical: bool,
}

impl LevelledView<'_> {
    fn short_len(&self) -> usize {
        if self.long_axis_vertical {
            self.window.width as usize
        } else {
            self.window.height as usize
        }
    }

    fn long_len(&self) -> usize {
        if self.long_axis_vertical {
            self.window.height as usize
        } else {
            self.window.width as usize
        }
    }

    fn is_foreground(&self, long: usize, short: usize) -> bool {
        let (dx, dy) = if self.long_axis_vertical {
            (short, long)
        } else {
            (long, short)
        };
        self.mask
            .get_pixel(self.window.x + dx as u32, self.window.y + dy as u32)
            .0[0]
            > 0
    }

    /// Foreground count at every short-axis position, over the whole window.
    fn short_profile(&self) -> Vec<u32> {
        (0..self.short_len())
            .map(|s| {
                (0..self.long_len())
                    .filter(|&l| self.is_foreground(l, s))
                    .count() as u32
            })
            .collect()
    }

    /// Foreground count at every long-axis position, within the `band` of
    /// short-axis positions.
    fn long_profile(&self, band: RangeInclusive<usize>) -> Vec<u32> {
        (0..self.long_len())
            .map(|l| band.clone().filter(|&s| self.is_foreground(l, s)).count() as u32)
            .collect()
    }
}

/// First and last index whose value exceeds `ratio` times the maximum.
fn dominant_range(profile: &[u32], ratio: f32) -> Option<(usize, usize)> {
    let max = profile.iter().copied().max().filter(|&m| m > 0)?;
    let threshold = ratio * max as f32;
    let first = profile.iter().position(|&v| v as f32 > threshold)?;
    let last = profile.iter().rposition(|&v| v as f32 > threshold)?;
    Some((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Body of 80x40 at (60..140, 50..90) with 4 px wide leads 12 px long
    /// below and above. Transposed, the body stands upright with leads
    /// left and right.
    fn chip_with_leads(transposed: bool) -> ForegroundMask {
        let (w, h) = if transposed { (140, 200) } else { (200, 140) };
        let mut mask = GrayImage::new(w, h);
        let mut put = |x: u32, y: u32| {
            if transposed {
                mask.put_pixel(y, x, Luma([255]));
            } else {
                mask.put_pixel(x, y, Luma([255]));
            }
        };
        for y in 50..90 {
            for x in 60..140 {
                put(x, y);
            }
        }
        for lead in 0..6 {
            let x0 = 66 + lead * 12;
            for y in (38..50).chain(90..102) {
                for x in x0..x0 + 4 {
                    put(x, y);
                }
            }
        }
        ForegroundMask::new(mask)
    }

    /// The contour box of [`chip_with_leads`], leads included.
    fn leaded_box() -> OrientedBox {
        OrientedBox {
            center: Point::new(99.5, 69.5),
            width: 80.0,
            height: 64.0,
            angle: 0.0,
        }
    }

    fn run_of(value: u32, len: usize) -> Vec<u32> {
        vec![value; len]
    }

    fn with_tails(tail: u32, tail_len: usize, body: u32, body_len: usize) -> Vec<u32> {
        let mut profile = run_of(tail, tail_len);
        profile.extend(run_of(body, body_len));
        profile.extend(run_of(tail, tail_len));
        profile
    }

    #[test]
    fn test_leads_are_trimmed() {
        let mask = chip_with_leads(false);
        let body = refine_box(&mask, &leaded_box(), &ProfileRefinement::default(), 10.0);

        assert!(body.refined);
        assert_eq!(body.package, Some(PackageClass::Soic));
        assert_eq!(body.oriented.width, 80.0);
        assert_eq!(body.oriented.height, 40.0);
        assert!((body.oriented.center.x - 99.5).abs() < 1e-3);
        assert!((body.oriented.center.y - 69.5).abs() < 1e-3);
    }

    #[test]
    fn test_fixed_ratios_trim_leads() {
        let mask = chip_with_leads(false);
        let fixed = ProfileRefinement::fixed(0.85, 0.80);
        let body = refine_box(&mask, &leaded_box(), &fixed, 10.0);

        assert!(body.refined);
        assert_eq!(body.package, None);
        assert_eq!((body.oriented.width, body.oriented.height), (80.0, 40.0));
    }

    #[test]
    fn test_upright_body_is_trimmed_across_its_width() {
        let mask = chip_with_leads(true);
        let upright = OrientedBox {
            center: Point::new(69.5, 99.5),
            width: 64.0,
            height: 80.0,
            angle: 0.0,
        };
        let body = refine_box(&mask, &upright, &ProfileRefinement::default(), 10.0);

        assert!(body.refined);
        assert_eq!((body.oriented.width, body.oriented.height), (40.0, 80.0));
        assert!((body.oriented.center.x - 69.5).abs() < 1e-3);
        assert!((body.oriented.center.y - 99.5).abs() < 1e-3);
    }

    #[test]
    fn test_empty_mask_keeps_detected_box() {
        let mask = ForegroundMask::new(GrayImage::new(50, 50));
        let oriented = OrientedBox {
            center: Point::new(25.0, 25.0),
            width: 20.0,
            height: 20.0,
            angle: 0.0,
        };
        let body = refine_box(&mask, &oriented, &ProfileRefinement::default(), 10.0);
        assert_eq!(body, ChipBody::unrefined(oriented));
    }

    #[test]
    fn test_sliver_profile_keeps_detected_box() {
        // Only a 6 px strip is solid; refining would go below the floor.
        let mut mask = GrayImage::new(120, 80);
        for y in 37..43 {
            for x in 20..100 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let oriented = OrientedBox {
            center: Point::new(59.5, 39.5),
            width: 80.0,
            height: 20.0,
            angle: 0.0,
        };
        let mask = ForegroundMask::new(mask);
        let body = refine_box(&mask, &oriented, &ProfileRefinement::default(), 10.0);
        assert!(!body.refined);
        assert_eq!(body.oriented, oriented);
    }

    #[test]
    fn test_square_package() {
        let profile = run_of(50, 50);
        assert_eq!(
            classify_package(&profile, &profile, 50.0, 50.0),
            PackageClass::SmallSquare
        );
    }

    #[test]
    fn test_long_body_is_dip() {
        let across = run_of(100, 30);
        let along = run_of(30, 100);
        assert_eq!(classify_package(&across, &along, 30.0, 100.0), PackageClass::Dip);
    }

    #[test]
    fn test_long_leads_make_dip_long_leads() {
        // 20 of 30 short-axis positions sit in the 40% lead band.
        let across = with_tails(40, 10, 100, 30);
        let along = run_of(30, 100);
        assert_eq!(
            classify_package(&across, &along, 30.0, 100.0),
            PackageClass::DipLongLeads
        );
    }

    #[test]
    fn test_lead_shoulders_make_dip_at_moderate_aspect() {
        // Aspect about 2 but the 60% shoulders widen the short span by half.
        let across = with_tails(60, 10, 100, 40);
        let along = run_of(40, 80);
        assert_eq!(
            classify_package(&across, &along, 40.0, 80.0),
            PackageClass::DipLongLeads
        );
    }

    #[test]
    fn test_end_leads_make_wide_soic() {
        let across = run_of(80, 30);
        let along = with_tails(60, 10, 100, 60);
        assert_eq!(
            classify_package(&across, &along, 30.0, 80.0),
            PackageClass::WideSoic
        );
    }

    #[test]
    fn test_plain_outline_is_soic() {
        let across = run_of(100, 40);
        let along = run_of(40, 80);
        assert_eq!(classify_package(&across, &along, 40.0, 80.0), PackageClass::Soic);
    }

    #[test]
    fn test_empty_profiles_fall_back_to_box_sides() {
        // Aspect 60 / 20 comes from the box itself.
        assert_eq!(
            classify_package(&[0; 10], &[0; 10], 20.0, 60.0),
            PackageClass::Dip
        );
    }

    #[test]
    fn test_tail_ratio() {
        let profile = with_tails(40, 10, 100, 30);
        assert!((tail_ratio(&profile, 30.0) - 20.0 / 30.0).abs() < 1e-6);
        assert_eq!(tail_ratio(&[0, 0], 10.0), 0.0);
    }

    #[test]
    fn test_dominant_range() {
        assert_eq!(dominant_range(&[0, 2, 10, 10, 9, 1], 0.85), Some((2, 4)));
        assert_eq!(dominant_range(&[0, 0, 0], 0.85), None);
    }
}
