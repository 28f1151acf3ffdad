//! The chip body after optional projection-profile refinement.

use serde::{Deserialize, Serialize};

use super::orientation::OrientedBox;

/// Package family inferred from the shape of the projection profiles.
///
/// Each family has its own profile cut-offs. Directions are given for the
/// levelled body with its long axis horizontal: the height ratio bounds the
/// short axis (where the leads of a DIP or SOIC stick out), the width ratio
/// bounds the long axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageClass {
    /// Nearly square bodies (QFP, QFN, small outlines).
    SmallSquare,
    /// Long dual in-line packages with short leads.
    Dip,
    /// Dual in-line packages whose leads make up a large share of the height.
    DipLongLeads,
    /// Small outlines with leads showing past the body ends.
    WideSoic,
    /// Standard small outline packages.
    Soic,
}

impl PackageClass {
    /// Cut-off ratios `(height, width)` for this package family.
    pub fn ratios(self) -> (f32, f32) {
        match self {
            PackageClass::SmallSquare => (0.80, 0.80),
            PackageClass::Dip => (0.959, 0.70),
            PackageClass::DipLongLeads => (0.875, 0.58),
            PackageClass::WideSoic => (0.92, 0.50),
            PackageClass::Soic => (0.85, 0.80),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PackageClass::SmallSquare => "small_square",
            PackageClass::Dip => "dip",
            PackageClass::DipLongLeads => "dip_long_leads",
            PackageClass::WideSoic => "wide_soic",
            PackageClass::Soic => "soic",
        }
    }
}

impl std::fmt::Display for PackageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The box the crop is cut around, with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipBody {
    /// The body box in frame coordinates.
    pub oriented: OrientedBox,
    /// True when profile refinement tightened the detected box.
    pub refined: bool,
    /// Package family used to pick the cut-offs, when it was classified.
    pub package: Option<PackageClass>,
}

impl ChipBody {
    /// The detected box, untouched by refinement.
    pub fn unrefined(oriented: OrientedBox) -> Self {
        Self {
            oriented,
            refined: false,
            package: None,
        }
    }
}
