//! Feature records and the structures assembled from them at finalize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::topology::ids::ElementId;
use crate::track_error::TrackError;

/// What a located feature is. Discriminants are bit flags so that a set of
/// types fits in a [`FeatureTypeSet`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum FeatureType {
    Minimum = 1,
    Maximum = 1 << 1,
    Saddle = 1 << 2,
    Attracting = 1 << 3,
    Repelling = 1 << 4,
    Center = 1 << 5,
    AttractingFocus = 1 << 6,
    RepellingFocus = 1 << 7,
    Degenerate = 1 << 8,
    Contour = 1 << 9,
    Unknown = 1 << 10,
}

impl FeatureType {
    pub const ALL: [FeatureType; 11] = [
        FeatureType::Minimum,
        FeatureType::Maximum,
        FeatureType::Saddle,
        FeatureType::Attracting,
        FeatureType::Repelling,
        FeatureType::Center,
        FeatureType::AttractingFocus,
        FeatureType::RepellingFocus,
        FeatureType::Degenerate,
        FeatureType::Contour,
        FeatureType::Unknown,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            FeatureType::Minimum => "min",
            FeatureType::Maximum => "max",
            FeatureType::Saddle => "saddle",
            FeatureType::Attracting => "attracting",
            FeatureType::Repelling => "repelling",
            FeatureType::Center => "center",
            FeatureType::AttractingFocus => "attracting_focus",
            FeatureType::RepellingFocus => "repelling_focus",
            FeatureType::Degenerate => "degenerate",
            FeatureType::Contour => "contour",
            FeatureType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let alias = match key.as_str() {
            "minimum" => "min",
            "maximum" => "max",
            other => other,
        };
        FeatureType::ALL
            .into_iter()
            .find(|t| t.name() == alias)
            .ok_or_else(|| TrackError::InvalidConfig(format!("unknown feature type `{s}`")))
    }
}

/// Bit set of [`FeatureType`]s, written as `"min|max|saddle"` in configuration.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureTypeSet(u32);

impl FeatureTypeSet {
    pub const EMPTY: FeatureTypeSet = FeatureTypeSet(0);
    pub const ALL: FeatureTypeSet = FeatureTypeSet((1 << 11) - 1);

    pub fn contains(self, t: FeatureType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn with(self, t: FeatureType) -> Self {
        FeatureTypeSet(self.0 | t.bit())
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for FeatureTypeSet {
    fn default() -> Self {
        FeatureTypeSet::ALL
    }
}

impl FromIterator<FeatureType> for FeatureTypeSet {
    fn from_iter<I: IntoIterator<Item = FeatureType>>(iter: I) -> Self {
        iter.into_iter().fold(FeatureTypeSet::EMPTY, FeatureTypeSet::with)
    }
}

impl FromStr for FeatureTypeSet {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(FeatureTypeSet::ALL);
        }
        s.split('|').map(str::parse::<FeatureType>).collect()
    }
}

impl TryFrom<String> for FeatureTypeSet {
    type Error = TrackError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FeatureTypeSet> for String {
    fn from(set: FeatureTypeSet) -> String {
        set.to_string()
    }
}

impl fmt::Display for FeatureTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == FeatureTypeSet::ALL {
            return f.write_str("all");
        }
        let names: Vec<&str> = FeatureType::ALL
            .into_iter()
            .filter(|t| self.contains(*t))
            .map(FeatureType::name)
            .collect();
        f.write_str(&names.join("|"))
    }
}

impl fmt::Debug for FeatureTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureTypeSet({self})")
    }
}

/// Which features are extracted and how they are connected.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Zeros of a 2-vector field on triangles of a 2D-base mesh, joined into trajectories.
    #[default]
    CriticalPoints,
    /// Zeros of a 2-vector field on triangles of a 3D-base mesh, joined into surfaces.
    Filaments,
    /// Level crossings of a scalar field on edges of a 2D-base mesh, joined into surfaces.
    Contours,
}

impl FeatureKind {
    /// Dimension of the simplices a feature is detected on.
    pub const fn feature_dim(self) -> usize {
        match self {
            FeatureKind::CriticalPoints | FeatureKind::Filaments => 2,
            FeatureKind::Contours => 1,
        }
    }

    /// Dimension of the cells whose faces are joined.
    pub const fn cell_dim(self) -> usize {
        match self {
            FeatureKind::CriticalPoints => 3,
            FeatureKind::Filaments => 4,
            FeatureKind::Contours => 3,
        }
    }

    /// Dimension of the space-time mesh this kind runs on.
    pub const fn mesh_dim(self) -> usize {
        self.cell_dim()
    }

    pub const fn produces_surfaces(self) -> bool {
        !matches!(self, FeatureKind::CriticalPoints)
    }
}

/// One located feature. Immutable once inserted into the detection map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub x: [f64; 3],
    pub t: f64,
    pub scalar: f64,
    pub kind: FeatureType,
    pub element: ElementId,
    pub ordinal: bool,
    pub timestep: usize,
}

/// A feature followed through time: points ordered by increasing `t`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Connected component the trajectory was walked from.
    pub component: usize,
    pub points: Vec<FeatureRecord>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time extent `t_max - t_min` (0 for fewer than two points).
    pub fn duration(&self) -> f64 {
        let (lo, hi) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.t), hi.max(p.t))
            });
        if hi >= lo { hi - lo } else { 0.0 }
    }

    pub fn ordinal_points(&self) -> impl Iterator<Item = &FeatureRecord> + '_ {
        self.points.iter().filter(|p| p.ordinal)
    }
}

/// Triangulated feature surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSurface {
    pub points: Vec<FeatureRecord>,
    /// Connected component of each point, parallel to `points`.
    pub component: Vec<usize>,
    /// Indices into `points`.
    pub triangles: Vec<[usize; 3]>,
}

impl FeatureSurface {
    pub fn n_components(&self) -> usize {
        self.component.iter().max().map_or(0, |c| c + 1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrackingResult {
    Trajectories(Vec<Trajectory>),
    Surface(FeatureSurface),
}

impl TrackingResult {
    pub fn trajectories(&self) -> Option<&[Trajectory]> {
        match self {
            TrackingResult::Trajectories(t) => Some(t),
            TrackingResult::Surface(_) => None,
        }
    }

    pub fn surface(&self) -> Option<&FeatureSurface> {
        match self {
            TrackingResult::Surface(s) => Some(s),
            TrackingResult::Trajectories(_) => None,
        }
    }
}
