//! Relation definitions - typed spatial edges between places.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;

use crate::PlaceId;

/// Kinds of connection between two places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Path,
    #[default]
    Near,
    River,
    Road,
    Door,
}

impl RelationType {
    pub const ALL: [RelationType; 5] = [
        RelationType::Path,
        RelationType::Near,
        RelationType::River,
        RelationType::Road,
        RelationType::Door,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Path => "path",
            RelationType::Near => "near",
            RelationType::River => "river",
            RelationType::Road => "road",
            RelationType::Door => "door",
        }
    }

    /// Parse the wire name. Anything outside the enumeration is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Eight-point compass direction from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bearing {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Bearing {
    pub const ALL: [Bearing; 8] = [
        Bearing::N,
        Bearing::NE,
        Bearing::E,
        Bearing::SE,
        Bearing::S,
        Bearing::SW,
        Bearing::W,
        Bearing::NW,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bearing::N => "N",
            Bearing::NE => "NE",
            Bearing::E => "E",
            Bearing::SE => "SE",
            Bearing::S => "S",
            Bearing::SW => "SW",
            Bearing::W => "W",
            Bearing::NW => "NW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == s)
    }

    /// Unit vector for a bearing in screen space (north is `-y`).
    ///
    /// An unspecified bearing points East.
    pub fn unit_vector(bearing: Option<Bearing>) -> (f64, f64) {
        const D: f64 = FRAC_1_SQRT_2;
        match bearing {
            Some(Bearing::N) => (0.0, -1.0),
            Some(Bearing::NE) => (D, -D),
            Some(Bearing::E) => (1.0, 0.0),
            Some(Bearing::SE) => (D, D),
            Some(Bearing::S) => (0.0, 1.0),
            Some(Bearing::SW) => (-D, D),
            Some(Bearing::W) => (-1.0, 0.0),
            Some(Bearing::NW) => (-D, -D),
            None => (1.0, 0.0),
        }
    }
}

impl std::fmt::Display for Bearing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse separation between two places, in abstract units of 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Distance {
    One,
    Two,
    Three,
}

impl Distance {
    pub fn value(&self) -> u8 {
        match self {
            Distance::One => 1,
            Distance::Two => 2,
            Distance::Three => 3,
        }
    }

    /// Number of layout units; an unspecified distance counts as one.
    pub fn units(distance: Option<Distance>) -> f64 {
        distance.map_or(1.0, |d| f64::from(d.value()))
    }
}

impl TryFrom<u8> for Distance {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Distance::One),
            2 => Ok(Distance::Two),
            3 => Ok(Distance::Three),
            other => Err(format!("distance must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Distance> for u8 {
    fn from(distance: Distance) -> Self {
        distance.value()
    }
}

/// A directed, typed edge from `a` to `b`.
///
/// Equality covers the whole tuple, which is also the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub a: PlaceId,
    pub b: PlaceId,
    #[serde(rename = "type", default)]
    pub relation_type: RelationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<Bearing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
}

impl Relation {
    pub fn new(a: impl Into<PlaceId>, b: impl Into<PlaceId>, relation_type: RelationType) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            relation_type,
            bearing: None,
            distance: None,
        }
    }

    pub fn with_bearing(mut self, bearing: Bearing) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Whether the relation touches the given place.
    pub fn involves(&self, id: &PlaceId) -> bool {
        &self.a == id || &self.b == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_vectors_are_normalized() {
        for bearing in Bearing::ALL {
            let (x, y) = Bearing::unit_vector(Some(bearing));
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < 1e-9, "{bearing}");
        }
    }

    #[test]
    fn test_unspecified_bearing_points_east() {
        assert_eq!(Bearing::unit_vector(None), Bearing::unit_vector(Some(Bearing::E)));
        assert_eq!(Bearing::unit_vector(Some(Bearing::N)), (0.0, -1.0));
    }

    #[test]
    fn test_distance_units_default_to_one() {
        assert_eq!(Distance::units(None), 1.0);
        assert_eq!(Distance::units(Some(Distance::Three)), 3.0);
    }

    #[test]
    fn test_parse_closed_enumerations() {
        assert_eq!(RelationType::parse("river"), Some(RelationType::River));
        assert_eq!(RelationType::parse("bridge"), None);
        assert_eq!(Bearing::parse("SW"), Some(Bearing::SW));
        assert_eq!(Bearing::parse("sw"), None);
    }

    #[test]
    fn test_relation_wire_shape() {
        let relation = Relation::new("dock", "inn", RelationType::Road)
            .with_bearing(Bearing::NE)
            .with_distance(Distance::Two);
        let json = serde_json::to_value(&relation).unwrap();
        assert_eq!(json["type"], "road");
        assert_eq!(json["bearing"], "NE");
        assert_eq!(json["distance"], 2);

        let bare = serde_json::to_value(Relation::new("dock", "inn", RelationType::Near)).unwrap();
        assert!(bare.get("bearing").is_none());
        assert!(bare.get("distance").is_none());
    }

    #[test]
    fn test_out_of_range_distance_fails_to_deserialize() {
        let result: Result<Relation, _> =
            serde_json::from_str(r#"{"a":"x","b":"y","type":"near","distance":7}"#);
        assert!(result.is_err());
    }
}
