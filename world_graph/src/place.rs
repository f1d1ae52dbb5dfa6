//! Place definitions - the nodes of the world map.

use serde::{Deserialize, Serialize};

/// Stable slug-style identifier for places (e.g. `misty-harbor`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub String);

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PlaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A known location in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,

    /// Display name, not required to be unique.
    pub name: String,

    /// Short descriptive tags in first-seen order. Only ever grows.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Flips false -> true once and never reverts.
    #[serde(default)]
    pub visited: bool,

    #[serde(default)]
    pub notes: String,

    /// Normalized position, assigned by the layout engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl Place {
    /// Create an unvisited, unpositioned place.
    pub fn new(id: impl Into<PlaceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
            visited: false,
            notes: String::new(),
            x: None,
            y: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Add a tag unless already present. Returns true if it was new.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Replace the notes only with a non-empty, strictly longer candidate.
    ///
    /// Length stands in for "more informative"; a padded note wins over a
    /// terse one. Returns true if the notes changed.
    pub fn offer_notes(&mut self, candidate: &str) -> bool {
        if candidate.is_empty() || candidate.chars().count() <= self.notes.chars().count() {
            return false;
        }
        self.notes = candidate.to_string();
        true
    }

    /// Both coordinates, once the layout engine has assigned them.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.x.zip(self.y)
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = Some(x);
        self.y = Some(y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_creation() {
        let place = Place::new("misty-harbor", "Misty Harbor");
        assert_eq!(place.id.as_str(), "misty-harbor");
        assert!(!place.visited);
        assert!(place.tags.is_empty());
        assert!(place.position().is_none());
    }

    #[test]
    fn test_add_tag_keeps_order_without_duplicates() {
        let mut place = Place::new("dock", "Dock").with_tag("wet").with_tag("loud");
        assert!(!place.add_tag("wet"));
        assert!(place.add_tag("fishy"));
        assert_eq!(place.tags, vec!["wet", "loud", "fishy"]);
    }

    #[test]
    fn test_offer_notes_longest_wins() {
        let mut place = Place::new("inn", "Inn").with_notes("Warm");
        assert!(!place.offer_notes(""));
        assert!(!place.offer_notes("Cold"));
        assert!(place.offer_notes("Warm hearth and stew"));
        assert!(!place.offer_notes("Short"));
        assert_eq!(place.notes, "Warm hearth and stew");
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut place = Place::new("gate", "Gate");
        place.x = Some(0.5);
        assert!(place.position().is_none());
        place.set_position(0.5, 0.25);
        assert_eq!(place.position(), Some((0.5, 0.25)));
    }

    #[test]
    fn test_place_json_omits_missing_position() {
        let place = Place::new("gate", "Gate");
        let json = serde_json::to_value(&place).unwrap();
        assert!(json.get("x").is_none());
        assert_eq!(json["id"], "gate");
    }
}
