//! Facts payloads - the boundary between an untrusted extraction step and
//! the world graph.
//!
//! Extracted payloads arrive as loosely-shaped JSON. Everything here turns
//! that JSON into validated [`PlaceFact`] / [`Relation`] values, coercing or
//! dropping each field on its own so one bad entry never spoils a batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{Bearing, Distance, PlaceId, Relation, RelationType};

/// Errors from parsing a facts payload.
#[derive(Debug, Error)]
pub enum FactsError {
    #[error("facts payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Size limits applied while sanitizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeLimits {
    pub max_name_chars: usize,
    pub max_tags: usize,
    pub max_notes_chars: usize,
}

impl Default for SanitizeLimits {
    fn default() -> Self {
        Self {
            max_name_chars: 60,
            max_tags: 6,
            max_notes_chars: 140,
        }
    }
}

/// A sanitized candidate place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceFact {
    pub id: PlaceId,
    pub name: String,
    pub tags: Vec<String>,
    pub notes: String,
}

impl PlaceFact {
    /// A candidate whose id is the slug of its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: PlaceId(slugify(&name)),
            name,
            tags: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<PlaceId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// A sanitized batch of facts, ready for merging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    pub places: Vec<PlaceFact>,
    pub relations: Vec<Relation>,
    pub current_place_id: Option<PlaceId>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, place: PlaceFact) -> Self {
        self.places.push(place);
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_current_place(mut self, id: impl Into<PlaceId>) -> Self {
        self.current_place_id = Some(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.relations.is_empty() && self.current_place_id.is_none()
    }

    /// Parse and sanitize a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError::Json`] only if `text` is not JSON at all.
    /// Well-formed JSON of the wrong shape sanitizes to a sparse or empty
    /// batch instead.
    pub fn parse(text: &str, limits: &SanitizeLimits) -> Result<Self, FactsError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&value, limits))
    }

    /// Sanitize an untyped payload. Never fails.
    pub fn from_value(value: &Value, limits: &SanitizeLimits) -> Self {
        let Some(object) = value.as_object() else {
            debug!("facts payload is not an object");
            return Self::default();
        };

        let places = entries(object, "places")
            .filter_map(|entry| sanitize_place(entry, limits))
            .collect();
        let relations = entries(object, "relations")
            .filter_map(sanitize_relation)
            .collect();
        let current_place_id = object
            .get("current_place_id")
            .and_then(non_blank_str)
            .map(PlaceId::new);

        Self {
            places,
            relations,
            current_place_id,
        }
    }
}

/// Lowercase, collapse every run of non `[a-z0-9]` characters into a single
/// hyphen, and strip hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn entries<'a>(object: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.as_slice())
        .unwrap_or_default()
        .iter()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn non_blank_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Scalars become strings; arrays, objects and null do not.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn sanitize_place(entry: &Value, limits: &SanitizeLimits) -> Option<PlaceFact> {
    let Some(full_name) = entry
        .get("name")
        .and_then(stringify)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
    else {
        debug!("dropped place without a name");
        return None;
    };
    let name = truncate(&full_name, limits.max_name_chars);

    // The slug comes from the whole name so it matches the id an extractor
    // derives when it reuses a known place.
    let id = match entry.get("id").and_then(non_blank_str) {
        Some(id) => id.to_string(),
        None => slugify(&full_name),
    };
    if id.is_empty() {
        debug!(%name, "dropped place whose name has no usable slug");
        return None;
    }

    let tags = entry
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .take(limits.max_tags)
                .filter_map(stringify)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let notes = entry
        .get("notes")
        .and_then(Value::as_str)
        .map(|n| truncate(n.trim(), limits.max_notes_chars))
        .unwrap_or_default();

    Some(PlaceFact {
        id: PlaceId(id),
        name,
        tags,
        notes,
    })
}

fn sanitize_relation(entry: &Value) -> Option<Relation> {
    let a = entry.get("a").and_then(non_blank_str);
    let b = entry.get("b").and_then(non_blank_str);
    let (Some(a), Some(b)) = (a, b) else {
        debug!("dropped relation without both endpoints");
        return None;
    };

    let relation_type = entry
        .get("type")
        .and_then(Value::as_str)
        .and_then(RelationType::parse)
        .unwrap_or(RelationType::Near);
    let bearing = entry
        .get("bearing")
        .and_then(Value::as_str)
        .and_then(Bearing::parse);
    let distance = entry.get("distance").and_then(parse_distance);

    Some(Relation {
        a: PlaceId::new(a),
        b: PlaceId::new(b),
        relation_type,
        bearing,
        distance,
    })
}

/// Accepts the JSON numbers 1, 2 and 3 (integral floats included).
fn parse_distance(value: &Value) -> Option<Distance> {
    let n = value.as_f64()?;
    if n.fract() != 0.0 || !(1.0..=3.0).contains(&n) {
        return None;
    }
    Distance::try_from(n as u8).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sanitize(value: Value) -> Facts {
        Facts::from_value(&value, &SanitizeLimits::default())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Misty Harbor"), "misty-harbor");
        assert_eq!(slugify("  The Old -- Mill!! "), "the-old-mill");
        assert_eq!(slugify("Ancient Library Entrance"), "ancient-library-entrance");
        assert_eq!(slugify("Café 42"), "caf-42");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_place_id_defaults_to_slug() {
        let facts = sanitize(json!({"places": [{"name": "Misty Harbor"}]}));
        assert_eq!(facts.places.len(), 1);
        assert_eq!(facts.places[0].id, PlaceId::from("misty-harbor"));
        assert!(facts.places[0].tags.is_empty());
        assert_eq!(facts.places[0].notes, "");
    }

    #[test]
    fn test_long_name_slug_uses_whole_name() {
        let long = "The Very Long and Winding Name of the Ancient Sunken Library of Eldermoor Beneath the Sea";
        let facts = sanitize(json!({"places": [{"name": long}]}));
        let place = &facts.places[0];
        assert_eq!(place.id.as_str(), slugify(long));
        assert!(place.id.as_str().ends_with("beneath-the-sea"));
        assert_eq!(place.name.chars().count(), 60);
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let facts = sanitize(json!({"places": [{"name": "Harbor", "id": "harbor-east"}]}));
        assert_eq!(facts.places[0].id, PlaceId::from("harbor-east"));
    }

    #[test]
    fn test_place_limits() {
        let long_name = "N".repeat(80);
        let long_notes = "n".repeat(200);
        let facts = sanitize(json!({"places": [{
            "name": long_name,
            "tags": ["a", "b", 3, true, "e", "f", "g", "h"],
            "notes": long_notes,
        }]}));

        let place = &facts.places[0];
        assert_eq!(place.name.chars().count(), 60);
        assert_eq!(place.tags, vec!["a", "b", "3", "true", "e", "f"]);
        assert_eq!(place.notes.chars().count(), 140);
    }

    #[test]
    fn test_nameless_places_are_dropped_individually() {
        let facts = sanitize(json!({"places": [
            {"id": "ghost"},
            {"name": "   "},
            {"name": "!!!"},
            {"name": {"nested": true}},
            {"name": "Lighthouse", "tags": "not-a-list"},
        ]}));
        assert_eq!(facts.places.len(), 1);
        assert_eq!(facts.places[0].id, PlaceId::from("lighthouse"));
        assert!(facts.places[0].tags.is_empty());
    }

    #[test]
    fn test_relation_coercion() {
        let facts = sanitize(json!({"relations": [
            {"a": "dock", "b": "inn", "type": "bridge", "bearing": "north", "distance": 9},
            {"a": "dock", "b": "inn", "type": "road", "bearing": "NW", "distance": 2.0},
            {"a": "dock", "b": "inn", "distance": "2"},
        ]}));

        assert_eq!(facts.relations.len(), 3);
        let odd = &facts.relations[0];
        assert_eq!(odd.relation_type, RelationType::Near);
        assert_eq!(odd.bearing, None);
        assert_eq!(odd.distance, None);

        let road = &facts.relations[1];
        assert_eq!(road.relation_type, RelationType::Road);
        assert_eq!(road.bearing, Some(Bearing::NW));
        assert_eq!(road.distance, Some(Distance::Two));

        assert_eq!(facts.relations[2].distance, None);
    }

    #[test]
    fn test_relation_without_endpoints_is_dropped() {
        let facts = sanitize(json!({"relations": [
            {"a": "dock"},
            {"a": "", "b": "inn"},
            {"a": 4, "b": "inn"},
        ]}));
        assert!(facts.relations.is_empty());
    }

    #[test]
    fn test_current_place_id() {
        assert_eq!(
            sanitize(json!({"current_place_id": "dock"})).current_place_id,
            Some(PlaceId::from("dock"))
        );
        assert_eq!(sanitize(json!({"current_place_id": ""})).current_place_id, None);
        assert_eq!(sanitize(json!({"current_place_id": 7})).current_place_id, None);
    }

    #[test]
    fn test_wrong_shapes_sanitize_to_empty() {
        assert!(sanitize(json!([1, 2, 3])).is_empty());
        assert!(sanitize(json!({"places": "nope", "relations": {}})).is_empty());
        assert!(sanitize(Value::Null).is_empty());
    }

    #[test]
    fn test_parse_rejects_non_json_only() {
        let limits = SanitizeLimits::default();
        assert!(matches!(Facts::parse("not json", &limits), Err(FactsError::Json(_))));
        assert!(Facts::parse("42", &limits).unwrap().is_empty());
    }

    #[test]
    fn test_limits_from_partial_config() {
        let limits: SanitizeLimits = serde_json::from_value(json!({"max_tags": 2})).unwrap();
        assert_eq!(limits.max_tags, 2);
        assert_eq!(limits.max_name_chars, 60);
    }
}
