//! World graph - the aggregate of all places and relations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::facts::PlaceFact;
use crate::{Place, PlaceId, Relation};

/// What [`World::upsert_place`] did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    /// Existing place gained tags or better notes.
    Enriched,
    Unchanged,
}

/// What [`World::add_relation`] did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOutcome {
    Added,
    Duplicate,
    /// One or both endpoints are not known places.
    DanglingEndpoint,
}

/// Serialized shape of a world: `{places, relations, lastPlaceId}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorldRecord {
    #[serde(default)]
    places: BTreeMap<PlaceId, Place>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    last_place_id: Option<PlaceId>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorldRecordRef<'a> {
    places: &'a BTreeMap<PlaceId, Place>,
    relations: &'a [Relation],
    #[serde(skip_serializing_if = "Option::is_none")]
    last_place_id: Option<&'a PlaceId>,
}

/// The incrementally-built world map.
///
/// Places are keyed by id and kept in id order, so iteration (and a seeded
/// layout pass) is reproducible. Relations are append-only and always
/// reference known places.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    places: BTreeMap<PlaceId, Place>,
    relations: Vec<Relation>,
    last_place_id: Option<PlaceId>,

    /// Dedup index over `relations`, rebuilt on deserialize.
    relation_keys: HashSet<Relation>,
}

impl Serialize for World {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WorldRecordRef {
            places: &self.places,
            relations: &self.relations,
            last_place_id: self.last_place_id.as_ref(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for World {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = WorldRecord::deserialize(deserializer)?;
        let mut world = World::default();
        for (key, place) in record.places {
            if key != place.id {
                debug!(key = %key, id = %place.id, "dropped saved place filed under another id");
                continue;
            }
            world.places.insert(key, place);
        }
        // Re-adding through the store keeps a hand-edited save honest.
        for relation in record.relations {
            world.add_relation(relation);
        }
        world.last_place_id = record
            .last_place_id
            .filter(|id| world.places.contains_key(id));
        Ok(world)
    }
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new place, or enrich the existing one with the same id.
    ///
    /// Enrichment is monotonic: tags are unioned, notes are replaced only by
    /// a strictly longer candidate, and `visited` is never touched.
    pub fn upsert_place(&mut self, candidate: &PlaceFact) -> Upsert {
        match self.places.get_mut(&candidate.id) {
            None => {
                let mut place = Place::new(candidate.id.clone(), candidate.name.clone())
                    .with_notes(candidate.notes.clone());
                for tag in &candidate.tags {
                    place.add_tag(tag.clone());
                }
                debug!(place = %candidate.id, "inserted place");
                self.places.insert(candidate.id.clone(), place);
                Upsert::Inserted
            }
            Some(place) => {
                let mut changed = false;
                for tag in &candidate.tags {
                    changed |= place.add_tag(tag.clone());
                }
                changed |= place.offer_notes(&candidate.notes);
                if changed {
                    debug!(place = %candidate.id, "enriched place");
                    Upsert::Enriched
                } else {
                    Upsert::Unchanged
                }
            }
        }
    }

    /// Append a relation if both endpoints exist and it is not a duplicate.
    pub fn add_relation(&mut self, relation: Relation) -> RelationOutcome {
        if !self.places.contains_key(&relation.a) || !self.places.contains_key(&relation.b) {
            debug!(a = %relation.a, b = %relation.b, "dropped relation with unknown endpoint");
            return RelationOutcome::DanglingEndpoint;
        }
        if self.relation_keys.contains(&relation) {
            return RelationOutcome::Duplicate;
        }
        self.relation_keys.insert(relation.clone());
        self.relations.push(relation);
        RelationOutcome::Added
    }

    /// Mark a place visited and make it the current place.
    ///
    /// Returns false (and changes nothing) if the id is unknown.
    pub fn mark_visited(&mut self, id: &PlaceId) -> bool {
        match self.places.get_mut(id) {
            Some(place) => {
                place.visited = true;
                self.last_place_id = Some(id.clone());
                true
            }
            None => false,
        }
    }

    /// Mark the first place whose name matches (case-insensitively) as the
    /// current place.
    ///
    /// Names are not unique. When several places share one, the match with
    /// the smallest id wins, not the one inserted first.
    pub fn set_current_place_by_name(&mut self, name: &str) -> Option<PlaceId> {
        let wanted = name.to_lowercase();
        let id = self
            .places
            .values()
            .find(|p| p.name.to_lowercase() == wanted)
            .map(|p| p.id.clone())?;
        self.mark_visited(&id);
        Some(id)
    }

    /// Names of every known place, for handing to an extraction step so it
    /// can reuse existing ids.
    pub fn known_place_names(&self) -> Vec<String> {
        self.places.values().map(|p| p.name.clone()).collect()
    }

    /// Drop everything.
    pub fn reset(&mut self) {
        *self = World::default();
    }

    pub fn place(&self, id: &PlaceId) -> Option<&Place> {
        self.places.get(id)
    }

    pub fn place_mut(&mut self, id: &PlaceId) -> Option<&mut Place> {
        self.places.get_mut(id)
    }

    pub fn contains_place(&self, id: &PlaceId) -> bool {
        self.places.contains_key(id)
    }

    /// All places in id order.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places.values()
    }

    pub fn places_mut(&mut self) -> impl Iterator<Item = &mut Place> {
        self.places.values_mut()
    }

    pub fn place_ids(&self) -> Vec<PlaceId> {
        self.places.keys().cloned().collect()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn visited_count(&self) -> usize {
        self.places.values().filter(|p| p.visited).count()
    }

    pub fn last_place_id(&self) -> Option<&PlaceId> {
        self.last_place_id.as_ref()
    }

    pub fn last_place(&self) -> Option<&Place> {
        self.last_place_id.as_ref().and_then(|id| self.places.get(id))
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty() && self.relations.is_empty() && self.last_place_id.is_none()
    }
}
