//! Fact Merger - folds a sanitized facts batch into the world.

use tracing::debug;

use world_graph::{Facts, PlaceId, RelationOutcome, Upsert, World};

/// Tally of what a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub places_added: usize,
    pub places_enriched: usize,
    pub relations_added: usize,
    pub relations_duplicate: usize,
    /// Relations dropped because an endpoint is unknown.
    pub relations_dangling: usize,
    /// The place that became current, if the batch named a known one.
    pub current_place: Option<PlaceId>,
}

impl MergeReport {
    /// Whether the merge touched graph content or the current place.
    pub fn changed(&self) -> bool {
        self.places_added > 0
            || self.places_enriched > 0
            || self.relations_added > 0
            || self.current_place.is_some()
    }
}

/// Merge `facts` into `world`.
///
/// Order matters: places go in first so relations naming places from the
/// same batch find their endpoints, and the current place is resolved last.
/// Bad entries are skipped one at a time; the merge itself cannot fail.
pub fn merge_facts(world: &mut World, facts: &Facts) -> MergeReport {
    let mut report = MergeReport::default();

    for place in &facts.places {
        match world.upsert_place(place) {
            Upsert::Inserted => report.places_added += 1,
            Upsert::Enriched => report.places_enriched += 1,
            Upsert::Unchanged => {}
        }
    }

    for relation in &facts.relations {
        match world.add_relation(relation.clone()) {
            RelationOutcome::Added => report.relations_added += 1,
            RelationOutcome::Duplicate => report.relations_duplicate += 1,
            RelationOutcome::DanglingEndpoint => report.relations_dangling += 1,
        }
    }

    if let Some(id) = &facts.current_place_id {
        if world.mark_visited(id) {
            report.current_place = Some(id.clone());
        } else {
            debug!(place = %id, "current place is not a known place");
        }
    }

    report
}
