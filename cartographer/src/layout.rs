//! Layout Engine - places every node in the unit square.
//!
//! A small force-directed relaxation specialized for maps that grow a place
//! or two at a time:
//!
//! 1. **Seeding**: unpositioned places start near the current place
//!    (jittered), or anywhere in the square when there is no current place
//! 2. **Springs**: each relation pulls `b` part of the way toward the point
//!    its bearing and distance imply from `a`
//! 3. **Repulsion**: pairs closer than the minimum separation are pushed
//!    apart, split evenly between the two
//! 4. **Clamping**: coordinates stay inside `[0, 1]`
//!
//! The pass runs a fixed number of iterations and accepts whatever state
//! results. Randomness comes from the caller so tests can seed it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;
use tracing::debug;

use world_graph::{Bearing, Distance, PlaceId, World};

/// Tuning for the relaxation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Number of spring + repulsion rounds per pass.
    pub iterations: u32,

    /// Fraction of the way `b` moves toward its spring target each round.
    pub spring_step: f64,

    /// Separation of one distance unit, in normalized coordinates.
    pub unit_distance: f64,

    /// Places closer than this repel each other.
    pub min_separation: f64,

    /// Fraction of an overlap removed per round, split between the pair.
    pub repulsion: f64,

    /// Width of the square new places are scattered in around the seed.
    pub seed_jitter: f64,

    /// Without a seed, new places land in `[margin, 1 - margin]`.
    pub random_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 80,
            spring_step: 0.08,
            unit_distance: 0.18,
            min_separation: 0.07,
            repulsion: 0.5,
            seed_jitter: 0.12,
            random_margin: 0.1,
        }
    }
}

struct Spring {
    a: usize,
    b: usize,
    offset: (f64, f64),
}

/// Assigns normalized positions to the places of a [`World`].
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run one relaxation pass over the whole world.
    ///
    /// Returns how many places were seeded with a first position. An empty
    /// world is left alone.
    pub fn relax<R: Rng>(&self, world: &mut World, rng: &mut R) -> usize {
        let ids = world.place_ids();
        if ids.is_empty() {
            return 0;
        }
        let index: HashMap<&PlaceId, usize> =
            ids.iter().enumerate().map(|(i, id)| (id, i)).collect();

        let mut positions: Vec<Option<(f64, f64)>> = ids
            .iter()
            .map(|id| world.place(id).and_then(|p| p.position()))
            .collect();
        let seed = world.last_place_id().and_then(|id| index.get(id).copied());
        let seeded = self.seed(&mut positions, seed, rng);
        let mut positions: Vec<(f64, f64)> = positions.into_iter().flatten().collect();

        let springs: Vec<Spring> = world
            .relations()
            .iter()
            .filter_map(|r| {
                let a = *index.get(&r.a)?;
                let b = *index.get(&r.b)?;
                // A place cannot sit at an offset from itself.
                if a == b {
                    return None;
                }
                let (ux, uy) = Bearing::unit_vector(r.bearing);
                let d = self.config.unit_distance * Distance::units(r.distance);
                Some(Spring {
                    a,
                    b,
                    offset: (ux * d, uy * d),
                })
            })
            .collect();

        for _ in 0..self.config.iterations {
            self.apply_springs(&mut positions, &springs);
            self.apply_repulsion(&mut positions, rng);
            clamp_all(&mut positions);
        }
        clamp_all(&mut positions);

        for (id, (x, y)) in ids.iter().zip(positions) {
            if let Some(place) = world.place_mut(id) {
                place.set_position(x, y);
            }
        }

        debug!(
            places = ids.len(),
            springs = springs.len(),
            seeded,
            "layout pass complete"
        );
        seeded
    }

    /// Give every unpositioned place a starting point. The seed place is
    /// positioned first so the others can cluster around it.
    fn seed<R: Rng>(
        &self,
        positions: &mut [Option<(f64, f64)>],
        seed: Option<usize>,
        rng: &mut R,
    ) -> usize {
        let mut seeded = 0;
        let anchor = match seed {
            Some(i) => match positions[i] {
                Some(pos) => Some(pos),
                None => {
                    let pos = self.random_point(rng);
                    positions[i] = Some(pos);
                    seeded += 1;
                    Some(pos)
                }
            },
            None => None,
        };

        for slot in positions.iter_mut().filter(|p| p.is_none()) {
            let pos = match anchor {
                Some((sx, sy)) => (
                    sx + (rng.gen::<f64>() - 0.5) * self.config.seed_jitter,
                    sy + (rng.gen::<f64>() - 0.5) * self.config.seed_jitter,
                ),
                None => self.random_point(rng),
            };
            *slot = Some(pos);
            seeded += 1;
        }
        seeded
    }

    fn random_point<R: Rng>(&self, rng: &mut R) -> (f64, f64) {
        let margin = self.config.random_margin.clamp(0.0, 0.5);
        let span = 1.0 - 2.0 * margin;
        (
            margin + rng.gen::<f64>() * span,
            margin + rng.gen::<f64>() * span,
        )
    }

    fn apply_springs(&self, positions: &mut [(f64, f64)], springs: &[Spring]) {
        let step = self.config.spring_step;
        for spring in springs {
            let (ax, ay) = positions[spring.a];
            let (tx, ty) = (ax + spring.offset.0, ay + spring.offset.1);
            let b = &mut positions[spring.b];
            b.0 += (tx - b.0) * step;
            b.1 += (ty - b.1) * step;
        }
    }

    fn apply_repulsion<R: Rng>(&self, positions: &mut [(f64, f64)], rng: &mut R) {
        let min = self.config.min_separation;
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (px, py) = positions[i];
                let (qx, qy) = positions[j];
                let (dx, dy) = (px - qx, py - qy);
                let dist = dx.hypot(dy);
                if dist >= min {
                    continue;
                }
                // Coincident places have no direction to separate along.
                let (ux, uy) = if dist < 1e-9 {
                    let angle = rng.gen::<f64>() * TAU;
                    (angle.cos(), angle.sin())
                } else {
                    (dx / dist, dy / dist)
                };
                let shift = (min - dist) * self.config.repulsion / 2.0;
                positions[i] = (px + ux * shift, py + uy * shift);
                positions[j] = (qx - ux * shift, qy - uy * shift);
            }
        }
    }
}

fn clamp_all(positions: &mut [(f64, f64)]) {
    for (x, y) in positions.iter_mut() {
        *x = x.clamp(0.0, 1.0);
        *y = y.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use world_graph::{PlaceFact, Relation, RelationType};

    fn world_with(names: &[&str]) -> World {
        let mut world = World::new();
        for name in names {
            world.upsert_place(&PlaceFact::named(*name));
        }
        world
    }

    fn pos(world: &World, id: &str) -> (f64, f64) {
        world.place(&PlaceId::from(id)).unwrap().position().unwrap()
    }

    fn min_pair_distance(world: &World) -> f64 {
        let points: Vec<_> = world.places().filter_map(|p| p.position()).collect();
        let mut min = f64::INFINITY;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                let d = (points[i].0 - points[j].0).hypot(points[i].1 - points[j].1);
                min = min.min(d);
            }
        }
        min
    }

    #[test]
    fn test_empty_world_is_noop() {
        let mut world = World::new();
        let seeded = LayoutEngine::default().relax(&mut world, &mut SmallRng::seed_from_u64(1));
        assert_eq!(seeded, 0);
        assert!(world.is_empty());
    }

    #[test]
    fn test_every_place_gets_a_position_in_bounds() {
        let mut world = world_with(&["Dock", "Inn", "Mill", "Chapel", "Gate"]);
        let seeded = LayoutEngine::default().relax(&mut world, &mut SmallRng::seed_from_u64(2));

        assert_eq!(seeded, 5);
        for place in world.places() {
            let (x, y) = place.position().unwrap();
            assert!((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y));
        }
    }

    #[test]
    fn test_long_relations_stay_in_bounds() {
        let mut world = world_with(&["A", "B", "C", "D", "E"]);
        for (a, b) in [("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")] {
            world.add_relation(
                Relation::new(a, b, RelationType::Road)
                    .with_bearing(Bearing::E)
                    .with_distance(Distance::Three),
            );
        }
        LayoutEngine::default().relax(&mut world, &mut SmallRng::seed_from_u64(3));

        for place in world.places() {
            let (x, y) = place.position().unwrap();
            assert!((0.0..=1.0).contains(&x), "{} x={x}", place.id);
            assert!((0.0..=1.0).contains(&y), "{} y={y}", place.id);
        }
    }

    #[test]
    fn test_unrelated_places_reach_min_separation() {
        let mut world = world_with(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        let engine = LayoutEngine::default();
        engine.relax(&mut world, &mut SmallRng::seed_from_u64(4));

        assert!(min_pair_distance(&world) >= engine.config().min_separation - 5e-3);
    }

    #[test]
    fn test_coincident_places_are_separated() {
        let mut world = world_with(&["A", "B", "C", "D", "E", "F"]);
        for place in world.places_mut() {
            place.set_position(0.5, 0.5);
        }
        let engine = LayoutEngine::default();
        let seeded = engine.relax(&mut world, &mut SmallRng::seed_from_u64(5));

        assert_eq!(seeded, 0);
        assert!(min_pair_distance(&world) >= engine.config().min_separation - 5e-3);
    }

    #[test]
    fn test_bearing_pulls_b_into_direction() {
        let mut world = world_with(&["Square", "Tower"]);
        world.add_relation(Relation::new("square", "tower", RelationType::Path).with_bearing(Bearing::N));
        LayoutEngine::default().relax(&mut world, &mut SmallRng::seed_from_u64(6));

        let (sx, sy) = pos(&world, "square");
        let (tx, ty) = pos(&world, "tower");
        assert!(ty < sy, "tower should be north of the square");
        assert!((tx - sx).abs() < 0.02);
    }

    #[test]
    fn test_new_places_seed_near_current_place() {
        let mut world = world_with(&["Harbor"]);
        world.place_mut(&PlaceId::from("harbor")).unwrap().set_position(0.5, 0.5);
        world.mark_visited(&PlaceId::from("harbor"));
        world.upsert_place(&PlaceFact::named("Fish Market"));

        let engine = LayoutEngine::new(LayoutConfig {
            iterations: 0,
            ..LayoutConfig::default()
        });
        assert_eq!(engine.relax(&mut world, &mut SmallRng::seed_from_u64(7)), 1);

        let (x, y) = pos(&world, "fish-market");
        assert!((x - 0.5).abs() <= 0.06 && (y - 0.5).abs() <= 0.06);
        assert_eq!(pos(&world, "harbor"), (0.5, 0.5));
    }

    #[test]
    fn test_unpositioned_seed_place_is_placed_first() {
        let mut world = world_with(&["Harbor", "Pier"]);
        world.mark_visited(&PlaceId::from("harbor"));

        let engine = LayoutEngine::new(LayoutConfig {
            iterations: 0,
            ..LayoutConfig::default()
        });
        engine.relax(&mut world, &mut SmallRng::seed_from_u64(8));

        let (hx, hy) = pos(&world, "harbor");
        let (px, py) = pos(&world, "pier");
        assert!((hx - px).abs() <= 0.06 && (hy - py).abs() <= 0.06);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut first = world_with(&["Dock", "Inn", "Mill"]);
        first.add_relation(Relation::new("dock", "inn", RelationType::Road).with_bearing(Bearing::SW));
        let mut second = first.clone();

        let engine = LayoutEngine::default();
        engine.relax(&mut first, &mut SmallRng::seed_from_u64(9));
        engine.relax(&mut second, &mut SmallRng::seed_from_u64(9));
        assert_eq!(first, second);
    }
}
