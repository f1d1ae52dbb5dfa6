//! # Cartographer
//!
//! The map engine behind Wayfinder's world map. Scenes are turned into facts
//! by an external extraction step; this crate folds those facts into the
//! `world_graph` model, lays the map out, draws it, and keeps it saved.
//!
//! ## Core Components
//!
//! - **merger**: Folds a sanitized facts batch into the world
//! - **layout**: Bearing-aware spring/repulsion relaxation in the unit square
//! - **render**: Pure world-to-drawing projection plus place cards and fast travel
//! - **persist**: Whole-world JSON snapshots in a key/value slot
//! - **config**: TOML configuration for all of the above
//! - **atlas**: The session owner that sequences merge, layout and save
//!
//! ## Flow
//!
//! scene -> extractor -> [`Facts`](world_graph::Facts) -> merge -> layout ->
//! save, with the game loop redrawing a [`MapView`] from [`Atlas::world`].

pub mod atlas;
pub mod config;
pub mod layout;
pub mod merger;
pub mod persist;
pub mod render;

pub use atlas::*;
pub use config::*;
pub use layout::*;
pub use merger::*;
pub use persist::*;
pub use render::*;
