//! # World Graph
//!
//! The map model for Wayfinder: the places a player has heard of, the spatial
//! relations between them, and the boundary that turns untrusted extracted
//! facts into validated values. This crate holds no layout, rendering or I/O.
//!
//! ## Core Components
//!
//! - **place**: Places and their stable slug ids
//! - **relation**: Typed edges with optional bearing and coarse distance
//! - **world**: The `World` aggregate and its store operations
//! - **facts**: Parse-and-sanitize for extracted facts payloads
//!
//! ## Invariants
//!
//! - An id identifies at most one place; re-learning about a place only ever
//!   adds tags, lengthens notes, or marks it visited
//! - Every stored relation references two known places, and no relation is
//!   stored twice

pub mod facts;
pub mod place;
pub mod relation;
pub mod world;

pub use facts::*;
pub use place::*;
pub use relation::*;
pub use world::*;
