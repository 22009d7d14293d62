//! Claim polygon construction.
//!
//! A route becomes land by buffering its path into a corridor of fixed
//! half-width; a closed loop additionally claims everything it encircles.

pub mod builder;
pub mod corridor;

pub use builder::{hull_repair, ClaimError, ClaimPolygon, ClaimPolygonBuilder};
pub use corridor::{buffer_path, capsule, loop_fill};
