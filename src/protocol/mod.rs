//! Protocol handling.
//!
//! The boundary decode step for route and territory geometry, and the command
//! parser for the line protocol spoken by the `landgrab` binary.

pub mod geojson;
pub mod parser;

pub use geojson::{decode_route, DecodeError, MultiPolygonDocument};
pub use parser::{parse_command, Command};
