//! landgrab territory conquest engine library.
//!
//! Turns GPS routes into claimed land, transfers overlapped land between
//! users, and commits the new ownership state with optimistic concurrency.
//! Exposes the pipeline stages, the store, and the protocol modules for use
//! by integration tests and the binary entry points.

pub mod accounting;
pub mod claim;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod protocol;
pub mod report;
pub mod resolve;
pub mod route;
pub mod session;
pub mod simulation;
pub mod store;
pub mod territory;

pub use config::EngineConfig;
pub use engine::ConquestEngine;
pub use error::ConquestError;
pub use geometry::GeoPoint;
pub use report::ConquestResult;
pub use territory::{Territory, User, UserId};
