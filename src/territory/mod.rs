//! Ownership model: users and the territories they hold.

pub mod land;
pub mod user;

pub use land::Territory;
pub use user::{User, UserId};
