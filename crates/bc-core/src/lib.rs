//! bookclub/crates/bc-core/src/lib.rs
//!
//! The central domain model, permission rules and interface definitions
//! for the book club.

pub mod models;
pub mod traits;
pub mod error;
pub mod policy;
pub mod rating;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use policy::{authorize, can, Action, Resource, Session};
pub use rating::Rating;
