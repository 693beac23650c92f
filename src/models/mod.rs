//! Domain models for the crew capacity engine.
//!
//! # Core Concepts
//!
//! - [`Project`]: Fabrication job that owns packages, hangers and assignments.
//! - [`Team`]: A crew. Its daily capacity is derived from `daily_hours` or headcount.
//! - [`Hanger`]: Atomic unit of fabrication work carrying an hour estimate.
//! - [`Package`]: Ordered bundle of hangers sharing a level/zone.
//! - [`Assignment`]: Binding of one hanger to one team with a lifecycle state.
//!   At most one *active* (not `Done`) assignment exists per hanger.

mod assignment;
mod hanger;
mod package;
mod project;
mod team;

pub use assignment::*;
pub use hanger::*;
pub use package::*;
pub use project::*;
pub use team::*;
