//! Crew capacity bookkeeping and hanger assignment.
//!
//! The [`engine::AssignmentEngine`] places hangers on crews, enforces the
//! assignment lifecycle and reports capacity advisories. Capacity figures are
//! derived live by [`capacity`] and rolled up by [`dashboard`]; the
//! [`db::Database`] entity store is the single source of truth.

pub mod api;
pub mod capacity;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod engine;
pub mod models;
pub mod shortage;
