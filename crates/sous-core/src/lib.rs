//! Planning pipeline for the sous meal planner.
//!
//! The pipeline runs five stages over the typed state in `sous-store`:
//! constraint aggregation, recipe synthesis (pluggable backend), compliance
//! validation, a bounded per-slot retry loop, and post-hoc analysis
//! (schedule optimization and grocery aggregation). The orchestrator wires
//! the stages together and defers memory writes until a whole plan settles.

pub mod constraints;
pub mod cost;
pub mod grocery;
pub mod nutrition;
pub mod optimizer;
pub mod orchestrator;
pub mod slot;
pub mod synthesis;
pub mod validate;
