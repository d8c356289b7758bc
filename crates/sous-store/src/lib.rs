//! Typed data model and in-process state for the sous meal planner.
//!
//! This crate owns the things that outlive a single planning run: household
//! profiles, the long-term memory bank, and the JSON snapshot that persists
//! both. Planning logic lives in `sous-core`; nothing here reaches out to a
//! synthesis backend or the network.

pub mod memory;
pub mod models;
pub mod profiles;
pub mod snapshot;
