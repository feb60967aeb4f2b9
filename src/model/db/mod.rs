//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own formats.
//! - Typestate markers are serialised as their state names.

pub mod admin;
pub mod candidate;
pub mod election;
pub mod vote;
pub mod voter;
