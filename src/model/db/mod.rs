//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod admin;
pub mod audit_log;
pub mod candidate;
pub mod election;
pub mod partylist;
pub mod position;
pub mod vote;
pub mod voter;
