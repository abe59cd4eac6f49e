//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each record has a `*Core` type holding its data and a wrapper adding the
//! unique ID; the core doubles as the "new" type inserted without an ID.

pub mod admin;
pub mod candidate;
pub mod review;
pub mod vote;
pub mod voter;
