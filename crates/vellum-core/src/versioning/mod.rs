//! Relation version history.
//!
//! Every edit of a live relation produces an immutable snapshot keyed by
//! `(relation_id, version)`, together with its ordered members and its tags.

mod members;
mod schema;
mod store;
mod tags;

pub use store::{RelationHistoryStore, SqliteRelationHistory};
