//! Core types for relation history.

mod member;
mod relation;
mod timestamp;

pub use member::{Member, MemberKind, MemberRecord};
pub use relation::{LiveRelation, RelationVersion, TagRecord, Tags};
pub use timestamp::{format_document_timestamp, format_storage_timestamp, parse_storage_timestamp};

/// Identifier of a relation.
pub type RelationId = i64;
/// Identifier of a changeset.
pub type ChangesetId = i64;
/// Identifier of a user account.
pub type UserId = i64;
/// Identifier of a redaction.
pub type RedactionId = i64;
