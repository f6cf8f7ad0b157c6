//! vellum-core - Immutable version history for relations.
//!
//! Every edit of a live relation is captured as a snapshot keyed by
//! `(relation_id, version)` with its ordered members and its tags. Snapshots
//! can be redacted, and are rendered into interchange documents with
//! attribution resolved through caller-supplied caches.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vellum_core::{
//!     ChangesetOwnerCache, DisplayNameCache, LiveRelation, Member, MemoryDirectory,
//!     RelationHistoryStore, RelationRenderer, SqliteRelationHistory, Viewer,
//! };
//!
//! let directory = Arc::new(MemoryDirectory::new());
//! let store = SqliteRelationHistory::in_memory(directory.clone())?;
//!
//! let live = LiveRelation::new(42, 1, 10).with_member(Member::node(5, "outer"));
//! let snapshot = store.snapshot(&live)?;
//!
//! let renderer = RelationRenderer::new(directory.clone(), directory);
//! let node = renderer.render(
//!     &snapshot,
//!     Viewer::Public,
//!     &mut ChangesetOwnerCache::new(),
//!     &mut DisplayNameCache::new(),
//! )?;
//! println!("{}", node.to_xml());
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod redaction;
pub mod render;
pub mod traits;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use config::HistoryConfig;
pub use directory::{MemoryDirectory, SqliteDirectory};
pub use error::{ErrorCode, VellumError, VellumResult};
pub use redaction::{is_latest_version, Payload, RedactionState, Viewer};
pub use render::{
    render_document, ChangesetOwnerCache, DisplayName, DisplayNameCache, DocumentNode,
    RelationRenderer,
};
pub use traits::{ChangesetDirectory, UserDirectory, UserProfile};
pub use types::{
    LiveRelation, Member, MemberKind, MemberRecord, RelationVersion, TagRecord, Tags,
};
pub use versioning::{RelationHistoryStore, SqliteRelationHistory};
