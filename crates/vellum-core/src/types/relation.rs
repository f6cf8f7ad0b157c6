//! Live relations and their historical snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::member::Member;
use super::{ChangesetId, RedactionId, RelationId};

/// Tags of a relation: unique keys, order not significant.
pub type Tags = BTreeMap<String, String>;

static EMPTY_TAGS: Tags = BTreeMap::new();

/// A tag as persisted for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub relation_id: RelationId,
    pub version: u32,
    pub k: String,
    pub v: String,
}

/// Current state of a relation, owned by the editing application.
///
/// The history core only reads it when taking a snapshot or when checking
/// whether a snapshot is the latest version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRelation {
    pub id: RelationId,
    pub version: u32,
    pub visible: bool,
    pub changeset_id: ChangesetId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub tags: Tags,
}

impl LiveRelation {
    /// A visible relation with no members or tags, stamped now.
    pub fn new(id: RelationId, version: u32, changeset_id: ChangesetId) -> Self {
        Self {
            id,
            version,
            visible: true,
            changeset_id,
            timestamp: Utc::now(),
            members: Vec::new(),
            tags: Tags::new(),
        }
    }

    /// Builder: set the edit timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builder: mark as deleted
    pub fn deleted(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Builder: append a member
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Builder: set a tag
    pub fn with_tag(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.tags.insert(k.into(), v.into());
        self
    }
}

/// Immutable snapshot of a relation at one version.
///
/// Identity is `(relation_id, version)`. Members and tags are held in
/// explicit optional slots: they are filled either by the setters before a
/// snapshot is persisted, or by the store when the snapshot is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationVersion {
    pub relation_id: RelationId,
    pub version: u32,
    pub visible: bool,
    pub changeset_id: ChangesetId,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redaction_id: Option<RedactionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    members: Option<Vec<Member>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<Tags>,
}

impl RelationVersion {
    /// Header-only snapshot; members and tags are not loaded.
    pub fn new(
        relation_id: RelationId,
        version: u32,
        visible: bool,
        changeset_id: ChangesetId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            relation_id,
            version,
            visible,
            changeset_id,
            timestamp,
            redaction_id: None,
            members: None,
            tags: None,
        }
    }

    /// Copy the current state of a live relation.
    ///
    /// The version is provisional until the store reconciles it.
    pub fn from_live(live: &LiveRelation) -> Self {
        let mut snapshot = Self::new(
            live.id,
            live.version,
            live.visible,
            live.changeset_id,
            live.timestamp,
        );
        snapshot.set_members(live.members.clone());
        snapshot.set_tags(live.tags.clone());
        snapshot
    }

    /// Members in sequence order; empty when none were set or loaded.
    pub fn members(&self) -> &[Member] {
        self.members.as_deref().unwrap_or(&[])
    }

    /// Tags; empty when none were set or loaded.
    pub fn tags(&self) -> &Tags {
        self.tags.as_ref().unwrap_or(&EMPTY_TAGS)
    }

    pub fn set_members(&mut self, members: Vec<Member>) {
        self.members = Some(members);
    }

    pub fn set_tags(&mut self, tags: Tags) {
        self.tags = Some(tags);
    }

    pub fn members_loaded(&self) -> bool {
        self.members.is_some()
    }

    pub fn tags_loaded(&self) -> bool {
        self.tags.is_some()
    }

    /// Both members and tags are present.
    pub fn payload_loaded(&self) -> bool {
        self.members_loaded() && self.tags_loaded()
    }

    /// Overwrite the header with authoritative values read from the store,
    /// keeping any members and tags already held.
    pub(crate) fn adopt_header(&mut self, stored: RelationVersion) {
        self.relation_id = stored.relation_id;
        self.version = stored.version;
        self.visible = stored.visible;
        self.changeset_id = stored.changeset_id;
        self.timestamp = stored.timestamp;
        self.redaction_id = stored.redaction_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn loop_relation() -> LiveRelation {
        LiveRelation::new(42, 3, 10)
            .at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_member(Member::node(5, "outer"))
            .with_tag("name", "Loop")
    }

    #[test]
    fn test_from_live_copies_fields() {
        let live = loop_relation();
        let snapshot = RelationVersion::from_live(&live);

        assert_eq!(snapshot.relation_id, 42);
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.changeset_id, 10);
        assert!(snapshot.visible);
        assert_eq!(snapshot.timestamp, live.timestamp);
        assert_eq!(snapshot.members(), &[Member::node(5, "outer")]);
        assert_eq!(snapshot.tags().get("name").map(String::as_str), Some("Loop"));
        assert!(snapshot.redaction_id.is_none());
        assert!(snapshot.payload_loaded());
    }

    #[test]
    fn test_unloaded_accessors_are_empty() {
        let snapshot = RelationVersion::new(1, 1, true, 10, Utc::now());
        assert!(snapshot.members().is_empty());
        assert!(snapshot.tags().is_empty());
        assert!(!snapshot.payload_loaded());
    }

    #[test]
    fn test_adopt_header_keeps_payload() {
        let mut snapshot = RelationVersion::from_live(&loop_relation());
        let mut stored = RelationVersion::new(42, 7, true, 10, snapshot.timestamp);
        stored.redaction_id = Some(2);

        snapshot.adopt_header(stored);
        assert_eq!(snapshot.version, 7);
        assert_eq!(snapshot.redaction_id, Some(2));
        assert_eq!(snapshot.members().len(), 1);
    }

    #[test]
    fn test_deleted_builder() {
        let live = LiveRelation::new(1, 2, 3).deleted();
        assert!(!live.visible);
        assert!(!RelationVersion::from_live(&live).visible);
    }
}
