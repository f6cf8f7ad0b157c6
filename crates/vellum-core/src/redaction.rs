//! Redaction visibility.
//!
//! A redacted snapshot keeps its identity, version and redaction reference
//! visible to everyone; only its members and tags are withheld, and only
//! from viewers without moderator privileges.

use serde::{Deserialize, Serialize};

use crate::types::{LiveRelation, Member, RedactionId, RelationVersion, Tags};

/// Privilege level of whoever is reading history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    #[default]
    Public,
    Moderator,
}

impl Viewer {
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Moderator)
    }
}

/// Members and tags of a snapshot as a given viewer may see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Visible {
        members: &'a [Member],
        tags: &'a Tags,
    },
    Withheld {
        redaction_id: RedactionId,
    },
}

impl Payload<'_> {
    pub fn is_withheld(&self) -> bool {
        matches!(self, Self::Withheld { .. })
    }
}

/// Redaction view over a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RedactionState<'a> {
    snapshot: &'a RelationVersion,
}

impl<'a> RedactionState<'a> {
    pub fn of(snapshot: &'a RelationVersion) -> Self {
        Self { snapshot }
    }

    pub fn is_redacted(&self) -> bool {
        self.snapshot.redaction_id.is_some()
    }

    pub fn redaction_id(&self) -> Option<RedactionId> {
        self.snapshot.redaction_id
    }

    /// What `viewer` may see of the snapshot's members and tags.
    pub fn visible_payload(&self, viewer: Viewer) -> Payload<'a> {
        match self.snapshot.redaction_id {
            Some(redaction_id) if !viewer.is_privileged() => Payload::Withheld { redaction_id },
            _ => Payload::Visible {
                members: self.snapshot.members(),
                tags: self.snapshot.tags(),
            },
        }
    }
}

/// Whether `snapshot` is the version the live relation currently has.
pub fn is_latest_version(snapshot: &RelationVersion, live: &LiveRelation) -> bool {
    snapshot.version == live.version
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(version: u32, redaction_id: Option<RedactionId>) -> RelationVersion {
        let mut snapshot = RelationVersion::new(1, version, true, 10, Utc::now());
        snapshot.set_members(vec![Member::node(5, "outer")]);
        snapshot.redaction_id = redaction_id;
        snapshot
    }

    #[test]
    fn test_unredacted_payload_visible_to_all() {
        let s = snapshot(1, None);
        let state = RedactionState::of(&s);
        assert!(!state.is_redacted());
        assert!(!state.visible_payload(Viewer::Public).is_withheld());
        assert!(!state.visible_payload(Viewer::Moderator).is_withheld());
    }

    #[test]
    fn test_redacted_payload_withheld_from_public_only() {
        let s = snapshot(1, Some(4));
        let state = RedactionState::of(&s);
        assert!(state.is_redacted());
        assert_eq!(state.redaction_id(), Some(4));
        assert_eq!(
            state.visible_payload(Viewer::Public),
            Payload::Withheld { redaction_id: 4 }
        );
        match state.visible_payload(Viewer::Moderator) {
            Payload::Visible { members, .. } => assert_eq!(members.len(), 1),
            Payload::Withheld { .. } => panic!("moderators see redacted payloads"),
        }
    }

    #[test]
    fn test_is_latest_version() {
        let live = LiveRelation::new(1, 3, 10);
        assert!(is_latest_version(&snapshot(3, None), &live));
        for version in [1, 2, 4] {
            assert!(!is_latest_version(&snapshot(version, None), &live));
        }
    }
}
