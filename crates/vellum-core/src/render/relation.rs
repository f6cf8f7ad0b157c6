//! Rendering relation snapshots into interchange documents.
//!
//! Attribution takes two lookups per snapshot (changeset owner, then the
//! owner's display name). Callers rendering a batch pass the same
//! [`ChangesetOwnerCache`] and [`DisplayNameCache`] to every call so each
//! changeset and each user is resolved at most once. The caches are plain
//! maps: they are not synchronized, and their lifetime is the caller's.
//!
//! Redaction is applied here: when the viewer may not see a snapshot's
//! payload, the member and tag children are left out while the header
//! attributes, including `redacted`, are still emitted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::document::DocumentNode;
use crate::error::{VellumError, VellumResult};
use crate::redaction::{Payload, RedactionState, Viewer};
use crate::traits::{ChangesetDirectory, UserDirectory};
use crate::types::{format_document_timestamp, ChangesetId, RelationVersion, UserId};

/// Changeset id to owning user id.
pub type ChangesetOwnerCache = HashMap<ChangesetId, UserId>;

/// User id to resolved display name.
pub type DisplayNameCache = HashMap<UserId, DisplayName>;

/// Cached outcome of a display-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayName {
    /// The user's edits may be attributed under this name.
    Public(String),
    /// The user keeps their edits private; no attribution is rendered.
    Private,
}

impl DisplayName {
    pub fn as_public(&self) -> Option<&str> {
        match self {
            Self::Public(name) => Some(name),
            Self::Private => None,
        }
    }
}

/// Renders relation snapshots, attributing them through the directories.
pub struct RelationRenderer {
    changesets: Arc<dyn ChangesetDirectory>,
    users: Arc<dyn UserDirectory>,
}

impl RelationRenderer {
    pub fn new(changesets: Arc<dyn ChangesetDirectory>, users: Arc<dyn UserDirectory>) -> Self {
        Self { changesets, users }
    }

    /// Render one snapshot as a `relation` element.
    pub fn render(
        &self,
        snapshot: &RelationVersion,
        viewer: Viewer,
        changeset_cache: &mut ChangesetOwnerCache,
        display_name_cache: &mut DisplayNameCache,
    ) -> VellumResult<DocumentNode> {
        let redaction = RedactionState::of(snapshot);
        let payload = redaction.visible_payload(viewer);
        if !payload.is_withheld() && !snapshot.payload_loaded() {
            return Err(VellumError::payload_not_loaded(
                snapshot.relation_id,
                snapshot.version,
            ));
        }

        let mut node = DocumentNode::new("relation")
            .attr("id", snapshot.relation_id)
            .attr("visible", snapshot.visible)
            .attr("timestamp", format_document_timestamp(&snapshot.timestamp))
            .attr("version", snapshot.version)
            .attr("changeset", snapshot.changeset_id);

        let user_id = self.changeset_owner(snapshot.changeset_id, changeset_cache)?;
        if let Some(name) = self.display_name(user_id, display_name_cache)?.as_public() {
            node.set_attr("user", name);
            node.set_attr("uid", user_id);
        }

        if let Some(redaction_id) = redaction.redaction_id() {
            node.set_attr("redacted", redaction_id);
        }

        if let Payload::Visible { members, tags } = payload {
            for member in members {
                node.push(
                    DocumentNode::new("member")
                        .attr("type", member.kind.document_type())
                        .attr("ref", member.member_id)
                        .attr("role", &member.role),
                );
            }
            for (k, v) in tags {
                node.push(DocumentNode::new("tag").attr("k", k).attr("v", v));
            }
        }

        Ok(node)
    }

    /// Render a batch of snapshots sharing one pair of caches.
    pub fn render_all<'a>(
        &self,
        snapshots: impl IntoIterator<Item = &'a RelationVersion>,
        viewer: Viewer,
        changeset_cache: &mut ChangesetOwnerCache,
        display_name_cache: &mut DisplayNameCache,
    ) -> VellumResult<Vec<DocumentNode>> {
        snapshots
            .into_iter()
            .map(|snapshot| self.render(snapshot, viewer, changeset_cache, display_name_cache))
            .collect()
    }

    fn changeset_owner(
        &self,
        changeset_id: ChangesetId,
        cache: &mut ChangesetOwnerCache,
    ) -> VellumResult<UserId> {
        if let Some(user_id) = cache.get(&changeset_id) {
            return Ok(*user_id);
        }

        let user_id = self
            .changesets
            .changeset_owner(changeset_id)?
            .ok_or_else(|| VellumError::changeset_lookup(changeset_id))?;
        debug!(changeset_id, user_id, "Resolved changeset owner");
        cache.insert(changeset_id, user_id);
        Ok(user_id)
    }

    fn display_name<'c>(
        &self,
        user_id: UserId,
        cache: &'c mut DisplayNameCache,
    ) -> VellumResult<&'c DisplayName> {
        match cache.entry(user_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let profile = self
                    .users
                    .user(user_id)?
                    .ok_or_else(|| VellumError::user_lookup(user_id))?;
                let name = if profile.data_public {
                    DisplayName::Public(profile.display_name)
                } else {
                    DisplayName::Private
                };
                debug!(user_id, public = profile.data_public, "Resolved display name");
                Ok(entry.insert(name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockChangesetDirectory, MockUserDirectory, UserProfile};
    use crate::types::Member;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn snapshot(version: u32, changeset_id: ChangesetId) -> RelationVersion {
        let mut snapshot = RelationVersion::new(
            42,
            version,
            true,
            changeset_id,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        snapshot.set_members(vec![Member::node(5, "outer"), Member::way(6, "")]);
        snapshot.set_tags([("name".to_string(), "Loop".to_string())].into_iter().collect());
        snapshot
    }

    fn renderer(data_public: bool) -> RelationRenderer {
        let mut changesets = MockChangesetDirectory::new();
        changesets
            .expect_changeset_owner()
            .with(eq(10))
            .times(1)
            .returning(|_| Ok(Some(7)));

        let mut users = MockUserDirectory::new();
        users
            .expect_user()
            .with(eq(7))
            .times(1)
            .returning(move |id| Ok(Some(UserProfile::new(id, "mapper", data_public))));

        RelationRenderer::new(Arc::new(changesets), Arc::new(users))
    }

    #[test]
    fn test_shared_caches_resolve_each_lookup_once() {
        let renderer = renderer(true);
        let mut changeset_cache = ChangesetOwnerCache::new();
        let mut display_name_cache = DisplayNameCache::new();

        let snapshots = [snapshot(1, 10), snapshot(2, 10)];
        let nodes = renderer
            .render_all(
                &snapshots,
                Viewer::Public,
                &mut changeset_cache,
                &mut display_name_cache,
            )
            .unwrap();

        assert_eq!(nodes.len(), 2);
        for node in &nodes {
            assert_eq!(node.get_attr("user"), Some("mapper"));
            assert_eq!(node.get_attr("uid"), Some("7"));
        }
        assert_eq!(changeset_cache.get(&10), Some(&7));
        assert_eq!(
            display_name_cache.get(&7),
            Some(&DisplayName::Public("mapper".to_string()))
        );
    }

    #[test]
    fn test_private_user_omits_attribution() {
        let renderer = renderer(false);
        let mut changeset_cache = ChangesetOwnerCache::new();
        let mut display_name_cache = DisplayNameCache::new();

        let node = renderer
            .render(
                &snapshot(1, 10),
                Viewer::Public,
                &mut changeset_cache,
                &mut display_name_cache,
            )
            .unwrap();

        assert_eq!(node.get_attr("changeset"), Some("10"));
        assert!(node.get_attr("user").is_none());
        assert!(node.get_attr("uid").is_none());
        assert_eq!(display_name_cache.get(&7), Some(&DisplayName::Private));
    }

    #[test]
    fn test_private_user_cached_across_renders() {
        let renderer = renderer(false);
        let mut changeset_cache = ChangesetOwnerCache::new();
        let mut display_name_cache = DisplayNameCache::new();

        for version in 1..=3 {
            let node = renderer
                .render(
                    &snapshot(version, 10),
                    Viewer::Public,
                    &mut changeset_cache,
                    &mut display_name_cache,
                )
                .unwrap();
            assert!(node.get_attr("user").is_none());
        }
        assert_eq!(display_name_cache.len(), 1);
    }

    #[test]
    fn test_unknown_user_is_lookup_failure_and_not_cached() {
        let mut users = MockUserDirectory::new();
        users.expect_user().returning(|_| Ok(None));
        let renderer =
            RelationRenderer::new(Arc::new(MockChangesetDirectory::new()), Arc::new(users));
        let mut changeset_cache = ChangesetOwnerCache::from([(10, 7)]);
        let mut display_name_cache = DisplayNameCache::new();

        let err = renderer
            .render(
                &snapshot(1, 10),
                Viewer::Public,
                &mut changeset_cache,
                &mut display_name_cache,
            )
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::LkpUserMissing);
        assert!(display_name_cache.is_empty());
    }

    #[test]
    fn test_prefilled_caches_skip_directories() {
        let renderer = RelationRenderer::new(
            Arc::new(MockChangesetDirectory::new()),
            Arc::new(MockUserDirectory::new()),
        );
        let mut changeset_cache = ChangesetOwnerCache::from([(10, 7)]);
        let mut display_name_cache = DisplayNameCache::from([(7, DisplayName::Private)]);

        let node = renderer
            .render(
                &snapshot(1, 10),
                Viewer::Public,
                &mut changeset_cache,
                &mut display_name_cache,
            )
            .unwrap();
        assert!(node.get_attr("user").is_none());
    }

    #[test]
    fn test_header_attributes_and_children() {
        let renderer = renderer(true);
        let node = renderer
            .render(
                &snapshot(3, 10),
                Viewer::Public,
                &mut ChangesetOwnerCache::new(),
                &mut DisplayNameCache::new(),
            )
            .unwrap();

        let names: Vec<&str> = node.attributes().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "visible", "timestamp", "version", "changeset", "user", "uid"]
        );
        assert_eq!(node.get_attr("timestamp"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(node.get_attr("visible"), Some("true"));

        let members: Vec<_> = node.children_named("member").collect();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].get_attr("type"), Some("node"));
        assert_eq!(members[0].get_attr("role"), Some("outer"));
        assert_eq!(members[1].get_attr("type"), Some("way"));
        assert_eq!(members[1].get_attr("role"), Some(""));
        assert_eq!(node.children_named("tag").count(), 1);
    }

    #[test]
    fn test_redacted_snapshot_for_public_and_moderator() {
        let mut redacted = snapshot(1, 10);
        redacted.redaction_id = Some(3);

        let mut changeset_cache = ChangesetOwnerCache::new();
        let mut display_name_cache = DisplayNameCache::new();
        let renderer = renderer(true);

        let public = renderer
            .render(&redacted, Viewer::Public, &mut changeset_cache, &mut display_name_cache)
            .unwrap();
        assert_eq!(public.get_attr("redacted"), Some("3"));
        assert_eq!(public.get_attr("version"), Some("1"));
        assert!(public.children().is_empty());

        let moderator = renderer
            .render(&redacted, Viewer::Moderator, &mut changeset_cache, &mut display_name_cache)
            .unwrap();
        assert_eq!(moderator.get_attr("redacted"), Some("3"));
        assert_eq!(moderator.children().len(), 3);
    }

    #[test]
    fn test_unknown_changeset_is_lookup_failure() {
        let mut changesets = MockChangesetDirectory::new();
        changesets.expect_changeset_owner().returning(|_| Ok(None));
        let renderer =
            RelationRenderer::new(Arc::new(changesets), Arc::new(MockUserDirectory::new()));

        let err = renderer
            .render(
                &snapshot(1, 10),
                Viewer::Public,
                &mut ChangesetOwnerCache::new(),
                &mut DisplayNameCache::new(),
            )
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::LkpChangesetMissing);
    }

    #[test]
    fn test_unloaded_payload_is_rejected() {
        let renderer = RelationRenderer::new(
            Arc::new(MockChangesetDirectory::new()),
            Arc::new(MockUserDirectory::new()),
        );
        let header_only = RelationVersion::new(42, 1, true, 10, Utc::now());

        let err = renderer
            .render(
                &header_only,
                Viewer::Public,
                &mut ChangesetOwnerCache::new(),
                &mut DisplayNameCache::new(),
            )
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ValPayloadNotLoaded);
    }
}
