//! Snapshot storage with store-assigned version numbers.
//!
//! Writing a snapshot is a two-step protocol: the header row is inserted
//! (under a placeholder version when the store assigns versions, otherwise
//! under the writer's version), then the newest row for the same
//! relation and timestamp is read back and its values replace the in-memory
//! header. Members and tags are written only after that, under the
//! authoritative `(relation_id, version)`.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{members, schema, tags};
use crate::config::HistoryConfig;
use crate::error::{VellumError, VellumResult};
use crate::redaction::is_latest_version;
use crate::traits::ChangesetDirectory;
use crate::types::{
    format_storage_timestamp, parse_storage_timestamp, LiveRelation, MemberRecord, RedactionId,
    RelationId, RelationVersion, TagRecord,
};

const VERSION_COLUMNS: &str =
    "relation_id, version, visible, changeset_id, timestamp, redaction_id";

/// Trait for relation history storage operations
pub trait RelationHistoryStore: Send + Sync {
    /// Persist a snapshot of the live relation's current state
    fn snapshot(&self, live: &LiveRelation) -> VellumResult<RelationVersion>;

    /// Persist a prepared snapshot together with its members and tags
    fn save(&self, snapshot: RelationVersion) -> VellumResult<RelationVersion>;

    /// Get a specific version, members and tags loaded
    fn get_version(
        &self,
        relation_id: RelationId,
        version: u32,
    ) -> VellumResult<Option<RelationVersion>>;

    /// Get the newest version of a relation, members and tags loaded
    fn latest(&self, relation_id: RelationId) -> VellumResult<Option<RelationVersion>>;

    /// Get every version of a relation (ordered by version)
    fn history(&self, relation_id: RelationId) -> VellumResult<Vec<RelationVersion>>;

    /// Fill in whichever of members and tags the snapshot does not hold yet
    fn load_children(&self, snapshot: &mut RelationVersion) -> VellumResult<()>;

    /// Member rows of a version in sequence order
    fn member_records(
        &self,
        relation_id: RelationId,
        version: u32,
    ) -> VellumResult<Vec<MemberRecord>>;

    /// Tag rows of a version
    fn tag_records(&self, relation_id: RelationId, version: u32) -> VellumResult<Vec<TagRecord>>;

    /// Attach a redaction to a historical version
    fn redact(
        &self,
        relation_id: RelationId,
        version: u32,
        redaction_id: RedactionId,
        live: &LiveRelation,
    ) -> VellumResult<RelationVersion>;

    /// Count stored versions of a relation
    fn count_versions(&self, relation_id: RelationId) -> VellumResult<usize>;
}

/// SQLite-backed relation history
pub struct SqliteRelationHistory {
    conn: Mutex<Connection>,
    changesets: Arc<dyn ChangesetDirectory>,
    store_assigned_versions: bool,
    atomic_snapshots: bool,
}

fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

impl SqliteRelationHistory {
    /// Open the store described by `config`.
    pub fn new(
        config: &HistoryConfig,
        changesets: Arc<dyn ChangesetDirectory>,
    ) -> VellumResult<Self> {
        let conn = if config.in_memory {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.database_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(&config.database_path)?
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        schema::init(&conn, config.store_assigned_versions)?;

        info!(
            path = %config.database_path.display(),
            in_memory = config.in_memory,
            store_assigned_versions = config.store_assigned_versions,
            atomic_snapshots = config.atomic_snapshots,
            "Opened relation history store"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            changesets,
            store_assigned_versions: config.store_assigned_versions,
            atomic_snapshots: config.atomic_snapshots,
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory(changesets: Arc<dyn ChangesetDirectory>) -> VellumResult<Self> {
        let config = HistoryConfig::builder().in_memory(true).build();
        Self::new(&config, changesets)
    }

    fn conn(&self) -> VellumResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VellumError::Internal("history connection lock poisoned".to_string()))
    }

    fn row_to_version(row: &rusqlite::Row<'_>) -> VellumResult<RelationVersion> {
        let relation_id: i64 = row.get(0)?;
        let version: u32 = row.get(1)?;
        let visible: bool = row.get(2)?;
        let changeset_id: i64 = row.get(3)?;
        let timestamp: String = row.get(4)?;
        let redaction_id: Option<i64> = row.get(5)?;

        let mut snapshot = RelationVersion::new(
            relation_id,
            version,
            visible,
            changeset_id,
            parse_storage_timestamp(&timestamp)?,
        );
        snapshot.redaction_id = redaction_id;
        Ok(snapshot)
    }

    fn read_header(
        conn: &Connection,
        relation_id: RelationId,
        version: u32,
    ) -> VellumResult<Option<RelationVersion>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM relation_versions WHERE relation_id = ?1 AND version = ?2",
            VERSION_COLUMNS
        ))?;

        stmt.query_row(params![relation_id, version], |row| {
            Ok(Self::row_to_version(row))
        })
        .optional()?
        .transpose()
    }

    fn fill_children(conn: &Connection, snapshot: &mut RelationVersion) -> VellumResult<()> {
        if !snapshot.members_loaded() {
            let loaded = members::read_members(conn, snapshot.relation_id, snapshot.version)?;
            snapshot.set_members(loaded);
        }
        if !snapshot.tags_loaded() {
            let loaded = tags::read_tags(conn, snapshot.relation_id, snapshot.version)?;
            snapshot.set_tags(loaded);
        }
        Ok(())
    }

    /// Insert the header, reconcile its version, then write the children.
    fn write_snapshot(
        conn: &Connection,
        snapshot: &mut RelationVersion,
        store_assigned: bool,
    ) -> VellumResult<()> {
        let timestamp = format_storage_timestamp(&snapshot.timestamp);
        let provisional = snapshot.version;

        if store_assigned {
            // The trigger replaces the placeholder with the assigned version.
            conn.execute(
                r#"INSERT INTO relation_versions
                   (relation_id, version, visible, changeset_id, timestamp, redaction_id)
                   VALUES (?1, -(SELECT COALESCE(MAX(rowid), 0) + 1 FROM relation_versions),
                           ?2, ?3, ?4, NULL)"#,
                params![
                    snapshot.relation_id,
                    snapshot.visible,
                    snapshot.changeset_id,
                    timestamp,
                ],
            )?;
        } else {
            conn.execute(
                r#"INSERT INTO relation_versions
                   (relation_id, version, visible, changeset_id, timestamp, redaction_id)
                   VALUES (?1, ?2, ?3, ?4, ?5, NULL)"#,
                params![
                    snapshot.relation_id,
                    provisional,
                    snapshot.visible,
                    snapshot.changeset_id,
                    timestamp,
                ],
            )
            .map_err(|e| {
                if is_primary_key_conflict(&e) {
                    VellumError::duplicate_version(snapshot.relation_id, provisional)
                } else {
                    VellumError::from(e)
                }
            })?;
        }

        let stored = {
            let mut stmt = conn.prepare_cached(&format!(
                r#"SELECT {} FROM relation_versions
                   WHERE relation_id = ?1 AND timestamp = ?2
                   ORDER BY version DESC
                   LIMIT 1"#,
                VERSION_COLUMNS
            ))?;
            stmt.query_row(params![snapshot.relation_id, timestamp], |row| {
                Ok(Self::row_to_version(row))
            })
            .optional()?
            .transpose()?
        }
        .ok_or_else(|| VellumError::reconcile_missing(snapshot.relation_id, &timestamp))?;

        if stored.version != provisional {
            warn!(
                relation_id = snapshot.relation_id,
                provisional,
                assigned = stored.version,
                "Store assigned a different version than the writer supplied"
            );
        }
        snapshot.adopt_header(stored);

        let tag_count = tags::write_tags(
            conn,
            snapshot.relation_id,
            snapshot.version,
            snapshot.tags(),
        )?;
        let member_count = members::write_members(
            conn,
            snapshot.relation_id,
            snapshot.version,
            snapshot.members(),
        )?;

        debug!(
            relation_id = snapshot.relation_id,
            version = snapshot.version,
            tags = tag_count,
            members = member_count,
            "Wrote relation snapshot"
        );
        Ok(())
    }
}

impl RelationHistoryStore for SqliteRelationHistory {
    fn snapshot(&self, live: &LiveRelation) -> VellumResult<RelationVersion> {
        self.save(RelationVersion::from_live(live))
    }

    fn save(&self, mut snapshot: RelationVersion) -> VellumResult<RelationVersion> {
        if self.changesets.changeset_owner(snapshot.changeset_id)?.is_none() {
            return Err(VellumError::unknown_changeset(snapshot.changeset_id));
        }
        // Unset slots are written as empty lists.
        if !snapshot.members_loaded() {
            snapshot.set_members(Vec::new());
        }
        if !snapshot.tags_loaded() {
            snapshot.set_tags(Default::default());
        }

        let mut conn = self.conn()?;
        if self.atomic_snapshots {
            let tx = conn.transaction()?;
            Self::write_snapshot(&tx, &mut snapshot, self.store_assigned_versions)?;
            tx.commit()?;
        } else {
            Self::write_snapshot(&conn, &mut snapshot, self.store_assigned_versions)?;
        }
        Ok(snapshot)
    }

    fn get_version(
        &self,
        relation_id: RelationId,
        version: u32,
    ) -> VellumResult<Option<RelationVersion>> {
        let conn = self.conn()?;
        match Self::read_header(&conn, relation_id, version)? {
            Some(mut snapshot) => {
                Self::fill_children(&conn, &mut snapshot)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn latest(&self, relation_id: RelationId) -> VellumResult<Option<RelationVersion>> {
        let conn = self.conn()?;
        let header = {
            let mut stmt = conn.prepare_cached(&format!(
                r#"SELECT {} FROM relation_versions
                   WHERE relation_id = ?1
                   ORDER BY version DESC
                   LIMIT 1"#,
                VERSION_COLUMNS
            ))?;
            stmt.query_row(params![relation_id], |row| Ok(Self::row_to_version(row)))
                .optional()?
                .transpose()?
        };

        match header {
            Some(mut snapshot) => {
                Self::fill_children(&conn, &mut snapshot)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn history(&self, relation_id: RelationId) -> VellumResult<Vec<RelationVersion>> {
        let conn = self.conn()?;
        let headers: Vec<RelationVersion> = {
            let mut stmt = conn.prepare_cached(&format!(
                r#"SELECT {} FROM relation_versions
                   WHERE relation_id = ?1
                   ORDER BY version ASC"#,
                VERSION_COLUMNS
            ))?;
            let results =
                stmt.query_map(params![relation_id], |row| Ok(Self::row_to_version(row)))?;
            results
                .map(|r| r.map_err(VellumError::from).and_then(|inner| inner))
                .collect::<VellumResult<_>>()?
        };

        headers
            .into_iter()
            .map(|mut snapshot| -> VellumResult<RelationVersion> {
                Self::fill_children(&conn, &mut snapshot)?;
                Ok(snapshot)
            })
            .collect()
    }

    fn load_children(&self, snapshot: &mut RelationVersion) -> VellumResult<()> {
        if snapshot.payload_loaded() {
            return Ok(());
        }
        let conn = self.conn()?;
        Self::fill_children(&conn, snapshot)
    }

    fn member_records(
        &self,
        relation_id: RelationId,
        version: u32,
    ) -> VellumResult<Vec<MemberRecord>> {
        let conn = self.conn()?;
        members::read_member_records(&conn, relation_id, version)
    }

    fn tag_records(&self, relation_id: RelationId, version: u32) -> VellumResult<Vec<TagRecord>> {
        let conn = self.conn()?;
        tags::read_tag_records(&conn, relation_id, version)
    }

    fn redact(
        &self,
        relation_id: RelationId,
        version: u32,
        redaction_id: RedactionId,
        live: &LiveRelation,
    ) -> VellumResult<RelationVersion> {
        if live.id != relation_id {
            return Err(VellumError::invalid_redaction(format!(
                "live relation {} does not match relation {}",
                live.id, relation_id
            )));
        }

        let conn = self.conn()?;
        let mut snapshot = Self::read_header(&conn, relation_id, version)?
            .ok_or_else(|| VellumError::not_found(relation_id, version))?;

        if is_latest_version(&snapshot, live) {
            return Err(VellumError::invalid_redaction(format!(
                "relation {} v{} is the current version and cannot be redacted",
                relation_id, version
            )));
        }
        if let Some(existing) = snapshot.redaction_id {
            return Err(VellumError::invalid_redaction(format!(
                "relation {} v{} is already redacted by redaction {}",
                relation_id, version, existing
            )));
        }

        conn.execute(
            r#"UPDATE relation_versions SET redaction_id = ?3
               WHERE relation_id = ?1 AND version = ?2 AND redaction_id IS NULL"#,
            params![relation_id, version, redaction_id],
        )?;
        snapshot.redaction_id = Some(redaction_id);

        info!(relation_id, version, redaction_id, "Redacted relation version");
        Ok(snapshot)
    }

    fn count_versions(&self, relation_id: RelationId) -> VellumResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM relation_versions WHERE relation_id = ?1",
            params![relation_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
