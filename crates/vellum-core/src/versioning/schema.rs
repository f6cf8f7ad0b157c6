//! Table layout for relation history.

use rusqlite::Connection;

use crate::error::VellumResult;

const TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS relation_versions (
        relation_id INTEGER NOT NULL,
        version INTEGER NOT NULL,
        visible INTEGER NOT NULL,
        changeset_id INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        redaction_id INTEGER,
        PRIMARY KEY (relation_id, version)
    );

    -- Post-insert reconciliation looks rows up by (relation_id, timestamp)
    CREATE INDEX IF NOT EXISTS idx_relation_versions_time
        ON relation_versions(relation_id, timestamp);

    CREATE TABLE IF NOT EXISTS relation_version_members (
        relation_id INTEGER NOT NULL,
        version INTEGER NOT NULL,
        sequence_id INTEGER NOT NULL,
        member_type TEXT NOT NULL,
        member_id INTEGER NOT NULL,
        member_role TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (relation_id, version, sequence_id),
        FOREIGN KEY (relation_id, version)
            REFERENCES relation_versions(relation_id, version) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS relation_version_tags (
        relation_id INTEGER NOT NULL,
        version INTEGER NOT NULL,
        k TEXT NOT NULL,
        v TEXT NOT NULL,
        PRIMARY KEY (relation_id, version, k),
        FOREIGN KEY (relation_id, version)
            REFERENCES relation_versions(relation_id, version) ON DELETE CASCADE
    );
"#;

// Rows arrive under a negative placeholder and are renumbered to one past the
// highest assigned (positive) version of the same relation.
const ASSIGN_VERSION_TRIGGER: &str = r#"
    CREATE TRIGGER IF NOT EXISTS relation_versions_assign_version
    AFTER INSERT ON relation_versions
    BEGIN
        UPDATE relation_versions
           SET version = (
               SELECT COALESCE(MAX(version), 0) + 1
                 FROM relation_versions
                WHERE relation_id = NEW.relation_id
                  AND version > 0
                  AND rowid != NEW.rowid
           )
         WHERE rowid = NEW.rowid;
    END;
"#;

const DROP_ASSIGN_VERSION_TRIGGER: &str =
    "DROP TRIGGER IF EXISTS relation_versions_assign_version;";

/// Create tables and install (or remove) the version assignment trigger.
pub(crate) fn init(conn: &Connection, store_assigned_versions: bool) -> VellumResult<()> {
    conn.execute_batch(TABLES)?;
    if store_assigned_versions {
        conn.execute_batch(ASSIGN_VERSION_TRIGGER)?;
    } else {
        conn.execute_batch(DROP_ASSIGN_VERSION_TRIGGER)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_init_is_idempotent_and_toggles_trigger() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn, true).unwrap();
        init(&conn, true).unwrap();
        assert_eq!(trigger_count(&conn), 1);

        init(&conn, false).unwrap();
        assert_eq!(trigger_count(&conn), 0);
    }

    #[test]
    fn test_trigger_renumbers_provisional_version() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn, true).unwrap();

        for placeholder in [-40, -7] {
            conn.execute(
                "INSERT INTO relation_versions
                 (relation_id, version, visible, changeset_id, timestamp)
                 VALUES (1, ?1, 1, 10, '2024-01-01T00:00:00.000000Z')",
                [placeholder],
            )
            .unwrap();
        }

        let versions: Vec<u32> = conn
            .prepare(
                "SELECT version FROM relation_versions WHERE relation_id = 1 ORDER BY version",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(versions, vec![1, 2]);
    }
}
