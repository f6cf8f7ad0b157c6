//! Tag rows of a snapshot.
//!
//! Keys are unique per snapshot. When a key is written twice the last
//! value wins.

use rusqlite::{params, Connection};

use crate::error::VellumResult;
use crate::types::{RelationId, TagRecord, Tags};

pub(crate) fn write_tags<'a>(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
    tags: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> VellumResult<usize> {
    let mut stmt = conn.prepare_cached(
        r#"INSERT OR REPLACE INTO relation_version_tags (relation_id, version, k, v)
           VALUES (?1, ?2, ?3, ?4)"#,
    )?;

    let mut written = 0;
    for (k, v) in tags {
        stmt.execute(params![relation_id, version, k, v])?;
        written += 1;
    }
    Ok(written)
}

pub(crate) fn read_tag_records(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
) -> VellumResult<Vec<TagRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT k, v FROM relation_version_tags WHERE relation_id = ?1 AND version = ?2",
    )?;

    let rows = stmt.query_map(params![relation_id, version], |row| {
        Ok(TagRecord {
            relation_id,
            version,
            k: row.get(0)?,
            v: row.get(1)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(crate) fn read_tags(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
) -> VellumResult<Tags> {
    Ok(read_tag_records(conn, relation_id, version)?
        .into_iter()
        .map(|tag| (tag.k, tag.v))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::versioning::schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::init(&conn, false).unwrap();
        conn.execute(
            "INSERT INTO relation_versions (relation_id, version, visible, changeset_id, timestamp)
             VALUES (1, 1, 1, 10, '2024-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_tags_read_back_equal() {
        let conn = setup();
        let mut tags = Tags::new();
        tags.insert("type".to_string(), "multipolygon".to_string());
        tags.insert("name".to_string(), "Loop".to_string());
        tags.insert("note".to_string(), String::new());

        assert_eq!(write_tags(&conn, 1, 1, &tags).unwrap(), 3);
        assert_eq!(read_tags(&conn, 1, 1).unwrap(), tags);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let conn = setup();
        let name = "name".to_string();
        let first = "Old".to_string();
        let second = "New".to_string();

        write_tags(&conn, 1, 1, vec![(&name, &first), (&name, &second)]).unwrap();

        let tags = read_tags(&conn, 1, 1).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("name"), Some(&second));
    }

    #[test]
    fn test_no_rows_reads_empty() {
        let conn = setup();
        assert!(read_tags(&conn, 1, 1).unwrap().is_empty());
    }
}
