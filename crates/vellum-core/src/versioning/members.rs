//! Ordered member rows of a snapshot.
//!
//! Position in the written slice becomes `sequence_id`; reads order by it.
//! Repeated identical members are kept as distinct positions.

use rusqlite::{params, Connection};

use crate::error::VellumResult;
use crate::types::{Member, MemberKind, MemberRecord, RelationId};

pub(crate) fn write_members(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
    members: &[Member],
) -> VellumResult<usize> {
    let mut stmt = conn.prepare_cached(
        r#"INSERT INTO relation_version_members
           (relation_id, version, sequence_id, member_type, member_id, member_role)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
    )?;

    for (sequence_id, member) in members.iter().enumerate() {
        stmt.execute(params![
            relation_id,
            version,
            sequence_id as u32,
            member.kind.as_str(),
            member.member_id,
            member.role,
        ])?;
    }
    Ok(members.len())
}

pub(crate) fn read_member_records(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
) -> VellumResult<Vec<MemberRecord>> {
    let mut stmt = conn.prepare_cached(
        r#"SELECT sequence_id, member_type, member_id, member_role
           FROM relation_version_members
           WHERE relation_id = ?1 AND version = ?2
           ORDER BY sequence_id ASC"#,
    )?;

    let rows = stmt.query_map(params![relation_id, version], |row| {
        let sequence_id: u32 = row.get(0)?;
        let member_type: String = row.get(1)?;
        let member_id: i64 = row.get(2)?;
        let role: String = row.get(3)?;
        Ok((sequence_id, member_type, member_id, role))
    })?;

    rows.map(|row| -> VellumResult<MemberRecord> {
        let (sequence_id, member_type, member_id, role) = row?;
        Ok(MemberRecord {
            relation_id,
            version,
            sequence_id,
            member: Member::new(MemberKind::parse(&member_type)?, member_id, role),
        })
    })
    .collect()
}

pub(crate) fn read_members(
    conn: &Connection,
    relation_id: RelationId,
    version: u32,
) -> VellumResult<Vec<Member>> {
    Ok(read_member_records(conn, relation_id, version)?
        .into_iter()
        .map(|record| record.member)
        .collect())
}
