//! Relation members.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{ErrorCode, VellumError, VellumResult};

/// Kinds of entity a relation can reference.
///
/// Stored in classified form (`Node`, `Way`, `Relation`) and rendered
/// lower-cased. Parsing accepts either casing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

impl MemberKind {
    /// Storage form.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Lower-cased form used in rendered documents.
    pub fn document_type(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Parse a stored member type.
    pub fn parse(s: &str) -> VellumResult<Self> {
        s.parse().map_err(|_| {
            VellumError::parse(
                format!("unknown member type {:?}", s),
                ErrorCode::ParseInvalidMemberKind,
            )
        })
    }
}

/// One entry of a relation's ordered member list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Kind of the referenced entity.
    #[serde(rename = "type")]
    pub kind: MemberKind,
    /// Id of the referenced entity.
    #[serde(rename = "ref")]
    pub member_id: i64,
    /// Role of the member, may be empty.
    #[serde(default)]
    pub role: String,
}

impl Member {
    pub fn new(kind: MemberKind, member_id: i64, role: impl Into<String>) -> Self {
        Self {
            kind,
            member_id,
            role: role.into(),
        }
    }

    pub fn node(member_id: i64, role: impl Into<String>) -> Self {
        Self::new(MemberKind::Node, member_id, role)
    }

    pub fn way(member_id: i64, role: impl Into<String>) -> Self {
        Self::new(MemberKind::Way, member_id, role)
    }

    pub fn relation(member_id: i64, role: impl Into<String>) -> Self {
        Self::new(MemberKind::Relation, member_id, role)
    }
}

/// A member as persisted for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub relation_id: i64,
    pub version: u32,
    /// 0-based position within the snapshot's member list.
    pub sequence_id: u32,
    #[serde(flatten)]
    pub member: Member,
}
