//! Error types for vellum operations.
//!
//! Every failure carries a stable [`ErrorCode`] so callers driving the
//! history core (an API layer, the CLI) can branch on the failure class
//! without matching message text.

use thiserror::Error;

/// Result type alias for vellum operations.
pub type VellumResult<T> = Result<T, VellumError>;

/// Main error type for all vellum operations.
#[derive(Error, Debug)]
pub enum VellumError {
    /// Input validation failed before anything was written.
    #[error("Validation error: {message}")]
    Validation { message: String, code: ErrorCode },

    /// A requested snapshot does not exist.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        relation_id: Option<i64>,
        version: Option<u32>,
    },

    /// Storage operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The store disagrees with itself, e.g. a freshly inserted snapshot
    /// cannot be read back.
    #[error("Inconsistent history: {message}")]
    Inconsistency { message: String, code: ErrorCode },

    /// An external collaborator could not resolve a reference.
    #[error("Lookup failed: {message}")]
    Lookup { message: String, code: ErrorCode },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValUnknownChangeset,
    ValInvalidRedaction,
    ValPayloadNotLoaded,
    ValInvalidInput,
    ValDuplicateVersion,

    // History (HIST_xxx)
    HistNotFound,
    HistReconcileMissing,

    // Lookup (LKP_xxx)
    LkpChangesetMissing,
    LkpUserMissing,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Parse (PARSE_xxx)
    ParseInvalidTimestamp,
    ParseInvalidMemberKind,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValUnknownChangeset => "VAL_001",
            ErrorCode::ValInvalidRedaction => "VAL_002",
            ErrorCode::ValPayloadNotLoaded => "VAL_003",
            ErrorCode::ValInvalidInput => "VAL_004",
            ErrorCode::ValDuplicateVersion => "VAL_005",
            ErrorCode::HistNotFound => "HIST_001",
            ErrorCode::HistReconcileMissing => "HIST_002",
            ErrorCode::LkpChangesetMissing => "LKP_001",
            ErrorCode::LkpUserMissing => "LKP_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::ParseInvalidTimestamp => "PARSE_001",
            ErrorCode::ParseInvalidMemberKind => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl VellumError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
        }
    }

    /// A snapshot references a changeset the directory does not know.
    pub fn unknown_changeset(changeset_id: i64) -> Self {
        Self::Validation {
            message: format!("changeset {} does not exist", changeset_id),
            code: ErrorCode::ValUnknownChangeset,
        }
    }

    /// Create an invalid redaction error.
    pub fn invalid_redaction(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidRedaction,
        }
    }

    /// Members or tags were needed but never loaded.
    pub fn payload_not_loaded(relation_id: i64, version: u32) -> Self {
        Self::Validation {
            message: format!(
                "members and tags of relation {} v{} have not been loaded",
                relation_id, version
            ),
            code: ErrorCode::ValPayloadNotLoaded,
        }
    }

    /// A client-assigned version is already stored for the relation.
    pub fn duplicate_version(relation_id: i64, version: u32) -> Self {
        Self::Validation {
            message: format!("relation {} already has version {}", relation_id, version),
            code: ErrorCode::ValDuplicateVersion,
        }
    }

    /// Create a not found error.
    pub fn not_found(relation_id: i64, version: u32) -> Self {
        Self::NotFound {
            message: format!("relation {} version {} not found", relation_id, version),
            code: ErrorCode::HistNotFound,
            relation_id: Some(relation_id),
            version: Some(version),
        }
    }

    /// The post-insert re-read returned no row.
    pub fn reconcile_missing(relation_id: i64, timestamp: &str) -> Self {
        Self::Inconsistency {
            message: format!(
                "no snapshot of relation {} at {} after insert",
                relation_id, timestamp
            ),
            code: ErrorCode::HistReconcileMissing,
        }
    }

    /// Create a changeset lookup error.
    pub fn changeset_lookup(changeset_id: i64) -> Self {
        Self::Lookup {
            message: format!("changeset {} could not be resolved", changeset_id),
            code: ErrorCode::LkpChangesetMissing,
        }
    }

    /// Create a user lookup error.
    pub fn user_lookup(user_id: i64) -> Self {
        Self::Lookup {
            message: format!("user {} could not be resolved", user_id),
            code: ErrorCode::LkpUserMissing,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Parse {
            message: message.into(),
            code,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Database { code, .. } => *code,
            Self::Inconsistency { code, .. } => *code,
            Self::Lookup { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the failure happened (or may have happened) after storage was touched.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Inconsistency { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self.code() {
            ErrorCode::ValUnknownChangeset => {
                Some("Open the changeset before snapshotting edits made under it")
            }
            ErrorCode::ValInvalidRedaction => {
                Some("Only historical, unredacted versions can be redacted")
            }
            ErrorCode::ValPayloadNotLoaded => {
                Some("Call load_children or fetch the snapshot through the store")
            }
            ErrorCode::ValDuplicateVersion => {
                Some("Enable store_assigned_versions or supply the next unused version")
            }
            ErrorCode::HistNotFound => Some("Check the relation id and version"),
            ErrorCode::HistReconcileMissing => {
                Some("Check the version assignment trigger on the relation_versions table")
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for VellumError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_changeset_error() {
        let err = VellumError::unknown_changeset(10);
        assert_eq!(err.code(), ErrorCode::ValUnknownChangeset);
        assert!(err.to_string().contains("changeset 10"));
        assert!(err.suggestion().is_some());
        assert!(!err.is_persistence_failure());
    }

    #[test]
    fn test_reconcile_missing_is_persistence_failure() {
        let err = VellumError::reconcile_missing(7, "2024-01-01T00:00:00Z");
        assert_eq!(err.code(), ErrorCode::HistReconcileMissing);
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn test_sqlite_error_maps_to_database() {
        let err: VellumError = rusqlite::Error::QueryReturnedNoRows.into();
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
        assert!(err.is_persistence_failure());
    }

    #[test]
    fn test_duplicate_version_is_validation() {
        let err = VellumError::duplicate_version(100, 2);
        assert_eq!(err.code(), ErrorCode::ValDuplicateVersion);
        assert!(matches!(err, VellumError::Validation { .. }));
        assert!(!err.is_persistence_failure());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValUnknownChangeset.as_str(), "VAL_001");
        assert_eq!(ErrorCode::LkpUserMissing.as_str(), "LKP_002");
    }
}
