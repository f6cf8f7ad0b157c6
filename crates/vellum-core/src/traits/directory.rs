//! Changeset and user lookups.
//!
//! Both directories live outside the history core. The store asks the
//! changeset directory whether a snapshot's changeset exists; the renderer
//! asks both to attribute a snapshot to a user.

use serde::{Deserialize, Serialize};

use crate::error::VellumResult;
use crate::types::{ChangesetId, UserId};

/// Public-facing slice of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    /// Whether the user agreed to have their edits attributed publicly.
    pub data_public: bool,
}

impl UserProfile {
    pub fn new(id: UserId, display_name: impl Into<String>, data_public: bool) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            data_public,
        }
    }
}

/// Resolves changesets to the user that opened them.
#[cfg_attr(test, mockall::automock)]
pub trait ChangesetDirectory: Send + Sync {
    /// Owning user of a changeset, or `None` if the changeset does not exist.
    fn changeset_owner(&self, changeset_id: ChangesetId) -> VellumResult<Option<UserId>>;
}

/// Resolves user accounts.
#[cfg_attr(test, mockall::automock)]
pub trait UserDirectory: Send + Sync {
    /// Look up a user, or `None` if the account does not exist.
    fn user(&self, user_id: UserId) -> VellumResult<Option<UserProfile>>;
}
