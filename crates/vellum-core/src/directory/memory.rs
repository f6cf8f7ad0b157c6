//! In-memory changeset and user directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{VellumError, VellumResult};
use crate::traits::{ChangesetDirectory, UserDirectory, UserProfile};
use crate::types::{ChangesetId, UserId};

/// Directory backed by hash maps.
///
/// Counts every lookup so callers can observe how well their render
/// caches are working.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    changesets: RwLock<HashMap<ChangesetId, UserId>>,
    users: RwLock<HashMap<UserId, UserProfile>>,
    changeset_lookups: AtomicUsize,
    user_lookups: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a changeset opened by `user_id`.
    pub fn add_changeset(&self, changeset_id: ChangesetId, user_id: UserId) -> VellumResult<()> {
        self.changesets
            .write()
            .map_err(|_| VellumError::Internal("changeset map lock poisoned".to_string()))?
            .insert(changeset_id, user_id);
        Ok(())
    }

    /// Register a user account.
    pub fn add_user(&self, profile: UserProfile) -> VellumResult<()> {
        self.users
            .write()
            .map_err(|_| VellumError::Internal("user map lock poisoned".to_string()))?
            .insert(profile.id, profile);
        Ok(())
    }

    /// Number of changeset lookups served so far.
    pub fn changeset_lookups(&self) -> usize {
        self.changeset_lookups.load(Ordering::Relaxed)
    }

    /// Number of user lookups served so far.
    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::Relaxed)
    }
}

impl ChangesetDirectory for MemoryDirectory {
    fn changeset_owner(&self, changeset_id: ChangesetId) -> VellumResult<Option<UserId>> {
        self.changeset_lookups.fetch_add(1, Ordering::Relaxed);
        let changesets = self
            .changesets
            .read()
            .map_err(|_| VellumError::Internal("changeset map lock poisoned".to_string()))?;
        Ok(changesets.get(&changeset_id).copied())
    }
}

impl UserDirectory for MemoryDirectory {
    fn user(&self, user_id: UserId) -> VellumResult<Option<UserProfile>> {
        self.user_lookups.fetch_add(1, Ordering::Relaxed);
        let users = self
            .users
            .read()
            .map_err(|_| VellumError::Internal("user map lock poisoned".to_string()))?;
        Ok(users.get(&user_id).cloned())
    }
}
