use crate::domain::waitlist_email::WaitlistEmail;
use crate::domain::waitlist_entry::{EntryId, WaitlistEntry};
use crate::utils::error_chain_fmt;
use async_trait::async_trait;

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("{0} is already on the waitlist")]
    Duplicate(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Persistence for waitlist entries.
///
/// Implementations enforce email uniqueness on `insert` atomically: when two
/// inserts race on the same address exactly one succeeds and the other gets
/// `StoreError::Duplicate`.
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn exists(&self, email: &WaitlistEmail) -> Result<bool, StoreError>;

    async fn insert(&self, entry: &WaitlistEntry) -> Result<EntryId, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Every entry, ordered by `created_at` ascending.
    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError>;
}
