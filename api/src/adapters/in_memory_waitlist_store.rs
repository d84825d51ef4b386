use crate::domain::{EntryId, StoreError, WaitlistEmail, WaitlistEntry, WaitlistStore};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-local store keyed by email. Used for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWaitlistStore {
    entries: Arc<Mutex<HashMap<String, WaitlistEntry>>>,
}

impl InMemoryWaitlistStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, WaitlistEntry>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::UnexpectedError(anyhow!("Waitlist store lock was poisoned")))
    }
}

#[async_trait]
impl WaitlistStore for InMemoryWaitlistStore {
    async fn exists(&self, email: &WaitlistEmail) -> Result<bool, StoreError> {
        Ok(self.entries()?.contains_key(email.as_ref()))
    }

    #[tracing::instrument(name = "Inserting waitlist entry in memory", skip(self, entry), fields(waitlist_email = %entry.email))]
    async fn insert(&self, entry: &WaitlistEntry) -> Result<EntryId, StoreError> {
        let mut entries = self.entries()?;

        if entries.contains_key(entry.email.as_ref()) {
            return Err(StoreError::Duplicate(entry.email.to_string()));
        }

        entries.insert(entry.email.to_string(), entry.clone());
        Ok(entry.id)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.entries()?.len() as u64)
    }

    async fn list_oldest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let mut entries: Vec<WaitlistEntry> = self.entries()?.values().cloned().collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}
