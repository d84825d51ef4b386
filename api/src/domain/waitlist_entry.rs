use crate::domain::waitlist_email::WaitlistEmail;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Origin tag recorded for every signup coming through the landing page form.
pub const LANDING_PAGE_SOURCE: &str = "landing_page";

pub type EntryId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitlistEntry {
    pub id: EntryId,
    pub email: WaitlistEmail,
    pub created_at: DateTime<Utc>,
    pub source: String,
}

impl WaitlistEntry {
    /// A fresh entry, timestamped now.
    pub fn new(email: WaitlistEmail, source: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            created_at: Utc::now(),
            source: source.to_string(),
        }
    }
}
