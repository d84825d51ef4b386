pub mod email_client;
pub mod waitlist_email;
pub mod waitlist_entry;
pub mod waitlist_store;
pub mod welcome_email;

pub use crate::domain::email_client::{EmailClient, EmailSendResult, MessageId, TransportError};
pub use crate::domain::waitlist_email::WaitlistEmail;
pub use crate::domain::waitlist_entry::{EntryId, WaitlistEntry, LANDING_PAGE_SOURCE};
pub use crate::domain::waitlist_store::{StoreError, WaitlistStore};
