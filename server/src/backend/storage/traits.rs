//! # Storage Traits
//!
//! Storage abstraction the domain layer works against, so the CSV backend can
//! be swapped without touching the services.

use anyhow::Result;
use async_trait::async_trait;

use crate::backend::domain::models::birthday::Birthday;

/// Trait defining the interface for birthday storage operations
#[async_trait]
pub trait BirthdayStorage: Send + Sync {
    /// All birthdays in display order (sort order, then name)
    async fn list_birthdays(&self) -> Result<Vec<Birthday>>;

    /// Birthdays with reminders turned on, in display order
    async fn list_enabled(&self) -> Result<Vec<Birthday>>;

    async fn get_birthday(&self, id: u64) -> Result<Option<Birthday>>;

    /// Store a new birthday under a freshly assigned id.
    /// The id on the incoming value is ignored.
    async fn insert_birthday(&self, birthday: Birthday) -> Result<Birthday>;

    /// Replace a stored birthday; returns false if the id is unknown
    async fn update_birthday(&self, birthday: &Birthday) -> Result<bool>;

    /// Returns true if the birthday was found and deleted
    async fn delete_birthday(&self, id: u64) -> Result<bool>;

    /// Give each listed id the sort order of its position; unlisted ids keep theirs
    async fn update_sort_orders(&self, ordered_ids: &[u64]) -> Result<()>;
}
