//! Storage capability shared by every backend.
//!
//! The directory can live in PostgreSQL, in a Google Sheet, or in memory. The
//! service layer only sees `DirectoryStore`, constructed once at startup and
//! passed around as `Arc<dyn DirectoryStore>`.

pub mod memory;
pub mod mirror;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::KeyDeriver;
use crate::types::{normalize_email, Group, Member, UpsertOutcome};

pub use memory::MemoryStore;
pub use mirror::MirroredStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Group '{name}' is in use by {count} member(s)")]
    GroupInUse { name: String, count: usize },

    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Spreadsheet error: {0}")]
    Sheets(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Short backend name used in logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn list_members(&self) -> StoreResult<Vec<Member>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let email = normalize_email(email);
        Ok(self
            .list_members()
            .await?
            .into_iter()
            .find(|m| m.email == email))
    }

    /// Linear scan deriving the key of every stored email. No index is kept.
    async fn find_by_key(&self, deriver: &KeyDeriver, key: &str) -> StoreResult<Option<Member>> {
        Ok(self
            .list_members()
            .await?
            .into_iter()
            .filter(|m| !m.email.is_empty())
            .find(|m| deriver.matches(&m.email, key)))
    }

    /// Insert or update the member identified by its normalized email.
    async fn upsert_member(&self, member: &Member) -> StoreResult<UpsertOutcome>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;

    /// Fails with `Conflict` when a group with that name already exists.
    async fn create_group(&self, name: &str) -> StoreResult<Group>;

    /// Rename a group and every member reference to it. Returns the number of
    /// members touched.
    async fn rename_group(&self, old_name: &str, new_name: &str) -> StoreResult<usize>;

    /// Fails with `GroupInUse` while any member still references the group.
    async fn delete_group(&self, name: &str) -> StoreResult<()>;

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
