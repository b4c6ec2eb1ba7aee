use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{DirectoryStore, StoreResult};
use crate::auth::KeyDeriver;
use crate::types::{Group, Member, UpsertOutcome};

/// Primary store whose member upserts are copied into a secondary store.
///
/// Reads, key scans and group operations only touch the primary. The mirror
/// receives each member after the primary accepted it; a mirror failure is
/// reported to the caller even though the primary write already happened.
pub struct MirroredStore {
    primary: Arc<dyn DirectoryStore>,
    mirror: Arc<dyn DirectoryStore>,
}

impl MirroredStore {
    pub fn new(primary: Arc<dyn DirectoryStore>, mirror: Arc<dyn DirectoryStore>) -> Self {
        info!("Mirroring member writes from {} into {}", primary.backend(), mirror.backend());
        Self { primary, mirror }
    }
}

#[async_trait]
impl DirectoryStore for MirroredStore {
    fn backend(&self) -> &'static str {
        self.primary.backend()
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        self.primary.list_members().await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        self.primary.find_by_email(email).await
    }

    async fn find_by_key(&self, deriver: &KeyDeriver, key: &str) -> StoreResult<Option<Member>> {
        self.primary.find_by_key(deriver, key).await
    }

    async fn upsert_member(&self, member: &Member) -> StoreResult<UpsertOutcome> {
        let outcome = self.primary.upsert_member(member).await?;
        if let Err(e) = self.mirror.upsert_member(member).await {
            error!("Mirror upsert into {} failed for {}: {}", self.mirror.backend(), member.email, e);
            return Err(e);
        }
        Ok(outcome)
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        self.primary.list_groups().await
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        self.primary.create_group(name).await
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> StoreResult<usize> {
        self.primary.rename_group(old_name, new_name).await
    }

    async fn delete_group(&self, name: &str) -> StoreResult<()> {
        self.primary.delete_group(name).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.primary.health_check().await
    }
}
