use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DirectoryStore, StoreError, StoreResult};
use crate::types::{Group, Member, UpsertOutcome};

#[derive(Default)]
struct Inner {
    members: Vec<Member>,
    groups: Vec<Group>,
}

/// Process-local store used for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given groups already defined.
    pub fn with_groups<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut groups: Vec<Group> = Vec::new();
        for name in names {
            let name = name.into();
            if !name.is_empty() && !groups.iter().any(|g| g.name == name) {
                groups.push(Group::new(name));
            }
        }
        Self {
            inner: RwLock::new(Inner {
                members: Vec::new(),
                groups,
            }),
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        Ok(self.inner.read().await.members.clone())
    }

    async fn upsert_member(&self, member: &Member) -> StoreResult<UpsertOutcome> {
        let mut inner = self.inner.write().await;
        match inner.members.iter_mut().find(|m| m.email == member.email) {
            Some(existing) => {
                *existing = member.clone();
                Ok(UpsertOutcome::Updated)
            }
            None => {
                inner.members.push(member.clone());
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.inner.read().await.groups.clone())
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let mut inner = self.inner.write().await;
        if inner.groups.iter().any(|g| g.name == name) {
            return Err(StoreError::Conflict(format!("Group '{}' already exists", name)));
        }
        let group = Group::new(name);
        inner.groups.push(group.clone());
        Ok(group)
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        if inner.groups.iter().any(|g| g.name == new_name) {
            return Err(StoreError::Conflict(format!("Group '{}' already exists", new_name)));
        }
        let group = inner
            .groups
            .iter_mut()
            .find(|g| g.name == old_name)
            .ok_or_else(|| StoreError::NotFound(format!("group '{}'", old_name)))?;
        group.name = new_name.to_string();

        let mut touched = 0;
        for member in inner.members.iter_mut() {
            if member.rename_group(old_name, new_name) {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete_group(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let position = inner
            .groups
            .iter()
            .position(|g| g.name == name)
            .ok_or_else(|| StoreError::NotFound(format!("group '{}'", name)))?;

        let count = inner.members.iter().filter(|m| m.in_group(name)).count();
        if count > 0 {
            return Err(StoreError::GroupInUse { name: name.to_string(), count });
        }
        inner.groups.remove(position);
        Ok(())
    }
}
