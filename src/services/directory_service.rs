use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::auth::{Access, AccessError, AccessResolver, KeyDeriver};
use crate::config::LinkConfig;
use crate::store::{DirectoryStore, StoreError};
use crate::types::{normalize_email, Group, Member, UpsertOutcome};
use crate::validation::{is_valid_email, MemberPayload, ModifyPayload, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unknown groups: {}", .0.join(", "))]
    UnknownGroups(Vec<String>),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid key")]
    InvalidKey,

    #[error("Email cannot be changed via modify link")]
    EmailMismatch,

    #[error("User not found for this key")]
    MemberNotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Group '{name}' is in use by {count} user(s)")]
    GroupInUse { name: String, count: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => DirectoryError::Conflict(msg),
            StoreError::NotFound(msg) => DirectoryError::NotFound(msg),
            StoreError::GroupInUse { name, count } => DirectoryError::GroupInUse { name, count },
            other => DirectoryError::Store(other),
        }
    }
}

impl From<AccessError> for DirectoryError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Denied => DirectoryError::InvalidKey,
            AccessError::EmailMismatch => DirectoryError::EmailMismatch,
            AccessError::Store(e) => e.into(),
        }
    }
}

impl From<ValidationErrors> for DirectoryError {
    fn from(err: ValidationErrors) -> Self {
        DirectoryError::Validation(err)
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A generated modification link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModLink {
    pub key: String,
    pub link: String,
}

/// Outcome of a keyed modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modification {
    pub member: Member,
    pub outcome: UpsertOutcome,
}

/// Every directory operation exposed over HTTP.
///
/// The store is injected once at startup; nothing here holds global state.
pub struct DirectoryService {
    store: Arc<dyn DirectoryStore>,
    resolver: AccessResolver,
    links: LinkConfig,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn DirectoryStore>, deriver: KeyDeriver, links: LinkConfig) -> Self {
        Self {
            store,
            resolver: AccessResolver::new(deriver),
            links,
        }
    }

    pub fn store(&self) -> &Arc<dyn DirectoryStore> {
        &self.store
    }

    pub fn deriver(&self) -> &KeyDeriver {
        self.resolver.deriver()
    }

    /// Derive the key for `email` and build the link to the modify form.
    pub fn mod_link(&self, raw_email: &str) -> DirectoryResult<ModLink> {
        let email = normalize_email(raw_email);
        if email.is_empty() {
            return Err(DirectoryError::BadRequest("email is required".to_string()));
        }

        let key = self.deriver().derive(&email);
        let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        let link = format!("{}{}?key={}", self.links.public_base_url, self.links.modify_path, encoded);

        info!(email = %email, "Generated modification link");
        debug!(email = %email, key = %key, link = %link, "Modification link details");
        Ok(ModLink { key, link })
    }

    /// Look up the member a key belongs to.
    pub async fn member_by_key(&self, raw_key: &str) -> DirectoryResult<Member> {
        let key = raw_key.trim();
        if key.is_empty() {
            return Err(DirectoryError::BadRequest("key is required".to_string()));
        }
        self.store
            .find_by_key(self.deriver(), key)
            .await?
            .ok_or(DirectoryError::MemberNotFound)
    }

    /// All members, sorted by name.
    pub async fn list_members(&self) -> DirectoryResult<Vec<Member>> {
        let mut members = self.store.list_members().await?;
        members.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(members)
    }

    /// Admin create. Rejects an email that is already present.
    pub async fn create_member(&self, payload: &MemberPayload) -> DirectoryResult<Member> {
        let member = payload.validate()?;
        self.ensure_groups_exist(&member.groups).await?;

        if self.store.find_by_email(&member.email).await?.is_some() {
            return Err(DirectoryError::DuplicateEmail);
        }

        self.store.upsert_member(&member).await?;
        info!(email = %member.email, "Created member");
        Ok(member)
    }

    /// Keyed modification. The key decides which record may be written.
    pub async fn modify_member(&self, payload: &ModifyPayload) -> DirectoryResult<Modification> {
        let (key, member) = payload.validate()?;

        let access = self
            .resolver
            .resolve(self.store.as_ref(), &key, Some(&member.email))
            .await?;
        self.ensure_groups_exist(&member.groups).await?;

        let outcome = self.store.upsert_member(&member).await?;
        match access {
            Access::Existing(_) => info!(email = %member.email, "Modified member via key"),
            Access::Provision { .. } => info!(email = %member.email, "Provisioned member via key"),
        }
        Ok(Modification { member, outcome })
    }

    async fn ensure_groups_exist(&self, groups: &[String]) -> DirectoryResult<()> {
        let known: HashSet<String> = self
            .store
            .list_groups()
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect();
        let missing: Vec<String> = groups.iter().filter(|g| !known.contains(*g)).cloned().collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DirectoryError::UnknownGroups(missing))
        }
    }

    /// Groups sorted by name.
    pub async fn list_groups(&self) -> DirectoryResult<Vec<Group>> {
        let mut groups = self.store.list_groups().await?;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    pub async fn group_names(&self) -> DirectoryResult<Vec<String>> {
        Ok(self.list_groups().await?.into_iter().map(|g| g.name).collect())
    }

    pub async fn create_group(&self, raw_name: &str) -> DirectoryResult<Group> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(DirectoryError::BadRequest("name is required".to_string()));
        }
        let group = self.store.create_group(name).await?;
        info!(group = %group.name, "Created group");
        Ok(group)
    }

    /// Rename a group and cascade into members. Returns members touched.
    pub async fn rename_group(&self, raw_old: &str, raw_new: &str) -> DirectoryResult<usize> {
        let (old_name, new_name) = (raw_old.trim(), raw_new.trim());
        if old_name.is_empty() || new_name.is_empty() {
            return Err(DirectoryError::BadRequest("oldName and newName are required".to_string()));
        }
        if old_name == new_name {
            return Err(DirectoryError::Conflict(format!("Group '{}' already exists", new_name)));
        }
        let touched = self.store.rename_group(old_name, new_name).await?;
        info!(from = %old_name, to = %new_name, members = touched, "Renamed group");
        Ok(touched)
    }

    pub async fn delete_group(&self, raw_name: &str) -> DirectoryResult<()> {
        let name = raw_name.trim();
        if name.is_empty() {
            return Err(DirectoryError::BadRequest("name is required".to_string()));
        }
        self.store.delete_group(name).await?;
        info!(group = %name, "Deleted group");
        Ok(())
    }
}

/// Cheap syntactic check used by callers that only have an email, such as the CLI.
pub fn looks_like_email(raw: &str) -> bool {
    is_valid_email(&normalize_email(raw))
}
