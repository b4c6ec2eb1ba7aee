use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{info, warn};

use super::client::{RangeUpdate, SheetsClient};
use super::rows::{
    duplicate_email_rows, email_row_index, header_matches, is_blank, join_groups, member_to_row,
    row_to_member, Row, FIRST_DATA_ROW, GROUP_HEADERS, MEMBER_HEADERS,
};
use crate::store::{DirectoryStore, StoreError, StoreResult};
use crate::types::{normalize_email, Group, Member, UpsertOutcome};

/// Directory kept in a Google Sheet.
///
/// Members occupy columns A..F of one tab, one member per row below a fixed
/// header. Groups occupy column A of a second tab. Rows are addressed by
/// position, so every write is preceded by a fresh read.
pub struct SheetsStore {
    client: SheetsClient,
    members_tab: String,
    groups_tab: String,
}

impl SheetsStore {
    pub fn new(client: SheetsClient, members_tab: impl Into<String>, groups_tab: impl Into<String>) -> Self {
        Self {
            client,
            members_tab: members_tab.into(),
            groups_tab: groups_tab.into(),
        }
    }

    fn members_range(&self, cells: &str) -> String {
        format!("{}!{}", self.members_tab, cells)
    }

    fn groups_range(&self, cells: &str) -> String {
        format!("{}!{}", self.groups_tab, cells)
    }

    /// Rewrite the header row when any expected cell is missing or different.
    async fn ensure_header(&self, range: String, expected: &[&str]) -> StoreResult<()> {
        let current = self.client.get(&range).await?;
        let first = current.into_iter().next().unwrap_or_default();
        if !header_matches(&first, expected) {
            info!("Writing header row {}", range);
            let header: Row = expected.iter().map(|h| h.to_string()).collect();
            self.client.update(&range, vec![header]).await?;
        }
        Ok(())
    }

    async fn ensure_member_header(&self) -> StoreResult<()> {
        self.ensure_header(self.members_range("A1:F1"), &MEMBER_HEADERS).await
    }

    async fn ensure_group_header(&self) -> StoreResult<()> {
        self.ensure_header(self.groups_range("A1:A1"), &GROUP_HEADERS).await
    }

    /// All member rows below the header, paired with their sheet row number.
    async fn member_rows(&self) -> StoreResult<Vec<(usize, Member)>> {
        self.ensure_member_header().await?;
        let rows = self.client.get(&self.members_range("A2:F")).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !is_blank(row))
            .map(|(i, row)| (i + FIRST_DATA_ROW, row_to_member(row)))
            .collect())
    }

    /// Rows that count as directory entries. Rows without an email are
    /// skipped, and only the first row of a duplicated email is kept.
    async fn directory_rows(&self) -> StoreResult<Vec<(usize, Member)>> {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for (row, member) in self.member_rows().await? {
            if member.email.is_empty() {
                continue;
            }
            if !seen.insert(member.email.clone()) {
                warn!("Duplicate email {} in sheet row {} is ignored", member.email, row);
                continue;
            }
            members.push((row, member));
        }
        Ok(members)
    }

    /// Group names with their sheet row number.
    async fn group_rows(&self) -> StoreResult<Vec<(usize, String)>> {
        self.ensure_group_header().await?;
        let rows = self.client.get(&self.groups_range("A2:A")).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let name = row.first().map(|c| c.trim()).unwrap_or_default();
                (!name.is_empty()).then(|| (i + FIRST_DATA_ROW, name.to_string()))
            })
            .collect())
    }
}

#[async_trait]
impl DirectoryStore for SheetsStore {
    fn backend(&self) -> &'static str {
        "sheets"
    }

    /// Members in sheet order.
    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        Ok(self
            .directory_rows()
            .await?
            .into_iter()
            .map(|(_, member)| member)
            .collect())
    }

    async fn upsert_member(&self, member: &Member) -> StoreResult<UpsertOutcome> {
        self.ensure_member_header().await?;

        let email = normalize_email(&member.email);
        if email.is_empty() {
            return Err(StoreError::Sheets("member email missing, cannot sync to sheet".to_string()));
        }

        let column = self.client.get(&self.members_range("C2:C")).await?;
        for (duplicate, row) in duplicate_email_rows(&column) {
            if duplicate == email {
                warn!("Email {} also appears in sheet row {}; updating the first row only", email, row);
            }
        }

        let values = vec![member_to_row(member)];
        match email_row_index(&column).get(&email) {
            Some(&row) => {
                let range = self.members_range(&format!("A{}:F{}", row, row));
                self.client.update(&range, values).await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                self.client.append(&self.members_range("A:F"), values).await?;
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let mut groups: Vec<Group> = Vec::new();
        for (_, name) in self.group_rows().await? {
            if !groups.iter().any(|g| g.name == name) {
                groups.push(Group::new(name));
            }
        }
        Ok(groups)
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        if self.group_rows().await?.iter().any(|(_, g)| g == name) {
            return Err(StoreError::Conflict(format!("Group '{}' already exists", name)));
        }
        self.client
            .append(&self.groups_range("A:A"), vec![vec![name.to_string()]])
            .await?;
        Ok(Group::new(name))
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> StoreResult<usize> {
        let groups = self.group_rows().await?;
        if groups.iter().any(|(_, g)| g == new_name) {
            return Err(StoreError::Conflict(format!("Group '{}' already exists", new_name)));
        }
        let group_row = groups
            .iter()
            .find(|(_, g)| g == old_name)
            .map(|(row, _)| *row)
            .ok_or_else(|| StoreError::NotFound(format!("group '{}'", old_name)))?;

        let mut updates = vec![RangeUpdate {
            range: self.groups_range(&format!("A{}", group_row)),
            values: vec![vec![new_name.to_string()]],
        }];

        let mut touched = 0;
        for (row, mut member) in self.directory_rows().await? {
            if member.rename_group(old_name, new_name) {
                touched += 1;
                updates.push(RangeUpdate {
                    range: self.members_range(&format!("F{}", row)),
                    values: vec![vec![join_groups(&member.groups)]],
                });
            }
        }

        self.client.batch_update(updates).await?;
        Ok(touched)
    }

    async fn delete_group(&self, name: &str) -> StoreResult<()> {
        let group_row = self
            .group_rows()
            .await?
            .into_iter()
            .find(|(_, g)| g == name)
            .map(|(row, _)| row)
            .ok_or_else(|| StoreError::NotFound(format!("group '{}'", name)))?;

        let count = self
            .directory_rows()
            .await?
            .iter()
            .filter(|(_, m)| m.in_group(name))
            .count();
        if count > 0 {
            return Err(StoreError::GroupInUse { name: name.to_string(), count });
        }

        self.client.clear(&self.groups_range(&format!("A{}", group_row))).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.client.get(&self.members_range("A1:F1")).await.map(|_| ())
    }
}
