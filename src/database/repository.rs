use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{FromRow, PgPool};

use super::manager::DatabaseManager;
use crate::auth::KeyDeriver;
use crate::store::{DirectoryStore, StoreError, StoreResult};
use crate::types::{normalize_email, Group, Member, UpsertOutcome};

const UNIQUE_VIOLATION: &str = "23505";

const MEMBER_COLUMNS: &str = "name, law_firm, email, phone, country, groups";

#[derive(Debug, FromRow)]
struct MemberRow {
    name: String,
    law_firm: String,
    email: String,
    phone: String,
    country: String,
    groups: Vec<String>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            name: row.name,
            law_firm: row.law_firm,
            email: normalize_email(&row.email),
            phone: Some(row.phone).filter(|p| !p.is_empty()),
            country: row.country,
            groups: row.groups,
        }
    }
}

/// Directory stored in PostgreSQL tables `directory_members` and `directory_groups`.
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let sql = format!("SELECT {} FROM directory_members ORDER BY name", MEMBER_COLUMNS);
        let rows: Vec<MemberRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let sql = format!("SELECT {} FROM directory_members WHERE email = $1", MEMBER_COLUMNS);
        let row: Option<MemberRow> = sqlx::query_as(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Member::from))
    }

    /// Streams the email column and stops at the first key match.
    async fn find_by_key(&self, deriver: &KeyDeriver, key: &str) -> StoreResult<Option<Member>> {
        let mut emails = sqlx::query_scalar::<_, String>("SELECT email FROM directory_members")
            .fetch(&self.pool);

        let mut matched = None;
        while let Some(email) = emails.try_next().await? {
            let email = normalize_email(&email);
            if !email.is_empty() && deriver.matches(&email, key) {
                matched = Some(email);
                break;
            }
        }
        drop(emails);

        match matched {
            Some(email) => self.find_by_email(&email).await,
            None => Ok(None),
        }
    }

    async fn upsert_member(&self, member: &Member) -> StoreResult<UpsertOutcome> {
        let inserted: bool = sqlx::query_scalar(
            r#"INSERT INTO directory_members (email, name, law_firm, phone, country, groups)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (email) DO UPDATE SET
                   name = EXCLUDED.name,
                   law_firm = EXCLUDED.law_firm,
                   phone = EXCLUDED.phone,
                   country = EXCLUDED.country,
                   groups = EXCLUDED.groups,
                   updated_at = now()
               RETURNING (xmax = 0)"#,
        )
        .bind(normalize_email(&member.email))
        .bind(&member.name)
        .bind(&member.law_firm)
        .bind(member.phone.as_deref().unwrap_or_default())
        .bind(&member.country)
        .bind(&member.groups)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted { UpsertOutcome::Created } else { UpsertOutcome::Updated })
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM directory_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().map(Group::new).collect())
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        match sqlx::query("INSERT INTO directory_groups (name) VALUES ($1)")
            .bind(name)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(Group::new(name)),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::Conflict(format!("Group '{}' already exists", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn rename_group(&self, old_name: &str, new_name: &str) -> StoreResult<usize> {
        let mut tx = self.pool.begin().await?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM directory_groups WHERE name = $1)")
            .bind(new_name)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(StoreError::Conflict(format!("Group '{}' already exists", new_name)));
        }

        let renamed = sqlx::query("UPDATE directory_groups SET name = $2 WHERE name = $1")
            .bind(old_name)
            .bind(new_name)
            .execute(&mut *tx)
            .await?;
        if renamed.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("group '{}'", old_name)));
        }

        // array_replace may leave the new name twice when a member already held it
        let members = sqlx::query(
            r#"UPDATE directory_members
               SET groups = ARRAY(
                       SELECT g FROM unnest(array_replace(groups, $1, $2)) WITH ORDINALITY AS t(g, i)
                       GROUP BY g ORDER BY MIN(i)
                   ),
                   updated_at = now()
               WHERE $1 = ANY(groups)"#,
        )
        .bind(old_name)
        .bind(new_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(members.rows_affected() as usize)
    }

    async fn delete_group(&self, name: &str) -> StoreResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM directory_groups WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(StoreError::NotFound(format!("group '{}'", name)));
        }

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM directory_members WHERE $1 = ANY(groups)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        if in_use > 0 {
            return Err(StoreError::GroupInUse { name: name.to_string(), count: in_use as usize });
        }

        sqlx::query("DELETE FROM directory_groups WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(DatabaseManager::health_check(&self.pool).await?)
    }
}
