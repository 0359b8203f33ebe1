//! SQLite backend for [`GroupStore`].

use super::{Group, GroupId, GroupStore, Member, MemberId};
use crate::error::StoreError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const CREATE_GROUPS: &str = "CREATE TABLE IF NOT EXISTS groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(40)
)";

const CREATE_MEMBERS: &str = "CREATE TABLE IF NOT EXISTS members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER REFERENCES groups(id),
    phone VARCHAR(40) NOT NULL CHECK (phone <> ''),
    name VARCHAR(40)
)";

type GroupRow = (i64, String);
type MemberRow = (i64, i64, String, Option<String>);

fn group_from_row((id, name): GroupRow) -> Group {
    Group {
        id: GroupId(id),
        name,
    }
}

/// Name comparison with full Unicode case folding; SQLite's `lower()` only
/// folds ASCII.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn member_from_row((id, group_id, phone, name): MemberRow) -> Member {
    Member {
        id: MemberId(id),
        group_id: GroupId(group_id),
        phone,
        name,
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Private in-memory database, mainly for tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    /// Open (creating if needed) the database at `url` and ensure both tables exist.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // `sqlite::memory:` is per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        for ddl in [CREATE_GROUPS, CREATE_MEMBERS] {
            sqlx::query(ddl)
                .execute(&pool)
                .await
                .map_err(|e| StoreError::Schema(e.to_string()))?;
        }

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl GroupStore for SqliteStore {
    // ───────────────────────────── Groups ─────────────────────────────

    async fn insert_group(&self, name: &str) -> Result<GroupId, StoreError> {
        let done = sqlx::query("INSERT INTO groups (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(GroupId(done.last_insert_rowid()))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>("SELECT id, name FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(group_from_row).collect())
    }

    async fn groups_by_id(&self, id: GroupId) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>("SELECT id, name FROM groups WHERE id = ?")
            .bind(id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(group_from_row).collect())
    }

    async fn groups_by_name(&self, name: &str) -> Result<Vec<Group>, StoreError> {
        let groups = self.list_groups().await?;
        Ok(groups
            .into_iter()
            .filter(|g| same_name(&g.name, name))
            .collect())
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ───────────────────────────── Members ────────────────────────────

    async fn members(&self, group: GroupId) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, group_id, phone, name FROM members WHERE group_id = ? ORDER BY id",
        )
        .bind(group.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn members_by_phone(
        &self,
        group: GroupId,
        phone: &str,
    ) -> Result<Vec<Member>, StoreError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, group_id, phone, name FROM members
             WHERE group_id = ? AND phone = ? ORDER BY id",
        )
        .bind(group.0)
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(member_from_row).collect())
    }

    async fn members_by_name(&self, group: GroupId, name: &str) -> Result<Vec<Member>, StoreError> {
        let members = self.members(group).await?;
        Ok(members
            .into_iter()
            .filter(|m| m.name.as_deref().is_some_and(|n| same_name(n, name)))
            .collect())
    }

    async fn insert_member(
        &self,
        group: GroupId,
        phone: &str,
        name: Option<&str>,
    ) -> Result<MemberId, StoreError> {
        let done = sqlx::query("INSERT INTO members (group_id, phone, name) VALUES (?, ?, ?)")
            .bind(group.0)
            .bind(phone)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(MemberId(done.last_insert_rowid()))
    }

    async fn delete_members_by_phone(
        &self,
        group: GroupId,
        phone: &str,
    ) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM members WHERE group_id = ? AND phone = ?")
            .bind(group.0)
            .bind(phone)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn delete_members_by_name(&self, group: GroupId, name: &str) -> Result<u64, StoreError> {
        let mut removed = 0;
        for member in self.members_by_name(group, name).await? {
            let done = sqlx::query("DELETE FROM members WHERE id = ?")
                .bind(member.id.0)
                .execute(&self.pool)
                .await?;
            removed += done.rows_affected();
        }
        Ok(removed)
    }

    async fn delete_members(&self, group: GroupId) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM members WHERE group_id = ?")
            .bind(group.0)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
