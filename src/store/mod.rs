//! Storage collaborator for groups and members.
//!
//! Backends only provide primitive reads and writes. Uniqueness rules and
//! selector resolution live in [`crate::directory::GroupDirectory`], so each
//! directory operation is a sequence of independent statements rather than a
//! single transaction.

pub mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::StoreError;
use async_trait::async_trait;
use std::fmt;

/// Group identifier assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub i64);

/// Member identifier assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemberId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// Member record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub group_id: GroupId,
    /// Canonical phone number, never empty.
    pub phone: String,
    /// Display name; `None` when the member was added without one.
    pub name: Option<String>,
}

impl Member {
    /// Display name or an empty string.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Primitive persistence operations over the `groups` and `members` tables.
///
/// Name lookups are case-insensitive; phone lookups are exact. Listing
/// operations return rows in creation order.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Insert a group and return its new id.
    async fn insert_group(&self, name: &str) -> Result<GroupId, StoreError>;

    /// All groups.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Groups with the given id (zero or one row).
    async fn groups_by_id(&self, id: GroupId) -> Result<Vec<Group>, StoreError>;

    /// Groups whose name matches case-insensitively.
    async fn groups_by_name(&self, name: &str) -> Result<Vec<Group>, StoreError>;

    /// Delete a group row. Members must already be gone.
    async fn delete_group(&self, id: GroupId) -> Result<(), StoreError>;

    /// Members of a group.
    async fn members(&self, group: GroupId) -> Result<Vec<Member>, StoreError>;

    /// Members of a group with exactly this phone number.
    async fn members_by_phone(&self, group: GroupId, phone: &str)
        -> Result<Vec<Member>, StoreError>;

    /// Members of a group whose name matches case-insensitively.
    async fn members_by_name(&self, group: GroupId, name: &str) -> Result<Vec<Member>, StoreError>;

    /// Insert a member and return its new id.
    async fn insert_member(
        &self,
        group: GroupId,
        phone: &str,
        name: Option<&str>,
    ) -> Result<MemberId, StoreError>;

    /// Delete members of a group by phone; returns the number removed.
    async fn delete_members_by_phone(&self, group: GroupId, phone: &str)
        -> Result<u64, StoreError>;

    /// Delete members of a group by case-insensitive name; returns the number removed.
    async fn delete_members_by_name(&self, group: GroupId, name: &str) -> Result<u64, StoreError>;

    /// Delete every member of a group; returns the number removed.
    async fn delete_members(&self, group: GroupId) -> Result<u64, StoreError>;
}
