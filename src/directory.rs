//! Group and member directory.
//!
//! Enforces the directory invariants on top of a [`GroupStore`]:
//! group names are unique ignoring case, member phones are non-empty and unique
//! within a group, non-empty member names are unique within a group ignoring
//! case, and members never outlive their group.
//!
//! Operations run as separate store statements without a surrounding
//! transaction. Another process writing to the same database between a
//! duplicate check and the following insert can therefore still create a
//! duplicate.

use crate::error::DirectoryError;
use crate::store::{Group, GroupId, GroupStore, Member};

/// Selects a group by id or by case-insensitive name.
///
/// When both are set the id wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupSelector<'a> {
    pub id: Option<GroupId>,
    pub name: Option<&'a str>,
}

impl<'a> GroupSelector<'a> {
    pub fn id(id: GroupId) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn name(name: &'a str) -> Self {
        Self {
            id: None,
            name: Some(name),
        }
    }

    /// Selector for an optional group token taken from a command.
    pub fn from_token(token: Option<&'a str>) -> Self {
        Self {
            id: None,
            name: token,
        }
    }
}

/// Selects members within a group by phone or by case-insensitive name.
///
/// When both are set the name wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberSelector<'a> {
    pub phone: Option<&'a str>,
    pub name: Option<&'a str>,
}

impl<'a> MemberSelector<'a> {
    pub fn phone(phone: &'a str) -> Self {
        Self {
            phone: Some(phone),
            name: None,
        }
    }

    pub fn name(name: &'a str) -> Self {
        Self {
            phone: None,
            name: Some(name),
        }
    }
}

/// A group that was deleted together with its members.
#[derive(Debug, Clone)]
pub struct RemovedGroup {
    pub group: Group,
    pub members: Vec<Member>,
}

/// Owns the group/member data model.
pub struct GroupDirectory<S> {
    store: S,
}

impl<S: GroupStore> GroupDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a group unless one with the same name (ignoring case) exists.
    pub async fn add_group(&self, name: &str) -> Result<Group, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "no group name given".to_string(),
            ));
        }

        if !self.store.groups_by_name(name).await?.is_empty() {
            return Err(DirectoryError::Duplicate("group already present".to_string()));
        }

        let id = self.store.insert_group(name).await?;
        Ok(Group {
            id,
            name: name.to_string(),
        })
    }

    /// All groups in creation order.
    pub async fn list_groups(&self) -> Result<Vec<Group>, DirectoryError> {
        Ok(self.store.list_groups().await?)
    }

    /// Resolve a selector to exactly one group.
    pub async fn resolve_group(
        &self,
        selector: GroupSelector<'_>,
    ) -> Result<Group, DirectoryError> {
        let mut matches = match selector {
            GroupSelector { id: Some(id), .. } => self.store.groups_by_id(id).await?,
            GroupSelector {
                name: Some(name), ..
            } => self.store.groups_by_name(name).await?,
            _ => {
                return Err(DirectoryError::InvalidArgument(
                    "no group identifier given".to_string(),
                ))
            }
        };

        match matches.len() {
            0 => Err(DirectoryError::NotFound("no such group".to_string())),
            1 => Ok(matches.remove(0)),
            n => Err(DirectoryError::Ambiguous(format!(
                "{} groups match this name",
                n
            ))),
        }
    }

    /// Members of a resolved group in directory order.
    pub async fn members_of(&self, group: &Group) -> Result<Vec<Member>, DirectoryError> {
        Ok(self.store.members(group.id).await?)
    }

    /// Delete a group and all of its members.
    ///
    /// Members are deleted first so none is left pointing at a missing group.
    pub async fn remove_group(
        &self,
        selector: GroupSelector<'_>,
    ) -> Result<RemovedGroup, DirectoryError> {
        let group = self.resolve_group(selector).await?;
        let members = self.store.members(group.id).await?;
        self.store.delete_members(group.id).await?;
        self.store.delete_group(group.id).await?;
        Ok(RemovedGroup { group, members })
    }

    /// Add a member to a group.
    ///
    /// A name conflict is reported before a phone conflict.
    pub async fn add_member(
        &self,
        selector: GroupSelector<'_>,
        phone: Option<&str>,
        name: Option<&str>,
    ) -> Result<Member, DirectoryError> {
        let phone = phone.map(str::trim).filter(|p| !p.is_empty()).ok_or_else(|| {
            DirectoryError::InvalidArgument("no phone number given".to_string())
        })?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let group = self.resolve_group(selector).await?;

        if let Some(name) = name {
            if !self.store.members_by_name(group.id, name).await?.is_empty() {
                return Err(DirectoryError::Duplicate(
                    "name is already in group".to_string(),
                ));
            }
        }

        if !self.store.members_by_phone(group.id, phone).await?.is_empty() {
            return Err(DirectoryError::Duplicate(
                "phone number is already in group".to_string(),
            ));
        }

        let id = self.store.insert_member(group.id, phone, name).await?;
        Ok(Member {
            id,
            group_id: group.id,
            phone: phone.to_string(),
            name: name.map(str::to_string),
        })
    }

    /// Remove matching members from a group.
    ///
    /// Returns the resolved group and how many members were deleted; no match
    /// is not an error.
    pub async fn remove_member(
        &self,
        selector: GroupSelector<'_>,
        member: MemberSelector<'_>,
    ) -> Result<(Group, u64), DirectoryError> {
        let group = self.resolve_group(selector).await?;

        let removed = match member {
            MemberSelector {
                name: Some(name), ..
            } => self.store.delete_members_by_name(group.id, name).await?,
            MemberSelector {
                phone: Some(phone),
                ..
            } => self.store.delete_members_by_phone(group.id, phone).await?,
            _ => {
                return Err(DirectoryError::InvalidArgument(
                    "no phone number or name given".to_string(),
                ))
            }
        };

        Ok((group, removed))
    }
}
