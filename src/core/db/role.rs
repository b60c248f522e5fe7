use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::core::db::model::RoleId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRole {
    pub id: RoleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl ProjectRole {
    pub fn is_active(&self) -> bool {
        !self.is_deleted.unwrap_or(false)
    }
}

pub trait RoleRepository {
    fn get_roles(&self) -> impl Future<Output = anyhow::Result<Vec<ProjectRole>>>;
    fn get_role_by_id(&self, id: RoleId) -> impl Future<Output = anyhow::Result<Option<ProjectRole>>>;
    fn add_role(&self, name: &str) -> impl Future<Output = anyhow::Result<ProjectRole>>;
    fn rename_role(&self, id: RoleId, name: &str) -> impl Future<Output = anyhow::Result<ProjectRole>>;
    /// Marks the role deleted; it stays resolvable for existing payout tables.
    fn delete_role(&self, id: RoleId) -> impl Future<Output = anyhow::Result<()>>;
}
