use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};

use crate::core::db::model::{ProjectTypeId, RoleId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectType {
    pub id: ProjectTypeId,
    pub title: String,
    pub price: f64,
    /// Share of the price per role, in percent. Expected to sum to at most 100.
    pub payout_percentages: BTreeMap<RoleId, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
}

impl ProjectType {
    pub fn is_active(&self) -> bool {
        !self.is_deleted.unwrap_or(false)
    }

    /// Percentage for `role`, zero when the type does not pay that role.
    pub fn percentage_for(&self, role: RoleId) -> f64 {
        self.payout_percentages.get(&role).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct NewProjectType {
    pub title: String,
    pub price: f64,
    pub payout_percentages: BTreeMap<RoleId, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectTypeUpdate {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub payout_percentages: Option<BTreeMap<RoleId, f64>>,
}

pub trait ProjectTypeRepository {
    fn get_project_types(&self) -> impl Future<Output = anyhow::Result<Vec<ProjectType>>>;
    fn get_project_type_by_id(
        &self,
        id: ProjectTypeId,
    ) -> impl Future<Output = anyhow::Result<Option<ProjectType>>>;
    fn add_project_type(
        &self,
        project_type: &NewProjectType,
    ) -> impl Future<Output = anyhow::Result<ProjectType>>;
    fn update_project_type(
        &self,
        id: ProjectTypeId,
        update: &ProjectTypeUpdate,
    ) -> impl Future<Output = anyhow::Result<ProjectType>>;
    fn delete_project_type(&self, id: ProjectTypeId) -> impl Future<Output = anyhow::Result<()>>;
}
