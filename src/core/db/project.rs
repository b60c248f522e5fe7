use std::{collections::BTreeMap, future::Future};

use serde::{Deserialize, Serialize};

use crate::core::db::model::{MemberId, Millis, ProjectId, ProjectTypeId, RoleId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub client_full_name: String,
    pub project_type_id: ProjectTypeId,
    /// One entry per role of the project type; `None` means nobody is assigned.
    pub role_assignments: BTreeMap<RoleId, Option<MemberId>>,
    pub selected: bool,
    pub selected_timestamp: Option<Millis>,
    pub creation_date: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Project {
    /// The stored quantity, with a missing or zero value counting as 1.
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.filter(|q| *q > 0).unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub client_full_name: String,
    pub project_type_id: ProjectTypeId,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub client_full_name: Option<String>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
}

pub trait ProjectRepository {
    fn get_projects(&self) -> impl Future<Output = anyhow::Result<Vec<Project>>>;
    fn get_project_by_id(&self, id: ProjectId) -> impl Future<Output = anyhow::Result<Option<Project>>>;
    fn add_project(&self, project: &NewProject) -> impl Future<Output = anyhow::Result<Project>>;
    fn update_project(
        &self,
        id: ProjectId,
        update: &ProjectUpdate,
    ) -> impl Future<Output = anyhow::Result<Project>>;
    /// Switches the project type and resets every role assignment.
    fn set_project_type(
        &self,
        id: ProjectId,
        project_type_id: ProjectTypeId,
    ) -> impl Future<Output = anyhow::Result<Project>>;
    fn assign_member(
        &self,
        id: ProjectId,
        role_id: RoleId,
        member_id: Option<MemberId>,
    ) -> impl Future<Output = anyhow::Result<Project>>;
    fn set_selected(&self, id: ProjectId, selected: bool) -> impl Future<Output = anyhow::Result<Project>>;
    fn set_quantity(&self, id: ProjectId, quantity: u32) -> impl Future<Output = anyhow::Result<Project>>;
    fn delete_project(&self, id: ProjectId) -> impl Future<Output = anyhow::Result<()>>;
}
