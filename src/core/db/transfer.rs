use serde::{Deserialize, Serialize};

use crate::{
    core::db::{member::Member, project::Project, project_type::ProjectType, role::ProjectRole},
    error::TrackerError,
};

/// The whole tracker state; also the import/export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub projects: Vec<Project>,
    pub members: Vec<Member>,
    pub project_types: Vec<ProjectType>,
    pub project_roles: Vec<ProjectRole>,
}

impl AppData {
    pub fn from_json(text: &str) -> Result<Self, TrackerError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string(self)?)
    }
}
