pub mod integrity;
mod member;
mod model;
mod project;
mod project_type;
mod role;
mod state;
mod storage;
mod transfer;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::error::TrackerError;

pub use member::{Member, MemberRepository};
pub use model::{MemberId, Millis, ProjectId, ProjectTypeId, RoleId, millis_to_datetime, now_millis};
pub use project::{NewProject, Project, ProjectRepository, ProjectUpdate};
pub use project_type::{NewProjectType, ProjectType, ProjectTypeRepository, ProjectTypeUpdate};
pub use role::{ProjectRole, RoleRepository};
pub use state::SqliteStorage;
pub use storage::{MemoryStorage, Storage};
pub use transfer::AppData;

pub const PROJECTS_KEY: &str = "projectsData";
pub const MEMBERS_KEY: &str = "membersData";
pub const PROJECT_TYPES_KEY: &str = "projectTypesData";
pub const PROJECT_ROLES_KEY: &str = "projectRolesData";

/// One of the four persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Blob {
    Projects,
    Members,
    ProjectTypes,
    ProjectRoles,
}

impl Blob {
    const ALL: [Blob; 4] = [Blob::Projects, Blob::Members, Blob::ProjectTypes, Blob::ProjectRoles];

    fn key(self) -> &'static str {
        match self {
            Blob::Projects => PROJECTS_KEY,
            Blob::Members => MEMBERS_KEY,
            Blob::ProjectTypes => PROJECT_TYPES_KEY,
            Blob::ProjectRoles => PROJECT_ROLES_KEY,
        }
    }
}

/// The tracker store: all state in memory, written through to a [`Storage`]
/// after every mutation.
#[derive(Debug)]
pub struct TrackerDb<S> {
    storage: S,
    data: RwLock<AppData>,
}

impl<S: Storage> TrackerDb<S> {
    /// Load the four collections from `storage`; missing keys load as empty.
    pub async fn open(storage: S) -> anyhow::Result<Self> {
        let mut data = AppData {
            projects: load_blob(&storage, PROJECTS_KEY).await?,
            members: load_blob(&storage, MEMBERS_KEY).await?,
            project_types: load_blob(&storage, PROJECT_TYPES_KEY).await?,
            project_roles: load_blob(&storage, PROJECT_ROLES_KEY).await?,
        };
        let cleared = integrity::clear_dangling_assignments(&mut data.projects, &data.members);
        let db = Self {
            storage,
            data: RwLock::new(AppData::default()),
        };
        if cleared > 0 {
            tracing::info!(cleared, "cleared assignments to missing members on load");
            db.persist(&data, &[Blob::Projects]).await?;
        }
        tracing::debug!(
            projects = data.projects.len(),
            members = data.members.len(),
            project_types = data.project_types.len(),
            project_roles = data.project_roles.len(),
            "opened tracker"
        );
        *db.data.write().await = data;
        Ok(db)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// A copy of every collection, shaped as the export document.
    pub async fn export_data(&self) -> AppData {
        self.data.read().await.clone()
    }

    pub async fn export_json(&self) -> anyhow::Result<String> {
        let json = self.data.read().await.to_json()?;
        tracing::info!(bytes = json.len(), "exported tracker data");
        Ok(json)
    }

    /// Replace every collection with the document in `text`.
    ///
    /// A malformed document is logged and returned as [`TrackerError::Import`];
    /// the store is left untouched in that case.
    pub async fn import_json(&self, text: &str) -> anyhow::Result<usize> {
        let imported = match AppData::from_json(text) {
            Ok(imported) => imported,
            Err(err) => {
                tracing::error!(error = %err, "error parsing import document");
                return Err(err.into());
            }
        };
        self.import_data(imported).await
    }

    /// Replace every collection with `imported`; returns the number of dangling
    /// assignments that had to be cleared.
    pub async fn import_data(&self, mut imported: AppData) -> anyhow::Result<usize> {
        let cleared = integrity::clear_dangling_assignments(&mut imported.projects, &imported.members);
        let mut data = self.data.write().await;
        *data = imported;
        self.persist(&data, &Blob::ALL).await?;
        tracing::info!(
            projects = data.projects.len(),
            members = data.members.len(),
            project_types = data.project_types.len(),
            project_roles = data.project_roles.len(),
            cleared,
            "imported tracker data"
        );
        Ok(cleared)
    }

    async fn persist(&self, data: &AppData, blobs: &[Blob]) -> anyhow::Result<()> {
        for blob in blobs {
            let json = match blob {
                Blob::Projects => to_json(&data.projects)?,
                Blob::Members => to_json(&data.members)?,
                Blob::ProjectTypes => to_json(&data.project_types)?,
                Blob::ProjectRoles => to_json(&data.project_roles)?,
            };
            self.storage.set_item(blob.key(), &json).await?;
        }
        Ok(())
    }
}

async fn load_blob<S: Storage, T: DeserializeOwned>(storage: &S, key: &str) -> anyhow::Result<Vec<T>> {
    match storage.get_item(key).await? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| anyhow::anyhow!("Failed to parse stored {}: {}", key, e)),
        None => Ok(Vec::new()),
    }
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn required_text(value: &str, what: &str) -> Result<String, TrackerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::invalid(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: f64) -> Result<f64, TrackerError> {
    if !price.is_finite() || price < 0.0 {
        return Err(TrackerError::invalid(format!("price {} must be a non-negative number", price)));
    }
    Ok(price)
}

fn validate_percentages(
    percentages: &std::collections::BTreeMap<RoleId, f64>,
    roles: &[ProjectRole],
) -> Result<(), TrackerError> {
    for (role_id, percent) in percentages {
        if !roles.iter().any(|r| r.id == *role_id) {
            return Err(TrackerError::not_found("role", role_id));
        }
        if !percent.is_finite() || *percent < 0.0 {
            return Err(TrackerError::invalid(format!(
                "percentage {} for role {} must be a non-negative number",
                percent, role_id
            )));
        }
    }
    let sum: f64 = percentages.values().sum();
    if sum > 100.0 {
        tracing::warn!(sum, "payout percentages add up to more than 100");
    }
    Ok(())
}

impl<S: Storage> MemberRepository for TrackerDb<S> {
    async fn get_members(&self) -> anyhow::Result<Vec<Member>> {
        Ok(self.data.read().await.members.clone())
    }

    async fn get_member_by_id(&self, id: MemberId) -> anyhow::Result<Option<Member>> {
        Ok(self.data.read().await.members.iter().find(|m| m.id == id).cloned())
    }

    async fn add_member(&self, full_name: &str) -> anyhow::Result<Member> {
        let member = Member {
            id: MemberId::new(),
            full_name: required_text(full_name, "member name")?,
        };
        let mut data = self.data.write().await;
        data.members.push(member.clone());
        self.persist(&data, &[Blob::Members]).await?;
        tracing::debug!(id = %member.id, "added member");
        Ok(member)
    }

    async fn rename_member(&self, id: MemberId, full_name: &str) -> anyhow::Result<Member> {
        let full_name = required_text(full_name, "member name")?;
        let mut data = self.data.write().await;
        let member = data
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| TrackerError::not_found("member", id))?;
        member.full_name = full_name;
        let member = member.clone();
        self.persist(&data, &[Blob::Members]).await?;
        tracing::debug!(%id, "renamed member");
        Ok(member)
    }

    async fn delete_member(&self, id: MemberId) -> anyhow::Result<usize> {
        let mut data = self.data.write().await;
        let before = data.members.len();
        data.members.retain(|m| m.id != id);
        if data.members.len() == before {
            return Err(TrackerError::not_found("member", id).into());
        }
        let AppData { projects, members, .. } = &mut *data;
        let cleared = integrity::clear_dangling_assignments(projects, members);
        self.persist(&data, &[Blob::Members, Blob::Projects]).await?;
        tracing::info!(%id, cleared, "deleted member");
        Ok(cleared)
    }
}

impl<S: Storage> RoleRepository for TrackerDb<S> {
    async fn get_roles(&self) -> anyhow::Result<Vec<ProjectRole>> {
        Ok(self.data.read().await.project_roles.clone())
    }

    async fn get_role_by_id(&self, id: RoleId) -> anyhow::Result<Option<ProjectRole>> {
        Ok(self
            .data
            .read()
            .await
            .project_roles
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn add_role(&self, name: &str) -> anyhow::Result<ProjectRole> {
        let role = ProjectRole {
            id: RoleId::new(),
            name: required_text(name, "role name")?,
            is_deleted: None,
        };
        let mut data = self.data.write().await;
        data.project_roles.push(role.clone());
        self.persist(&data, &[Blob::ProjectRoles]).await?;
        tracing::debug!(id = %role.id, "added role");
        Ok(role)
    }

    async fn rename_role(&self, id: RoleId, name: &str) -> anyhow::Result<ProjectRole> {
        let name = required_text(name, "role name")?;
        let mut data = self.data.write().await;
        let role = data
            .project_roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TrackerError::not_found("role", id))?;
        role.name = name;
        let role = role.clone();
        self.persist(&data, &[Blob::ProjectRoles]).await?;
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        let role = data
            .project_roles
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TrackerError::not_found("role", id))?;
        role.is_deleted = Some(true);
        self.persist(&data, &[Blob::ProjectRoles]).await?;
        tracing::debug!(%id, "deleted role");
        Ok(())
    }
}

impl<S: Storage> ProjectTypeRepository for TrackerDb<S> {
    async fn get_project_types(&self) -> anyhow::Result<Vec<ProjectType>> {
        Ok(self.data.read().await.project_types.clone())
    }

    async fn get_project_type_by_id(&self, id: ProjectTypeId) -> anyhow::Result<Option<ProjectType>> {
        Ok(self
            .data
            .read()
            .await
            .project_types
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn add_project_type(&self, project_type: &NewProjectType) -> anyhow::Result<ProjectType> {
        let mut data = self.data.write().await;
        validate_percentages(&project_type.payout_percentages, &data.project_roles)?;
        let project_type = ProjectType {
            id: ProjectTypeId::new(),
            title: required_text(&project_type.title, "project type title")?,
            price: validate_price(project_type.price)?,
            payout_percentages: project_type.payout_percentages.clone(),
            is_deleted: None,
        };
        data.project_types.push(project_type.clone());
        self.persist(&data, &[Blob::ProjectTypes]).await?;
        tracing::debug!(id = %project_type.id, "added project type");
        Ok(project_type)
    }

    async fn update_project_type(
        &self,
        id: ProjectTypeId,
        update: &ProjectTypeUpdate,
    ) -> anyhow::Result<ProjectType> {
        let mut data = self.data.write().await;
        if let Some(percentages) = &update.payout_percentages {
            validate_percentages(percentages, &data.project_roles)?;
        }
        let title = update
            .title
            .as_deref()
            .map(|t| required_text(t, "project type title"))
            .transpose()?;
        let price = update.price.map(validate_price).transpose()?;

        let project_type = data
            .project_types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TrackerError::not_found("project type", id))?;
        if let Some(title) = title {
            project_type.title = title;
        }
        if let Some(price) = price {
            project_type.price = price;
        }
        if let Some(percentages) = &update.payout_percentages {
            project_type.payout_percentages = percentages.clone();
        }
        let project_type = project_type.clone();
        self.persist(&data, &[Blob::ProjectTypes]).await?;
        tracing::debug!(%id, "updated project type");
        Ok(project_type)
    }

    async fn delete_project_type(&self, id: ProjectTypeId) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        let project_type = data
            .project_types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TrackerError::not_found("project type", id))?;
        project_type.is_deleted = Some(true);
        self.persist(&data, &[Blob::ProjectTypes]).await?;
        tracing::debug!(%id, "deleted project type");
        Ok(())
    }
}

fn active_project_type(data: &AppData, id: ProjectTypeId) -> Result<&ProjectType, TrackerError> {
    let project_type = data
        .project_types
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| TrackerError::not_found("project type", id))?;
    if !project_type.is_active() {
        return Err(TrackerError::invalid(format!("project type {} is deleted", id)));
    }
    Ok(project_type)
}

fn project_mut(data: &mut AppData, id: ProjectId) -> Result<&mut Project, TrackerError> {
    data.projects
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| TrackerError::not_found("project", id))
}

impl<S: Storage> TrackerDb<S> {
    /// Apply `change` to project `id`, persist the projects blob and return the result.
    async fn modify_project<F>(&self, id: ProjectId, change: F) -> anyhow::Result<Project>
    where
        F: FnOnce(&mut Project) -> Result<(), TrackerError>,
    {
        let mut data = self.data.write().await;
        let project = project_mut(&mut data, id)?;
        change(project)?;
        let project = project.clone();
        self.persist(&data, &[Blob::Projects]).await?;
        Ok(project)
    }
}

impl<S: Storage> ProjectRepository for TrackerDb<S> {
    async fn get_projects(&self) -> anyhow::Result<Vec<Project>> {
        Ok(self.data.read().await.projects.clone())
    }

    async fn get_project_by_id(&self, id: ProjectId) -> anyhow::Result<Option<Project>> {
        Ok(self.data.read().await.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn add_project(&self, project: &NewProject) -> anyhow::Result<Project> {
        let client_full_name = required_text(&project.client_full_name, "client name")?;
        let mut data = self.data.write().await;
        let project_type = active_project_type(&data, project.project_type_id)?;
        let project = Project {
            id: ProjectId::new(),
            client_full_name,
            project_type_id: project_type.id,
            role_assignments: integrity::empty_assignments(project_type),
            selected: false,
            selected_timestamp: None,
            creation_date: now_millis(),
            quantity: None,
            notes: None,
        };
        data.projects.push(project.clone());
        self.persist(&data, &[Blob::Projects]).await?;
        tracing::debug!(id = %project.id, project_type = %project.project_type_id, "added project");
        Ok(project)
    }

    async fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> anyhow::Result<Project> {
        let client_full_name = update
            .client_full_name
            .as_deref()
            .map(|name| required_text(name, "client name"))
            .transpose()?;
        let project = self
            .modify_project(id, |project| {
                if let Some(name) = client_full_name {
                    project.client_full_name = name;
                }
                if let Some(notes) = &update.notes {
                    let notes = notes.trim();
                    project.notes = (!notes.is_empty()).then(|| notes.to_string());
                }
                Ok(())
            })
            .await?;
        tracing::debug!(%id, "updated project");
        Ok(project)
    }

    async fn set_project_type(&self, id: ProjectId, project_type_id: ProjectTypeId) -> anyhow::Result<Project> {
        let mut data = self.data.write().await;
        let project_type = active_project_type(&data, project_type_id)?.clone();
        let project = project_mut(&mut data, id)?;
        integrity::reset_role_assignments(project, &project_type);
        let project = project.clone();
        self.persist(&data, &[Blob::Projects]).await?;
        tracing::debug!(%id, project_type = %project_type_id, "changed project type");
        Ok(project)
    }

    async fn assign_member(
        &self,
        id: ProjectId,
        role_id: RoleId,
        member_id: Option<MemberId>,
    ) -> anyhow::Result<Project> {
        let mut data = self.data.write().await;
        if let Some(member_id) = member_id {
            if !data.members.iter().any(|m| m.id == member_id) {
                return Err(TrackerError::not_found("member", member_id).into());
            }
        }
        let project = project_mut(&mut data, id)?;
        let slot = project
            .role_assignments
            .get_mut(&role_id)
            .ok_or_else(|| TrackerError::not_found("role assignment", role_id))?;
        *slot = member_id;
        let project = project.clone();
        self.persist(&data, &[Blob::Projects]).await?;
        tracing::debug!(%id, role = %role_id, member = ?member_id, "assigned member");
        Ok(project)
    }

    async fn set_selected(&self, id: ProjectId, selected: bool) -> anyhow::Result<Project> {
        let project = self
            .modify_project(id, |project| {
                project.selected = selected;
                project.selected_timestamp = selected.then(now_millis);
                Ok(())
            })
            .await?;
        tracing::debug!(%id, selected, "changed project status");
        Ok(project)
    }

    async fn set_quantity(&self, id: ProjectId, quantity: u32) -> anyhow::Result<Project> {
        if quantity == 0 {
            return Err(TrackerError::invalid("quantity must be at least 1").into());
        }
        let project = self
            .modify_project(id, |project| {
                project.quantity = Some(quantity);
                Ok(())
            })
            .await?;
        tracing::debug!(%id, quantity, "changed project quantity");
        Ok(project)
    }

    async fn delete_project(&self, id: ProjectId) -> anyhow::Result<()> {
        let mut data = self.data.write().await;
        let before = data.projects.len();
        data.projects.retain(|p| p.id != id);
        if data.projects.len() == before {
            return Err(TrackerError::not_found("project", id).into());
        }
        self.persist(&data, &[Blob::Projects]).await?;
        tracing::debug!(%id, "deleted project");
        Ok(())
    }
}
