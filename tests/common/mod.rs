mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from payroster for tests
pub use payroster::core::db::{
    AppData, Member, MemberId, MemberRepository, MemoryStorage, NewProject, NewProjectType,
    Project, ProjectId, ProjectRepository, ProjectRole, ProjectType, ProjectTypeId,
    ProjectTypeRepository, ProjectTypeUpdate, ProjectUpdate, RoleId, RoleRepository,
    SqliteStorage, Storage, TrackerDb,
};
pub use payroster::TrackerError;
