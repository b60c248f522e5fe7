//! Invariant enforcement between projects and the entities they reference.
//!
//! Every `role_assignments` value must be `None` or the id of an existing
//! member. The store calls these functions after each mutation that can break
//! that, instead of relying on change notifications.

use std::collections::{BTreeMap, HashSet};

use crate::core::db::{
    member::Member,
    model::{MemberId, RoleId},
    project::Project,
    project_type::ProjectType,
};

/// Role assignments for a fresh project of `project_type`: every paid role, nobody assigned.
pub fn empty_assignments(project_type: &ProjectType) -> BTreeMap<RoleId, Option<MemberId>> {
    project_type
        .payout_percentages
        .keys()
        .map(|role_id| (*role_id, None))
        .collect()
}

/// Nulls every assignment pointing at a member that is not in `members`.
///
/// Returns the number of assignments cleared.
pub fn clear_dangling_assignments(projects: &mut [Project], members: &[Member]) -> usize {
    let known: HashSet<MemberId> = members.iter().map(|m| m.id).collect();
    let mut cleared = 0;
    for project in projects.iter_mut() {
        for assignment in project.role_assignments.values_mut() {
            if let Some(member_id) = assignment {
                if !known.contains(member_id) {
                    *assignment = None;
                    cleared += 1;
                }
            }
        }
    }
    cleared
}

/// Points `project` at `project_type` and rebuilds its assignments from the type's roles.
///
/// Moving to a different type drops the quantity; it only counts for the type it was set on.
pub fn reset_role_assignments(project: &mut Project, project_type: &ProjectType) {
    if project.project_type_id != project_type.id {
        project.quantity = None;
    }
    project.project_type_id = project_type.id;
    project.role_assignments = empty_assignments(project_type);
}
