//! Integration tests for the member roster.
//!
//! Tests cover:
//! - Adding, renaming and listing members
//! - Rejecting blank names
//! - Deleting members and clearing their role assignments everywhere

mod common;

use common::*;

#[tokio::test]
async fn test_add_and_rename_member() -> anyhow::Result<()> {
    let tracker = create_test_tracker().await;

    let member = tracker.add_member("  Olena Koval  ").await?;
    assert_eq!(member.full_name, "Olena Koval");

    let renamed = tracker.rename_member(member.id, "Olena K.").await?;
    assert_eq!(renamed.id, member.id);
    assert_eq!(renamed.full_name, "Olena K.");

    let members = tracker.get_members().await?;
    assert_eq!(members, vec![renamed.clone()]);
    assert_eq!(tracker.get_member_by_id(member.id).await?, Some(renamed));

    Ok(())
}

#[tokio::test]
async fn test_blank_member_name_is_rejected() -> anyhow::Result<()> {
    let tracker = create_test_tracker().await;

    let err = tracker.add_member("   ").await.unwrap_err();
    assert_tracker_error(&err, |e| matches!(e, TrackerError::InvalidInput(_)));

    let member = tracker.add_member("Taras").await?;
    let err = tracker.rename_member(member.id, "").await.unwrap_err();
    assert_tracker_error(&err, |e| matches!(e, TrackerError::InvalidInput(_)));
    assert_eq!(tracker.get_members().await?[0].full_name, "Taras");

    Ok(())
}

#[tokio::test]
async fn test_member_changes_are_persisted() -> anyhow::Result<()> {
    let tracker = create_test_tracker().await;
    let member = tracker.add_member("Ivan").await?;

    let stored = tracker
        .storage()
        .get_item("membersData")
        .await?
        .expect("members blob should be written");
    let stored: Vec<Member> = serde_json::from_str(&stored)?;
    assert_eq!(stored, vec![member]);

    Ok(())
}

#[tokio::test]
async fn test_delete_member_clears_assignments_in_all_projects() -> anyhow::Result<()> {
    let tracker = create_test_tracker().await;
    let (project_type, roles) =
        add_type_with_roles(&tracker, "Diploma", 2000.0, &[("Author", 60.0), ("Reviewer", 15.0)]).await?;
    let leaving = tracker.add_member("Leaving").await?;
    let staying = tracker.add_member("Staying").await?;

    let mut project_ids = Vec::new();
    for client in ["First", "Second"] {
        let project = tracker
            .add_project(&NewProject {
                client_full_name: client.to_string(),
                project_type_id: project_type.id,
            })
            .await?;
        tracker.assign_member(project.id, roles[0].id, Some(leaving.id)).await?;
        tracker.assign_member(project.id, roles[1].id, Some(staying.id)).await?;
        project_ids.push(project.id);
    }

    let cleared = tracker.delete_member(leaving.id).await?;
    assert_eq!(cleared, 2);

    for id in project_ids {
        let project = tracker.get_project_by_id(id).await?.expect("project exists");
        assert_eq!(project.role_assignments[&roles[0].id], None);
        assert_eq!(project.role_assignments[&roles[1].id], Some(staying.id));
    }
    assert_eq!(tracker.get_members().await?.len(), 1);

    // The cleared assignments reach storage too
    let stored = tracker.storage().get_item("projectsData").await?.unwrap();
    let stored: Vec<Project> = serde_json::from_str(&stored)?;
    assert!(stored
        .iter()
        .all(|p| p.role_assignments.values().all(|m| *m != Some(leaving.id))));

    Ok(())
}

#[tokio::test]
async fn test_delete_unknown_member() -> anyhow::Result<()> {
    let tracker = create_test_tracker().await;
    tracker.add_member("Someone").await?;

    let err = tracker.delete_member(MemberId::new()).await.unwrap_err();
    assert_tracker_error(&err, |e| matches!(e, TrackerError::NotFound { kind: "member", .. }));
    assert_eq!(tracker.get_members().await?.len(), 1);

    Ok(())
}
