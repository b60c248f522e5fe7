use std::collections::BTreeMap;

use payroster::core::db::{
    MemoryStorage, NewProjectType, ProjectRole, ProjectType, ProjectTypeRepository, RoleRepository,
    SqliteStorage, TrackerDb,
};
use payroster::TrackerError;

/// Creates a TrackerDb backed by in-memory storage.
pub async fn create_test_tracker() -> TrackerDb<MemoryStorage> {
    TrackerDb::open(MemoryStorage::new())
        .await
        .expect("Failed to open in-memory tracker")
}

/// Creates a TrackerDb backed by a SQLite file in a temporary directory.
/// Returns both the tracker and the temp directory (which must be kept alive).
pub async fn create_sqlite_tracker() -> (TrackerDb<SqliteStorage>, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let storage = SqliteStorage::open(dir.path().join("test.db"))
        .await
        .expect("Failed to open sqlite storage");
    let tracker = TrackerDb::open(storage)
        .await
        .expect("Failed to open sqlite tracker");
    (tracker, dir)
}

/// Adds the roles `names` and a project type paying them `percentages` (same order).
pub async fn add_type_with_roles<S: payroster::core::db::Storage>(
    tracker: &TrackerDb<S>,
    title: &str,
    price: f64,
    roles: &[(&str, f64)],
) -> anyhow::Result<(ProjectType, Vec<ProjectRole>)> {
    let mut created = Vec::new();
    let mut payout_percentages = BTreeMap::new();
    for (name, percent) in roles {
        let role = tracker.add_role(name).await?;
        payout_percentages.insert(role.id, *percent);
        created.push(role);
    }
    let project_type = tracker
        .add_project_type(&NewProjectType {
            title: title.to_string(),
            price,
            payout_percentages,
        })
        .await?;
    Ok((project_type, created))
}

/// Asserts that `err` carries a `TrackerError` matching `check`.
pub fn assert_tracker_error(err: &anyhow::Error, check: impl Fn(&TrackerError) -> bool) {
    let tracker_err = err
        .downcast_ref::<TrackerError>()
        .unwrap_or_else(|| panic!("expected a TrackerError, got: {}", err));
    assert!(check(tracker_err), "unexpected error: {}", tracker_err);
}
