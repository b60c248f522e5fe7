//! Project listings: the active/history split and the filtered price total.

use std::cmp::Reverse;

use time::{Date, Time};

use crate::core::db::{Millis, Project, ProjectType, ProjectTypeId};

pub const MISSING_PRICE_LABEL: &str = "N/A";

const DAY_MILLIS: Millis = 86_400_000;

/// Criteria for narrowing a project list. Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Inclusive lower bound on `creation_date`.
    pub created_from: Option<Millis>,
    /// Inclusive upper bound on `creation_date`.
    pub created_to: Option<Millis>,
    /// Case-insensitive substring of the client name.
    pub client: Option<String>,
    pub project_type_id: Option<ProjectTypeId>,
}

impl ProjectFilter {
    /// Restrict to projects created on the calendar days `from..=to` (UTC).
    pub fn with_days(mut self, from: Option<Date>, to: Option<Date>) -> Self {
        self.created_from = from.map(day_start);
        self.created_to = to.map(|d| day_start(d) + DAY_MILLIS - 1);
        self
    }

    pub fn matches(&self, project: &Project) -> bool {
        if self.created_from.is_some_and(|from| project.creation_date < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| project.creation_date > to) {
            return false;
        }
        if let Some(type_id) = self.project_type_id {
            if project.project_type_id != type_id {
                return false;
            }
        }
        match self.client.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => project
                .client_full_name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            _ => true,
        }
    }

    pub fn apply<'a>(&self, projects: &'a [Project]) -> Vec<&'a Project> {
        projects.iter().filter(|p| self.matches(p)).collect()
    }
}

fn day_start(date: Date) -> Millis {
    let start = date.with_time(Time::MIDNIGHT).assume_utc();
    (start.unix_timestamp_nanos() / 1_000_000) as Millis
}

/// `price * quantity` for `project`, `None` when its type cannot be found.
pub fn project_price(project: &Project, project_types: &[ProjectType]) -> Option<f64> {
    project_types
        .iter()
        .find(|t| t.id == project.project_type_id)
        .map(|t| t.price * f64::from(project.effective_quantity()))
}

/// The price cell: the amount followed by `currency`, or `"N/A"`.
pub fn price_label(project: &Project, project_types: &[ProjectType], currency: &str) -> String {
    match project_price(project, project_types) {
        Some(price) => format!("{} {}", price, currency),
        None => MISSING_PRICE_LABEL.to_string(),
    }
}

/// Sum of `price * quantity`; projects with a missing type add nothing.
pub fn total_price<'a, I>(projects: I, project_types: &[ProjectType]) -> f64
where
    I: IntoIterator<Item = &'a Project>,
{
    projects
        .into_iter()
        .filter_map(|p| project_price(p, project_types))
        .sum()
}

/// A filtered project list together with its price total.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub projects: Vec<&'a Project>,
    pub total_price: f64,
}

pub fn filtered_view<'a>(
    projects: &'a [Project],
    project_types: &[ProjectType],
    filter: &ProjectFilter,
) -> FilteredView<'a> {
    let projects = filter.apply(projects);
    let total_price = total_price(projects.iter().copied(), project_types);
    FilteredView {
        projects,
        total_price,
    }
}

/// Projects still in progress, in insertion order.
pub fn active_projects(projects: &[Project]) -> Vec<&Project> {
    projects.iter().filter(|p| !p.selected).collect()
}

/// Completed projects, most recently completed first.
pub fn history_projects(projects: &[Project]) -> Vec<&Project> {
    let mut history: Vec<&Project> = projects.iter().filter(|p| p.selected).collect();
    history.sort_by_key(|p| Reverse(p.selected_timestamp.unwrap_or(0)));
    history
}
