//! Payout arithmetic: how a project type's price is split between the members
//! assigned to its roles, minus the middleman fee.
//!
//! Amounts are computed in `f64` and rounded up with `ceil` at exactly two
//! points (the fee, then the member payout) so totals match the figures the
//! tracker has always shown.

use std::{iter::Sum, ops::Add};

use crate::core::db::{Member, MemberId, Project, ProjectId, ProjectRole, ProjectType, RoleId};

/// Share of every role's base payout kept as the middleman fee, in percent.
pub const MIDDLEMAN_FEE_PERCENT: f64 = 10.0;

pub const UNASSIGNED_ROLE_LABEL: &str = "Unassigned Role";
pub const UNASSIGNED_MEMBER_LABEL: &str = "-";

/// What a role earns: the member's part and the middleman's part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Payout {
    pub member: i64,
    pub fee: i64,
}

impl Add for Payout {
    type Output = Payout;

    fn add(self, rhs: Payout) -> Payout {
        Payout {
            member: self.member + rhs.member,
            fee: self.fee + rhs.fee,
        }
    }
}

impl Sum for Payout {
    fn sum<I: Iterator<Item = Payout>>(iter: I) -> Payout {
        iter.fold(Payout::default(), Add::add)
    }
}

impl<'a> Sum<&'a Payout> for Payout {
    fn sum<I: Iterator<Item = &'a Payout>>(iter: I) -> Payout {
        iter.copied().sum()
    }
}

/// `base = price/100*percent`, `fee = ceil(base/100*10)`, `member = ceil(base - fee)`.
pub fn compute_payout(price: f64, percent: f64) -> Payout {
    let base = price / 100.0 * percent;
    let fee = (base / 100.0 * MIDDLEMAN_FEE_PERCENT).ceil();
    let member = (base - fee).ceil();
    Payout {
        member: member as i64,
        fee: fee as i64,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayoutRow {
    pub role_id: RoleId,
    pub role_name: Option<String>,
    pub member_id: Option<MemberId>,
    pub member_name: Option<String>,
    pub payout: Payout,
}

impl PayoutRow {
    pub fn role_label(&self) -> &str {
        self.role_name.as_deref().unwrap_or(UNASSIGNED_ROLE_LABEL)
    }

    pub fn member_label(&self) -> &str {
        self.member_name.as_deref().unwrap_or(UNASSIGNED_MEMBER_LABEL)
    }
}

/// Per-role payouts of one project plus their totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutBreakdown {
    pub project_id: ProjectId,
    pub rows: Vec<PayoutRow>,
    pub total: Payout,
}

/// Build the payout table for `project`.
///
/// A missing type pays nothing; a role the type does not list pays nothing.
/// Deleted roles still resolve their name.
pub fn project_breakdown(
    project: &Project,
    project_type: Option<&ProjectType>,
    roles: &[ProjectRole],
    members: &[Member],
) -> PayoutBreakdown {
    let price = project_type.map(|t| t.price).unwrap_or(0.0);
    let rows: Vec<PayoutRow> = project
        .role_assignments
        .iter()
        .map(|(role_id, member_id)| {
            let percent = project_type.map(|t| t.percentage_for(*role_id)).unwrap_or(0.0);
            PayoutRow {
                role_id: *role_id,
                role_name: roles.iter().find(|r| r.id == *role_id).map(|r| r.name.clone()),
                member_id: *member_id,
                member_name: member_id
                    .and_then(|id| members.iter().find(|m| m.id == id))
                    .map(|m| m.full_name.clone()),
                payout: compute_payout(price, percent),
            }
        })
        .collect();
    let total: Payout = rows.iter().map(|row| &row.payout).sum();
    PayoutBreakdown {
        project_id: project.id,
        rows,
        total,
    }
}

/// Breakdowns for every project in `projects`, resolving types, roles and members by id.
pub fn breakdowns<'a, I>(
    projects: I,
    project_types: &[ProjectType],
    roles: &[ProjectRole],
    members: &[Member],
) -> Vec<PayoutBreakdown>
where
    I: IntoIterator<Item = &'a Project>,
{
    projects
        .into_iter()
        .map(|project| {
            let project_type = project_types.iter().find(|t| t.id == project.project_type_id);
            project_breakdown(project, project_type, roles, members)
        })
        .collect()
}

pub fn grand_total<'a, I>(breakdowns: I) -> Payout
where
    I: IntoIterator<Item = &'a PayoutBreakdown>,
{
    breakdowns.into_iter().map(|b| &b.total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{ProjectTypeId, RoleId};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn half_of_a_thousand() {
        assert_eq!(compute_payout(1000.0, 50.0), Payout { member: 450, fee: 50 });
    }

    #[test]
    fn fee_rounds_up() {
        // base 333.3, fee ceil(33.33) = 34, member ceil(299.3) = 300
        assert_eq!(compute_payout(1111.0, 30.0), Payout { member: 300, fee: 34 });
        // base 0.5, fee ceil(0.05) = 1, member ceil(-0.5) = 0
        assert_eq!(compute_payout(1.0, 50.0), Payout { member: 0, fee: 1 });
    }

    #[test]
    fn zero_percent_pays_nothing() {
        assert_eq!(compute_payout(1500.0, 0.0), Payout::default());
    }

    fn fixture() -> (Project, ProjectType, Vec<ProjectRole>, Vec<Member>) {
        let author = ProjectRole {
            id: RoleId::new(),
            name: "Author".to_string(),
            is_deleted: None,
        };
        let reviewer = ProjectRole {
            id: RoleId::new(),
            name: "Reviewer".to_string(),
            is_deleted: Some(true),
        };
        let member = Member {
            id: MemberId::new(),
            full_name: "Olena K.".to_string(),
        };
        let project_type = ProjectType {
            id: ProjectTypeId::new(),
            title: "Diploma".to_string(),
            price: 2000.0,
            payout_percentages: BTreeMap::from([(author.id, 60.0), (reviewer.id, 15.0)]),
            is_deleted: None,
        };
        let project = Project {
            id: ProjectId::new(),
            client_full_name: "Client".to_string(),
            project_type_id: project_type.id,
            role_assignments: BTreeMap::from([(author.id, Some(member.id)), (reviewer.id, None)]),
            selected: false,
            selected_timestamp: None,
            creation_date: 0,
            quantity: None,
            notes: None,
        };
        (project, project_type, vec![author, reviewer], vec![member])
    }

    #[test]
    fn breakdown_resolves_names_and_totals() {
        let (project, project_type, roles, members) = fixture();
        let breakdown = project_breakdown(&project, Some(&project_type), &roles, &members);

        assert_eq!(breakdown.rows.len(), 2);
        let author = breakdown.rows.iter().find(|r| r.role_id == roles[0].id).unwrap();
        assert_eq!(author.role_label(), "Author");
        assert_eq!(author.member_label(), "Olena K.");
        assert_eq!(author.payout, Payout { member: 1080, fee: 120 });

        let reviewer = breakdown.rows.iter().find(|r| r.role_id == roles[1].id).unwrap();
        assert_eq!(reviewer.role_label(), "Reviewer");
        assert_eq!(reviewer.member_label(), UNASSIGNED_MEMBER_LABEL);
        assert_eq!(reviewer.payout, Payout { member: 270, fee: 30 });

        assert_eq!(breakdown.total, Payout { member: 1350, fee: 150 });
    }

    #[test]
    fn missing_lookups_fall_back() {
        let (project, _, _, _) = fixture();
        let breakdown = project_breakdown(&project, None, &[], &[]);

        assert!(breakdown.rows.iter().all(|r| r.role_label() == UNASSIGNED_ROLE_LABEL));
        assert!(breakdown.rows.iter().all(|r| r.member_label() == UNASSIGNED_MEMBER_LABEL));
        assert_eq!(breakdown.total, Payout::default());
    }

    #[test]
    fn grand_total_sums_projects() {
        let (project, project_type, roles, members) = fixture();
        let mut other = project.clone();
        other.id = ProjectId::new();
        let all = breakdowns([&project, &other], &[project_type], &roles, &members);

        assert_eq!(all.len(), 2);
        assert_eq!(grand_total(&all), Payout { member: 2700, fee: 300 });
    }

    proptest! {
        #[test]
        fn payout_matches_formula(price in 0u32..1_000_000, percent in 0u32..=100) {
            let (price, percent) = (f64::from(price), f64::from(percent));
            let payout = compute_payout(price, percent);
            let fee = (price / 100.0 * percent / 100.0 * 10.0).ceil();
            prop_assert_eq!(payout.fee, fee as i64);
            prop_assert_eq!(payout.member, (price / 100.0 * percent - fee).ceil() as i64);
        }

        #[test]
        fn payout_never_exceeds_base(price in 0u32..1_000_000, percent in 0u32..=100) {
            let base = f64::from(price) / 100.0 * f64::from(percent);
            let payout = compute_payout(f64::from(price), f64::from(percent));
            prop_assert!((payout.member + payout.fee) as f64 <= base.ceil() + 1.0);
            prop_assert!(payout.fee >= 0 && payout.member >= 0);
        }
    }
}
