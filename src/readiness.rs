//! Start eligibility of a project.

use crate::composition::{TeamDiagnostic, TeamVerdict, validate_team};
use crate::deadline::{RetrospectiveCheck, retrospective_check};
use crate::model::{Project, RoleConstraints};

pub const TEAM_ERROR: &str = "team does not meet project-type constraints";
pub const MISSING_TYPE_ERROR: &str = "project type is not available";

/// Snapshot of everything the verdict depends on.
#[derive(Clone, Copy, Debug)]
pub struct ReadinessInput<'a> {
    pub project: &'a Project,
    pub constraints: &'a RoleConstraints,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Readiness {
    pub can_start: bool,
    pub team_valid: bool,
    pub deadline_valid: bool,
    pub errors: Vec<String>,
    pub missing_roles: Vec<TeamDiagnostic>,
    pub team: Option<TeamVerdict>,
    pub deadline: Option<RetrospectiveCheck>,
}

/// Combine the team and deadline verdicts. An absent project yields an
/// all-false verdict with no errors.
pub fn evaluate(input: Option<ReadinessInput<'_>>) -> Readiness {
    let Some(ReadinessInput {
        project,
        constraints,
    }) = input
    else {
        return Readiness::default();
    };
    let mut errors = Vec::new();

    let team = validate_team(&project.team, constraints);
    if !team.valid {
        errors.push(TEAM_ERROR.to_owned());
    }

    let deadline = project
        .governing_type()
        .map(|t| retrospective_check(project.created_at, project.estimated_date, t));
    match &deadline {
        Some(check) => errors.extend(check.message()),
        None => errors.push(MISSING_TYPE_ERROR.to_owned()),
    }
    let deadline_valid = deadline.is_some_and(|check| check.valid);

    Readiness {
        can_start: team.valid && deadline_valid,
        team_valid: team.valid,
        deadline_valid,
        errors,
        missing_roles: team.missing_roles().cloned().collect(),
        team: Some(team),
        deadline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;
    use crate::model::{MaxCount, ProjectStatus, ProjectType, TeamMember};
    use uuid::Uuid;

    fn project(students: usize, deadline: &str) -> Project {
        Project {
            id: Uuid::new_v4(),
            application: Uuid::new_v4(),
            title: "Compilers for fun".into(),
            created_at: parse_date("2024-01-15").unwrap(),
            approved_at: None,
            estimated_date: parse_date(deadline).unwrap(),
            status: ProjectStatus::Approved,
            project_types: vec![ProjectType::new(Uuid::new_v4(), "thesis", 6, 9).unwrap()],
            team: (0..students)
                .map(|_| TeamMember::new(Uuid::new_v4(), "Student"))
                .collect(),
            creator: Uuid::new_v4(),
        }
    }

    fn constraints() -> RoleConstraints {
        RoleConstraints::new()
            .with("Student", 3, MaxCount::Bounded(5))
            .unwrap()
    }

    #[test]
    fn test_absent_project() {
        let readiness = evaluate(None);
        assert!(!readiness.can_start);
        assert!(!readiness.team_valid);
        assert!(!readiness.deadline_valid);
        assert!(readiness.errors.is_empty());
        assert!(readiness.missing_roles.is_empty());
    }

    #[test]
    fn test_open_ended_project_type() {
        let mut p = project(3, "2030-07-15");
        p.project_types = vec![ProjectType::new(Uuid::new_v4(), "open", 0, u32::MAX).unwrap()];
        let constraints = constraints();
        let readiness = evaluate(Some(ReadinessInput {
            project: &p,
            constraints: &constraints,
        }));
        assert!(readiness.deadline_valid);
        assert!(readiness.can_start);
    }

    #[test]
    fn test_can_start_truth_table() {
        let constraints = constraints();
        for (students, deadline, team_valid, deadline_valid) in [
            (3, "2024-07-15", true, true),
            (3, "2024-03-15", true, false),
            (2, "2024-07-15", false, true),
            (2, "2024-03-15", false, false),
        ] {
            let p = project(students, deadline);
            let readiness = evaluate(Some(ReadinessInput {
                project: &p,
                constraints: &constraints,
            }));
            assert_eq!(readiness.team_valid, team_valid);
            assert_eq!(readiness.deadline_valid, deadline_valid);
            assert_eq!(readiness.can_start, team_valid && deadline_valid);
            assert_eq!(
                readiness.errors.len(),
                usize::from(!team_valid) + usize::from(!deadline_valid)
            );
        }
    }

    #[test]
    fn test_errors_and_missing_roles() {
        let constraints = constraints();
        let p = project(2, "2024-03-15");
        let readiness = evaluate(Some(ReadinessInput {
            project: &p,
            constraints: &constraints,
        }));
        assert_eq!(readiness.errors[0], TEAM_ERROR);
        assert_eq!(
            readiness.errors[1],
            "estimated date must be 6 to 10 months after creation, but is 2 months"
        );
        assert_eq!(
            readiness.missing_roles,
            vec![TeamDiagnostic::Missing {
                role: "Student".into(),
                current: 2,
                min: 3,
                max: MaxCount::Bounded(5),
                needed: 1,
            }]
        );
    }

    #[test]
    fn test_missing_project_type() {
        let constraints = constraints();
        let mut p = project(3, "2024-07-15");
        p.project_types.clear();
        let readiness = evaluate(Some(ReadinessInput {
            project: &p,
            constraints: &constraints,
        }));
        assert!(readiness.team_valid);
        assert!(!readiness.deadline_valid);
        assert!(!readiness.can_start);
        assert_eq!(readiness.errors, vec![MISSING_TYPE_ERROR.to_owned()]);
    }
}
