use crate::model::{MaxCount, RoleConstraints, TeamMember};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TeamDiagnostic {
    /// Not enough members hold this role.
    Missing {
        role: String,
        current: u32,
        min: u32,
        max: MaxCount,
        needed: u32,
    },
    /// More members hold this role than allowed.
    Excess {
        role: String,
        current: u32,
        min: u32,
        max: u32,
        excess: u32,
    },
    /// No role policy is known and the team is empty.
    NoMembers,
}

impl TeamDiagnostic {
    pub fn is_missing(&self) -> bool {
        matches!(self, TeamDiagnostic::Missing { .. })
    }
}

impl fmt::Display for TeamDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamDiagnostic::Missing {
                role,
                current,
                min,
                needed,
                ..
            } => write!(
                f,
                "{role}: {current} of at least {min}, {needed} more needed"
            ),
            TeamDiagnostic::Excess {
                role,
                current,
                max,
                excess,
                ..
            } => write!(f, "{role}: {current} of at most {max}, {excess} too many"),
            TeamDiagnostic::NoMembers => f.write_str("the team needs at least one member"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TeamVerdict {
    pub valid: bool,
    pub counts: BTreeMap<String, u32>,
    pub diagnostics: Vec<TeamDiagnostic>,
}

impl TeamVerdict {
    pub fn missing_roles(&self) -> impl Iterator<Item = &TeamDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_missing())
    }
}

fn add_member(counts: &mut BTreeMap<String, u32>, role: &str) {
    let n = counts.entry(role.to_owned()).or_insert(0);
    *n = n.saturating_add(1);
}

pub fn count_roles(team: &[TeamMember]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for member in team {
        add_member(&mut counts, &member.role);
    }
    counts
}

/// Check a roster against per-role headcount limits.
///
/// Without any role policy a team is acceptable as soon as it has one member.
/// Roles present in the roster but absent from the policy are not checked.
pub fn validate_team(team: &[TeamMember], constraints: &RoleConstraints) -> TeamVerdict {
    let counts = count_roles(team);
    let mut diagnostics = Vec::new();
    if constraints.is_empty() {
        if team.is_empty() {
            diagnostics.push(TeamDiagnostic::NoMembers);
        }
    } else {
        for (role, constraint) in constraints.iter() {
            let current = counts.get(role).copied().unwrap_or(0);
            if current < constraint.min {
                diagnostics.push(TeamDiagnostic::Missing {
                    role: role.clone(),
                    current,
                    min: constraint.min,
                    max: constraint.max,
                    needed: constraint.min - current,
                });
            }
            if let MaxCount::Bounded(max) = constraint.max {
                if current > max {
                    diagnostics.push(TeamDiagnostic::Excess {
                        role: role.clone(),
                        current,
                        min: constraint.min,
                        max,
                        excess: current - max,
                    });
                }
            }
        }
    }
    TeamVerdict {
        valid: diagnostics.is_empty(),
        counts,
        diagnostics,
    }
}
