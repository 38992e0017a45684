use super::{ModelError, ProjectType, TeamMember};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProjectStatus {
    Approved,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Approved => "approved",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
        }
    }

    /// States reachable in one step. `InProgress -> Approved` is the rollback.
    pub fn next_states(self) -> &'static [ProjectStatus] {
        match self {
            ProjectStatus::Approved => &[ProjectStatus::InProgress],
            ProjectStatus::InProgress => &[ProjectStatus::Approved, ProjectStatus::Completed],
            ProjectStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ProjectStatus::Approved),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(ModelError::UnknownStatus {
                kind: "project",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Project {
    pub id: Uuid,
    /// Application this project was approved from.
    pub application: Uuid,
    pub title: String,
    pub created_at: NaiveDate,
    pub approved_at: Option<NaiveDate>,
    /// Committed deadline.
    pub estimated_date: NaiveDate,
    pub status: ProjectStatus,
    pub project_types: Vec<ProjectType>,
    pub team: Vec<TeamMember>,
    /// Professor or administrator who approved the application.
    pub creator: Uuid,
}

impl Project {
    pub fn governing_type(&self) -> Option<&ProjectType> {
        self.project_types.first()
    }

    pub fn is_created_by(&self, user: Uuid) -> bool {
        self.creator == user
    }
}
