use super::{ModelError, ProjectType};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ApplicationStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::InReview => "in_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// States reachable in one step.
    pub fn next_states(self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Pending => &[ApplicationStatus::InReview],
            ApplicationStatus::InReview => {
                &[ApplicationStatus::Approved, ApplicationStatus::Rejected]
            }
            ApplicationStatus::Approved | ApplicationStatus::Rejected => &[],
        }
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.next_states().is_empty()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "in_review" => Ok(ApplicationStatus::InReview),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(ModelError::UnknownStatus {
                kind: "application",
                value: other.to_owned(),
            }),
        }
    }
}

/// A submitted proposal awaiting review.
#[derive(Clone, Debug)]
pub struct Application {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub created_at: NaiveDate,
    /// Deadline proposed by the submitter, if any.
    pub deadline: Option<NaiveDate>,
    pub project_types: Vec<ProjectType>,
    pub faculties: Vec<Uuid>,
    pub problem_types: Vec<Uuid>,
    pub attachments: Vec<String>,
    pub status: ApplicationStatus,
}

impl Application {
    /// The first associated type is the one whose duration rules apply.
    pub fn governing_type(&self) -> Option<&ProjectType> {
        self.project_types.first()
    }

    pub fn is_reviewable(&self) -> bool {
        self.status.can_transition_to(ApplicationStatus::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_state_machine() {
        use ApplicationStatus::*;
        assert!(Pending.can_transition_to(InReview));
        assert!(!Pending.can_transition_to(Approved));
        assert!(InReview.can_transition_to(Approved));
        assert!(InReview.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(InReview));
        assert!(Approved.is_terminal());
        assert!(Rejected.is_terminal());
        assert!(!InReview.is_terminal());
    }

    #[test]
    fn test_application_status_names() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::InReview,
            ApplicationStatus::Approved,
            ApplicationStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<ApplicationStatus>(), Ok(status));
        }
        assert!("archived".parse::<ApplicationStatus>().is_err());
    }
}
