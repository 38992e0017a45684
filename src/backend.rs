//! Interface of the persistence service holding applications and projects.

use crate::calendar::format_date;
use crate::errors::{BackendError, TransitionError};
use crate::model::{Application, Project, ProjectType, RawRoleConstraint};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Project data gathered while reviewing an application. Identifiers may
/// still be unresolved.
#[derive(Clone, Debug, Default)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub estimated_date: Option<NaiveDate>,
    pub project_types: Vec<Option<Uuid>>,
    pub faculties: Vec<Option<Uuid>>,
    pub problem_types: Vec<Option<Uuid>>,
}

impl ProjectDraft {
    pub fn from_application(application: &Application, estimated_date: NaiveDate) -> Self {
        Self {
            title: application.title.clone(),
            description: application.description.clone(),
            short_description: application.short_description.clone(),
            estimated_date: Some(estimated_date),
            project_types: application.project_types.iter().map(|t| Some(t.id)).collect(),
            faculties: application.faculties.iter().copied().map(Some).collect(),
            problem_types: application.problem_types.iter().copied().map(Some).collect(),
        }
    }
}

/// Body of an approval request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApprovalPayload {
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    /// `YYYY-MM-DD`
    pub estimated_date: String,
    pub project_types: Vec<Uuid>,
    pub faculties: Vec<Uuid>,
    pub problem_types: Vec<Uuid>,
}

impl ApprovalPayload {
    /// Drop unresolved identifiers. Nothing is substituted for them.
    pub fn from_draft(draft: &ProjectDraft) -> Result<Self, TransitionError> {
        if draft.title.trim().is_empty() {
            return Err(TransitionError::missing_field("title"));
        }
        let estimated_date = draft
            .estimated_date
            .ok_or_else(|| TransitionError::missing_field("estimated_date"))?;
        let resolved = |ids: &[Option<Uuid>]| ids.iter().flatten().copied().collect::<Vec<_>>();
        Ok(Self {
            title: draft.title.trim().to_owned(),
            description: draft.description.clone(),
            short_description: draft.short_description.clone(),
            estimated_date: format_date(estimated_date),
            project_types: resolved(&draft.project_types),
            faculties: resolved(&draft.faculties),
            problem_types: resolved(&draft.problem_types),
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ApprovedProject {
    pub id: Uuid,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_project_types(&self) -> Result<Vec<ProjectType>, BackendError>;

    async fn fetch_team_role_constraints(
        &self,
        project: Uuid,
    ) -> Result<Vec<BTreeMap<String, RawRoleConstraint>>, BackendError>;

    async fn fetch_application(&self, application: Uuid) -> Result<Application, BackendError>;

    /// Project snapshot including its team.
    async fn fetch_project(&self, project: Uuid) -> Result<Project, BackendError>;

    async fn approve_application(
        &self,
        application: Uuid,
        payload: &ApprovalPayload,
    ) -> Result<ApprovedProject, BackendError>;

    async fn start_project(&self, project: Uuid) -> Result<(), BackendError>;

    async fn rollback_project(&self, project: Uuid) -> Result<(), BackendError>;

    /// `deadline` is formatted as `YYYY-MM-DD`.
    async fn update_project_deadline(&self, project: Uuid, deadline: &str)
    -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;

    #[test]
    fn test_payload_filters_unresolved_ids() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let draft = ProjectDraft {
            title: "  Rust for embedded  ".into(),
            description: "desc".into(),
            estimated_date: Some(parse_date("2024-07-15T10:00:00Z").unwrap()),
            project_types: vec![None, Some(a)],
            faculties: vec![None],
            problem_types: vec![Some(b), None],
            ..ProjectDraft::default()
        };
        let payload = ApprovalPayload::from_draft(&draft).unwrap();
        assert_eq!(payload.title, "Rust for embedded");
        assert_eq!(payload.estimated_date, "2024-07-15");
        assert_eq!(payload.project_types, vec![a]);
        assert!(payload.faculties.is_empty());
        assert_eq!(payload.problem_types, vec![b]);
    }

    #[test]
    fn test_payload_requires_title_and_date() {
        let draft = ProjectDraft {
            title: "Rust".into(),
            ..ProjectDraft::default()
        };
        assert_eq!(
            ApprovalPayload::from_draft(&draft),
            Err(TransitionError::missing_field("estimated_date"))
        );
        let draft = ProjectDraft {
            estimated_date: Some(parse_date("2024-07-15").unwrap()),
            ..ProjectDraft::default()
        };
        assert_eq!(
            ApprovalPayload::from_draft(&draft),
            Err(TransitionError::missing_field("title"))
        );
    }
}
