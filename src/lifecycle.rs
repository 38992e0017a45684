//! Submission of lifecycle transitions to the backend.
//!
//! ```text
//! pending -> in_review -> [project approved] -> in_progress -> completed
//!                     \-> rejected              in_progress -> approved (rollback)
//! ```
//!
//! The controller forwards each transition once and classifies the outcome.
//! It does not re-check start eligibility; callers evaluate readiness first.

use crate::backend::{ApprovalPayload, ApprovedProject, Backend, ProjectDraft};
use crate::calendar::format_date;
use crate::errors::{Operation, TransitionError, classify};
use crate::model::{Project, RoleConstraints};
use crate::readiness::{Readiness, ReadinessInput, evaluate};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct BusyFlags {
    approve: AtomicBool,
    start: AtomicBool,
    rollback: AtomicBool,
    update_deadline: AtomicBool,
}

impl BusyFlags {
    fn flag(&self, op: Operation) -> &AtomicBool {
        match op {
            Operation::Approve => &self.approve,
            Operation::Start => &self.start,
            Operation::Rollback => &self.rollback,
            Operation::UpdateDeadline => &self.update_deadline,
        }
    }

    fn acquire(&self, op: Operation) -> Result<BusyGuard<'_>, TransitionError> {
        let flag = self.flag(op);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TransitionError::Busy(op))?;
        Ok(BusyGuard(flag))
    }
}

/// Clears its flag when the call completes, whatever the outcome.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Lifecycle<B> {
    backend: B,
    busy: BusyFlags,
}

impl<B: Backend> Lifecycle<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            busy: BusyFlags::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_busy(&self, op: Operation) -> bool {
        self.busy.flag(op).load(Ordering::Acquire)
    }

    /// Role constraints of a project, merged into a single policy.
    pub async fn role_constraints(&self, project: Uuid) -> Result<RoleConstraints, TransitionError> {
        let maps = self.backend.fetch_team_role_constraints(project).await?;
        Ok(RoleConstraints::merge(maps)?)
    }

    /// Fetch a fresh snapshot of a project and evaluate whether it may start.
    #[instrument(skip(self))]
    pub async fn readiness(&self, project: Uuid) -> Result<(Project, Readiness), TransitionError> {
        let snapshot = self.backend.fetch_project(project).await?;
        let constraints = self.role_constraints(project).await?;
        let readiness = evaluate(Some(ReadinessInput {
            project: &snapshot,
            constraints: &constraints,
        }));
        Ok((snapshot, readiness))
    }

    #[instrument(skip(self, draft))]
    pub async fn approve(
        &self,
        application: Uuid,
        draft: &ProjectDraft,
    ) -> Result<ApprovedProject, TransitionError> {
        let _guard = self.busy.acquire(Operation::Approve)?;
        let payload = ApprovalPayload::from_draft(draft)?;
        let result = self
            .backend
            .approve_application(application, &payload)
            .await
            .map_err(|e| classify(Operation::Approve, e));
        if let Ok(project) = &result {
            info!(%application, project = %project.id, "application approved");
        }
        Self::report(Operation::Approve, result)
    }

    #[instrument(skip(self))]
    pub async fn start(&self, project: Uuid) -> Result<(), TransitionError> {
        let _guard = self.busy.acquire(Operation::Start)?;
        let result = self
            .backend
            .start_project(project)
            .await
            .map_err(|e| classify(Operation::Start, e));
        Self::report(Operation::Start, result)
    }

    /// Return a running project to `approved`. Only its approver may do so.
    #[instrument(skip(self))]
    pub async fn rollback(&self, project: Uuid) -> Result<(), TransitionError> {
        let _guard = self.busy.acquire(Operation::Rollback)?;
        let result = self
            .backend
            .rollback_project(project)
            .await
            .map_err(|e| classify(Operation::Rollback, e));
        Self::report(Operation::Rollback, result)
    }

    /// The new deadline is expected to lie within the commitment window.
    #[instrument(skip(self))]
    pub async fn update_deadline(
        &self,
        project: Uuid,
        deadline: NaiveDate,
    ) -> Result<(), TransitionError> {
        let _guard = self.busy.acquire(Operation::UpdateDeadline)?;
        let result = self
            .backend
            .update_project_deadline(project, &format_date(deadline))
            .await
            .map_err(|e| classify(Operation::UpdateDeadline, e));
        Self::report(Operation::UpdateDeadline, result)
    }

    fn report<T>(op: Operation, result: Result<T, TransitionError>) -> Result<T, TransitionError> {
        match &result {
            Ok(_) => info!(%op, "transition succeeded"),
            Err(e) => warn!(%op, error = %e, "transition failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_date;
    use crate::errors::{BackendError, Denial, ReasonCode};
    use crate::model::{Application, ProjectStatus, ProjectType, RawRoleConstraint, TeamMember};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// In-memory backend recording calls and failing on demand.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        failure: Option<BackendError>,
        hold_start: bool,
        release: Notify,
    }

    impl FakeBackend {
        fn failing(failure: BackendError) -> Self {
            Self {
                failure: Some(failure),
                ..Self::default()
            }
        }

        fn network_down() -> Self {
            Self::failing(BackendError::network("connection refused"))
        }

        fn record(&self, call: String) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(call);
            self.failure.clone().map_or(Ok(()), Err)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn thesis() -> ProjectType {
        ProjectType::new(Uuid::nil(), "thesis", 6, 9).unwrap()
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn fetch_project_types(&self) -> Result<Vec<ProjectType>, BackendError> {
            Ok(vec![thesis()])
        }

        async fn fetch_team_role_constraints(
            &self,
            _project: Uuid,
        ) -> Result<Vec<BTreeMap<String, RawRoleConstraint>>, BackendError> {
            Ok(vec![BTreeMap::from([(
                "Student".to_owned(),
                RawRoleConstraint {
                    min_count: 2,
                    max_count: None,
                },
            )])])
        }

        async fn fetch_application(&self, application: Uuid) -> Result<Application, BackendError> {
            Err(BackendError::not_found(application))
        }

        async fn fetch_project(&self, project: Uuid) -> Result<Project, BackendError> {
            Ok(Project {
                id: project,
                application: Uuid::new_v4(),
                title: "Borrow checker visualiser".into(),
                created_at: parse_date("2024-01-15").unwrap(),
                approved_at: None,
                estimated_date: parse_date("2024-07-15").unwrap(),
                status: ProjectStatus::Approved,
                project_types: vec![thesis()],
                team: vec![
                    TeamMember::new(Uuid::new_v4(), "Student"),
                    TeamMember::new(Uuid::new_v4(), "Student"),
                ],
                creator: Uuid::nil(),
            })
        }

        async fn approve_application(
            &self,
            application: Uuid,
            payload: &ApprovalPayload,
        ) -> Result<ApprovedProject, BackendError> {
            self.record(format!("approve {application} {}", payload.estimated_date))?;
            Ok(ApprovedProject { id: Uuid::nil() })
        }

        async fn start_project(&self, project: Uuid) -> Result<(), BackendError> {
            if self.hold_start {
                self.release.notified().await;
            }
            self.record(format!("start {project}"))
        }

        async fn rollback_project(&self, project: Uuid) -> Result<(), BackendError> {
            self.record(format!("rollback {project}"))
        }

        async fn update_project_deadline(
            &self,
            project: Uuid,
            deadline: &str,
        ) -> Result<(), BackendError> {
            self.record(format!("deadline {project} {deadline}"))
        }
    }

    #[tokio::test]
    async fn test_approve_submits_payload() {
        let lifecycle = Lifecycle::new(FakeBackend::default());
        let application = Uuid::new_v4();
        let draft = ProjectDraft {
            title: "Borrow checker visualiser".into(),
            estimated_date: Some(parse_date("2024-07-15").unwrap()),
            ..ProjectDraft::default()
        };
        let project = lifecycle.approve(application, &draft).await.unwrap();
        assert_eq!(project.id, Uuid::nil());
        assert_eq!(
            lifecycle.backend().calls(),
            vec![format!("approve {application} 2024-07-15")]
        );
    }

    #[tokio::test]
    async fn test_approve_with_incomplete_draft_is_not_submitted() {
        let lifecycle = Lifecycle::new(FakeBackend::default());
        let err = lifecycle
            .approve(Uuid::new_v4(), &ProjectDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::Validation { .. }));
        assert!(lifecycle.backend().calls().is_empty());
        assert!(!lifecycle.is_busy(Operation::Approve));
    }

    #[tokio::test]
    async fn test_update_deadline_sends_plain_date() {
        let lifecycle = Lifecycle::new(FakeBackend::default());
        let project = Uuid::new_v4();
        lifecycle
            .update_deadline(project, parse_date("2024-08-01T22:00:00Z").unwrap())
            .await
            .unwrap();
        assert_eq!(
            lifecycle.backend().calls(),
            vec![format!("deadline {project} 2024-08-01")]
        );
    }

    #[tokio::test]
    async fn test_rollback_by_non_creator() {
        let backend = FakeBackend::failing(
            BackendError::status(403, "only the creator may do this")
                .with_reason(ReasonCode::NotCreator),
        );
        let lifecycle = Lifecycle::new(backend);
        let err = lifecycle.rollback(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            TransitionError::Authorization {
                denial: Denial::NotCreator,
                ..
            }
        ));
        assert_eq!(lifecycle.backend().calls().len(), 1);
        assert!(!lifecycle.is_busy(Operation::Rollback));
    }

    #[tokio::test]
    async fn test_failures_are_not_retried() {
        let lifecycle = Lifecycle::new(FakeBackend::network_down());
        let err = lifecycle.start(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, TransitionError::Network(_)));
        assert_eq!(lifecycle.backend().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_busy_flags_are_per_operation() {
        let backend = FakeBackend {
            hold_start: true,
            ..FakeBackend::default()
        };
        let lifecycle = Lifecycle::new(backend);
        let project = Uuid::new_v4();
        let first = lifecycle.start(project);
        let others = async {
            assert!(lifecycle.is_busy(Operation::Start));
            let again = lifecycle.start(project).await;
            let deadline = lifecycle
                .update_deadline(project, parse_date("2024-08-01").unwrap())
                .await;
            lifecycle.backend().release.notify_one();
            (again, deadline)
        };
        let (first, (again, deadline)) = tokio::join!(first, others);
        assert_eq!(first, Ok(()));
        assert_eq!(again, Err(TransitionError::Busy(Operation::Start)));
        assert_eq!(deadline, Ok(()));
        assert!(!lifecycle.is_busy(Operation::Start));
        assert_eq!(lifecycle.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_readiness_from_snapshot() {
        let lifecycle = Lifecycle::new(FakeBackend::default());
        let (project, readiness) = lifecycle.readiness(Uuid::new_v4()).await.unwrap();
        assert_eq!(project.team.len(), 2);
        assert!(readiness.team_valid);
        assert!(readiness.deadline_valid);
        assert!(readiness.can_start);
    }
}
