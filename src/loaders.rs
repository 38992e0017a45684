#![allow(clippy::cast_possible_wrap)]

//! SQL implementation of the backend. It is the authority on state: illegal
//! transitions and rollbacks by anyone but the approver are refused here.

use crate::backend::{ApprovalPayload, ApprovedProject, Backend};
use crate::calendar::{self, format_date, parse_date};
use crate::config::Session;
use crate::errors::{BackendError, ReasonCode};
use crate::model::{
    Application, ApplicationStatus, Project, ProjectStatus, ProjectType,
    RawRoleConstraint, TeamMember,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::any::{AnyConnectOptions, AnyRow};
use sqlx::{AnyConnection, Connection, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace};
use uuid::Uuid;

pub struct Loader {
    conn: Mutex<AnyConnection>,
    session: Session,
}

fn db_error(e: sqlx::Error) -> BackendError {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => {
            BackendError::network(e.to_string())
        }
        e => BackendError::status(500, e.to_string()),
    }
}

fn invalid_data(e: impl std::fmt::Display) -> BackendError {
    BackendError::status(500, format!("invalid stored data: {e}"))
}

fn invalid_field(field: &str, message: impl Into<String>) -> BackendError {
    BackendError::status(422, message).with_reason(ReasonCode::InvalidField(field.to_owned()))
}

fn invalid_state(message: impl Into<String>) -> BackendError {
    BackendError::status(409, message).with_reason(ReasonCode::InvalidState)
}

fn uuid_at(row: &AnyRow, column: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(&row.try_get::<String, _>(column).map_err(db_error)?).map_err(invalid_data)
}

fn date_at(row: &AnyRow, column: &str) -> Result<NaiveDate, BackendError> {
    parse_date(&row.try_get::<String, _>(column).map_err(db_error)?).map_err(invalid_data)
}

fn optional_date_at(row: &AnyRow, column: &str) -> Result<Option<NaiveDate>, BackendError> {
    row.try_get::<Option<String>, _>(column)
        .map_err(db_error)?
        .map(|s| parse_date(&s).map_err(invalid_data))
        .transpose()
}

fn count_at(row: &AnyRow, column: &str) -> Result<u32, BackendError> {
    u32::try_from(row.try_get::<i64, _>(column).map_err(db_error)?).map_err(invalid_data)
}

fn project_type_from(row: &AnyRow) -> Result<ProjectType, BackendError> {
    ProjectType::new(
        uuid_at(row, "id")?,
        row.try_get::<String, _>("name").map_err(db_error)?,
        count_at(row, "min_months")?,
        count_at(row, "max_months")?,
    )
    .map_err(invalid_data)
}

impl Loader {
    pub async fn new(url: &str, session: Session) -> Result<Self, sqlx::Error> {
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect_with(&AnyConnectOptions::from_str(url)?).await?;
        debug!(user = %session.user, "connected to backend database");
        Ok(Self {
            conn: Mutex::new(conn),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run a batch of statements, such as a schema definition.
    pub async fn execute_script(&self, script: &str) -> Result<(), sqlx::Error> {
        let mut conn = self.conn.lock().await;
        for statement in script.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&mut *conn).await?;
        }
        Ok(())
    }

    async fn load_types_for(
        conn: &mut AnyConnection,
        link_table: &str,
        owner_column: &str,
        owner: Uuid,
    ) -> Result<Vec<ProjectType>, BackendError> {
        let query = format!(
            "SELECT t.id, t.name, t.min_months, t.max_months FROM {link_table} l \
             JOIN project_types t ON t.id = l.project_type_id \
             WHERE l.{owner_column} = ? ORDER BY l.position"
        );
        sqlx::query(&query)
            .bind(owner.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?
            .iter()
            .map(project_type_from)
            .collect()
    }

    async fn load_ids(
        conn: &mut AnyConnection,
        query: &str,
        owner: Uuid,
    ) -> Result<Vec<Uuid>, BackendError> {
        sqlx::query(query)
            .bind(owner.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?
            .iter()
            .map(|row| uuid_at(row, "id"))
            .collect()
    }

    async fn load_team(conn: &mut AnyConnection, project: Uuid) -> Result<Vec<TeamMember>, BackendError> {
        sqlx::query("SELECT user_id, role FROM team_members WHERE project_id = ? ORDER BY role, user_id")
            .bind(project.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?
            .iter()
            .map(|row| {
                Ok(TeamMember::new(
                    uuid_at(row, "user_id")?,
                    row.try_get::<String, _>("role").map_err(db_error)?,
                ))
            })
            .collect()
    }

    async fn project_row(conn: &mut AnyConnection, project: Uuid) -> Result<AnyRow, BackendError> {
        sqlx::query(
            "SELECT id, application_id, title, created_at, approved_at, estimated_date, status, creator_id \
             FROM projects WHERE id = ?",
        )
        .bind(project.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| BackendError::not_found(format!("project {project}")))
    }

    fn project_status(row: &AnyRow) -> Result<ProjectStatus, BackendError> {
        row.try_get::<String, _>("status")
            .map_err(db_error)?
            .parse()
            .map_err(invalid_data)
    }

    async fn set_project_status(
        &self,
        project: Uuid,
        from: ProjectStatus,
        to: ProjectStatus,
        creator_only: bool,
    ) -> Result<(), BackendError> {
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await.map_err(db_error)?;
        let row = Self::project_row(&mut tx, project).await?;
        if creator_only && uuid_at(&row, "creator_id")? != self.session.user {
            return Err(BackendError::status(
                403,
                "only the project creator can perform this action",
            )
            .with_reason(ReasonCode::NotCreator));
        }
        let status = Self::project_status(&row)?;
        if status != from || !status.can_transition_to(to) {
            return Err(invalid_state(format!("project is {status}, expected {from}")));
        }
        sqlx::query("UPDATE projects SET status = ? WHERE id = ?")
            .bind(to.as_str())
            .bind(project.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        info!(%project, %from, %to, "project status changed");
        Ok(())
    }
}

#[async_trait]
impl Backend for Loader {
    #[instrument(skip(self))]
    async fn fetch_project_types(&self) -> Result<Vec<ProjectType>, BackendError> {
        let mut conn = self.conn.lock().await;
        sqlx::query("SELECT id, name, min_months, max_months FROM project_types ORDER BY name")
            .fetch_all(&mut *conn)
            .await
            .map_err(db_error)?
            .iter()
            .map(project_type_from)
            .collect()
    }

    #[instrument(skip(self))]
    async fn fetch_team_role_constraints(
        &self,
        project: Uuid,
    ) -> Result<Vec<BTreeMap<String, RawRoleConstraint>>, BackendError> {
        let mut conn = self.conn.lock().await;
        Self::project_row(&mut conn, project).await?;
        let rows = sqlx::query(
            "SELECT c.project_type_id, c.role, c.min_count, c.max_count \
             FROM project_project_types p \
             JOIN team_role_constraints c ON c.project_type_id = p.project_type_id \
             WHERE p.project_id = ? ORDER BY p.position, c.role",
        )
        .bind(project.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?;
        // One map per project type, in type order.
        let mut maps: Vec<(Uuid, BTreeMap<String, RawRoleConstraint>)> = Vec::new();
        for row in &rows {
            let project_type = uuid_at(row, "project_type_id")?;
            let max_count = row
                .try_get::<Option<i64>, _>("max_count")
                .map_err(db_error)?
                .map(u32::try_from)
                .transpose()
                .map_err(invalid_data)?;
            let constraint = RawRoleConstraint {
                min_count: count_at(row, "min_count")?,
                max_count,
            };
            let role = row.try_get::<String, _>("role").map_err(db_error)?;
            match maps.last_mut() {
                Some((id, map)) if *id == project_type => {
                    map.insert(role, constraint);
                }
                _ => maps.push((project_type, BTreeMap::from([(role, constraint)]))),
            }
        }
        trace!(types = maps.len(), roles = rows.len(), "loaded team role constraints");
        Ok(maps.into_iter().map(|(_, map)| map).collect())
    }

    #[instrument(skip(self))]
    async fn fetch_application(&self, application: Uuid) -> Result<Application, BackendError> {
        let mut conn = self.conn.lock().await;
        let row = sqlx::query(
            "SELECT id, title, description, short_description, created_at, deadline, status \
             FROM applications WHERE id = ?",
        )
        .bind(application.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| BackendError::not_found(format!("application {application}")))?;
        let project_types =
            Self::load_types_for(&mut conn, "application_project_types", "application_id", application)
                .await?;
        let faculties = Self::load_ids(
            &mut conn,
            "SELECT faculty_id AS id FROM application_faculties WHERE application_id = ? ORDER BY faculty_id",
            application,
        )
        .await?;
        let problem_types = Self::load_ids(
            &mut conn,
            "SELECT problem_type_id AS id FROM application_problem_types WHERE application_id = ? \
             ORDER BY problem_type_id",
            application,
        )
        .await?;
        let attachments = sqlx::query(
            "SELECT path FROM application_attachments WHERE application_id = ? ORDER BY path",
        )
        .bind(application.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(db_error)?
        .iter()
        .map(|row| row.try_get::<String, _>("path").map_err(db_error))
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Application {
            id: uuid_at(&row, "id")?,
            title: row.try_get("title").map_err(db_error)?,
            description: row.try_get("description").map_err(db_error)?,
            short_description: row.try_get("short_description").map_err(db_error)?,
            created_at: date_at(&row, "created_at")?,
            deadline: optional_date_at(&row, "deadline")?,
            project_types,
            faculties,
            problem_types,
            attachments,
            status: row
                .try_get::<String, _>("status")
                .map_err(db_error)?
                .parse()
                .map_err(invalid_data)?,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_project(&self, project: Uuid) -> Result<Project, BackendError> {
        let mut conn = self.conn.lock().await;
        let row = Self::project_row(&mut conn, project).await?;
        let project_types =
            Self::load_types_for(&mut conn, "project_project_types", "project_id", project).await?;
        let team = Self::load_team(&mut conn, project).await?;
        Ok(Project {
            id: uuid_at(&row, "id")?,
            application: uuid_at(&row, "application_id")?,
            title: row.try_get("title").map_err(db_error)?,
            created_at: date_at(&row, "created_at")?,
            approved_at: optional_date_at(&row, "approved_at")?,
            estimated_date: date_at(&row, "estimated_date")?,
            status: Self::project_status(&row)?,
            project_types,
            team,
            creator: uuid_at(&row, "creator_id")?,
        })
    }

    #[instrument(skip(self, payload))]
    async fn approve_application(
        &self,
        application: Uuid,
        payload: &ApprovalPayload,
    ) -> Result<ApprovedProject, BackendError> {
        let estimated_date = parse_date(&payload.estimated_date)
            .map_err(|e| invalid_field("estimated_date", e.to_string()))?;
        if payload.project_types.is_empty() {
            return Err(invalid_field("project_types", "at least one project type is required"));
        }
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await.map_err(db_error)?;
        let status: ApplicationStatus =
            sqlx::query("SELECT status FROM applications WHERE id = ?")
                .bind(application.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?
                .ok_or_else(|| BackendError::not_found(format!("application {application}")))?
                .try_get::<String, _>("status")
                .map_err(db_error)?
                .parse()
                .map_err(invalid_data)?;
        if !status.can_transition_to(ApplicationStatus::Approved) {
            return Err(invalid_state(format!("application is {status}")));
        }
        let today = format_date(calendar::today());
        let project = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO projects (id, application_id, title, created_at, approved_at, estimated_date, status, creator_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(project.to_string())
        .bind(application.to_string())
        .bind(payload.title.clone())
        .bind(today.clone())
        .bind(today)
        .bind(format_date(estimated_date))
        .bind(ProjectStatus::Approved.as_str())
        .bind(self.session.user.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        for (position, project_type) in payload.project_types.iter().enumerate() {
            sqlx::query(
                "INSERT INTO project_project_types (project_id, project_type_id, position) VALUES (?, ?, ?)",
            )
            .bind(project.to_string())
            .bind(project_type.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        sqlx::query(
            "UPDATE applications SET status = ?, title = ?, description = ?, short_description = ?, deadline = ? \
             WHERE id = ?",
        )
        .bind(ApplicationStatus::Approved.as_str())
        .bind(payload.title.clone())
        .bind(payload.description.clone())
        .bind(payload.short_description.clone())
        .bind(format_date(estimated_date))
        .bind(application.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        for (table, column, ids) in [
            ("application_faculties", "faculty_id", &payload.faculties),
            ("application_problem_types", "problem_type_id", &payload.problem_types),
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE application_id = ?"))
                .bind(application.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            for id in ids {
                sqlx::query(&format!(
                    "INSERT INTO {table} (application_id, {column}) VALUES (?, ?)"
                ))
                .bind(application.to_string())
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            }
        }
        tx.commit().await.map_err(db_error)?;
        info!(%application, %project, "project created from application");
        Ok(ApprovedProject { id: project })
    }

    #[instrument(skip(self))]
    async fn start_project(&self, project: Uuid) -> Result<(), BackendError> {
        self.set_project_status(project, ProjectStatus::Approved, ProjectStatus::InProgress, false)
            .await
    }

    #[instrument(skip(self))]
    async fn rollback_project(&self, project: Uuid) -> Result<(), BackendError> {
        self.set_project_status(project, ProjectStatus::InProgress, ProjectStatus::Approved, true)
            .await
    }

    #[instrument(skip(self))]
    async fn update_project_deadline(
        &self,
        project: Uuid,
        deadline: &str,
    ) -> Result<(), BackendError> {
        let deadline =
            parse_date(deadline).map_err(|e| invalid_field("estimated_date", e.to_string()))?;
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await.map_err(db_error)?;
        let row = Self::project_row(&mut tx, project).await?;
        let status = Self::project_status(&row)?;
        if status.is_terminal() {
            return Err(invalid_state(format!("project is {status}")));
        }
        sqlx::query("UPDATE projects SET estimated_date = ? WHERE id = ?")
            .bind(format_date(deadline))
            .bind(project.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;
        info!(%project, deadline = %format_date(deadline), "project deadline updated");
        Ok(())
    }
}
