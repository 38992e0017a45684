//! Legal deadline windows for a project.
//!
//! Three policies coexist and are kept apart on purpose:
//!
//! - the creation-relative window, used while an application is reviewed;
//! - the commitment-relative window, used when moving the deadline of an
//!   approved or running project;
//! - the retrospective whole-month check, used to decide whether an existing
//!   project may be started.
//!
//! The first two accept a date range, the third counts whole months, and they
//! do not agree on every input.

use crate::calendar::{DATE_FORMAT, add_months, format_date, months_between};
use crate::model::ProjectType;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Extension granted past the nominal minimum duration of a project type.
pub const GRACE_MONTHS: u32 = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeadlineWindow {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub min_months: u32,
    pub max_months: u32,
}

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum DeadlineViolation {
    #[error("deadline {} is before the earliest allowed date {}", .candidate.format(DATE_FORMAT), .min_date.format(DATE_FORMAT))]
    TooEarly {
        candidate: NaiveDate,
        min_date: NaiveDate,
    },
    #[error("deadline {} is after the latest allowed date {}", .candidate.format(DATE_FORMAT), .max_date.format(DATE_FORMAT))]
    TooLate {
        candidate: NaiveDate,
        max_date: NaiveDate,
    },
}

impl DeadlineWindow {
    fn from_reference(reference: NaiveDate, project_type: &ProjectType) -> Self {
        let min_months = project_type.min_estimated_months;
        let min_date = add_months(reference, min_months);
        Self {
            min_date,
            max_date: add_months(min_date, GRACE_MONTHS),
            min_months,
            max_months: min_months.saturating_add(GRACE_MONTHS),
        }
    }

    /// Bounds are inclusive.
    pub fn contains(&self, candidate: NaiveDate) -> bool {
        self.check(candidate).is_ok()
    }

    pub fn check(&self, candidate: NaiveDate) -> Result<(), DeadlineViolation> {
        if candidate < self.min_date {
            Err(DeadlineViolation::TooEarly {
                candidate,
                min_date: self.min_date,
            })
        } else if candidate > self.max_date {
            Err(DeadlineViolation::TooLate {
                candidate,
                max_date: self.max_date,
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for DeadlineWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {} ({}-{} months)",
            format_date(self.min_date),
            format_date(self.max_date),
            self.min_months,
            self.max_months
        )
    }
}

/// Window for a deadline chosen while reviewing an application.
pub fn creation_window(created_at: NaiveDate, project_type: &ProjectType) -> DeadlineWindow {
    DeadlineWindow::from_reference(created_at, project_type)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommitmentWindow {
    pub window: DeadlineWindow,
    /// Committed deadline moved into the window, to preselect in a picker.
    pub suggested: NaiveDate,
}

/// Window for moving the deadline of an already approved project.
///
/// The floor never follows a committed deadline that is earlier than the
/// type minimum.
pub fn commitment_window(
    created_at: NaiveDate,
    committed: NaiveDate,
    project_type: &ProjectType,
) -> CommitmentWindow {
    let window = DeadlineWindow::from_reference(created_at, project_type);
    let suggested = committed.max(window.min_date).min(window.max_date);
    CommitmentWindow { window, suggested }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetrospectiveCheck {
    pub months_diff: i32,
    pub min_months: u32,
    /// Includes the one-month grace.
    pub max_months: u32,
    pub valid: bool,
}

impl RetrospectiveCheck {
    pub fn message(&self) -> Option<String> {
        (!self.valid).then(|| {
            format!(
                "estimated date must be {} to {} months after creation, but is {} months",
                self.min_months, self.max_months, self.months_diff
            )
        })
    }
}

/// Whole-month check applied to an existing project before it is started.
pub fn retrospective_check(
    created_at: NaiveDate,
    deadline: NaiveDate,
    project_type: &ProjectType,
) -> RetrospectiveCheck {
    let months_diff = months_between(created_at, deadline);
    let min_months = project_type.min_estimated_months;
    let max_months = project_type.max_estimated_months.saturating_add(GRACE_MONTHS);
    let months = i64::from(months_diff);
    RetrospectiveCheck {
        months_diff,
        min_months,
        max_months,
        valid: months >= i64::from(min_months)
            && months <= i64::from(project_type.max_estimated_months) + i64::from(GRACE_MONTHS),
    }
}
