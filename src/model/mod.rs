pub use self::application::{Application, ApplicationStatus};
pub use self::project::{Project, ProjectStatus};
pub use self::project_type::ProjectType;
pub use self::team::{MaxCount, RawRoleConstraint, RoleConstraint, RoleConstraints, TeamMember};

use thiserror::Error;

mod application;
mod project;
mod project_type;
mod team;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("project type {name}: minimum of {min} months exceeds maximum of {max} months")]
    InvalidDuration { name: String, min: u32, max: u32 },
    #[error("role {role}: minimum count {min} exceeds maximum count {max}")]
    InvalidConstraint { role: String, min: u32, max: u32 },
    #[error("unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}
