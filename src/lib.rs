//! Rules deciding how a reviewed application becomes a project, which
//! deadlines it may carry, which team it needs before it starts, and how it
//! is rolled back.

pub mod backend;
pub mod calendar;
pub mod composition;
pub mod config;
pub mod deadline;
pub mod display;
pub mod errors;
pub mod lifecycle;
pub mod loaders;
pub mod model;
pub mod readiness;
