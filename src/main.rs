use clap::{ArgAction, Parser, Subcommand};
use eyre::{Result, WrapErr, bail, ensure};
use projlife::backend::{Backend, ProjectDraft};
use projlife::calendar::{format_date, parse_date};
use projlife::config::Config;
use projlife::deadline::{commitment_window, creation_window};
use projlife::display::{
    display_application, display_commitment, display_readiness, display_window,
};
use projlife::errors::TransitionError;
use projlife::lifecycle::Lifecycle;
use projlife::loaders::Loader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(version, author, about)]
struct Cli {
    /// Use FILE instead of projlife.toml
    #[arg(short, long, value_name = "FILE", default_value = "projlife.toml")]
    config: PathBuf,
    /// Compute verdicts without submitting any transition
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Set verbosity level
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List project types and their estimated durations
    Types,
    /// Show the deadline window of an application under review
    Window {
        application: Uuid,
        /// Check this date against the window
        #[arg(long)]
        candidate: Option<String>,
    },
    /// Tell whether a project may be started
    Readiness { project: Uuid },
    /// Approve an application, creating a project with the given deadline
    Approve {
        application: Uuid,
        #[arg(long)]
        deadline: String,
    },
    /// Start an approved project
    Start { project: Uuid },
    /// Put a running project back in the approved state
    Rollback { project: Uuid },
    /// Move the deadline of a project
    Deadline { project: Uuid, date: String },
}

fn user_facing(e: TransitionError) -> eyre::Report {
    let message = e.user_message();
    eyre::Report::new(e).wrap_err(message)
}

async fn run(lifecycle: &Lifecycle<Loader>, command: Command, dry_run: bool) -> Result<()> {
    let backend = lifecycle.backend();
    match command {
        Command::Types => {
            let types = backend
                .fetch_project_types()
                .await
                .map_err(|e| user_facing(e.into()))?;
            for t in types {
                println!(
                    "{}: {}-{} months",
                    t.name, t.min_estimated_months, t.max_estimated_months
                );
            }
        }
        Command::Window {
            application,
            candidate,
        } => {
            let application = backend
                .fetch_application(application)
                .await
                .map_err(|e| user_facing(e.into()))?;
            display_application(&application);
            let Some(project_type) = application.governing_type() else {
                bail!("application {} has no project type", application.id);
            };
            let candidate = candidate.as_deref().map(parse_date).transpose()?;
            display_window(&creation_window(application.created_at, project_type), candidate);
        }
        Command::Readiness { project } => {
            let (project, readiness) = lifecycle.readiness(project).await.map_err(user_facing)?;
            display_readiness(&project, &readiness);
        }
        Command::Approve {
            application,
            deadline,
        } => {
            let application = backend
                .fetch_application(application)
                .await
                .map_err(|e| user_facing(e.into()))?;
            ensure!(
                application.is_reviewable(),
                "application {} is {} and cannot be approved",
                application.id,
                application.status
            );
            let Some(project_type) = application.governing_type() else {
                bail!("application {} has no project type", application.id);
            };
            let deadline = parse_date(&deadline)?;
            let window = creation_window(application.created_at, project_type);
            display_window(&window, Some(deadline));
            window.check(deadline)?;
            if dry_run {
                return Ok(());
            }
            let draft = ProjectDraft::from_application(&application, deadline);
            let project = lifecycle
                .approve(application.id, &draft)
                .await
                .map_err(user_facing)?;
            println!("Project {} created", project.id);
        }
        Command::Start { project } => {
            let (snapshot, readiness) = lifecycle.readiness(project).await.map_err(user_facing)?;
            display_readiness(&snapshot, &readiness);
            ensure!(readiness.can_start, "project {} cannot be started yet", project);
            if dry_run {
                return Ok(());
            }
            lifecycle.start(project).await.map_err(user_facing)?;
            println!("Project {project} started");
        }
        Command::Rollback { project } => {
            if dry_run {
                return Ok(());
            }
            lifecycle.rollback(project).await.map_err(user_facing)?;
            println!("Project {project} rolled back to approved");
        }
        Command::Deadline { project, date } => {
            let snapshot = backend
                .fetch_project(project)
                .await
                .map_err(|e| user_facing(e.into()))?;
            let Some(project_type) = snapshot.governing_type() else {
                bail!("project {} has no project type", project);
            };
            let deadline = parse_date(&date)?;
            let commitment =
                commitment_window(snapshot.created_at, snapshot.estimated_date, project_type);
            display_commitment(&commitment, snapshot.estimated_date);
            commitment.window.check(deadline)?;
            if dry_run {
                return Ok(());
            }
            lifecycle
                .update_deadline(project, deadline)
                .await
                .map_err(user_facing)?;
            println!("Deadline of project {project} set to {}", format_date(deadline));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("projlife={level}"))),
        )
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(&cli.config)?;
    let loader = Loader::new(&config.database.url, config.session.clone())
        .await
        .wrap_err("cannot connect to database")?;
    info!(user = %loader.session().user, "session opened");
    let lifecycle = Lifecycle::new(loader);
    run(&lifecycle, cli.command, cli.dry_run).await
}
