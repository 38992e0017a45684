use crate::calendar::format_date;
use crate::composition::TeamDiagnostic;
use crate::deadline::{CommitmentWindow, DeadlineWindow};
use crate::model::{Application, Project};
use crate::readiness::Readiness;
use chrono::NaiveDate;

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

pub fn display_application(a: &Application) {
    println!("{} [{}]", a.title, a.status);
    println!("  - submitted: {}", format_date(a.created_at));
    if let Some(deadline) = a.deadline {
        println!("  - proposed deadline: {}", format_date(deadline));
    }
    for t in &a.project_types {
        println!(
            "  - type: {} ({}-{} months)",
            t.name, t.min_estimated_months, t.max_estimated_months
        );
    }
}

pub fn display_window(w: &DeadlineWindow, candidate: Option<NaiveDate>) {
    println!("Allowed deadlines: {w}");
    if let Some(candidate) = candidate {
        match w.check(candidate) {
            Ok(()) => println!("  - {} is allowed", format_date(candidate)),
            Err(e) => println!("  - {e}"),
        }
    }
}

pub fn display_commitment(c: &CommitmentWindow, committed: NaiveDate) {
    display_window(&c.window, None);
    println!("  - committed: {}", format_date(committed));
    if c.suggested != committed {
        println!("  - suggested: {}", format_date(c.suggested));
    }
}

pub fn display_readiness(p: &Project, r: &Readiness) {
    println!("{} [{}]", p.title, p.status);
    println!("  - created: {}", format_date(p.created_at));
    println!("  - deadline: {}", format_date(p.estimated_date));
    if let Some(team) = &r.team {
        for (role, n) in &team.counts {
            println!("  - {role}: {n}");
        }
    }
    println!("Team valid: {}", yes_no(r.team_valid));
    println!("Deadline valid: {}", yes_no(r.deadline_valid));
    println!("Can start: {}", yes_no(r.can_start));
    if !r.errors.is_empty() {
        println!("Problems:");
        for e in &r.errors {
            println!("  - {e}");
        }
    }
    let excess = r
        .team
        .iter()
        .flat_map(|t| &t.diagnostics)
        .filter(|d| !d.is_missing());
    for d in r.missing_roles.iter().chain(excess) {
        match d {
            TeamDiagnostic::Missing { max, .. } => println!("  - {d} (max {max})"),
            _ => println!("  - {d}"),
        }
    }
}
