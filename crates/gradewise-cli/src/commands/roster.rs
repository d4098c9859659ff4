//! Class roster commands
//!
//! Removing a student goes through the delete tracker: the removal is
//! requested, confirmed, performed, and only reported done once a fresh
//! roster read no longer lists the student.

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::api::{Enrollments, Users};
use gradewise_core::models::{CreateEnrollment, Enrollment, UserFilters};
use gradewise_core::{DeleteTracker, Error, Role, RosterReconciler};
use serde::Serialize;
use tabled::Tabled;

use super::auth::UserRow;
use super::helpers::{confirm, non_blank};
use super::Context;
use crate::output::{display_date, display_opt, print_info, print_output, print_success, print_warning};

#[derive(Subcommand)]
pub enum RosterAction {
    /// List the students enrolled in a class
    List {
        /// Class ID
        #[arg(short, long)]
        class: String,
    },

    /// Enroll a student (teachers only)
    Add {
        /// Class ID
        #[arg(short, long)]
        class: String,

        /// Student user ID
        #[arg(short, long)]
        student: String,
    },

    /// Find student accounts to enroll (teachers only)
    Students {
        /// Match on name or email
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Remove a student from a class (teachers only)
    Remove {
        /// Class ID
        #[arg(short, long)]
        class: String,

        /// Enrollment ID or student user ID
        target: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Enrollment row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct EnrollmentRow {
    #[tabled(rename = "Enrollment")]
    pub id: String,
    #[tabled(rename = "Student")]
    pub student: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Student ID")]
    pub student_id: String,
    #[tabled(rename = "Enrolled")]
    pub enrolled_at: String,
}

impl From<&Enrollment> for EnrollmentRow {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            id: enrollment.id.clone(),
            student: enrollment.label(),
            email: display_opt(enrollment.student_email.as_deref()),
            student_id: enrollment.student_id.clone(),
            enrolled_at: display_date(enrollment.enrolled_at),
        }
    }
}

pub async fn execute(ctx: &Context, action: RosterAction) -> Result<()> {
    match action {
        RosterAction::List { class } => list_roster(ctx, &class).await,
        RosterAction::Add { class, student } => add_student(ctx, &class, &student).await,
        RosterAction::Students { search } => list_students(ctx, search).await,
        RosterAction::Remove { class, target, yes } => {
            remove_student(ctx, &class, &target, yes).await
        }
    }
}

async fn list_roster(ctx: &Context, class_id: &str) -> Result<()> {
    ctx.require_user()?;
    let roster = RosterReconciler::new(&*ctx.queries, class_id).roster().await?;

    let rows: Vec<EnrollmentRow> = roster.iter().map(EnrollmentRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn add_student(ctx: &Context, class_id: &str, student_id: &str) -> Result<()> {
    ctx.require_teacher()?;
    let dto = CreateEnrollment {
        class_id: class_id.trim().to_string(),
        student_id: student_id.trim().to_string(),
    };
    if dto.class_id.is_empty() || dto.student_id.is_empty() {
        bail!("Both --class and --student are required");
    }

    let enrollment = ctx.queries.resource::<Enrollments>().create(&dto).await?;
    print_success(
        &format!("Enrolled {} in class {} [{}]", enrollment.label(), class_id, enrollment.id),
        ctx.quiet,
    );
    Ok(())
}

async fn list_students(ctx: &Context, search: Option<String>) -> Result<()> {
    ctx.require_teacher()?;
    let filters = UserFilters {
        role: Some(Role::Student),
        search: non_blank(search),
        ..Default::default()
    };

    let page = ctx.queries.resource::<Users>().list(&filters).await?;
    let rows: Vec<UserRow> = page.content.iter().map(UserRow::from).collect();
    print_output(&rows, ctx.format)
}

/// Find a roster row by enrollment ID first, then by student ID
fn find_enrollment<'a>(roster: &'a [Enrollment], target: &str) -> Option<&'a Enrollment> {
    let target = target.trim();
    roster
        .iter()
        .find(|e| e.id == target)
        .or_else(|| roster.iter().find(|e| e.student_id == target))
}

async fn remove_student(ctx: &Context, class_id: &str, target: &str, yes: bool) -> Result<()> {
    ctx.require_teacher()?;
    let reconciler = RosterReconciler::new(&*ctx.queries, class_id);
    let roster = reconciler.roster().await?;

    let Some(enrollment) = find_enrollment(&roster, target) else {
        bail!("No student '{}' on the roster of class {}", target, class_id);
    };
    let label = enrollment.label();

    let mut tracker = DeleteTracker::new();
    tracker.request_removal(enrollment.id.clone(), label.clone())?;

    if !yes && !confirm(&format!("Remove {} from class {}?", label, class_id))? {
        tracker.cancel();
        print_info("Cancelled.", ctx.quiet);
        return Ok(());
    }

    match reconciler.remove(&mut tracker).await {
        Ok(()) => {
            print_success(&format!("Removed {} from class {}", label, class_id), ctx.quiet);
            Ok(())
        }
        // The delete went through; only the roster read is behind
        Err(Error::Timeout(msg)) => {
            log::warn!("[roster] {} ({})", msg, tracker.state());
            print_warning(
                &format!(
                    "Removed {}, but the roster has not caught up yet. Check again with 'gradewise roster list --class {}'",
                    label, class_id
                ),
                ctx.quiet,
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
