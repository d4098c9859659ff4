//! Class commands

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::api::Classes;
use gradewise_core::models::{validate_class_year, Class, ClassFilters, CreateClass, UpdateClass};
use serde::Serialize;
use tabled::Tabled;

use super::helpers::{confirm, non_blank};
use super::Context;
use crate::output::{
    display_date, display_opt, print_details, print_info, print_output, print_success,
};

#[derive(Subcommand)]
pub enum ClassAction {
    /// List classes
    List {
        /// Only classes of this subject
        #[arg(short, long)]
        subject: Option<String>,

        /// Only classes of this academic year
        #[arg(short, long)]
        year: Option<i32>,

        /// Only classes taught by this teacher
        #[arg(short, long)]
        teacher: Option<String>,
    },

    /// Show one class
    Show {
        /// Class ID
        id: String,
    },

    /// Add a class (teachers only)
    Add {
        /// Class name
        #[arg(short, long)]
        name: String,

        /// Subject ID
        #[arg(short, long)]
        subject: String,

        /// Academic year
        #[arg(short, long)]
        year: i32,

        /// Term label, e.g. "Fall"
        #[arg(long)]
        term: Option<String>,
    },

    /// Update a class (teachers only)
    Update {
        /// Class ID
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        subject: Option<String>,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(long)]
        term: Option<String>,
    },

    /// Delete a class (teachers only)
    Delete {
        /// Class ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Class row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ClassRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Subject")]
    pub subject: String,
    #[tabled(rename = "Year")]
    pub year: i32,
    #[tabled(rename = "Term")]
    pub term: String,
    #[tabled(rename = "Teacher")]
    pub teacher: String,
    #[tabled(rename = "Students")]
    pub students: String,
}

impl From<&Class> for ClassRow {
    fn from(class: &Class) -> Self {
        Self {
            id: class.id.clone(),
            name: class.name.clone(),
            subject: class
                .subject_name
                .clone()
                .unwrap_or_else(|| class.subject_id.clone()),
            year: class.year,
            term: display_opt(class.term.as_deref()),
            teacher: display_opt(class.teacher_name.as_deref()),
            students: display_opt(class.enrollment_count),
        }
    }
}

pub async fn execute(ctx: &Context, action: ClassAction) -> Result<()> {
    match action {
        ClassAction::List {
            subject,
            year,
            teacher,
        } => list_classes(ctx, subject, year, teacher).await,
        ClassAction::Show { id } => show_class(ctx, &id).await,
        ClassAction::Add {
            name,
            subject,
            year,
            term,
        } => add_class(ctx, name, subject, year, term).await,
        ClassAction::Update {
            id,
            name,
            subject,
            year,
            term,
        } => {
            let dto = UpdateClass {
                name: non_blank(name),
                subject_id: non_blank(subject),
                year,
                term: non_blank(term),
            };
            update_class(ctx, &id, dto).await
        }
        ClassAction::Delete { id, yes } => delete_class(ctx, &id, yes).await,
    }
}

async fn list_classes(
    ctx: &Context,
    subject: Option<String>,
    year: Option<i32>,
    teacher: Option<String>,
) -> Result<()> {
    ctx.require_user()?;
    let filters = ClassFilters {
        subject_id: non_blank(subject),
        teacher_id: non_blank(teacher),
        year,
        ..Default::default()
    };

    let page = ctx.queries.resource::<Classes>().list(&filters).await?;
    let rows: Vec<ClassRow> = page.content.iter().map(ClassRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn show_class(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_user()?;
    let class = ctx.queries.resource::<Classes>().get(id).await?;

    print_details(
        class.as_ref(),
        &[
            ("ID", class.id.clone()),
            ("Name", class.name.clone()),
            ("Subject", display_opt(class.subject_name.as_deref())),
            ("Subject ID", class.subject_id.clone()),
            ("Year", class.year.to_string()),
            ("Term", display_opt(class.term.as_deref())),
            ("Teacher", display_opt(class.teacher_name.as_deref())),
            ("Students", display_opt(class.enrollment_count)),
            ("Created", display_date(class.created_at)),
        ],
        ctx.format,
    )
}

async fn add_class(
    ctx: &Context,
    name: String,
    subject: String,
    year: i32,
    term: Option<String>,
) -> Result<()> {
    let teacher = ctx.require_teacher()?;
    validate_class_year(year)?;
    let name = name.trim().to_string();
    if name.is_empty() {
        bail!("Class name is required");
    }

    let dto = CreateClass {
        name,
        subject_id: subject.trim().to_string(),
        year,
        term: non_blank(term),
        teacher_id: Some(teacher.id.clone()),
    };
    let class = ctx.queries.resource::<Classes>().create(&dto).await?;

    print_success(
        &format!("Added class {} ({}) [{}]", class.name, class.year, class.id),
        ctx.quiet,
    );
    Ok(())
}

async fn update_class(ctx: &Context, id: &str, dto: UpdateClass) -> Result<()> {
    ctx.require_teacher()?;
    if let Some(year) = dto.year {
        validate_class_year(year)?;
    }
    if dto.name.is_none() && dto.subject_id.is_none() && dto.year.is_none() && dto.term.is_none() {
        bail!("Nothing to update. Pass --name, --subject, --year or --term");
    }

    let class = ctx.queries.resource::<Classes>().update(id, &dto).await?;
    print_success(&format!("Updated class {}", class.name), ctx.quiet);
    Ok(())
}

async fn delete_class(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    ctx.require_teacher()?;
    if !yes && !confirm(&format!("Delete class {} and its roster?", id))? {
        print_info("Cancelled.", ctx.quiet);
        return Ok(());
    }

    ctx.queries.resource::<Classes>().delete(id).await?;
    print_success(&format!("Deleted class {}", id), ctx.quiet);
    Ok(())
}
