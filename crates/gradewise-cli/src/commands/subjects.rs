//! Subject commands

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::api::Subjects;
use gradewise_core::models::{CreateSubject, Subject, SubjectFilters, UpdateSubject};
use serde::Serialize;
use tabled::Tabled;

use super::helpers::{confirm, non_blank};
use super::Context;
use crate::output::{
    display_date, display_opt, print_details, print_info, print_output, print_success, truncate,
};

#[derive(Subcommand)]
pub enum SubjectAction {
    /// List subjects
    List {
        /// Only subjects whose name or code matches
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one subject
    Show {
        /// Subject ID
        id: String,
    },

    /// Add a subject (teachers only)
    Add {
        /// Subject name
        #[arg(short, long)]
        name: String,

        /// Short code, e.g. MATH101
        #[arg(short, long)]
        code: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Update a subject (teachers only)
    Update {
        /// Subject ID
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        code: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a subject (teachers only)
    Delete {
        /// Subject ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Subject row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct SubjectRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Code")]
    pub code: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<&Subject> for SubjectRow {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id.clone(),
            code: subject.code.clone(),
            name: subject.name.clone(),
            description: truncate(subject.description.as_deref().unwrap_or("-"), 40),
        }
    }
}

pub async fn execute(ctx: &Context, action: SubjectAction) -> Result<()> {
    match action {
        SubjectAction::List { search } => list_subjects(ctx, search).await,
        SubjectAction::Show { id } => show_subject(ctx, &id).await,
        SubjectAction::Add {
            name,
            code,
            description,
        } => add_subject(ctx, name, code, description).await,
        SubjectAction::Update {
            id,
            name,
            code,
            description,
        } => update_subject(ctx, &id, name, code, description).await,
        SubjectAction::Delete { id, yes } => delete_subject(ctx, &id, yes).await,
    }
}

async fn list_subjects(ctx: &Context, search: Option<String>) -> Result<()> {
    ctx.require_user()?;
    let filters = SubjectFilters {
        search: non_blank(search),
        ..Default::default()
    };

    let page = ctx.queries.resource::<Subjects>().list(&filters).await?;
    let rows: Vec<SubjectRow> = page.content.iter().map(SubjectRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn show_subject(ctx: &Context, id: &str) -> Result<()> {
    ctx.require_user()?;
    let subject = ctx.queries.resource::<Subjects>().get(id).await?;

    print_details(
        subject.as_ref(),
        &[
            ("ID", subject.id.clone()),
            ("Code", subject.code.clone()),
            ("Name", subject.name.clone()),
            ("Description", display_opt(subject.description.as_deref())),
            ("Created", display_date(subject.created_at)),
            ("Updated", display_date(subject.updated_at)),
        ],
        ctx.format,
    )
}

async fn add_subject(
    ctx: &Context,
    name: String,
    code: String,
    description: Option<String>,
) -> Result<()> {
    ctx.require_teacher()?;
    let name = name.trim().to_string();
    let code = code.trim().to_string();
    if name.is_empty() || code.is_empty() {
        bail!("Subject name and code are required");
    }

    let dto = CreateSubject {
        name,
        code,
        description: non_blank(description),
    };
    let subject = ctx.queries.resource::<Subjects>().create(&dto).await?;

    print_success(
        &format!("Added subject {} ({}) [{}]", subject.name, subject.code, subject.id),
        ctx.quiet,
    );
    Ok(())
}

async fn update_subject(
    ctx: &Context,
    id: &str,
    name: Option<String>,
    code: Option<String>,
    description: Option<String>,
) -> Result<()> {
    ctx.require_teacher()?;
    let dto = UpdateSubject {
        name: non_blank(name),
        code: non_blank(code),
        description: non_blank(description),
    };
    if dto.name.is_none() && dto.code.is_none() && dto.description.is_none() {
        bail!("Nothing to update. Pass --name, --code or --description");
    }

    let subject = ctx.queries.resource::<Subjects>().update(id, &dto).await?;
    print_success(&format!("Updated subject {}", subject.name), ctx.quiet);
    Ok(())
}

async fn delete_subject(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    ctx.require_teacher()?;
    if !yes && !confirm(&format!("Delete subject {}?", id))? {
        print_info("Cancelled.", ctx.quiet);
        return Ok(());
    }

    ctx.queries.resource::<Subjects>().delete(id).await?;
    print_success(&format!("Deleted subject {}", id), ctx.quiet);
    Ok(())
}
