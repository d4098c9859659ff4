//! Grade commands
//!
//! Listing, recording and summarizing grades. Students only ever see their
//! own grades, so a student running `list` or `summary` without filters gets
//! their own.

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::api::Grades;
use gradewise_core::grades::{summarize, GradeSummary};
use gradewise_core::models::{validate_score, CreateGrade, Grade, GradeFilters, UpdateGrade};
use gradewise_core::UserProfile;
use serde::Serialize;
use tabled::Tabled;

use super::helpers::{confirm, non_blank};
use super::Context;
use crate::output::{
    display_date, display_opt, display_percent, print_info, print_json, print_output,
    print_success, print_warning, OutputFormat,
};

#[derive(Subcommand)]
pub enum GradeAction {
    /// List grades for a class or a student
    List {
        /// Class ID
        #[arg(short, long)]
        class: Option<String>,

        /// Student user ID
        #[arg(short, long)]
        student: Option<String>,

        /// Only this assessment
        #[arg(short, long)]
        assessment: Option<String>,
    },

    /// Record a grade (teachers only)
    Add {
        /// Class ID
        #[arg(short, long)]
        class: String,

        /// Student user ID
        #[arg(short, long)]
        student: String,

        /// Assessment name, e.g. "Quiz 1"
        #[arg(short, long)]
        assessment: String,

        /// Points scored
        #[arg(long)]
        score: f64,

        /// Maximum points
        #[arg(short, long, default_value_t = 100.0)]
        max: f64,

        /// Weight in the overall average
        #[arg(short, long)]
        weight: Option<f64>,

        /// Feedback for the student
        #[arg(long)]
        comment: Option<String>,
    },

    /// Update a grade (teachers only)
    Update {
        /// Grade ID
        id: String,

        #[arg(short, long)]
        assessment: Option<String>,

        #[arg(long)]
        score: Option<f64>,

        #[arg(short, long)]
        max: Option<f64>,

        #[arg(short, long)]
        weight: Option<f64>,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Delete a grade (teachers only)
    Delete {
        /// Grade ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Averages per student and per assessment
    Summary {
        /// Class ID
        #[arg(short, long)]
        class: Option<String>,

        /// Student user ID
        #[arg(short, long)]
        student: Option<String>,
    },
}

/// Grade row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct GradeRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Student")]
    pub student: String,
    #[tabled(rename = "Assessment")]
    pub assessment: String,
    #[tabled(rename = "Score")]
    pub score: String,
    #[tabled(rename = "%")]
    pub percent: String,
    #[tabled(rename = "Weight")]
    pub weight: String,
    #[tabled(rename = "Graded")]
    pub graded_at: String,
}

impl From<&Grade> for GradeRow {
    fn from(grade: &Grade) -> Self {
        Self {
            id: grade.id.clone(),
            student: grade
                .student_name
                .clone()
                .unwrap_or_else(|| grade.student_id.clone()),
            assessment: grade.assessment_name.clone(),
            score: format!("{}/{}", grade.score, grade.max_score),
            percent: display_percent(grade.percent()),
            weight: display_opt(grade.weight),
            graded_at: display_date(grade.graded_at),
        }
    }
}

/// One student's line in the summary table
#[derive(Debug, Serialize, Tabled)]
pub struct StudentSummaryRow {
    #[tabled(rename = "Student")]
    pub student: String,
    #[tabled(rename = "Grades")]
    pub grades: usize,
    #[tabled(rename = "Overall")]
    pub overall: String,
    #[tabled(rename = "Latest Rolling")]
    pub rolling: String,
}

/// One assessment's line in the summary table
#[derive(Debug, Serialize, Tabled)]
pub struct AssessmentSummaryRow {
    #[tabled(rename = "Assessment")]
    pub assessment: String,
    #[tabled(rename = "Grades")]
    pub count: usize,
    #[tabled(rename = "Class Average")]
    pub average: String,
}

pub async fn execute(ctx: &Context, action: GradeAction) -> Result<()> {
    match action {
        GradeAction::List {
            class,
            student,
            assessment,
        } => {
            let user = ctx.require_user()?;
            let mut filters = scoped_filters(user, class, student);
            filters.assessment_name = non_blank(assessment);
            list_grades(ctx, &filters).await
        }
        GradeAction::Add {
            class,
            student,
            assessment,
            score,
            max,
            weight,
            comment,
        } => {
            let dto = CreateGrade {
                class_id: class.trim().to_string(),
                student_id: student.trim().to_string(),
                assessment_name: assessment.trim().to_string(),
                score,
                max_score: max,
                weight,
                comment: non_blank(comment),
            };
            add_grade(ctx, dto).await
        }
        GradeAction::Update {
            id,
            assessment,
            score,
            max,
            weight,
            comment,
        } => {
            let dto = UpdateGrade {
                assessment_name: non_blank(assessment),
                score,
                max_score: max,
                weight,
                comment: non_blank(comment),
            };
            update_grade(ctx, &id, dto).await
        }
        GradeAction::Delete { id, yes } => delete_grade(ctx, &id, yes).await,
        GradeAction::Summary { class, student } => {
            let user = ctx.require_user()?;
            let filters = scoped_filters(user, class, student);
            grade_summary(ctx, &filters).await
        }
    }
}

/// Build grade filters, defaulting a student with no filters to their own grades
fn scoped_filters(user: &UserProfile, class: Option<String>, student: Option<String>) -> GradeFilters {
    let class_id = non_blank(class);
    let mut student_id = non_blank(student);
    if class_id.is_none() && student_id.is_none() && !user.is_teacher() {
        student_id = Some(user.id.clone());
    }
    GradeFilters {
        class_id,
        student_id,
        ..Default::default()
    }
}

async fn list_grades(ctx: &Context, filters: &GradeFilters) -> Result<()> {
    let page = ctx.queries.resource::<Grades>().list(filters).await?;
    let rows: Vec<GradeRow> = page.content.iter().map(GradeRow::from).collect();
    print_output(&rows, ctx.format)
}

async fn add_grade(ctx: &Context, dto: CreateGrade) -> Result<()> {
    ctx.require_teacher()?;
    if dto.class_id.is_empty() || dto.student_id.is_empty() || dto.assessment_name.is_empty() {
        bail!("Class, student and assessment are required");
    }
    validate_score(dto.score, dto.max_score)?;
    if matches!(dto.weight, Some(w) if w < 0.0) {
        bail!("Weight cannot be negative");
    }

    let grade = ctx.queries.resource::<Grades>().create(&dto).await?;
    print_success(
        &format!(
            "Recorded {} for {}: {}/{} [{}]",
            grade.assessment_name,
            grade.student_name.as_deref().unwrap_or(&grade.student_id),
            grade.score,
            grade.max_score,
            grade.id
        ),
        ctx.quiet,
    );
    Ok(())
}

async fn update_grade(ctx: &Context, id: &str, dto: UpdateGrade) -> Result<()> {
    ctx.require_teacher()?;
    let grades = ctx.queries.resource::<Grades>();

    // A partial score change is checked against the stored counterpart
    if dto.score.is_some() || dto.max_score.is_some() {
        let current = grades.get(id).await?;
        validate_score(
            dto.score.unwrap_or(current.score),
            dto.max_score.unwrap_or(current.max_score),
        )?;
    }
    if dto.assessment_name.is_none()
        && dto.score.is_none()
        && dto.max_score.is_none()
        && dto.weight.is_none()
        && dto.comment.is_none()
    {
        bail!("Nothing to update. Pass --assessment, --score, --max, --weight or --comment");
    }

    let grade = grades.update(id, &dto).await?;
    print_success(
        &format!("Updated {}: {}/{}", grade.assessment_name, grade.score, grade.max_score),
        ctx.quiet,
    );
    Ok(())
}

async fn delete_grade(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    ctx.require_teacher()?;
    if !yes && !confirm(&format!("Delete grade {}?", id))? {
        print_info("Cancelled.", ctx.quiet);
        return Ok(());
    }

    ctx.queries.resource::<Grades>().delete(id).await?;
    print_success(&format!("Deleted grade {}", id), ctx.quiet);
    Ok(())
}

async fn grade_summary(ctx: &Context, filters: &GradeFilters) -> Result<()> {
    let page = ctx.queries.resource::<Grades>().list(filters).await?;
    let summary = summarize(&page.content);

    match ctx.format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_summary_tables(&summary, ctx.quiet)?,
    }
    Ok(())
}

fn student_rows(summary: &GradeSummary) -> Vec<StudentSummaryRow> {
    summary
        .students
        .iter()
        .map(|s| StudentSummaryRow {
            student: s.display_name().to_string(),
            grades: s.grade_count(),
            overall: display_percent(s.overall_average),
            rolling: display_percent(s.rolling_average.last().map(|p| p.average)),
        })
        .collect()
}

fn assessment_rows(summary: &GradeSummary) -> Vec<AssessmentSummaryRow> {
    summary
        .assessments
        .iter()
        .map(|a| AssessmentSummaryRow {
            assessment: a.assessment_name.clone(),
            count: a.count,
            average: display_percent(Some(a.average)),
        })
        .collect()
}

fn print_summary_tables(summary: &GradeSummary, quiet: bool) -> Result<()> {
    print_info("Students", quiet);
    print_output(&student_rows(summary), OutputFormat::Table)?;
    print_info("", quiet);
    print_info("Assessments", quiet);
    print_output(&assessment_rows(summary), OutputFormat::Table)?;

    if summary.skipped > 0 {
        print_warning(
            &format!(
                "{} grade(s) left out because their max score is not positive",
                summary.skipped
            ),
            quiet,
        );
    }
    Ok(())
}
