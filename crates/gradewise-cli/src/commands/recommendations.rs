//! Recommendation commands
//!
//! `list --watch` keeps polling the backend and reprints whenever the
//! recommendations change, until interrupted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use gradewise_core::api::Recommendations;
use gradewise_core::models::{Audience, ListFilters, Recommendation, RecommendationFilters};
use gradewise_core::query::{Poller, RECOMMENDATION_POLL_INTERVAL};
use gradewise_core::{ApiClient, Queries, UserProfile};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::Mutex;

use super::helpers::non_blank;
use super::Context;
use crate::output::{
    display_date, display_opt, print_error, print_info, print_output, truncate, OutputFormat,
};

#[derive(Subcommand)]
pub enum RecommendationAction {
    /// List recommendations
    List {
        /// Class ID
        #[arg(short, long)]
        class: Option<String>,

        /// Student user ID
        #[arg(short, long)]
        student: Option<String>,

        /// Audience: student, teacher or individual
        #[arg(short, long)]
        audience: Option<Audience>,

        /// Keep polling and reprint on changes (Ctrl+C to stop)
        #[arg(short, long)]
        watch: bool,

        /// Seconds between polls in watch mode
        #[arg(long, default_value_t = RECOMMENDATION_POLL_INTERVAL.as_secs())]
        interval: u64,
    },
}

/// Recommendation row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct RecommendationRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Audience")]
    pub audience: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Content")]
    pub content: String,
    #[tabled(rename = "Class")]
    pub class_id: String,
    #[tabled(rename = "Created")]
    pub created_at: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(rec: &Recommendation) -> Self {
        Self {
            id: rec.id.clone(),
            audience: rec.audience.to_string(),
            title: rec.title.clone(),
            content: truncate(&rec.content, 60),
            class_id: display_opt(rec.class_id.as_deref()),
            created_at: display_date(rec.created_at),
        }
    }
}

pub async fn execute(ctx: &Context, action: RecommendationAction) -> Result<()> {
    match action {
        RecommendationAction::List {
            class,
            student,
            audience,
            watch,
            interval,
        } => {
            let user = ctx.require_user()?;
            let filters = scoped_filters(user, class, student, audience);
            if watch {
                watch_recommendations(ctx, filters, Duration::from_secs(interval.max(1))).await
            } else {
                list_recommendations(ctx, &filters).await
            }
        }
    }
}

/// A student with no filters sees recommendations addressed to them
fn scoped_filters(
    user: &UserProfile,
    class: Option<String>,
    student: Option<String>,
    audience: Option<Audience>,
) -> RecommendationFilters {
    let class_id = non_blank(class);
    let mut student_id = non_blank(student);
    if class_id.is_none() && student_id.is_none() && audience.is_none() && !user.is_teacher() {
        student_id = Some(user.id.clone());
    }
    RecommendationFilters {
        class_id,
        student_id,
        audience,
        ..Default::default()
    }
}

fn rows(recommendations: &[Recommendation]) -> Vec<RecommendationRow> {
    recommendations.iter().map(RecommendationRow::from).collect()
}

async fn list_recommendations(ctx: &Context, filters: &RecommendationFilters) -> Result<()> {
    let page = ctx.queries.resource::<Recommendations>().list(filters).await?;
    print_output(&rows(&page.content), ctx.format)
}

async fn watch_recommendations(
    ctx: &Context,
    filters: RecommendationFilters,
    every: Duration,
) -> Result<()> {
    // Fail fast on bad filters instead of inside the loop
    filters.validate()?;

    print_info(
        &format!("Watching recommendations every {}s. Press Ctrl+C to stop.", every.as_secs()),
        ctx.quiet,
    );

    let queries: Arc<Queries<ApiClient>> = Arc::clone(&ctx.queries);
    let last_seen: Arc<Mutex<Option<Vec<Recommendation>>>> = Arc::new(Mutex::new(None));
    let format = ctx.format;

    let poller = Poller::spawn(every, move || {
        let queries = Arc::clone(&queries);
        let last_seen = Arc::clone(&last_seen);
        let filters = filters.clone();
        async move {
            // Always go to the backend; a tick can land just inside the fresh window
            match queries.resource::<Recommendations>().refetch(&filters).await {
                Ok(page) => {
                    let mut last = last_seen.lock().await;
                    if last.as_deref() == Some(page.content.as_slice()) {
                        log::debug!("[recommendations] No changes");
                        return;
                    }
                    print_update(&page.content, format);
                    *last = Some(page.content.clone());
                }
                Err(e) => {
                    log::warn!("[recommendations] Poll failed: {}", e);
                    print_error(&format!("Refresh failed: {}", e));
                }
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    poller.shutdown().await;
    print_info("Stopped watching.", ctx.quiet);
    Ok(())
}

fn print_update(recommendations: &[Recommendation], format: OutputFormat) {
    if format == OutputFormat::Table {
        println!("\n[{}]", chrono::Local::now().format("%H:%M:%S"));
    }
    if let Err(e) = print_output(&rows(recommendations), format) {
        print_error(&format!("Could not print recommendations: {}", e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradewise_core::Role;

    fn user(role: Role) -> UserProfile {
        UserProfile {
            id: "u-3".to_string(),
            auth_user_id: "auth-3".to_string(),
            full_name: "Lee Chen".to_string(),
            email: "lee@school.test".to_string(),
            role,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_student_defaults_to_own_recommendations() {
        let filters = scoped_filters(&user(Role::Student), None, None, None);
        assert_eq!(filters.student_id.as_deref(), Some("u-3"));

        let filters = scoped_filters(&user(Role::Student), None, None, Some(Audience::Student));
        assert!(filters.student_id.is_none());
        assert_eq!(filters.audience, Some(Audience::Student));
    }

    #[test]
    fn test_teacher_gets_no_implicit_scope() {
        let filters = scoped_filters(&user(Role::Teacher), None, None, None);
        assert_eq!(filters, RecommendationFilters::default());
    }

    #[test]
    fn test_recommendation_row() {
        let rec = Recommendation {
            id: "r-1".to_string(),
            audience: Audience::Individual,
            student_id: Some("u-3".to_string()),
            class_id: None,
            title: "Practice fractions".to_string(),
            content: "Work through the fraction drills in chapter four before Friday's quiz, focusing on mixed numbers.".to_string(),
            created_at: None,
        };
        let row = RecommendationRow::from(&rec);
        assert_eq!(row.audience, "INDIVIDUAL");
        assert_eq!(row.class_id, "-");
        assert_eq!(row.content.chars().count(), 60);
        assert!(row.content.ends_with("..."));
    }
}
