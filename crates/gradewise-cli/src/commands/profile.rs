//! Profile commands for the logged-in user

use anyhow::{bail, Result};
use clap::Subcommand;
use gradewise_core::api::Users;
use gradewise_core::models::UpdateUserProfile;

use super::helpers::non_blank;
use super::Context;
use crate::output::{print_details, print_success};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show your profile
    Show,

    /// Change your display name
    Update {
        /// New full name
        #[arg(short = 'n', long)]
        full_name: String,
    },
}

pub async fn execute(ctx: &mut Context, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => show_profile(ctx),
        ProfileAction::Update { full_name } => update_profile(ctx, full_name).await,
    }
}

fn show_profile(ctx: &Context) -> Result<()> {
    let user = ctx.require_user()?;
    print_details(
        user,
        &[
            ("ID", user.id.clone()),
            ("Name", user.full_name.clone()),
            ("Email", user.email.clone()),
            ("Role", user.role.to_string()),
            ("Auth ID", user.auth_user_id.clone()),
        ],
        ctx.format,
    )
}

async fn update_profile(ctx: &mut Context, full_name: String) -> Result<()> {
    let user_id = ctx.require_user()?.id.clone();
    let Some(full_name) = non_blank(Some(full_name)) else {
        bail!("Full name cannot be empty");
    };

    let dto = UpdateUserProfile {
        full_name: Some(full_name),
        metadata: None,
    };
    let updated = ctx.queries.resource::<Users>().update(&user_id, &dto).await?;

    // Keep the stored session in step with the backend
    let name = updated.full_name.clone();
    ctx.session.set_user(updated)?;
    print_success(&format!("Profile updated. Name is now {}", name), ctx.quiet);
    Ok(())
}
