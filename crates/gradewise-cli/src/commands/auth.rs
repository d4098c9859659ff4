//! Authentication commands
//!
//! Login, signup, logout and the current session.

use anyhow::Result;
use clap::Subcommand;
use gradewise_core::{Role, SignupRequest, UserProfile};
use serde::Serialize;
use tabled::Tabled;

use super::helpers::read_password;
use super::Context;
use crate::output::{print_info, print_single, print_success, print_warning};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in with email and password
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "GRADEWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and its profile
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Full name shown to teachers and classmates
        #[arg(short = 'n', long)]
        full_name: String,

        /// Role: teacher or student
        #[arg(short, long, default_value = "student")]
        role: Role,

        /// Password (read from stdin when omitted)
        #[arg(short, long, env = "GRADEWISE_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// End the session
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Re-check the token and reload the profile from the backend
        #[arg(long)]
        refresh: bool,
    },
}

/// Current user row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct UserRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub full_name: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Role")]
    pub role: String,
}

impl From<&UserProfile> for UserRow {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
        }
    }
}

pub async fn execute(ctx: &mut Context, action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login { email, password } => login(ctx, email, password).await,
        AuthAction::Signup {
            email,
            full_name,
            role,
            password,
        } => signup(ctx, email, full_name, role, password).await,
        AuthAction::Logout => logout(ctx).await,
        AuthAction::Whoami { refresh } => whoami(ctx, refresh).await,
    }
}

async fn login(ctx: &mut Context, email: String, password: Option<String>) -> Result<()> {
    let password = read_password(password, "Password")?;
    let gateway = ctx.gateway()?;

    let user = gateway.login_into(&mut ctx.session, &email, &password).await?;
    let message = format!("Logged in as {} ({})", user.full_name, user.role);
    let row = UserRow::from(user);

    ctx.reload_token()?;
    print_success(&message, ctx.quiet);
    if !ctx.quiet {
        print_single(&row, ctx.format)?;
    }
    Ok(())
}

async fn signup(
    ctx: &mut Context,
    email: String,
    full_name: String,
    role: Role,
    password: Option<String>,
) -> Result<()> {
    let password = read_password(password, "Choose a password")?;
    let request = SignupRequest {
        email,
        password,
        confirm_password: None,
        full_name,
        role,
    };
    let gateway = ctx.gateway()?;

    let user = gateway.signup_into(&mut ctx.session, request).await?;
    let message = format!("Welcome, {}! Signed up as {}", user.full_name, user.role);
    let row = UserRow::from(user);

    ctx.reload_token()?;
    print_success(&message, ctx.quiet);
    if !ctx.quiet {
        print_single(&row, ctx.format)?;
    }
    Ok(())
}

async fn logout(ctx: &mut Context) -> Result<()> {
    if !ctx.session.is_authenticated() {
        print_info("Not logged in.", ctx.quiet);
        return Ok(());
    }

    let gateway = ctx.gateway()?;
    gateway.logout(&mut ctx.session).await?;
    ctx.queries.cache().clear().await;
    ctx.reload_token()?;
    print_success("Logged out.", ctx.quiet);
    Ok(())
}

async fn whoami(ctx: &mut Context, refresh: bool) -> Result<()> {
    if !ctx.session.is_authenticated() {
        print_info("Not logged in.", ctx.quiet);
        print_info("Use 'gradewise auth login --email <email>' to log in.", ctx.quiet);
        return Ok(());
    }

    if refresh {
        let gateway = ctx.gateway()?;
        if let Err(e) = gateway.refresh_profile(&mut ctx.session).await {
            if !ctx.session.is_authenticated() {
                print_warning("Your session has expired. Please log in again.", ctx.quiet);
            }
            return Err(e.into());
        }
    }

    let user = ctx.require_user()?;
    print_single(&UserRow::from(user), ctx.format)?;
    Ok(())
}
