//! Creates the first admin account, or promotes an existing one.
//!
//! ```text
//! seed <email> <password> [name]
//! ```
//! Falls back to `SEED_ADMIN_EMAIL`, `SEED_ADMIN_PASSWORD` and
//! `SEED_ADMIN_NAME`. Uses the same settings as the server.

use std::env;

use anyhow::{bail, Context};
use bc_auth_simple::SimpleCredentialProvider;
use bc_configs::Settings;
use bc_core::models::{NewMember, Role};
use bc_core::traits::{CredentialProvider, MemberRepo};
use bc_db_sqlite::{RetryPolicy, SqliteClubRepo};
use tracing::info;

fn arg_or_env(args: &[String], index: usize, var: &str) -> Option<String> {
    args.get(index)
        .cloned()
        .or_else(|| env::var(var).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(email) = arg_or_env(&args, 0, "SEED_ADMIN_EMAIL") else {
        bail!("usage: seed <email> <password> [name]");
    };
    let email = email.to_lowercase();
    let name = arg_or_env(&args, 2, "SEED_ADMIN_NAME").unwrap_or_else(|| "Admin".to_string());

    let repo = SqliteClubRepo::connect(
        &settings.database.url,
        settings.database.max_connections,
        RetryPolicy::default(),
    )
    .await
    .with_context(|| format!("failed to open {}", settings.database.url))?;

    if let Some(existing) = repo.get_credentials(&email).await? {
        repo.set_role(existing.member.id, Role::Admin).await?;
        info!(member_id = %existing.member.id, %email, "existing account promoted to admin");
        return Ok(());
    }

    let Some(password) = arg_or_env(&args, 1, "SEED_ADMIN_PASSWORD") else {
        bail!("a password is required to create {email}");
    };
    if password.chars().count() < 8 {
        bail!("password must be at least 8 characters");
    }

    let credentials = SimpleCredentialProvider::new(settings.auth.pepper);
    let member = repo
        .create_member(NewMember {
            email,
            name,
            password_hash: credentials.hash_password(&password)?,
            role: Role::Admin,
        })
        .await?;

    info!(member_id = %member.id, email = %member.email, "admin account created");
    Ok(())
}
