//! Tourbook CLI - a terminal front-end for the tourbook library backend.
//!
//! Every command runs through the same session store, request pipeline and
//! route guard the library provides, so a rejected or expired session is
//! handled here exactly as it would be in any other front-end.

mod cli;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tourbook_core::api::ApiError;
use tourbook_core::models::{Category, PasswordChange, UserInfoUpdate};
use tourbook_core::storage::open_store;
use tourbook_core::{AppContext, Config, Notice, NoticeLevel, Notifier};

use cli::{CategoryAction, Cli, Command, ProfileEdits};

/// Directory for a daily rolling log file, if set
const LOG_DIR_ENV: &str = "TOURBOOK_LOG_DIR";

/// Field the backend uses for a category's display name
const CATEGORY_NAME_FIELD: &str = "categoryName";

/// Prints notices to stderr as they happen.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        let label = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{}] {}", label, notice.message);
    }
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr));

    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "tourbook.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        _ => {
            registry.init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    let store = open_store(&config)?;
    let ctx = AppContext::new(config.clone(), store, Arc::new(StderrNotifier))?;
    info!(base_url = %config.base_url, "Tourbook CLI starting");

    run(&ctx, &mut config, cli.command).await
}

async fn run(ctx: &AppContext, config: &mut Config, command: Command) -> Result<()> {
    match command {
        Command::Login { username } => {
            let username = match username {
                Some(u) => u,
                None => prompt_username(config.last_username.as_deref())?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let landed = ctx.login(&username, &password).await.map_err(api_failure)?;

            config.last_username = Some(username);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            println!("Logged in. Now at {} ({})", landed.path, landed.view.name());
        }
        Command::Register { username, email } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            ctx.api
                .register(&username, &password, &email)
                .await
                .map_err(api_failure)?;
            println!("Registered {}. Log in with `tourbook login {}`.", username, username);
        }
        Command::Logout => {
            ctx.logout();
            println!("Logged out.");
        }
        Command::WhoAmI => {
            let profile = require_profile(ctx).await?;
            println!("{} <{}>", profile.display_name(), profile.email);
            println!("  id:        {}", profile.id);
            println!("  role:      {}", profile.role);
            println!("  phone:     {}", profile.phone);
            println!("  borrowed:  {}", profile.borrowed_count);
            if !profile.bio.is_empty() {
                println!("  bio:       {}", profile.bio);
            }
        }
        Command::Categories => {
            let categories = ctx.api.list_categories().await.map_err(api_failure)?;
            if categories.is_empty() {
                println!("No categories.");
            }
            for category in categories {
                let id = category.id.map(|id| id.to_string()).unwrap_or_default();
                println!("{:>6}  {}", id, category.display_name());
            }
        }
        Command::Category(category) => match category.action {
            CategoryAction::Add { name } => {
                let category = Category::new().with_field(CATEGORY_NAME_FIELD, name);
                ctx.api.add_category(&category).await.map_err(api_failure)?;
                println!("Category added.");
            }
            CategoryAction::Update { id, name } => {
                let categories = ctx.api.list_categories().await.map_err(api_failure)?;
                let category = renamed_category(categories, id, &name)?;
                ctx.api.update_category(&category).await.map_err(api_failure)?;
                println!("Category {} updated.", id);
            }
            CategoryAction::Delete { id } => {
                ctx.api.delete_category(id).await.map_err(api_failure)?;
                println!("Category {} deleted.", id);
            }
        },
        Command::Passwd => {
            let change = PasswordChange {
                old_password: rpassword::prompt_password("Current password: ")?,
                new_password: rpassword::prompt_password("New password: ")?,
                confirm_password: rpassword::prompt_password("Confirm new password: ")?,
            };
            if !change.confirmation_matches() {
                bail!("New passwords do not match");
            }
            ctx.api.update_password(&change).await.map_err(api_failure)?;
            println!("Password changed.");
        }
        Command::UpdateProfile(edits) => {
            let profile = require_profile(ctx).await?;
            let update = merge_edits(&profile, edits);
            ctx.api.update_user_info(&update).await.map_err(api_failure)?;
            println!("Profile updated.");
        }
        Command::DeleteAccount { id } => {
            let profile = require_profile(ctx).await?;
            let own = profile.user_id();
            let target = id.unwrap_or_else(|| own.clone());
            let label = if target == own {
                profile.display_name().to_string()
            } else {
                target.to_string()
            };
            if !confirm(&format!("Delete account {}? [y/N]: ", label))? {
                println!("Cancelled.");
                return Ok(());
            }
            ctx.api.delete_user(&target).await.map_err(api_failure)?;
            if target == own {
                ctx.logout();
            }
            println!("Account deleted.");
        }
        Command::Open { path } => {
            let location = ctx.navigate(&path)?;
            println!("{} -> {} ({})", path, location.path, location.view.name());
        }
    }
    Ok(())
}

/// Errors from the pipeline have already been shown as notices
fn api_failure(e: ApiError) -> anyhow::Error {
    anyhow::Error::new(e).context("Request failed")
}

async fn require_profile(ctx: &AppContext) -> Result<tourbook_core::Principal> {
    if !ctx.is_authenticated() {
        bail!("Not logged in. Run `tourbook login` first.");
    }
    ctx.fetch_user_info()
        .await
        .context("Could not load your profile")
}

fn merge_edits(profile: &tourbook_core::Principal, edits: ProfileEdits) -> UserInfoUpdate {
    UserInfoUpdate {
        user_id: profile.id.clone(),
        email: edits.email.unwrap_or_else(|| profile.email.clone()),
        phone: edits.phone.unwrap_or_else(|| profile.phone.clone()),
        name: edits.name.unwrap_or_else(|| profile.name.clone()),
        bio: edits.bio.unwrap_or_else(|| profile.bio.clone()),
    }
}

/// The stored category with `id`, renamed. Fields the CLI does not know
/// about are kept so the update does not drop them.
fn renamed_category(categories: Vec<Category>, id: i64, name: &str) -> Result<Category> {
    categories
        .into_iter()
        .find(|c| c.id == Some(id))
        .map(|c| c.with_field(CATEGORY_NAME_FIELD, name))
        .ok_or_else(|| anyhow!("No category with id {}", id))
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Username required"),
        (false, _) => Ok(input.to_string()),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourbook_core::auth::UserId;

    #[test]
    fn test_merge_edits_keeps_unset_fields() {
        let profile = tourbook_core::Principal {
            id: "4".to_string(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            phone: "555-0100".to_string(),
            bio: "Hiker".to_string(),
            ..Default::default()
        };
        let update = merge_edits(
            &profile,
            ProfileEdits {
                phone: Some("555-0199".to_string()),
                ..ProfileEdits::default()
            },
        );
        assert_eq!(update.user_id, "4");
        assert_eq!(update.phone, "555-0199");
        assert_eq!(update.email, "alice@example.com");
        assert_eq!(update.name, "Alice");
        assert_eq!(update.bio, "Hiker");
    }

    #[test]
    fn test_renamed_category_keeps_other_fields() {
        let categories: Vec<Category> = serde_json::from_value(serde_json::json!([
            {"id": 1, "categoryName": "Museums"},
            {"id": 2, "categoryName": "Parks", "categoryAlias": "park", "createUser": 3}
        ]))
        .unwrap();

        let renamed = renamed_category(categories.clone(), 2, "Gardens").unwrap();
        assert_eq!(
            serde_json::to_value(&renamed).unwrap(),
            serde_json::json!({"id": 2, "categoryName": "Gardens", "categoryAlias": "park", "createUser": 3})
        );
        assert!(renamed_category(categories, 9, "Nowhere").is_err());
    }

    #[test]
    fn test_own_user_id_from_profile() {
        let profile = tourbook_core::Principal {
            id: "4".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.user_id(), UserId::Number(4));
    }
}
