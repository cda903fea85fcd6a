//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use tourbook_core::auth::UserId;

#[derive(Parser, Debug)]
#[command(
    name = "tourbook",
    version,
    about = "Terminal front-end for the tourbook library backend",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and store the session token
    Login { username: Option<String> },
    /// Create an account
    Register { username: String, email: String },
    /// Forget the session token
    Logout,
    /// Show the logged-in user's profile
    #[command(name = "whoami")]
    WhoAmI,
    /// List categories
    Categories,
    /// Add, rename or delete a category
    Category(CategoryCommand),
    /// Change password
    Passwd,
    /// Change profile fields; the rest are kept
    UpdateProfile(ProfileEdits),
    /// Delete an account, by default the logged-in one
    DeleteAccount {
        #[arg(long)]
        id: Option<UserId>,
    },
    /// Resolve a route through the guard
    Open { path: String },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CategoryAction {
    Add { name: String },
    Update { id: i64, name: String },
    Delete { id: i64 },
}

/// Fields given on the command line; the rest come from the current profile
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdits {
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
}
