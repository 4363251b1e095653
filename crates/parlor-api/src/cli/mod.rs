//! CLI command definitions and dispatch for the `parlor` binary.
//!
//! Uses clap derive macros for argument parsing. Every command that opens a
//! view maps onto a [`Route`] so the session guard runs before dispatch.

pub mod auth;
pub mod character;
pub mod chat;
pub mod conversation;
pub mod lookup;
pub mod render;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};
use parlor_types::navigation::Route;

/// Chat with AI characters, one on one or in groups.
#[derive(Parser)]
#[command(name = "parlor", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in.
    Register {
        /// Username (prompted if omitted).
        #[arg(long)]
        username: Option<String>,

        /// Password (prompted if omitted).
        #[arg(long, env = "PARLOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign in to an existing account.
    Login {
        /// Username (prompted if omitted).
        #[arg(long)]
        username: Option<String>,

        /// Password (prompted if omitted).
        #[arg(long, env = "PARLOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out and forget the saved session.
    Logout,

    /// Show the signed-in account.
    Whoami,

    /// Create and browse AI characters.
    #[command(alias = "ai")]
    Character {
        #[command(subcommand)]
        action: CharacterCommand,
    },

    /// Create group chats.
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },

    /// List your chats, most recently active first.
    #[command(alias = "ls")]
    Chats,

    /// Print a chat's transcript.
    Show {
        /// Chat name, id, or id prefix.
        chat: String,

        /// Only show the last N messages.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Send one message and print the replies.
    Send {
        /// Chat name, id, or id prefix.
        chat: String,

        /// Message text.
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Start an interactive session in a chat.
    Talk {
        /// Chat name, id, or id prefix.
        chat: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum CharacterCommand {
    /// Create a character and open a one-on-one chat with it.
    New {
        /// Character name (skips the interactive wizard when given).
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        personality: Option<String>,

        #[arg(long)]
        background: Option<String>,

        /// Free-text description added to the persona.
        #[arg(long)]
        description: Option<String>,
    },

    /// List characters.
    #[command(alias = "ls")]
    List {
        /// Only characters you created.
        #[arg(long)]
        mine: bool,
    },

    /// List characters that could still join a chat.
    Available {
        /// Chat name, id, or id prefix.
        chat: String,
    },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Create a group chat with several characters.
    New {
        /// Group name (prompted if omitted).
        #[arg(long)]
        name: Option<String>,

        /// Character names or ids, in speaking order (picked interactively if omitted).
        characters: Vec<String>,
    },
}

impl Commands {
    /// The view this command opens, if it opens one.
    ///
    /// Chat-scoped commands resolve their chat after the guard runs, so they
    /// are checked against the chat list.
    pub fn route(&self) -> Option<Route> {
        match self {
            Commands::Register { .. } | Commands::Login { .. } => Some(Route::Auth),
            Commands::Logout | Commands::Completions { .. } => None,
            Commands::Whoami => Some(Route::Preferences),
            Commands::Character { action } => Some(match action {
                CharacterCommand::New { .. } => Route::CreateCharacter { character_id: None },
                CharacterCommand::List { .. } => Route::Welcome,
                CharacterCommand::Available { .. } => Route::Chats,
            }),
            Commands::Group { .. } => Some(Route::CreateGroup),
            Commands::Chats
            | Commands::Show { .. }
            | Commands::Send { .. }
            | Commands::Talk { .. } => Some(Route::Chats),
        }
    }
}

/// A steady-ticking spinner, hidden when output is machine-readable.
pub fn spinner(message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_joins_trailing_words() {
        let cli = Cli::parse_from(["parlor", "send", "Mika", "hello", "there"]);
        match cli.command {
            Commands::Send { chat, message } => {
                assert_eq!(chat, "Mika");
                assert_eq!(message.join(" "), "hello there");
            }
            _ => panic!("Expected Send"),
        }
    }

    #[test]
    fn test_routes() {
        let login = Cli::parse_from(["parlor", "login", "--username", "alice"]);
        assert_eq!(login.command.route(), Some(Route::Auth));

        let logout = Cli::parse_from(["parlor", "logout"]);
        assert_eq!(logout.command.route(), None);

        let group = Cli::parse_from(["parlor", "group", "new", "--name", "Club", "Mika", "Ren"]);
        assert_eq!(group.command.route(), Some(Route::CreateGroup));

        let new = Cli::parse_from(["parlor", "character", "new", "--name", "Mika"]);
        assert_eq!(
            new.command.route(),
            Some(Route::CreateCharacter { character_id: None })
        );

        let talk = Cli::parse_from(["parlor", "talk", "Mika"]);
        assert!(talk.command.route().is_some_and(|r| r.requires_auth()));
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["parlor", "chats", "-vv", "--json"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert!(!cli.otel);
    }
}
