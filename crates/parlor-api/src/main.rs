//! Parlor CLI entry point.
//!
//! Binary name: `parlor`
//!
//! Parses CLI arguments, initializes tracing, the database and services,
//! checks the command's route against the session guard, then dispatches to
//! the matching command handler.

mod cli;
mod state;

use anyhow::bail;
use clap::Parser;
use clap_complete::generate;
use console::style;
use tracing::debug;

use parlor_core::session::guard::guard;
use parlor_observe::tracing_setup::{init_tracing, shutdown_tracing};
use parlor_types::navigation::{Navigation, Route};

use cli::character::CharacterArgs;
use cli::{CharacterCommand, Cli, Commands, GroupCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,parlor=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "parlor", &mut std::io::stdout());
        return Ok(());
    }

    // Initialize application state (DB, services, restored session)
    let state = AppState::init().await?;

    if let Some(route) = cli.command.route() {
        match guard(&route, state.sessions.is_authenticated()) {
            Navigation::Proceed => debug!(route = %route, "Navigating"),
            Navigation::Redirect(Route::Auth) => {
                if !cli.json {
                    eprintln!(
                        "\n  {} Sign in first: {} or {}\n",
                        style("!").yellow().bold(),
                        style("parlor login").yellow(),
                        style("parlor register").yellow()
                    );
                }
                bail!("not logged in");
            }
            Navigation::Redirect(target) => {
                let user = state.user()?;
                if cli.json {
                    let redirect = serde_json::json!({
                        "redirect": target.path(),
                        "user": user,
                    });
                    println!("{}", serde_json::to_string_pretty(&redirect)?);
                } else {
                    println!(
                        "\n  {} Already signed in as {}. Run {} to switch accounts.\n",
                        style("i").blue().bold(),
                        style(user.label()).cyan(),
                        style("parlor logout").yellow()
                    );
                }
                return Ok(());
            }
        }
    }

    match cli.command {
        Commands::Register { username, password } => {
            cli::auth::register(&state, username, password, cli.json).await?;
        }

        Commands::Login { username, password } => {
            cli::auth::login(&state, username, password, cli.json).await?;
        }

        Commands::Logout => {
            cli::auth::logout(&state, cli.json).await?;
        }

        Commands::Whoami => {
            cli::auth::whoami(&state, &state.user()?, cli.json)?;
        }

        Commands::Character { action } => {
            let user = state.user()?;
            match action {
                CharacterCommand::New {
                    name,
                    gender,
                    personality,
                    background,
                    description,
                } => {
                    let args = CharacterArgs {
                        name,
                        gender,
                        personality,
                        background,
                        description,
                    };
                    cli::character::new_character(&state, &user, args, cli.json).await?;
                }
                CharacterCommand::List { mine } => {
                    cli::character::list_characters(&state, &user, mine, cli.json).await?;
                }
                CharacterCommand::Available { chat } => {
                    cli::character::available_characters(&state, &user, &chat, cli.json).await?;
                }
            }
        }

        Commands::Group { action } => match action {
            GroupCommand::New { name, characters } => {
                cli::conversation::new_group(&state, &state.user()?, name, characters, cli.json)
                    .await?;
            }
        },

        Commands::Chats => {
            cli::conversation::list_chats(&state, &state.user()?, cli.json)?;
        }

        Commands::Show { chat, limit } => {
            cli::conversation::show_chat(&state, &state.user()?, &chat, limit, cli.json).await?;
        }

        Commands::Send { chat, message } => {
            cli::conversation::send_message(&state, &state.user()?, &chat, &message, cli.json)
                .await?;
        }

        Commands::Talk { chat } => {
            cli::chat::loop_runner::run_talk_loop(&state, &state.user()?, &chat).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
