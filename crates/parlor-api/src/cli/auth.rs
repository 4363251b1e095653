//! Account CLI commands: register, login, logout, whoami.

use anyhow::Result;
use console::style;
use dialoguer::{Input, Password};

use parlor_types::user::User;

use crate::cli::spinner;
use crate::state::AppState;

fn prompt_username(username: Option<String>) -> Result<String> {
    match username {
        Some(u) => Ok(u),
        None => Ok(Input::<String>::new()
            .with_prompt("Username")
            .interact_text()?),
    }
}

/// Create an account and sign it in.
///
/// # Examples
///
/// ```bash
/// # Interactive prompts
/// parlor register
///
/// # One-shot (password from the environment)
/// PARLOR_PASSWORD=secret parlor register --username alice
/// ```
pub async fn register(
    state: &AppState,
    username: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let username = prompt_username(username)?;
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let spinner = spinner("Creating account...", json);
    let user = state.sessions.register(&username, &password).await;
    spinner.finish_and_clear();
    let user = user?;

    state.conversations.init(&user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Welcome, {}!",
        style("✓").green().bold(),
        style(user.label()).cyan().bold()
    );
    println!();
    println!(
        "  Create your first character: {}",
        style("parlor character new").yellow()
    );
    println!();

    Ok(())
}

/// Verify credentials and sign in.
pub async fn login(
    state: &AppState,
    username: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let username = prompt_username(username)?;
    let password = match password {
        Some(p) => p,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let spinner = spinner("Signing in...", json);
    let user = state.sessions.login(&username, &password).await;
    spinner.finish_and_clear();
    let user = user?;

    let chats = state.conversations.init(&user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Signed in as {}",
        style("✓").green().bold(),
        style(user.label()).cyan().bold()
    );
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Sign out. Safe to run when already signed out.
pub async fn logout(state: &AppState, json: bool) -> Result<()> {
    let previous = state.sessions.current_user();
    state.sessions.logout().await?;
    state.conversations.clear();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "logged_out": previous.is_some(),
            }))?
        );
        return Ok(());
    }

    match previous {
        Some(user) => println!(
            "\n  {} Signed out {}\n",
            style("✓").green().bold(),
            style(user.label()).cyan()
        ),
        None => println!("\n  {} Not signed in\n", style("i").blue().bold()),
    }
    Ok(())
}

/// Show the signed-in account and how replies are produced.
pub fn whoami(state: &AppState, user: &User, json: bool) -> Result<()> {
    let chats = state.conversations.chats();
    let completion = &state.config.completion;
    let ready = state.conversations.provider().is_ready();

    if json {
        let info = serde_json::json!({
            "user": user,
            "chats": chats.len(),
            "model": completion.model,
            "base_url": completion.base_url,
            "api_key_configured": ready,
            "data_dir": state.data_dir.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(user.label()).cyan().bold());
    if user.display_name.is_some() {
        println!("  {}", style(&user.username).dim());
    }
    println!();
    println!("  {}", style("── Account ──").dim());
    println!(
        "  {}        {}",
        style("ID:").bold(),
        style(user.id.to_string()).dim()
    );
    println!(
        "  {}    {}",
        style("Since:").bold(),
        user.created_at.format("%Y-%m-%d")
    );
    println!("  {}     {}", style("Chats:").bold(), chats.len());
    println!();
    println!("  {}", style("── Replies ──").dim());
    println!("  {}     {}", style("Model:").bold(), completion.model);
    println!("  {}  {}", style("Endpoint:").bold(), completion.base_url);
    let key_status = if ready {
        style("configured".to_string()).green()
    } else {
        style(format!("missing (set {})", completion.api_key_env)).yellow()
    };
    println!("  {}   {}", style("API key:").bold(), key_status);
    println!(
        "  {}      {}",
        style("Data:").bold(),
        style(state.data_dir.display()).dim()
    );
    println!();

    Ok(())
}
