//! Command handlers for vaultctl.

use crate::render;
use crate::Commands;
use anyhow::{anyhow, bail, Result};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;
use vault_common::{AuthError, MutationOutcome, Vault, VaultConfig};

pub async fn run(command: Commands, config: &VaultConfig) -> Result<()> {
    let vault = Vault::from_config(config);
    debug!(backend = vault.store().backend_name(), "store opened");
    vault.start().await;

    match command {
        Commands::Repl => repl(&vault, config).await,
        other => {
            execute(&vault, config, other).await?;
            println!();
            println!("{}", render::operation_log(&vault.operations()));
            Ok(())
        }
    }
}

async fn execute(vault: &Vault, config: &VaultConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Signup { email, password } => {
            let user = vault.sign_up(&email, &password).await.map_err(auth_error)?;
            println!("{} {}", "Account created:".green(), user.email);
            show_progress(vault);
        }
        Commands::Signin { email, password } => {
            let user = vault.sign_in(&email, &password).await.map_err(auth_error)?;
            println!("{} {}", "Welcome back,".green(), user.email);
            show_progress(vault);
        }
        Commands::Signout => {
            if vault.current_user().is_none() {
                println!("{}", "Not signed in.".dimmed());
            } else {
                vault.sign_out().await;
                println!("{}", "Signed out.".green());
            }
        }
        Commands::Status => {
            println!("{}", render::state_line(&vault.state()));
            match vault.current_user() {
                Some(user) => {
                    println!("{}", render::user_line(&user));
                    show_progress(vault);
                }
                None => println!("Not signed in. Use `signup` or `signin`."),
            }
        }
        Commands::Xp { amount } => {
            let amount = amount.unwrap_or(config.progress.default_xp_gain);
            let outcome = vault.add_xp(amount).await;
            report(&outcome, &format!("+{} XP earned! The data has been saved.", amount))?;
        }
        Commands::Lesson => {
            let outcome = vault.complete_lesson().await;
            report(
                &outcome,
                &format!(
                    "Lesson completed! +{} XP. Lessons and XP were both updated.",
                    config.progress.lesson_xp_bonus
                ),
            )?;
        }
        Commands::Reset => {
            let outcome = vault.reset_progress().await;
            report(&outcome, "Progress reset. All data zeroed in the database.")?;
        }
        Commands::Repl => bail!("already in interactive mode"),
    }
    Ok(())
}

fn auth_error(e: AuthError) -> anyhow::Error {
    anyhow!("[{}] {}", e.code(), e)
}

fn show_progress(vault: &Vault) {
    if let Some(record) = vault.progress() {
        println!("{}", render::progress_card(&record));
    }
}

fn report(outcome: &MutationOutcome, success: &str) -> Result<()> {
    match outcome {
        MutationOutcome::Applied(record) => {
            println!("{}", success.green());
            println!("{}", render::progress_card(record));
            Ok(())
        }
        MutationOutcome::Skipped(reason) => {
            println!("{} {}", "Nothing changed:".yellow(), reason.as_str());
            Ok(())
        }
    }
}

const REPL_HELP: &str = "commands: signup <email> <password> | signin <email> <password> | signout | \
status | xp [amount] | lesson | reset | log | clear | help | quit";

fn parse_line(line: &str) -> Result<Option<Commands>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        ["signup", email, password] => Commands::Signup {
            email: email.to_string(),
            password: password.to_string(),
        },
        ["signin", email, password] => Commands::Signin {
            email: email.to_string(),
            password: password.to_string(),
        },
        ["signout"] => Commands::Signout,
        ["status"] => Commands::Status,
        ["xp"] => Commands::Xp { amount: None },
        ["xp", amount] => Commands::Xp {
            amount: Some(amount.parse()?),
        },
        ["lesson"] => Commands::Lesson,
        ["reset"] => Commands::Reset,
        [] => return Ok(None),
        _ => bail!("unknown command: {}", line.trim()),
    };
    Ok(Some(command))
}

async fn repl(vault: &Vault, config: &VaultConfig) -> Result<()> {
    println!("{}", "ProgressVault interactive session".bold());
    println!("{}", REPL_HELP.dimmed());

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"vault> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "quit" | "exit" => break,
            "help" => println!("{}", REPL_HELP),
            "log" => println!("{}", render::operation_log(&vault.operations())),
            "clear" => {
                vault.clear_operation_log();
                println!("{}", "Operation log cleared.".dimmed());
            }
            input => match parse_line(input) {
                Ok(Some(command)) => {
                    if let Err(e) = execute(vault, config, command).await {
                        println!("{} {}", "error:".red(), e);
                    }
                    if let Some(latest) = vault.operations().first() {
                        println!("{}", render::operation(latest));
                    }
                }
                Ok(None) => {}
                Err(e) => println!("{} {}", "error:".red(), e),
            },
        }
    }
    Ok(())
}
