use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{open_session, output_json, output_success, session_client};
use crate::cli::OutputFormat;
use crate::client::ClientError;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Start a session with an identity-provider session token")]
    Login {
        #[arg(long, help = "Session token issued by the identity provider")]
        token: String,
    },

    #[command(about = "End the current session")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Show current user profile")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { token } => {
            let mut session = open_session()?;
            session.start(token.trim())?;

            // The first authenticated call provisions the user server-side.
            let profile = match session_client(&session)?.profile().await {
                Ok(profile) => profile,
                Err(e) => {
                    session.clear()?;
                    return Err(login_error(e));
                }
            };

            let name = profile.name.clone().unwrap_or_else(|| profile.email.clone());
            let welcome = session.first_time("notes", "welcome_shown")?;
            output_success(
                &output_format,
                &if welcome {
                    format!("Welcome, {}!", name)
                } else {
                    format!("Signed in as {}", name)
                },
                Some(json!({ "user": profile })),
            )
        }
        AuthCommands::Logout => {
            let mut session = open_session()?;
            session.clear()?;
            output_success(&output_format, "Signed out", None)
        }
        AuthCommands::Status => {
            let session = open_session()?;
            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "signed_in": session.is_active(),
                    "started_at": session.started_at(),
                })),
                OutputFormat::Text => {
                    match session.started_at() {
                        Some(started) if session.is_active() => {
                            println!("Signed in since {}", started.to_rfc3339())
                        }
                        _ => println!("Not signed in"),
                    }
                    Ok(())
                }
            }
        }
        AuthCommands::Whoami => {
            let session = open_session()?;
            let profile = session_client(&session)?.profile().await?;
            match output_format {
                OutputFormat::Json => output_json(&profile),
                OutputFormat::Text => {
                    println!("{}", profile.name.as_deref().unwrap_or(&profile.id));
                    println!("Email: {}", profile.email);
                    if let Some(provider) = &profile.provider {
                        println!("Provider: {}", provider);
                    }
                    println!("Notes: {}", profile.notes_count);
                    Ok(())
                }
            }
        }
    }
}

fn login_error(e: ClientError) -> anyhow::Error {
    match e.status() {
        Some(401) => anyhow::anyhow!("Token was rejected by the server"),
        _ => anyhow::anyhow!("Login failed: {}", e),
    }
}
