use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use crate::cli::config::{load_server_config, save_server_config, ServerInfo, ServerStatus};
use crate::cli::utils::{output_json, output_success};
use crate::cli::OutputFormat;
use crate::client::{NotesClient, StaticToken};

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Set the API server URL")]
    Set {
        #[arg(help = "Server URL, e.g. http://localhost:5000")]
        url: String,
    },

    #[command(about = "Show the configured server")]
    Show,

    #[command(about = "Health check the configured server")]
    Ping,
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Set { url } => {
            url::Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid server URL '{}': {}", url, e))?;

            let mut config = load_server_config()?;
            config.server = Some(ServerInfo::new(url.trim_end_matches('/').to_string()));
            save_server_config(&config)?;

            output_success(
                &output_format,
                &format!("Server set to {}", config.url()),
                Some(json!({ "url": config.url() })),
            )
        }
        ServerCommands::Show => {
            let config = load_server_config()?;
            match output_format {
                OutputFormat::Json => output_json(&json!({
                    "url": config.url(),
                    "server": config.server,
                })),
                OutputFormat::Text => {
                    println!("Server: {}", config.url());
                    if let Some(server) = &config.server {
                        println!("Status: {:?}", server.status);
                        if let Some(last_ping) = server.last_ping {
                            println!("Last ping: {}", last_ping.to_rfc3339());
                        }
                    } else {
                        println!("(default, not configured)");
                    }
                    Ok(())
                }
            }
        }
        ServerCommands::Ping => {
            let mut config = load_server_config()?;
            let client = NotesClient::new(config.url(), Arc::new(StaticToken::default()))?;

            let result = client.health().await;
            let status = if result.is_ok() {
                ServerStatus::Up
            } else {
                ServerStatus::Down
            };

            if let Some(server) = config.server.as_mut() {
                server.update_ping(status);
                save_server_config(&config)?;
            }

            match result {
                Ok(health) => output_success(
                    &output_format,
                    &format!("{} is up", config.url()),
                    Some(json!({ "status": health.status, "timestamp": health.timestamp })),
                ),
                Err(e) => Err(anyhow::anyhow!("{} is down: {}", config.url(), e)),
            }
        }
    }
}
