use serde_json::{json, Value};
use std::sync::Arc;

use crate::cli::config::{get_config_dir, load_server_config};
use crate::cli::OutputFormat;
use crate::client::{NotesClient, SessionStore, StaticToken};

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output a value as pretty JSON
pub fn output_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(&json!({ collection_name: [] })),
        OutputFormat::Text => {
            println!("{}", message);
            Ok(())
        }
    }
}

pub fn open_session() -> anyhow::Result<SessionStore> {
    Ok(SessionStore::open(&get_config_dir()?)?)
}

/// Client for the configured server, authorized with the session token.
pub fn session_client(session: &SessionStore) -> anyhow::Result<NotesClient> {
    let server = load_server_config()?;
    let token = StaticToken(session.token().map(str::to_string));
    Ok(NotesClient::new(server.url(), Arc::new(token))?)
}
