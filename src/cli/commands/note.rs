use clap::Subcommand;
use serde_json::json;
use std::io::Read;
use uuid::Uuid;

use crate::cli::utils::{
    open_session, output_empty_collection, output_json, output_success, session_client,
};
use crate::cli::OutputFormat;
use crate::client::collection::preview;
use crate::client::{NoteCollection, SortDirection, SortKey};

const PREVIEW_CHARS: usize = 120;

#[derive(Subcommand)]
pub enum NoteCommands {
    #[command(about = "List your notes")]
    List {
        #[arg(long, help = "Only notes whose title or text contains this")]
        search: Option<String>,
        #[arg(long, default_value = "created", help = "Sort by created, title or length")]
        sort: SortKey,
        #[arg(long, help = "Sort ascending instead of descending")]
        asc: bool,
    },

    #[command(about = "Create a note (content is read from stdin when omitted)")]
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: Option<String>,
    },

    #[command(about = "Update a note's title and/or content")]
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },

    #[command(about = "Permanently delete a note")]
    Delete { id: Uuid },
}

pub async fn handle(cmd: NoteCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut session = open_session()?;
    if !session.is_active() {
        anyhow::bail!("Not signed in. Run 'notes auth login --token <token>' first");
    }
    let client = session_client(&session)?;

    match cmd {
        NoteCommands::List { search, sort, asc } => {
            let notes = NoteCollection::new(client.list_notes().await?);
            if matches!(output_format, OutputFormat::Text)
                && session.first_time("notes", "loaded_shown")?
            {
                println!("✓ Notes loaded successfully");
            }

            let direction = if asc {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            let view = notes.view(search.as_deref().unwrap_or(""), sort, direction);

            if view.is_empty() {
                let message = if notes.is_empty() {
                    "No notes yet"
                } else {
                    "No notes match your search"
                };
                return output_empty_collection(&output_format, "notes", message);
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "notes": view })),
                OutputFormat::Text => {
                    println!("Your Notes ({})", view.len());
                    for note in view {
                        println!();
                        println!("{}  {}", note.id, note.title);
                        println!("  {}", note.created_at.format("%Y-%m-%d %H:%M"));
                        println!("  {}", preview(&note.content, PREVIEW_CHARS));
                    }
                    Ok(())
                }
            }
        }
        NoteCommands::Create { title, content } => {
            let content = match content {
                Some(content) => content,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                }
            };

            let note = client.create_note(&title, &content).await?;
            output_success(
                &output_format,
                &format!("Created note {}", note.id),
                Some(json!({ "note": note })),
            )
        }
        NoteCommands::Update { id, title, content } => {
            if title.is_none() && content.is_none() {
                anyhow::bail!("Nothing to update: pass --title and/or --content");
            }

            let note = client
                .update_note(id, title.as_deref(), content.as_deref())
                .await?;
            output_success(
                &output_format,
                &format!("Updated note {}", note.id),
                Some(json!({ "note": note })),
            )
        }
        NoteCommands::Delete { id } => {
            let message = client.delete_note(id).await?;
            output_success(&output_format, &message, Some(json!({ "id": id })))
        }
    }
}
