//! `topicnote` command-line front end.
//!
//! Every subcommand maps onto one [`ApiRequest`] and prints the JSON payload
//! on stdout. Failures print an error envelope on stderr and exit with a code
//! derived from the error class.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use topicnote_core::{
    core_version, init_logging, open_db, ApiError, ApiErrorClass, ApiRequest, CoreConfig,
    TopicNoteApi,
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "topicnote", about = "Hierarchical topics and notes", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database file (overrides TOPICNOTE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true, env = "TOPICNOTE_USER", default_value = "")]
    user: String,

    /// Log level (overrides TOPICNOTE_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute log directory (overrides TOPICNOTE_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List root topics with their subtrees
    Roots {
        /// Subtopic levels to expand below each root
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Show one topic with its subtree
    Topic {
        topic_id: Uuid,

        /// Subtopic levels to expand below the topic
        #[arg(long)]
        depth: Option<usize>,
    },

    /// List direct subtopics
    Subtopics { topic_id: Uuid },

    /// Show the path from the root down to a topic
    Breadcrumbs { topic_id: Uuid },

    /// Create a topic
    CreateTopic {
        name: String,

        /// Parent topic; omit for a root topic
        #[arg(long)]
        parent: Option<Uuid>,
    },

    /// Rename a topic
    RenameTopic { topic_id: Uuid, name: String },

    /// Move a topic under another parent
    MoveTopic {
        topic_id: Uuid,

        /// New parent topic; omit to move to root level
        #[arg(long)]
        parent: Option<Uuid>,
    },

    /// Delete a topic with its subtopics and notes
    DeleteTopic { topic_id: Uuid },

    /// Search topics by name
    Search { query: Option<String> },

    /// Create a note
    CreateNote {
        topic_id: Uuid,
        name: String,

        /// Document body as JSON
        #[arg(long)]
        body: Option<String>,
    },

    /// Replace name, body and topic of a note
    UpdateNote {
        note_id: Uuid,
        topic_id: Uuid,
        name: String,

        /// Document body as JSON
        #[arg(long)]
        body: Option<String>,
    },

    /// List notes of a topic
    Notes { topic_id: Uuid },

    /// Show one note
    Note { note_id: Uuid },

    /// Delete a note
    DeleteNote { note_id: Uuid },

    /// Print the core version
    Version,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("{}", core_version());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = CoreConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(dir) = cli.log_dir {
        config.log_dir = Some(dir);
    }
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir).context("failed to initialize logging")?;
    }

    let request = to_request(cli.command)?;
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    let api = TopicNoteApi::new(&conn);

    match api.handle(&cli.user, request) {
        Ok(payload) => {
            info!("event=cli_request module=cli status=ok");
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(
                "event=cli_request module=cli status=error error_class={:?}",
                err.class
            );
            eprintln!("{}", serde_json::to_string_pretty(&err)?);
            Ok(exit_code(&err))
        }
    }
}

fn to_request(command: Commands) -> Result<ApiRequest> {
    let request = match command {
        Commands::Roots { depth } => ApiRequest::RootTopics { max_depth: depth },
        Commands::Topic { topic_id, depth } => ApiRequest::Topic {
            topic_id,
            max_depth: depth,
        },
        Commands::Subtopics { topic_id } => ApiRequest::Subtopics { topic_id },
        Commands::Breadcrumbs { topic_id } => ApiRequest::Breadcrumbs { topic_id },
        Commands::CreateTopic { name, parent } => ApiRequest::CreateTopic {
            name,
            parent_id: parent,
        },
        Commands::RenameTopic { topic_id, name } => ApiRequest::RenameTopic { topic_id, name },
        Commands::MoveTopic { topic_id, parent } => ApiRequest::MoveTopic {
            topic_id,
            parent_id: parent,
        },
        Commands::DeleteTopic { topic_id } => ApiRequest::DeleteTopic { topic_id },
        Commands::Search { query } => ApiRequest::SearchTopics { query },
        Commands::CreateNote {
            topic_id,
            name,
            body,
        } => ApiRequest::CreateNote {
            name,
            body: parse_body(body.as_deref())?,
            topic_id,
        },
        Commands::UpdateNote {
            note_id,
            topic_id,
            name,
            body,
        } => ApiRequest::UpdateNote {
            note_id,
            name,
            body: parse_body(body.as_deref())?,
            topic_id,
        },
        Commands::Notes { topic_id } => ApiRequest::NotesByTopic { topic_id },
        Commands::Note { note_id } => ApiRequest::Note { note_id },
        Commands::DeleteNote { note_id } => ApiRequest::DeleteNote { note_id },
        Commands::Version => anyhow::bail!("version has no request form"),
    };
    Ok(request)
}

/// Missing body means an empty document.
fn parse_body(raw: Option<&str>) -> Result<Value> {
    match raw {
        Some(text) => serde_json::from_str(text).context("--body must be valid JSON"),
        None => Ok(json!({"type": "doc", "content": []})),
    }
}

fn exit_code(err: &ApiError) -> ExitCode {
    match err.class {
        ApiErrorClass::BadRequest => ExitCode::from(2),
        ApiErrorClass::NotFound => ExitCode::from(3),
        ApiErrorClass::Internal => ExitCode::from(1),
    }
}
