mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "studymate-cli", about = "Track topics, quiz yourself, review on schedule", version)]
struct Cli {
    /// Data directory (default: <local data dir>/studymate)
    #[arg(long, global = true, env = "STUDYMATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Never call the model; use the local heuristics
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Add study material as a new topic and extract its knowledge points
    Add {
        /// Topic title
        title: String,
        /// Material text (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
        /// Create the topic without extracting knowledge points
        #[arg(long)]
        no_extract: bool,
    },

    /// List topics
    Topics,

    /// Show a topic and its knowledge points
    Show {
        /// Topic title (case-insensitive prefix match)
        topic: String,
    },

    /// Edit or delete topics
    #[command(subcommand)]
    Topic(TopicCommand),

    /// Add, edit or delete knowledge points
    #[command(subcommand)]
    Point(PointCommand),

    /// List knowledge points due for review
    Due,

    /// Practice a knowledge point: answer a question and get graded
    Quiz {
        /// Knowledge point id or id prefix (default: the most overdue point)
        point: Option<String>,
        /// Answer non-interactively
        #[arg(long)]
        answer: Option<String>,
    },

    /// Learning statistics
    Stats,

    /// Write the whole document as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace the whole document from a JSON export
    Import {
        /// Export file
        file: PathBuf,
    },

    /// Delete all topics, points and practices
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show recent model calls
    Log {
        /// Number of entries
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Push the document to the remote table now
    Sync,

    /// AI provider and sync settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum TopicCommand {
    /// Change a topic's title or material
    Edit {
        topic: String,
        #[arg(long)]
        title: Option<String>,
        /// New material (use "-" to read from stdin)
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a topic with its knowledge points and practices
    Rm { topic: String },
}

#[derive(Subcommand)]
enum PointCommand {
    /// Add a knowledge point to a topic
    Add {
        topic: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Change a knowledge point's title or description
    Edit {
        /// Knowledge point id or id prefix
        point: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a knowledge point with its practices
    Rm { point: String },

    /// Show practice history of a knowledge point
    History { point: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current settings (secrets masked)
    Show,

    /// Configure the AI provider
    SetAi {
        /// openai, deepseek, moonshot, qwen or anthropic
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },

    /// Configure remote table sync
    SetSync {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long)]
        app_secret: Option<String>,
        #[arg(long)]
        app_token: Option<String>,
        #[arg(long)]
        table_id: Option<String>,
        /// Quiet period in seconds before a push
        #[arg(long)]
        delay: Option<u64>,
    },
}

/// Read content from stdin if piped, or resolve "-" as stdin
fn resolve_content(content: Option<String>) -> Option<String> {
    let read_stdin = || {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf).ok();
        buf
    };

    match content.as_deref() {
        Some("-") => Some(read_stdin()),
        Some(_) => content,
        None if !std::io::stdin().is_terminal() => {
            let buf = read_stdin();
            if buf.is_empty() { None } else { Some(buf) }
        }
        None => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let format = cli.format;

    let app = app::App::new(cli.data_dir, cli.offline)?;

    let result = match cli.command {
        Command::Add { title, content, no_extract } => {
            let content = resolve_content(content).unwrap_or_default();
            commands::add::run(&app, &title, &content, no_extract, &format, use_color).await
        }
        Command::Topics => commands::topics::run_list(&app, &format, use_color),
        Command::Show { topic } => commands::topics::run_show(&app, &topic, &format, use_color),
        Command::Topic(TopicCommand::Edit { topic, title, content }) => {
            let content = resolve_content(content);
            commands::topics::run_edit(&app, &topic, title, content, &format)
        }
        Command::Topic(TopicCommand::Rm { topic }) => {
            commands::topics::run_delete(&app, &topic, &format)
        }
        Command::Point(PointCommand::Add { topic, title, description }) => {
            commands::points::run_add(&app, &topic, &title, &description, &format)
        }
        Command::Point(PointCommand::Edit { point, title, description }) => {
            commands::points::run_edit(&app, &point, title, description, &format)
        }
        Command::Point(PointCommand::Rm { point }) => {
            commands::points::run_delete(&app, &point, &format)
        }
        Command::Point(PointCommand::History { point }) => {
            commands::points::run_history(&app, &point, &format, use_color)
        }
        Command::Due => commands::due::run(&app, &format, use_color),
        Command::Quiz { point, answer } => {
            commands::quiz::run(&app, point.as_deref(), answer, &format, use_color).await
        }
        Command::Stats => commands::stats::run(&app, &format, use_color),
        Command::Export { output } => commands::backup::run_export(&app, output.as_deref()),
        Command::Import { file } => commands::backup::run_import(&app, &file, &format),
        Command::Reset { yes } => commands::backup::run_reset(&app, yes),
        Command::Log { limit } => commands::log::run(&app, limit, &format, use_color),
        Command::Sync => commands::sync::run(&app, &format).await,
        Command::Config(ConfigCommand::Show) => commands::config::run_show(&app, &format),
        Command::Config(ConfigCommand::SetAi { provider, api_key, base_url, model }) => {
            commands::config::run_set_ai(&app, provider, api_key, base_url, model)
        }
        Command::Config(ConfigCommand::SetSync {
            enabled,
            app_id,
            app_secret,
            app_token,
            table_id,
            delay,
        }) => commands::config::run_set_sync(
            &app,
            commands::config::SyncSettings {
                enabled,
                app_id,
                app_secret,
                app_token,
                table_id,
                delay_secs: delay,
            },
        ),
    };

    // Pending sync pushes go out before exit, even after a failed command
    app.finish().await;
    result
}
