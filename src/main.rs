use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jotter::config::Config;
use jotter::error::Result;
use jotter::output::Format;
use jotter::store::live::NoteStore;
use jotter::store::repository::NoteRepository;

#[derive(Parser)]
#[command(name = "jotter", version, about = "Small local note keeper")]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: Format,
    /// Data directory holding notes.db and logs (default: $JOTTER_HOME, then XDG data dir)
    #[arg(long, global = true)]
    home: Option<PathBuf>,
    /// Log level: trace, debug, info, warn, error (default: $JOTTER_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive note list (default)
    Tui,
    /// Create a note
    #[command(visible_alias = "create")]
    Add {
        /// Note title
        title: Option<String>,
        /// Note description
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Edit a note's title and/or description
    Edit {
        /// Note ID
        id: i64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: i64,
    },
    /// List all notes, newest first
    List,
    /// Show a single note
    Show {
        /// Note ID
        id: i64,
    },
}

fn run(cli: Cli, format: Format) -> Result<()> {
    let config = Config::resolve(cli.home, cli.log_level)?;
    config.ensure_home()?;
    jotter::logging::init_logging(&config.log_level, &config.log_dir())?;

    let store = NoteStore::open(&config.db_path())?;
    let repo = NoteRepository::new(store.handle());

    let result = match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => jotter::commands::tui::run(&repo),
        Commands::Add { title, description } => {
            jotter::commands::create::run(&repo, title, description, format)
        }
        Commands::Edit {
            id,
            title,
            description,
        } => jotter::commands::edit::run(&repo, id, title, description, format),
        Commands::Delete { id } => jotter::commands::delete::run(&repo, id, format),
        Commands::List => jotter::commands::list::run(&repo, format),
        Commands::Show { id } => jotter::commands::show::run(&repo, id, format),
    };

    store.close();
    result
}

fn main() {
    let cli = Cli::parse();
    let format = cli.format;
    if let Err(e) = run(cli, format) {
        log::error!("event=command_failed module=cli code={} error={}", e.code(), e);
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            _ => eprintln!("error: {e}"),
        }
        log::logger().flush();
        std::process::exit(1);
    }
}
