use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use stratum::playback::build_timeline;
use stratum::storage::{FileStore, ProjectCatalog};
use stratum::{
    encode, import_tab_with, normalize_tab, EditorConfig, MetadataField, StratumError, TabSheet,
};

#[derive(Parser)]
#[command(name = "stratum")]
#[command(version)]
#[command(about = "Guitar tablature editor core: ASCII tab import/export and project tools", long_about = None)]
struct Cli {
    /// YAML editor configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a blank project
    New {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        artist: Option<String>,

        /// Output file path (writes to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode ASCII tab into a project
    Import {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode a project as canonical ASCII tab
    Export {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite any ASCII tab in the canonical layout
    Normalize {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the playback timeline of a project as JSON
    Timeline { input: PathBuf },

    /// List projects saved in a directory
    Catalog {
        /// Project directory (defaults to the configured storage dir)
        dir: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::load_or_default(path),
        None => EditorConfig::default(),
    };

    if let Err(e) = run(cli.command, &config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands, config: &EditorConfig) -> Result<(), StratumError> {
    match command {
        Commands::New {
            title,
            artist,
            output,
        } => {
            let mut sheet = config.create_sheet();
            if let Some(title) = title {
                sheet = sheet.set_metadata(MetadataField::Title, &title);
            }
            if let Some(artist) = artist {
                sheet = sheet.set_metadata(MetadataField::Artist, &artist);
            }
            write_output(output.as_deref(), &serde_json::to_string_pretty(&sheet)?)
        }
        Commands::Import { input, output } => {
            let text = fs::read_to_string(&input)?;
            let sheet = import_tab_with(&text, config.decode_options())?;
            eprintln!("Imported {} rows from {}", sheet.rows.len(), input.display());
            write_output(output.as_deref(), &serde_json::to_string_pretty(&sheet)?)
        }
        Commands::Export { input, output } => {
            let sheet = read_project(&input)?;
            write_output(output.as_deref(), &encode(&sheet))
        }
        Commands::Normalize { input, output } => {
            let text = fs::read_to_string(&input)?;
            write_output(output.as_deref(), &normalize_tab(&text, config.decode_options())?)
        }
        Commands::Timeline { input } => {
            let sheet = read_project(&input)?;
            let data = build_timeline(&sheet, None);
            write_output(None, &serde_json::to_string_pretty(&data)?)
        }
        Commands::Catalog { dir } => {
            let dir = dir
                .or_else(|| config.storage_dir.clone())
                .ok_or_else(|| StratumError::Config("no project directory given".to_string()))?;
            let catalog = ProjectCatalog::new(FileStore::new(dir));
            for meta in catalog.list() {
                println!(
                    "{}  {}  {} - {}",
                    meta.id,
                    meta.last_modified.format("%Y-%m-%d %H:%M"),
                    meta.title,
                    meta.artist
                );
            }
            Ok(())
        }
    }
}

fn read_project(path: &Path) -> Result<TabSheet, StratumError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn write_output(path: Option<&Path>, content: &str) -> Result<(), StratumError> {
    match path {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
