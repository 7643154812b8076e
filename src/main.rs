mod commands;
mod render;

use agendafs_core::{AgendaFs, AgendaFsConfig, ConfigOverrides};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "agendafs")]
#[command(about = "Browse and edit a directory of journal records as a file tree")]
struct Cli {
    /// Directory of .ics records (overrides the config file)
    #[arg(long, global = true)]
    vdir: Option<String>,

    /// Extension for records that do not carry one
    #[arg(long = "ext", global = true)]
    default_extension: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole tree
    Tree {
        #[arg(default_value = "/")]
        path: String,
    },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    Stat {
        path: String,
    },
    /// Print the content of a file
    Cat {
        path: String,
    },
    /// Write stdin into a file, creating it if needed
    Write {
        path: String,

        /// Byte offset to start writing at
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Drop existing content first
        #[arg(long)]
        truncate: bool,
    },
    Mkdir {
        path: String,
    },
    Touch {
        path: String,
    },
    Mv {
        old: String,
        new: String,
    },
    Rm {
        path: String,
    },
    Rmdir {
        path: String,
    },
    /// Inspect or change record attributes
    Attr {
        #[command(subcommand)]
        action: AttrAction,
    },
    /// Keep running and log changes made to the vdir by other tools
    Watch,
}

#[derive(Subcommand)]
enum AttrAction {
    List {
        path: String,
    },
    Get {
        path: String,
        name: String,
    },
    Set {
        path: String,
        name: String,
        value: String,
    },
    Rm {
        path: String,
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("AGENDAFS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let overrides = ConfigOverrides {
        vdir: cli.vdir,
        default_extension: cli.default_extension,
    };
    let config = AgendaFsConfig::load(&overrides).context("Failed to load configuration")?;
    let fs = AgendaFs::from_config(&config)
        .with_context(|| format!("Failed to read vdir {}", config.vdir_path().display()))?;

    match cli.command {
        Commands::Tree { path } => commands::tree::run(&fs, &path),
        Commands::Ls { path } => commands::tree::ls(&fs, &path),
        Commands::Stat { path } => commands::file::stat(&fs, &path),
        Commands::Cat { path } => commands::file::cat(&fs, &path),
        Commands::Write {
            path,
            offset,
            truncate,
        } => commands::file::write(&fs, &path, offset, truncate),
        Commands::Mkdir { path } => commands::file::mkdir(&fs, &path),
        Commands::Touch { path } => commands::file::touch(&fs, &path),
        Commands::Mv { old, new } => commands::file::mv(&fs, &old, &new),
        Commands::Rm { path } => commands::file::rm(&fs, &path),
        Commands::Rmdir { path } => commands::file::rmdir(&fs, &path),
        Commands::Attr { action } => match action {
            AttrAction::List { path } => commands::attr::list(&fs, &path),
            AttrAction::Get { path, name } => commands::attr::get(&fs, &path, &name),
            AttrAction::Set { path, name, value } => {
                commands::attr::set(&fs, &path, &name, &value)
            }
            AttrAction::Rm { path, name } => commands::attr::rm(&fs, &path, &name),
        },
        Commands::Watch => commands::watch::run(fs),
    }
}
