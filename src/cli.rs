use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "tidysweep",
    about = "A cleanup tool - move old and junk files to a backup folder, the trash, or delete them",
    version
)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TIDYSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Which files to look at.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Preset to start from (see `tidysweep presets`)
    #[arg(long, default_value = "custom")]
    pub preset: String,

    /// Directory to scan. Repeat for several roots.
    #[arg(long = "path")]
    pub paths: Vec<PathBuf>,

    /// Junk suffixes, replacing the preset's (e.g. ".tmp,.log")
    #[arg(long, value_delimiter = ',')]
    pub junk: Vec<String>,

    /// Suffixes that are never disposed of (e.g. ".pdf,.docx")
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Minimum age since last modification (e.g. "30d", "12h")
    #[arg(long)]
    pub min_age: Option<String>,

    /// Minimum file size (e.g. "1KB", "10MB")
    #[arg(long)]
    pub min_size: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    Delete,
    Trash,
    Backup,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreDisposalArg {
    Never,
    Copy,
    Compress,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionArg {
    Fail,
    Rename,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// What to do with junk files
    #[arg(long, value_enum, default_value_t = ActionArg::Backup)]
    pub action: ActionArg,

    /// Backup folder (defaults to the configured one)
    #[arg(long)]
    pub backup: Option<PathBuf>,

    /// Trash folder (defaults to the configured one)
    #[arg(long)]
    pub trash: Option<PathBuf>,

    /// Copy or compress each file into the backup folder first
    #[arg(long, value_enum, default_value_t = PreDisposalArg::Never)]
    pub pre_disposal: PreDisposalArg,

    /// Ask for every file whether to run the --pre-disposal step
    #[arg(long)]
    pub ask: bool,

    /// What to do when the destination already has a file of that name
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionArg>,

    /// Remove directories left empty afterwards
    #[arg(long)]
    pub prune: bool,

    /// Actually dispose of files. Without this flag, behaves like scan.
    #[arg(long)]
    pub confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List junk files (dry-run, nothing is touched)
    Scan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Dispose of junk files (requires --confirm)
    Clean(CleanArgs),

    /// Remove empty directories (requires --confirm)
    Prune {
        /// Directory to prune
        #[arg(long)]
        path: PathBuf,

        /// Directory names to leave alone, comma-separated (e.g. ".git,node_modules")
        #[arg(long, value_delimiter = ',')]
        skip: Vec<String>,

        #[arg(long)]
        confirm: bool,
    },

    /// List files in the backup folder
    Backups {
        #[arg(long)]
        backup: Option<PathBuf>,
    },

    /// Move files from the backup folder back
    Restore {
        /// File names as listed by `tidysweep backups`
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(long)]
        backup: Option<PathBuf>,

        /// Where to restore to (defaults to the downloads folder)
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Show the history of completed cleans
    Report {
        /// Also write the history as CSV to this file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Clean periodically
    Schedule {
        /// Interval between runs (e.g. "24h", "7d")
        #[arg(long, default_value = "24h")]
        every: String,

        /// Stop after this many runs
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        runs: Option<usize>,

        #[command(flatten)]
        clean: CleanArgs,
    },

    /// List available presets
    Presets,

    /// Inspect or change the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Set the backup folder
    SetBackup { dir: PathBuf },
}
