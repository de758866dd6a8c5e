use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
}

#[derive(Parser)]
#[command(name = "dctx")]
#[command(
    about = "Pack a codebase into a single Markdown context document for LLMs"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan, filter and read a project into a Markdown context file
    Pack(PackArgs),

    /// Display the filtered project tree
    Tree(TreeArgs),

    /// Initialize a deepctx.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output file path (default from config: codebase_context.md)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of ingest workers (default: available CPUs)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Additional ignore patterns (gitignore syntax)
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Project ignore file name, relative to the root
    #[arg(long)]
    pub ignore_file: Option<String>,

    /// Files larger than this many bytes keep only their tail
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Number of lines kept from an oversized file
    #[arg(long)]
    pub tail_lines: Option<usize>,

    /// Print run statistics as JSON to stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct TreeArgs {
    /// Root directory to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Additional ignore patterns (gitignore syntax)
    #[arg(short, long)]
    pub ignore: Vec<String>,

    /// Project ignore file name, relative to the root
    #[arg(long)]
    pub ignore_file: Option<String>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

impl Cli {
    /// Global flags as a context passed to every command
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}
