//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use keel::util::config::MessageFormat;

/// Keel - a build orchestrator for monorepos
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build projects or targets
    Build(BuildArgs),

    /// Build a target and run its executable
    Run(RunArgs),

    /// Build every test project and run its executables
    Test(TestArgs),

    /// List projects or targets in the workspace
    List(ListArgs),

    /// List projects affected by changes to files
    Affected(AffectedArgs),

    /// Rewrite `[deps]` of every project from its source imports
    Fix(FixArgs),

    /// Show the dependencies extracted from a project's sources
    Deps(DepsArgs),

    /// Print the build graph in Graphviz dot format
    Graph(GraphArgs),

    /// Deploy a target
    Deploy(DeployArgs),

    /// Create a workspace
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Labels (`//apps/web`, `//apps/web:web`) or paths inside projects
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Number of parallel actions
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Stop scheduling after the first failed action
    #[arg(long)]
    pub fail_fast: bool,

    /// Output format for build events
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub message_format: Option<MessageFormat>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Label or path of the target to run
    pub target: String,

    /// Number of parallel actions
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Arguments passed to the executable
    #[arg(last = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct TestArgs {
    /// Only test these projects
    pub targets: Vec<String>,

    /// Number of parallel actions
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Stop scheduling after the first failed action
    #[arg(long)]
    pub fail_fast: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ListWhat {
    #[default]
    Projects,
    Targets,
}

#[derive(Args)]
pub struct ListArgs {
    /// What to list
    #[arg(value_enum, default_value_t = ListWhat::Projects)]
    pub what: ListWhat,
}

#[derive(Args)]
pub struct AffectedArgs {
    /// Changed files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct FixArgs {
    /// Only report projects with stale dependencies; fail if there are any
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct DepsArgs {
    /// Project name or path
    pub project: String,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Labels or paths to graph
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Graph the actions instead of the build steps
    #[arg(long)]
    pub actions: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Target label or path
    pub target: String,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
