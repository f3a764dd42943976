//! Keel CLI - a build orchestrator for monorepos

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use keel::build::build_graph::BuildGraphError;
use keel::core::errors::ConfigError;
use keel::core::label::LabelError;
use keel::util::diagnostic::{emit, suggestions, Diagnostic};
use keel::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        emit(&to_diagnostic(&e), color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // KEEL_LOG overrides the default filter
    let default_filter = if cli.verbose { "keel=debug" } else { "keel=info" };
    let filter = EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);

    match cli.command {
        Commands::Build(args) => commands::build::execute(&ctx, args),
        Commands::Run(args) => commands::run::execute(&ctx, args),
        Commands::Test(args) => commands::test::execute(&ctx, args),
        Commands::List(args) => commands::list::execute(&ctx, args),
        Commands::Affected(args) => commands::affected::execute(&ctx, args),
        Commands::Fix(args) => commands::fix::execute(&ctx, args),
        Commands::Deps(args) => commands::deps::execute(&ctx, args),
        Commands::Graph(args) => commands::graph::execute(&ctx, args),
        Commands::Deploy(args) => commands::deploy::execute(&ctx, args),
        Commands::Init(args) => commands::init::execute(&ctx, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn to_diagnostic(err: &anyhow::Error) -> Diagnostic {
    if let Some(config) = err.downcast_ref::<ConfigError>() {
        return config.to_diagnostic();
    }
    match err.downcast_ref::<BuildGraphError>() {
        Some(BuildGraphError::Config(config)) => return config.to_diagnostic(),
        Some(cycle @ BuildGraphError::Cycle { .. }) => {
            return Diagnostic::error(cycle.to_string()).with_suggestion(suggestions::CYCLE)
        }
        _ => {}
    }
    if let Some(label) = err.downcast_ref::<LabelError>() {
        return Diagnostic::error(label.to_string());
    }
    Diagnostic::error(format!("{:#}", err))
}
