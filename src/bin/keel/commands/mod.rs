//! Command implementations

use anyhow::{Context, Result};

use keel::core::label::Label;
use keel::core::workspace::Workspace;
use keel::ops::resolve_target;
use keel::util::config::MessageFormat;
use keel::util::shell::{ColorChoice, Shell, Verbosity};
use keel::GlobalContext;

pub mod affected;
pub mod build;
pub mod completions;
pub mod deploy;
pub mod deps;
pub mod fix;
pub mod graph;
pub mod init;
pub mod list;
pub mod run;
pub mod test;

/// Runtime for commands that drive the build graph.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")
}

fn shell(ctx: &GlobalContext, format: MessageFormat) -> Shell {
    let verbosity = if ctx.is_verbose() {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let color = if ctx.color() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    Shell::new(format, verbosity, color)
}

/// Resolve every command line value to a label, relative to the cwd.
fn resolve_labels(ctx: &GlobalContext, ws: &Workspace, values: &[String]) -> Result<Vec<Label>> {
    let mut labels = Vec::with_capacity(values.len());
    for value in values {
        let label = resolve_target(ws, value, ctx.cwd())?;
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    Ok(labels)
}
