//! `keel build` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use keel::ops::keel_build::{build, BuildOptions, BuildResult};
use keel::util::diagnostic::suggestions;
use keel::util::shell::{Shell, Status};
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: BuildArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let config = ctx.config(&ws);

    // CLI > config > default
    let format = args.message_format.unwrap_or_else(|| config.message_format());
    let shell = super::shell(ctx, format);

    let labels = super::resolve_labels(ctx, &ws, &args.targets)?;
    for label in &labels {
        shell.status(Status::Building, label);
    }

    let opts = BuildOptions {
        jobs: args.jobs.filter(|&jobs| jobs > 0).or(config.jobs()),
        fail_fast: args.fail_fast || config.fail_fast(),
        progress: !shell.is_json() && !ctx.is_verbose(),
    };

    let result = super::runtime()?.block_on(build(Arc::clone(&ws), &labels, &opts))?;
    report(&shell, &result);

    if !result.is_success() {
        if shell.is_json() {
            bail!("build failed");
        }
        bail!("build failed\n{}", suggestions::BUILD_FAILED);
    }
    Ok(())
}

/// Print the outcome of a build. Shared by the commands that build first.
pub(super) fn report(shell: &Shell, result: &BuildResult) {
    if shell.is_json() {
        for event in &result.events {
            shell.json_event(event);
        }
        return;
    }

    for failure in &result.step_failures {
        shell.error(format!("{} failed: {}", failure.label, failure.message));
    }
    for label in &result.skipped_steps {
        shell.status(Status::Skipped, format!("{} (a dependency failed)", label));
    }
    for failure in &result.action_failures {
        shell.error(format!("{} failed: {}", failure.mnemonic, failure.message));
    }
    if !result.skipped_actions.is_empty() {
        shell.status(
            Status::Skipped,
            format!("{} actions", result.skipped_actions.len()),
        );
    }
    for path in &result.missing_outputs {
        shell.warn(format!("{} was not produced", path.display()));
    }

    if result.is_success() {
        shell.status(
            Status::Finished,
            format!(
                "{} actions, {} outputs",
                result.actions_run,
                result.outputs.len()
            ),
        );
    }
}
