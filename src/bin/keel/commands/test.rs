//! `keel test` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::TestArgs;
use keel::ops::keel_build::BuildOptions;
use keel::ops::keel_test::{test, test_projects};
use keel::util::config::MessageFormat;
use keel::util::diagnostic::suggestions;
use keel::util::shell::Status;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: TestArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let config = ctx.config(&ws);
    let shell = super::shell(ctx, MessageFormat::Human);

    let only = super::resolve_labels(ctx, &ws, &args.targets)?;
    for label in test_projects(&ws, &only)? {
        shell.status(Status::Testing, label);
    }

    let opts = BuildOptions {
        jobs: args.jobs.filter(|&jobs| jobs > 0).or(config.jobs()),
        fail_fast: args.fail_fast || config.fail_fast(),
        progress: !ctx.is_verbose(),
    };

    let report = super::runtime()?.block_on(test(Arc::clone(&ws), &only, &opts))?;
    if !report.build.is_success() {
        super::build::report(&shell, &report.build);
        bail!("build failed\n{}", suggestions::BUILD_FAILED);
    }

    for label in &report.passed {
        shell.status(Status::Passed, label);
    }
    for failure in &report.failed {
        shell.error(format!("{} failed: {}", failure.label, failure.message));
    }
    if !report.is_success() {
        bail!("{} of {} test projects failed", report.failed.len(), report.failed.len() + report.passed.len());
    }
    shell.status(Status::Finished, format!("{} test projects passed", report.passed.len()));
    Ok(())
}
