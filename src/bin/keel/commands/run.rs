//! `keel run` command

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::RunArgs;
use keel::ops::keel_build::BuildOptions;
use keel::ops::keel_run::run;
use keel::ops::resolve_target;
use keel::util::config::MessageFormat;
use keel::util::diagnostic::suggestions;
use keel::util::shell::Status;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: RunArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let config = ctx.config(&ws);
    let shell = super::shell(ctx, MessageFormat::Human);

    let label = resolve_target(&ws, &args.target, ctx.cwd())?;
    shell.status(Status::Building, label);

    let opts = BuildOptions {
        jobs: args.jobs.filter(|&jobs| jobs > 0).or(config.jobs()),
        fail_fast: config.fail_fast(),
        progress: !ctx.is_verbose(),
    };

    let result = super::runtime()?.block_on(run(Arc::clone(&ws), label, &args.args, ctx.cwd(), &opts))?;
    if !result.is_success() {
        super::build::report(&shell, &result);
        bail!("build failed\n{}", suggestions::BUILD_FAILED);
    }
    Ok(())
}
