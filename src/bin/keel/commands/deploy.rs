//! `keel deploy` command

use anyhow::Result;

use crate::cli::DeployArgs;
use keel::ops::{deploy, resolve_target};
use keel::util::config::MessageFormat;
use keel::util::shell::Status;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: DeployArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let label = resolve_target(&ws, &args.target, ctx.cwd())?;
    shell.status(Status::Deploying, label);
    deploy(&ws, label)?;
    shell.status(Status::Finished, format!("deployed {}", label));

    Ok(())
}
