//! `keel init` command

use anyhow::Result;

use crate::cli::InitArgs;
use keel::ops::init_workspace;
use keel::util::config::MessageFormat;
use keel::util::fs;
use keel::util::shell::Status;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: InitArgs) -> Result<()> {
    let shell = super::shell(ctx, MessageFormat::Human);

    let path = match args.path {
        Some(path) => ctx.resolve_path(&path),
        None => ctx.cwd().to_path_buf(),
    };
    fs::ensure_dir(&path)?;

    let config_file = init_workspace(&path)?;
    shell.status(Status::Created, format!("workspace at {}", config_file.display()));

    Ok(())
}
