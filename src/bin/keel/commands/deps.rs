//! `keel deps` command
//!
//! Prints the `[deps]` table extraction would write, without writing it.

use anyhow::{bail, Result};

use crate::cli::DepsArgs;
use keel::ops::keel_fix::extracted_dependencies;
use keel::util::config::MessageFormat;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: DepsArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let label = keel::ops::resolve_target(&ws, &args.project, ctx.cwd())?;
    let project = ws.load_project(label.project())?;

    let Some(deps) = extracted_dependencies(&ws, &project)? else {
        bail!(
            "the builder of `{}` does not support dependency extraction",
            project.name
        );
    };
    for (name, kind) in deps.to_map() {
        shell.print(format!("\"{}\" = \"{}\"", name, kind.as_str()));
    }

    Ok(())
}
