//! `keel affected` command

use anyhow::Result;

use crate::cli::AffectedArgs;
use keel::ops::affected;
use keel::util::config::MessageFormat;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: AffectedArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let files: Vec<_> = args.files.iter().map(|f| ctx.resolve_path(f)).collect();
    for name in affected(&ws, &files)? {
        shell.print(name);
    }

    Ok(())
}
