//! `keel list` command

use anyhow::Result;

use crate::cli::{ListArgs, ListWhat};
use keel::ops::list::{list, ListKind};
use keel::util::config::MessageFormat;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: ListArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let kind = match args.what {
        ListWhat::Projects => ListKind::Projects,
        ListWhat::Targets => ListKind::Targets,
    };
    for name in list(&ws, kind)? {
        shell.print(name);
    }

    Ok(())
}
