//! `keel graph` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::GraphArgs;
use keel::ops::graph::{render_graph, GraphKind};
use keel::util::config::MessageFormat;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: GraphArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let labels = super::resolve_labels(ctx, &ws, &args.targets)?;
    let kind = if args.actions {
        GraphKind::Actions
    } else {
        GraphKind::Build
    };

    let dot = super::runtime()?.block_on(render_graph(Arc::clone(&ws), &labels, kind))?;
    shell.print(dot.trim_end());

    Ok(())
}
