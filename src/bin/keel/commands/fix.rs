//! `keel fix` command

use anyhow::{bail, Result};

use crate::cli::FixArgs;
use keel::ops::keel_fix::{fix, FixOptions};
use keel::util::config::MessageFormat;
use keel::util::diagnostic::suggestions;
use keel::util::shell::Status;
use keel::GlobalContext;

pub fn execute(ctx: &GlobalContext, args: FixArgs) -> Result<()> {
    let ws = ctx.workspace()?;
    let shell = super::shell(ctx, MessageFormat::Human);

    let report = fix(&ws, &FixOptions { check: args.check })?;

    for drift in &report.drift {
        let status = if report.written {
            Status::Updated
        } else {
            Status::Warning
        };
        shell.status(status, &drift.project);
        for (name, kind) in drift.added() {
            shell.note(format!("  + {} = \"{}\"", name, kind));
        }
        for name in drift.removed() {
            shell.note(format!("  - {}", name));
        }
    }

    if args.check && !report.is_clean() {
        bail!(
            "{} of {} projects have stale dependencies\n{}",
            report.drift.len(),
            report.checked,
            suggestions::STALE_DEPS
        );
    }

    let updated = if report.written { report.drift.len() } else { 0 };
    shell.status(
        Status::Finished,
        format!("checked {} projects, {} updated", report.checked, updated),
    );
    Ok(())
}
