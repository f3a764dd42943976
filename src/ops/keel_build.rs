//! Implementation of `keel build`.
//!
//! 1. assemble the build graph for the requested labels (cycles rejected)
//! 2. execute it, collecting providers and the action graph
//! 3. reduce the action graph to what the requested outputs need
//! 4. schedule those actions
//! 5. check every requested output exists

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::action::ActionId;
use crate::build::build_graph::{assemble, BuildGraphError};
use crate::build::events::{BuildEvent, EventLog, LoggedEvent};
use crate::build::execution::ExecutionGraph;
use crate::build::executor::{execute, StepFailure};
use crate::build::file::File;
use crate::build::scheduler::{
    default_jobs, schedule, ActionFailure, BuildProgress, FailurePolicy, ScheduleOptions,
};
use crate::core::label::Label;
use crate::core::provider::DefaultInfo;
use crate::core::workspace::Workspace;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Number of parallel actions (default: available CPUs)
    pub jobs: Option<usize>,

    /// Stop at the first failed action
    pub fail_fast: bool,

    /// Show a progress bar
    pub progress: bool,
}

#[derive(Debug, Default)]
pub struct BuildResult {
    /// Files the requested labels provide, sorted.
    pub outputs: Vec<PathBuf>,
    /// Requested outputs that do not exist after the build.
    pub missing_outputs: Vec<PathBuf>,
    /// Executables each requested label produces itself, upstream ones
    /// excluded.
    pub executables: BTreeMap<Label, Vec<PathBuf>>,
    pub step_failures: Vec<StepFailure>,
    pub skipped_steps: Vec<Label>,
    pub action_failures: Vec<ActionFailure>,
    pub skipped_actions: Vec<ActionId>,
    pub actions_run: usize,
    pub events: Vec<LoggedEvent>,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.step_failures.is_empty()
            && self.skipped_steps.is_empty()
            && self.action_failures.is_empty()
            && self.skipped_actions.is_empty()
            && self.missing_outputs.is_empty()
    }
}

/// Build `labels`.
///
/// Only graph assembly errors are returned as `Err`; everything that goes
/// wrong while building is reported in the [`BuildResult`].
pub async fn build(
    workspace: Arc<Workspace>,
    labels: &[Label],
    options: &BuildOptions,
) -> Result<BuildResult, BuildGraphError> {
    let graph = assemble(&workspace, labels)?;
    tracing::debug!("build graph has {} steps", graph.len());

    let events = EventLog::new();
    let executed = execute(Arc::clone(&workspace), &graph, &events).await;

    let outputs: Vec<PathBuf> = labels
        .iter()
        .flat_map(|label| DefaultInfo::files(executed.providers_of(label)))
        .map(|file| file.absolute_path())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let executables: BTreeMap<Label, Vec<PathBuf>> = labels
        .iter()
        .map(|label| {
            let own = Path::new(label.project());
            let paths = DefaultInfo::executables(executed.providers_of(label))
                .iter()
                .filter(|file| file.path().starts_with(own))
                .map(File::absolute_path)
                .collect();
            (*label, paths)
        })
        .collect();

    let execution = ExecutionGraph::reduce(&executed.actions, &outputs);
    tracing::debug!(
        "{} of {} actions needed for {} outputs",
        execution.len(),
        executed.actions.len(),
        outputs.len()
    );

    let progress = options
        .progress
        .then(|| BuildProgress::new(execution.len(), true));
    let schedule_options = ScheduleOptions {
        jobs: options.jobs.unwrap_or_else(default_jobs),
        policy: if options.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        },
        progress: progress.clone(),
    };
    let report = schedule(&execution, &schedule_options, &events).await;
    if let Some(progress) = progress {
        progress.finish();
    }

    let missing_outputs: Vec<PathBuf> = outputs
        .iter()
        .filter(|path| !path.exists())
        .cloned()
        .collect();
    for path in &missing_outputs {
        tracing::warn!("expected output {} was not produced", path.display());
    }

    let mut result = BuildResult {
        outputs,
        missing_outputs,
        executables,
        step_failures: executed.failures,
        skipped_steps: executed.skipped,
        action_failures: report.failed,
        skipped_actions: report.skipped,
        actions_run: report.completed.len(),
        events: Vec::new(),
    };
    events.push(BuildEvent::finished(
        result.is_success(),
        events.elapsed_ms(),
        result.actions_run,
    ));
    result.events = events.into_entries();
    Ok(result)
}
