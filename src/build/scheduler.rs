//! Execution graph scheduler.
//!
//! Runs actions concurrently, each one only after every action producing
//! one of its inputs has finished. The dispatcher seeds the ready queue with
//! actions that have no dependencies; whenever an action finishes, the
//! unfinished-dependency count of each dependent is decremented and those
//! reaching zero are queued. At most `jobs` actions run at once.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::{JoinHandle, JoinSet};

use crate::build::action::{Action, ActionId};
use crate::build::events::{BuildEvent, EventLog};
use crate::build::execution::ExecutionGraph;
use crate::util::fs::remove_path;

/// What to do when an action fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Skip everything depending on the failed action and keep running
    /// independent branches.
    #[default]
    Continue,
    /// Abort running actions and start nothing new.
    FailFast,
}

#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub jobs: usize,
    pub policy: FailurePolicy,
    pub progress: Option<BuildProgress>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        ScheduleOptions {
            jobs: default_jobs(),
            policy: FailurePolicy::default(),
            progress: None,
        }
    }
}

/// Number of available CPUs.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub id: ActionId,
    pub mnemonic: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ScheduleReport {
    /// Finished actions, in completion order.
    pub completed: Vec<ActionId>,
    pub failed: Vec<ActionFailure>,
    /// Actions that never ran or were aborted, ascending.
    pub skipped: Vec<ActionId>,
}

impl ScheduleReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<Result<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run every action of `graph`.
pub async fn schedule(graph: &ExecutionGraph, options: &ScheduleOptions, events: &EventLog) -> ScheduleReport {
    let jobs = options.jobs.max(1);
    let mut report = ScheduleReport::default();

    let mut remaining: HashMap<ActionId, usize> = graph
        .ids()
        .into_iter()
        .map(|id| (id, graph.dependencies(id).len()))
        .collect();
    let mut ready: VecDeque<ActionId> = graph
        .ids()
        .into_iter()
        .filter(|id| remaining.get(id) == Some(&0))
        .collect();

    let mut skipped: HashSet<ActionId> = HashSet::new();
    let mut running: HashSet<ActionId> = HashSet::new();
    let mut tasks: JoinSet<(ActionId, Result<()>)> = JoinSet::new();
    let mut aborting = false;

    loop {
        while !aborting && running.len() < jobs {
            let Some(id) = ready.pop_front() else {
                break;
            };
            let Some(action) = graph.action(id).cloned() else {
                continue;
            };
            events.push(BuildEvent::ActionStarted {
                id: id.0,
                mnemonic: action.mnemonic.clone(),
            });
            if let Some(ref progress) = options.progress {
                progress.started(&action.mnemonic);
            }
            tracing::debug!("starting action {} `{}`", id, action.mnemonic);
            running.insert(id);
            tasks.spawn(async move { (id, run_action(action).await) });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (id, result) = match joined {
            Ok(done) => done,
            // Only aborted tasks end up here; they are accounted for below.
            Err(_) => continue,
        };
        running.remove(&id);
        let Some(action) = graph.action(id) else {
            continue;
        };

        match result {
            Ok(()) => {
                tracing::info!("{}", action.mnemonic);
                events.push(BuildEvent::ActionFinished {
                    id: id.0,
                    mnemonic: action.mnemonic.clone(),
                    outputs: action.output_paths(),
                });
                if let Some(ref progress) = options.progress {
                    progress.finished();
                }
                report.completed.push(id);

                for dependent in graph.dependents(id) {
                    if skipped.contains(&dependent) {
                        continue;
                    }
                    if let Some(count) = remaining.get_mut(&dependent) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push_back(dependent);
                        }
                    }
                }
            }
            Err(err) => {
                let message = format!("{:#}", err);
                tracing::error!("{} failed: {}", action.mnemonic, message);
                events.push(BuildEvent::ActionFailed {
                    id: id.0,
                    mnemonic: action.mnemonic.clone(),
                    message: message.clone(),
                });
                if let Some(ref progress) = options.progress {
                    progress.failed();
                }
                remove_outputs(action);
                report.failed.push(ActionFailure {
                    id,
                    mnemonic: action.mnemonic.clone(),
                    message,
                });

                match options.policy {
                    FailurePolicy::Continue => {
                        for dependent in transitive_dependents(graph, id) {
                            skipped.insert(dependent);
                        }
                    }
                    FailurePolicy::FailFast => {
                        aborting = true;
                        tasks.abort_all();
                    }
                }
            }
        }
    }

    // Aborted actions may have written part of their outputs.
    for id in running {
        if let Some(action) = graph.action(id) {
            tracing::info!("aborted {}", action.mnemonic);
            remove_outputs(action);
        }
    }

    let done: HashSet<ActionId> = report
        .completed
        .iter()
        .copied()
        .chain(report.failed.iter().map(|f| f.id))
        .collect();
    report.skipped = graph.ids().into_iter().filter(|id| !done.contains(id)).collect();

    for &id in &report.skipped {
        if let Some(action) = graph.action(id) {
            events.push(BuildEvent::ActionSkipped {
                id: id.0,
                mnemonic: action.mnemonic.clone(),
            });
        }
    }
    if let Some(ref progress) = options.progress {
        progress.finish();
    }

    report
}

/// Create output directories, then run the action body on its own task so a
/// panic surfaces as an error.
async fn run_action(action: Arc<Action>) -> Result<()> {
    for output in &action.outputs {
        let dir = if output.is_directory() {
            output.absolute_path()
        } else {
            output.absolute_directory()
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create directory: {}", dir.display()))?;
    }

    let mut guard = AbortOnDrop(tokio::spawn(action.execute()));
    match (&mut guard.0).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(anyhow!("`{}` panicked", action.mnemonic)),
        Err(err) => Err(anyhow!("`{}` was cancelled: {}", action.mnemonic, err)),
    }
}

fn remove_outputs(action: &Action) {
    for path in action.output_paths() {
        if let Err(err) = remove_path(&path) {
            tracing::warn!("{:#}", err);
        }
    }
}

fn transitive_dependents(graph: &ExecutionGraph, id: ActionId) -> Vec<ActionId> {
    let mut seen: HashSet<ActionId> = HashSet::new();
    let mut queue: VecDeque<ActionId> = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents(current) {
            if seen.insert(dependent) {
                queue.push_back(dependent);
            }
        }
    }
    seen.into_iter().collect()
}

/// Progress bar for action execution.
#[derive(Clone)]
pub struct BuildProgress {
    bar: ProgressBar,
    finished: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    total: usize,
}

impl std::fmt::Debug for BuildProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildProgress")
            .field("finished", &self.finished_count())
            .field("failed", &self.failed_count())
            .field("total", &self.total)
            .finish()
    }
}

impl BuildProgress {
    /// A progress bar over `total` actions, drawn to stderr when `visible`.
    pub fn new(total: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        if visible {
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(120));
        }

        BuildProgress {
            bar,
            finished: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    pub fn started(&self, mnemonic: &str) {
        self.bar.set_message(mnemonic.to_string());
    }

    pub fn finished(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        self.bar.inc(1);
    }

    pub fn failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.bar.inc(1);
    }

    pub fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Fraction of actions done, failed ones included.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.finished_count() + self.failed_count()) as f64 / self.total as f64
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
