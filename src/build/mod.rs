//! The build pipeline.
//!
//! Requested labels are assembled into a build graph of per-project and
//! per-target steps. Executing the build graph yields providers plus an
//! action graph over files; the action graph is reduced to the actions
//! needed for the requested outputs and the scheduler runs those.

pub mod action;
pub mod build_graph;
pub mod context;
pub mod events;
pub mod execution;
pub mod executor;
pub mod file;
pub mod scheduler;
pub mod step;

pub use action::{Action, ActionGraph, ActionId};
pub use build_graph::{assemble, BuildGraph, BuildGraphError, BuildStep, StepKind};
pub use context::{BuildContext, Root};
pub use events::{BuildEvent, EventLog, LoggedEvent};
pub use execution::ExecutionGraph;
pub use executor::{ExecutedGraph, StepFailure};
pub use file::File;
pub use scheduler::{ActionFailure, BuildProgress, FailurePolicy, ScheduleOptions, ScheduleReport};
