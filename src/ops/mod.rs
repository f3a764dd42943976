//! High-level operations.
//!
//! This module contains the implementation of keel commands.

pub mod affected;
pub mod deploy;
pub mod graph;
pub mod keel_build;
pub mod keel_fix;
pub mod keel_init;
pub mod keel_run;
pub mod list;
pub mod resolve_target;

pub use affected::affected;
pub use deploy::deploy;
pub use graph::{render_graph, GraphKind};
pub use keel_build::{build, BuildOptions, BuildResult};
pub use keel_fix::{extracted_dependencies, fix, write_dependencies, FixOptions, FixReport, ProjectDrift};
pub use keel_init::init_workspace;
pub use keel_run::{executable_of, run};
pub use keel_test::{test, test_projects, TestFailure, TestReport};
pub use list::{list, ListKind};
pub use resolve_target::resolve_target;
