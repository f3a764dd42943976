//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod interning;
pub mod process;
pub mod shell;

pub use config::{Config, MessageFormat};
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use interning::InternedString;
pub use shell::Shell;
