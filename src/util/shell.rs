//! CLI output.
//!
//! Human mode prints right-aligned status words to stderr; JSON mode
//! prints one object per line to stdout and nothing else.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::PoisonError;
use std::sync::Mutex;

use serde::Serialize;

use crate::util::config::MessageFormat;

/// Output verbosity level (human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    #[default]
    Normal,
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Colors when stderr is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Finished,
    Updated,
    Building,
    Deploying,
    Testing,
    Passed,
    Info,
    Skipped,
    Warning,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Updated => "Updated",
            Status::Building => "Building",
            Status::Deploying => "Deploying",
            Status::Testing => "Testing",
            Status::Passed => "Passed",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Created | Status::Finished | Status::Updated | Status::Passed => "\x1b[1;32m",
            Status::Building | Status::Deploying | Status::Testing => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

#[derive(Debug)]
pub struct Shell {
    format: MessageFormat,
    verbosity: Verbosity,
    use_color: bool,
    stdout: Mutex<()>,
}

impl Shell {
    pub fn new(format: MessageFormat, verbosity: Verbosity, color: ColorChoice) -> Self {
        let use_color = format == MessageFormat::Human
            && match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            };
        Shell {
            format,
            verbosity,
            use_color,
            stdout: Mutex::new(()),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == MessageFormat::Json
    }

    pub fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// `{status:>12} {message}` on stderr. Quiet mode keeps errors only;
    /// JSON mode drops everything.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() || (self.is_quiet() && status != Status::Error) {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// An error line, or an `{"reason":"error"}` object in JSON mode.
    pub fn error(&self, msg: impl Display) {
        if self.is_json() {
            self.json_event(&serde_json::json!({
                "reason": "error",
                "message": msg.to_string(),
            }));
        } else {
            self.status(Status::Error, msg);
        }
    }

    /// Print one JSON line to stdout. Ignored in human mode.
    pub fn json_event<T: Serialize>(&self, event: &T) {
        if !self.is_json() {
            return;
        }
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("failed to serialize event: {}", err);
                return;
            }
        };
        let _guard = self.stdout.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }

    /// Plain output on stdout, for command results (`list`, `graph`).
    pub fn print(&self, msg: impl Display) {
        let _guard = self.stdout.lock().unwrap_or_else(PoisonError::into_inner);
        println!("{}", msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!(
                "{}{:>width$}\x1b[0m",
                status.color_code(),
                text,
                width = STATUS_WIDTH
            )
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(MessageFormat::Human, Verbosity::Normal, ColorChoice::Auto)
    }
}
