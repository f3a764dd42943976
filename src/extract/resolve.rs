//! Module specifier resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::core::label::Label;
use crate::util::fs::{find_ancestor_with, lexical_normalize, relative_path, to_slash};

/// Extensions probed, in order, for an extensionless specifier.
pub const PROBE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".json"];

/// Node's built-in modules.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Builtin,
    /// Root of an external package: `react`, `@scope/pkg`.
    External(String),
    /// A file (or directory) inside the workspace.
    File(PathBuf),
    Unresolved,
}

pub fn is_builtin(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let root = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.contains(&root)
}

/// `@scope/pkg/sub` -> `@scope/pkg`, `pkg/sub` -> `pkg`.
pub fn package_name(specifier: &str) -> String {
    let mut segments = specifier.split('/');
    match segments.next() {
        Some(scope) if scope.starts_with('@') => match segments.next() {
            Some(name) => format!("{}/{}", scope, name),
            None => scope.to_string(),
        },
        Some(name) => name.to_string(),
        None => specifier.to_string(),
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

#[derive(Debug, Clone)]
pub struct ModuleResolver {
    root: PathBuf,
    project_config_filename: String,
}

impl ModuleResolver {
    pub fn new(root: impl Into<PathBuf>, project_config_filename: impl Into<String>) -> Self {
        ModuleResolver {
            root: root.into(),
            project_config_filename: project_config_filename.into(),
        }
    }

    /// Classify `specifier` as imported from the file `importer`.
    pub fn resolve(&self, specifier: &str, importer: &Path) -> Resolved {
        if is_builtin(specifier) {
            return Resolved::Builtin;
        }

        let base = if let Some(rest) = specifier.strip_prefix("//") {
            self.root.join(rest)
        } else if is_relative(specifier) {
            importer
                .parent()
                .unwrap_or(&self.root)
                .join(specifier)
        } else {
            return Resolved::External(package_name(specifier));
        };

        match probe(&lexical_normalize(&base)) {
            Some(path) => Resolved::File(path),
            None => Resolved::Unresolved,
        }
    }

    /// Label of the project owning `path`: the nearest ancestor directory
    /// holding a project config, below the workspace root.
    pub fn project_label(&self, path: &Path) -> Option<Label> {
        let dir = find_ancestor_with(path, &self.project_config_filename)?;
        if dir == self.root || !dir.starts_with(&self.root) {
            return None;
        }
        Some(Label::new(&to_slash(&relative_path(&self.root, &dir)), None))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Find the file `base` refers to: the path itself, a `.js`-style path
/// whose source is TypeScript, `base` plus an extension, or an index file.
/// An existing directory without an index file resolves to the directory.
fn probe(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }

    let stem = match base.extension().and_then(|e| e.to_str()) {
        Some("js" | "jsx" | "mjs" | "cjs") => base.with_extension(""),
        _ => base.to_path_buf(),
    };

    for ext in PROBE_EXTENSIONS {
        let candidate = with_suffix(&stem, ext);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if base.is_dir() {
        for ext in PROBE_EXTENSIONS {
            let candidate = base.join(format!("index{}", ext));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        return Some(base.to_path_buf());
    }

    None
}
