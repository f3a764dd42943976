//! Labels - WHICH project or target.
//!
//! A label is written `//project` or `//project:target`, where `project` is
//! the project's directory relative to the workspace root. Labels are
//! interned: parsing the same text twice yields the same object, so labels
//! compare and hash by address and can key the build graph directly.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use miette::Diagnostic as MietteDiagnostic;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::util::interning::{InternedString, Interner};

static LABELS: Interner<LabelInner> = Interner::new();

static LABEL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^//(?P<project>(?:[^/:]+/)*[^/:]+)(?::(?P<target>[^/:.]+))?$")
        .expect("label pattern is valid")
});

/// `.` and `..` would let a project escape or alias its directory.
fn has_relative_segment(project: &str) -> bool {
    project.split('/').any(|segment| segment == "." || segment == "..")
}

fn captures(s: &str) -> Option<regex::Captures<'_>> {
    LABEL_RX
        .captures(s)
        .filter(|caps| !has_relative_segment(&caps["project"]))
}

static BARE_TARGET_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<target>[^/:.]+)$").expect("target pattern is valid"));

/// Error produced when text does not follow the label grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum LabelError {
    #[error("\"{0}\" is not a valid label format")]
    #[diagnostic(
        code(keel::label::invalid),
        help("labels look like `//path/to/project` or `//path/to/project:target`")
    )]
    InvalidLabelFormat(String),
}

/// An interned `(project, target)` pair.
#[derive(Clone, Copy)]
pub struct Label {
    inner: &'static LabelInner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LabelInner {
    project: InternedString,
    target: Option<InternedString>,
}

impl Label {
    /// Intern a label from its parts. No validation is done here.
    pub fn new(project: &str, target: Option<&str>) -> Self {
        let key = LabelInner {
            project: InternedString::new(project),
            target: target.map(InternedString::new),
        };
        let inner = LABELS.intern_with(&key, || Box::leak(Box::new(key)));
        Label { inner }
    }

    /// Parse `//project` or `//project:target`.
    pub fn parse(s: &str) -> Result<Self, LabelError> {
        Self::parse_in(s, None)
    }

    /// Parse a label, resolving a bare `target` against `context`'s project.
    pub fn parse_in(s: &str, context: Option<Label>) -> Result<Self, LabelError> {
        if let Some(caps) = captures(s) {
            let project = &caps["project"];
            let target = caps.name("target").map(|m| m.as_str());
            return Ok(Label::new(project, target));
        }

        if let (Some(context), Some(caps)) = (context, BARE_TARGET_RX.captures(s)) {
            return Ok(Label::new(context.project(), Some(&caps["target"])));
        }

        Err(LabelError::InvalidLabelFormat(s.to_string()))
    }

    /// Whether `s` is a fully qualified label (as opposed to a module name).
    pub fn is_label(s: &str) -> bool {
        captures(s).is_some()
    }

    pub fn project(&self) -> &'static str {
        self.inner.project.as_str()
    }

    pub fn target(&self) -> Option<&'static str> {
        self.inner.target.map(|t| t.as_str())
    }

    pub fn is_target(&self) -> bool {
        self.inner.target.is_some()
    }

    /// The label of the owning project (`//a:b` -> `//a`).
    pub fn project_label(&self) -> Label {
        match self.inner.target {
            None => *self,
            Some(_) => Label::new(self.project(), None),
        }
    }

    pub fn with_target(&self, target: &str) -> Label {
        Label::new(self.project(), Some(target))
    }
}

impl PartialEq for Label {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Label {}

impl Hash for Label {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Labels sort by project path, then target, with the bare project first.
impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.project()
            .cmp(other.project())
            .then_with(|| self.target().cmp(&other.target()))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "//{}:{}", self.project(), target),
            None => write!(f, "//{}", self.project()),
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self)
    }
}

impl FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Label::parse(&s).map_err(serde::de::Error::custom)
    }
}
