//! Dependency records.
//!
//! A project declares two overlapping dependency lists: `build` (needed to
//! produce its artifacts) and `lint` (everything referenced, including
//! type-only references). `build` is always a subset of `lint`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::label::Label;

/// How a dependency is declared in a project config's `[deps]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Build,
    Lint,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Build => "build",
            DependencyKind::Lint => "lint",
        }
    }
}

/// One extracted dependency.
///
/// `value` is either a workspace label (`//libs/ui`) or an external module
/// root (`react`, `@scope/pkg`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub value: String,
    pub build: bool,
    pub lint: bool,
}

impl Dependency {
    pub fn build(value: impl Into<String>) -> Self {
        Dependency {
            value: value.into(),
            build: true,
            lint: true,
        }
    }

    pub fn lint(value: impl Into<String>) -> Self {
        Dependency {
            value: value.into(),
            build: false,
            lint: true,
        }
    }

    /// The strongest kind this dependency needs to be declared as.
    pub fn kind(&self) -> DependencyKind {
        if self.build {
            DependencyKind::Build
        } else {
            DependencyKind::Lint
        }
    }

    pub fn is_label(&self) -> bool {
        Label::is_label(&self.value)
    }
}

/// The resolved dependency lists of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub build: Vec<String>,
    pub lint: Vec<String>,
}

impl Dependencies {
    /// Build from a `[deps]` table: `"build"` entries land in both lists,
    /// `"lint"` entries only in `lint`.
    pub fn from_map(deps: &BTreeMap<String, DependencyKind>) -> Self {
        let mut build = BTreeSet::new();
        let mut lint = BTreeSet::new();

        for (name, kind) in deps {
            if *kind == DependencyKind::Build {
                build.insert(name.clone());
            }
            lint.insert(name.clone());
        }

        Dependencies {
            build: build.into_iter().collect(),
            lint: lint.into_iter().collect(),
        }
    }

    /// Build from extraction results. A dependency seen during the build
    /// pass is always also a lint dependency.
    pub fn from_extracted(deps: &[Dependency]) -> Self {
        let mut build = BTreeSet::new();
        let mut lint = BTreeSet::new();

        for dep in deps {
            if dep.build {
                build.insert(dep.value.clone());
                lint.insert(dep.value.clone());
            } else if dep.lint {
                lint.insert(dep.value.clone());
            }
        }

        Dependencies {
            build: build.into_iter().collect(),
            lint: lint.into_iter().collect(),
        }
    }

    /// Render back into a `[deps]` table.
    pub fn to_map(&self) -> BTreeMap<String, DependencyKind> {
        let mut map: BTreeMap<String, DependencyKind> = self
            .lint
            .iter()
            .map(|name| (name.clone(), DependencyKind::Lint))
            .collect();
        for name in &self.build {
            map.insert(name.clone(), DependencyKind::Build);
        }
        map
    }

    /// Workspace labels among `build ∪ lint`, sorted and de-duplicated.
    /// External module names are skipped.
    pub fn labels(&self) -> Vec<Label> {
        let names: BTreeSet<&str> = self
            .build
            .iter()
            .chain(self.lint.iter())
            .map(String::as_str)
            .filter(|name| Label::is_label(name))
            .collect();

        let mut labels: Vec<Label> = names
            .into_iter()
            .filter_map(|name| Label::parse(name).ok())
            .collect();
        labels.sort();
        labels
    }

    /// Labels in the `lint` list only.
    pub fn lint_labels(&self) -> Vec<Label> {
        self.lint
            .iter()
            .filter_map(|name| Label::parse(name).ok())
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.build.iter().all(|b| self.lint.contains(b))
    }
}
