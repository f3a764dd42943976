//! Providers - typed results passed between build steps.
//!
//! A step returns a list of providers; steps downstream pick out the kinds
//! they understand with the helpers below and ignore everything else.
//! Providers are shared behind `Arc` and never mutated once returned.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::build::file::File;

#[derive(Debug, Clone)]
pub enum Provider {
    Default(Arc<DefaultInfo>),
    ExternalModules(Arc<ExternalModuleInfo>),
    Custom(Arc<CustomProvider>),
}

impl Provider {
    pub fn default_info(info: DefaultInfo) -> Self {
        Provider::Default(Arc::new(info))
    }

    pub fn external_modules(info: ExternalModuleInfo) -> Self {
        Provider::ExternalModules(Arc::new(info))
    }

    pub fn custom(kind: &ProviderKind, payload: Value) -> Self {
        Provider::Custom(Arc::new(CustomProvider {
            kind: kind.clone(),
            payload,
        }))
    }

    /// Whether both refer to the same provider instance.
    pub fn is_same(&self, other: &Provider) -> bool {
        match (self, other) {
            (Provider::Default(a), Provider::Default(b)) => Arc::ptr_eq(a, b),
            (Provider::ExternalModules(a), Provider::ExternalModules(b)) => Arc::ptr_eq(a, b),
            (Provider::Custom(a), Provider::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &str {
        match self {
            Provider::Default(_) => "DefaultInfo",
            Provider::ExternalModules(_) => "ExternalModuleInfo",
            Provider::Custom(custom) => custom.kind.name(),
        }
    }
}

/// Concatenate provider lists, dropping instances already seen.
pub fn merge_unique<'a>(lists: impl IntoIterator<Item = &'a [Provider]>) -> Vec<Provider> {
    let mut merged: Vec<Provider> = Vec::new();
    for list in lists {
        for provider in list {
            if !merged.iter().any(|p| p.is_same(provider)) {
                merged.push(provider.clone());
            }
        }
    }
    merged
}

/// Output files of a step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultInfo {
    pub files: Vec<File>,
    pub executables: Vec<File>,
}

impl DefaultInfo {
    pub fn with_files(files: Vec<File>) -> Self {
        DefaultInfo {
            files,
            executables: Vec::new(),
        }
    }

    /// Every file of every `DefaultInfo` in `providers`.
    pub fn files(providers: &[Provider]) -> Vec<File> {
        providers
            .iter()
            .filter_map(|p| match p {
                Provider::Default(info) => Some(info.files.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn executables(providers: &[Provider]) -> Vec<File> {
        providers
            .iter()
            .filter_map(|p| match p {
                Provider::Default(info) => Some(info.executables.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Collapse every `DefaultInfo` in `providers` into one.
    pub fn aggregate(providers: &[Provider]) -> Self {
        DefaultInfo {
            files: Self::files(providers),
            executables: Self::executables(providers),
        }
    }
}

/// External module names a target needs at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalModuleInfo {
    pub module_names: BTreeSet<String>,
}

impl ExternalModuleInfo {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ExternalModuleInfo {
            module_names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn module_names(providers: &[Provider]) -> BTreeSet<String> {
        providers
            .iter()
            .filter_map(|p| match p {
                Provider::ExternalModules(info) => Some(info.module_names.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn aggregate(providers: &[Provider]) -> Self {
        ExternalModuleInfo {
            module_names: Self::module_names(providers),
        }
    }
}

static NEXT_KIND: AtomicUsize = AtomicUsize::new(0);

/// A provider kind declared outside this crate.
///
/// Kinds compare by identity: declaring the same name twice yields two
/// distinct kinds.
#[derive(Clone)]
pub struct ProviderKind {
    id: usize,
    name: &'static str,
}

impl ProviderKind {
    pub fn declare(name: &'static str) -> Self {
        ProviderKind {
            id: NEXT_KIND.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ProviderKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProviderKind {}

impl fmt::Debug for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderKind({}#{})", self.name, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct CustomProvider {
    pub kind: ProviderKind,
    pub payload: Value,
}

impl CustomProvider {
    /// Payloads of every provider of `kind`.
    pub fn of_kind<'a>(providers: &'a [Provider], kind: &ProviderKind) -> Vec<&'a Value> {
        providers
            .iter()
            .filter_map(|p| match p {
                Provider::Custom(custom) if custom.kind == *kind => Some(&custom.payload),
                _ => None,
            })
            .collect()
    }
}
