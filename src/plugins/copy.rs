//! `copy` builder - publishes a project's sources to the output tree as-is.
//!
//! Useful for interpreted sources and as the reference builder: every
//! source file becomes one action, and the outputs of build dependencies
//! are declared as inputs so dependents are copied after what they use.

use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::build::context::{BuildContext, Root};
use crate::build::file::File;
use crate::build::step::CopyFiles;
use crate::core::label::Label;
use crate::core::plugin::{BuildOptions, Builder};
use crate::core::provider::{DefaultInfo, ExternalModuleInfo, Provider};
use crate::extract::{DependencyExtractor, ImportExtractor};

pub const NAME: &str = "copy";

#[derive(Debug, Default)]
pub struct CopyBuilder {
    extractor: ImportExtractor,
}

impl CopyBuilder {
    pub fn new() -> Self {
        CopyBuilder {
            extractor: ImportExtractor::new(),
        }
    }
}

/// Upstream files that belong to one of `projects`.
fn dependency_outputs(deps: &[Provider], projects: &[Label]) -> Vec<File> {
    DefaultInfo::files(deps)
        .into_iter()
        .filter(|file| {
            projects
                .iter()
                .any(|label| file.path().starts_with(Path::new(label.project())))
        })
        .collect()
}

impl Builder for CopyBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, cx: &mut BuildContext, opts: BuildOptions<'_>) -> Result<Vec<Provider>> {
        let build_deps: Vec<Label> = opts
            .project
            .dependencies
            .build
            .iter()
            .filter_map(|dep| Label::parse(dep).ok())
            .collect();
        let upstream = dependency_outputs(opts.deps, &build_deps);

        let mut outputs = Vec::with_capacity(opts.sources.len());
        for source in opts.sources {
            let output = cx.rebase(source, Root::Output);
            let mut inputs = vec![source.clone()];
            inputs.extend(upstream.iter().cloned());

            cx.action(
                format!("Copy {}", source.path().display()),
                CopyFiles::new(std::slice::from_ref(source), std::slice::from_ref(&output)),
                inputs,
                vec![output.clone()],
                CopyFiles::run,
            )?;
            outputs.push(output);
        }

        let externals = opts
            .project
            .dependencies
            .build
            .iter()
            .filter(|dep| !Label::is_label(dep));

        Ok(vec![
            Provider::default_info(DefaultInfo::with_files(outputs)),
            Provider::external_modules(ExternalModuleInfo::new(externals)),
        ])
    }

    fn extractor(&self) -> Option<&dyn DependencyExtractor> {
        Some(&self.extractor)
    }

    fn validate_config(&self, config: &Value) -> std::result::Result<(), String> {
        match config {
            Value::Null => Ok(()),
            Value::Object(table) if table.is_empty() => Ok(()),
            Value::Object(table) => Err(format!(
                "the copy builder takes no options, found `{}`",
                table.keys().cloned().collect::<Vec<_>>().join("`, `")
            )),
            _ => Err("expected a table".to_string()),
        }
    }
}
