//! Default dependency extractor for JavaScript/TypeScript-style sources.
//!
//! Two passes over the scanned references of every entry source:
//!
//! - the resolution pass follows references that survive to runtime (not
//!   type-only) and yields the `build` set;
//! - the static pass takes every reference and yields the `lint` set.
//!
//! Both map each reference to an external package root or to the label of
//! the workspace project owning the file it resolves to.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use rayon::prelude::*;

use crate::build::file::File;
use crate::core::dependency::Dependency;
use crate::core::label::Label;
use crate::extract::resolve::{ModuleResolver, Resolved};
use crate::extract::scan::{scan, ImportRef};
use crate::extract::{DependencyExtractor, ExtractRequest};

/// Extensions of files scanned for imports.
pub const SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs"];

/// Whether `file` is an entry source: a supported extension and not a
/// declaration file.
pub fn is_supported(file: &File) -> bool {
    let name = file.path().to_string_lossy();
    !name.ends_with(".d.ts") && SOURCE_EXTENSIONS.contains(&file.extension().as_str())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportExtractor;

struct ScannedFile {
    path: PathBuf,
    imports: Vec<ImportRef>,
}

impl ImportExtractor {
    pub fn new() -> Self {
        ImportExtractor
    }

    fn scan_sources(sources: &[File]) -> Result<Vec<ScannedFile>> {
        sources
            .par_iter()
            .filter(|file| is_supported(file))
            .map(|file| {
                let path = file.absolute_path();
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(ScannedFile {
                    imports: scan(&content),
                    path,
                })
            })
            .collect()
    }

    fn resolution_pass(resolver: &ModuleResolver, own: Label, files: &[ScannedFile]) -> BTreeSet<String> {
        files
            .iter()
            .flat_map(|file| {
                file.imports
                    .iter()
                    .filter(|import| !import.type_only)
                    .filter_map(move |import| dependency_value(resolver, own, file, import))
            })
            .collect()
    }

    fn static_pass(resolver: &ModuleResolver, own: Label, files: &[ScannedFile]) -> BTreeSet<String> {
        files
            .iter()
            .flat_map(|file| {
                file.imports
                    .iter()
                    .filter_map(move |import| dependency_value(resolver, own, file, import))
            })
            .collect()
    }
}

/// What a reference contributes to the dependency list, if anything.
fn dependency_value(
    resolver: &ModuleResolver,
    own: Label,
    file: &ScannedFile,
    import: &ImportRef,
) -> Option<String> {
    match resolver.resolve(&import.specifier, &file.path) {
        Resolved::Builtin => None,
        Resolved::External(name) => Some(name),
        Resolved::File(path) => match resolver.project_label(&path) {
            Some(label) if label == own => None,
            Some(label) => Some(label.to_string()),
            None => {
                tracing::warn!(
                    "`{}` imported from {} is not part of any project",
                    import.specifier,
                    file.path.display()
                );
                None
            }
        },
        Resolved::Unresolved => {
            tracing::warn!(
                "could not resolve `{}` imported from {}",
                import.specifier,
                file.path.display()
            );
            None
        }
    }
}

impl DependencyExtractor for ImportExtractor {
    fn extract(&self, req: &ExtractRequest<'_>) -> Result<Vec<Dependency>> {
        let resolver = ModuleResolver::new(req.workspace.root(), req.workspace.project_config_filename());
        let own = req.project.label();
        let files = Self::scan_sources(req.sources)?;

        let build = Self::resolution_pass(&resolver, own, &files);
        let mut lint = Self::static_pass(&resolver, own, &files);
        lint.extend(build.iter().cloned());

        tracing::debug!(
            "{}: {} build and {} lint dependencies from {} files",
            own,
            build.len(),
            lint.len(),
            files.len()
        );

        Ok(lint
            .into_iter()
            .map(|value| {
                if build.contains(&value) {
                    Dependency::build(value)
                } else {
                    Dependency::lint(value)
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::WorkspaceFixture;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(&File::new("a/index.ts", "/ws")));
        assert!(is_supported(&File::new("a/view.tsx", "/ws")));
        assert!(!is_supported(&File::new("a/types.d.ts", "/ws")));
        assert!(!is_supported(&File::new("a/logo.svg", "/ws")));
    }

    #[test]
    fn test_extract_splits_build_and_lint() {
        let fixture = WorkspaceFixture::new()
            .project("libs/types", "build = \"copy\"\n")
            .file("libs/types/index.ts", "export type Id = string;\n")
            .project("libs/util", "build = \"copy\"\n")
            .file("libs/util/index.ts", "export const id = 1;\n")
            .project("apps/web", "build = \"copy\"\n")
            .file(
                "apps/web/main.ts",
                r#"
import type { Id } from "//libs/types";
import { id } from "../../libs/util";
import React from "react";
import { helper } from "./helper";
import fs from "node:fs";
import { missing } from "./missing";
const lazy = () => import("@scope/lazy/sub");
"#,
            )
            .file("apps/web/helper.ts", "export const helper = 1;\n")
            .file("apps/web/types.d.ts", "import x from \"ignored\";\n");
        let ws = fixture.workspace();
        let project = ws.load_project("apps/web").unwrap();
        let files = project.collect_files(ws.project_config_filename()).unwrap();
        let sources: Vec<File> = files
            .sources
            .iter()
            .map(|s| File::new(PathBuf::from("apps/web").join(s), ws.root()))
            .collect();

        let deps = ImportExtractor::new()
            .extract(&ExtractRequest {
                workspace: &ws,
                project: &project,
                sources: &sources,
            })
            .unwrap();

        assert_eq!(
            deps,
            [
                Dependency::lint("//libs/types"),
                Dependency::build("//libs/util"),
                Dependency::build("@scope/lazy"),
                Dependency::build("react"),
            ]
        );
        assert!(deps.iter().all(|d| d.lint || !d.build));
    }
}
