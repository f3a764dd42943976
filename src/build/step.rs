//! Running a single build step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::build::build_graph::{BuildStep, StepKind};
use crate::build::context::{BuildContext, Root};
use crate::build::file::File;
use crate::core::plugin::{BuildOptions, BundleOptions};
use crate::core::project::Project;
use crate::core::provider::{merge_unique, DefaultInfo, Provider};
use crate::core::target::Target;
use crate::util::fs::copy_file;

pub const COPY_ASSETS_MNEMONIC: &str = "Copy Assets";

/// Source/destination pairs of a copy action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFiles {
    pub files: Vec<(PathBuf, PathBuf)>,
}

impl CopyFiles {
    pub fn new(inputs: &[File], outputs: &[File]) -> Self {
        CopyFiles {
            files: inputs
                .iter()
                .zip(outputs)
                .map(|(from, to)| (from.absolute_path(), to.absolute_path()))
                .collect(),
        }
    }

    pub async fn run(self) -> Result<()> {
        for (from, to) in &self.files {
            copy_file(from, to).await?;
        }
        Ok(())
    }
}

impl BuildStep {
    /// Run the step against the providers of the steps it depends on.
    ///
    /// A project step returns `upstream` followed by what it produced. A
    /// target step returns exactly what its bundler returns.
    pub fn execute(&self, cx: &mut BuildContext, upstream: &[Provider]) -> Result<Vec<Provider>> {
        let result = match &self.kind {
            StepKind::Project(project) => build_project(cx, project, upstream),
            StepKind::Target { project, target } => bundle_target(cx, project, target, upstream),
        };
        result.with_context(|| format!("{} failed", self.mnemonic))
    }
}

fn build_project(
    cx: &mut BuildContext,
    project: &Project,
    upstream: &[Provider],
) -> Result<Vec<Provider>> {
    let ws = Arc::clone(cx.workspace());
    let collected = project.collect_files(ws.project_config_filename())?;
    let project_dir = Path::new(&project.name);

    let sources: Vec<File> = collected
        .sources
        .iter()
        .map(|source| cx.file(project_dir.join(source), Root::Source))
        .collect();

    let mut own = Vec::new();
    if project.build.is_some() || !sources.is_empty() {
        let builder = ws.get_builder(project)?;
        let config = project
            .build
            .as_ref()
            .map(|build| build.config.clone())
            .unwrap_or_default();
        tracing::info!("building {} with `{}`", project.label(), builder.name());
        own = builder.build(
            cx,
            BuildOptions {
                config: &config,
                sources: &sources,
                project,
                deps: upstream,
            },
        )?;
    }

    if !collected.assets.is_empty() {
        let inputs: Vec<File> = collected
            .assets
            .iter()
            .map(|asset| cx.file(project_dir.join(asset), Root::Source))
            .collect();
        let outputs: Vec<File> = inputs.iter().map(|f| cx.rebase(f, Root::Output)).collect();

        cx.action(
            COPY_ASSETS_MNEMONIC,
            CopyFiles::new(&inputs, &outputs),
            inputs,
            outputs.clone(),
            CopyFiles::run,
        )?;
        own.push(Provider::default_info(DefaultInfo::with_files(outputs)));
    }

    Ok(merge_unique([upstream, own.as_slice()]))
}

fn bundle_target(
    cx: &mut BuildContext,
    project: &Project,
    target: &Target,
    upstream: &[Provider],
) -> Result<Vec<Provider>> {
    let bundler = cx.workspace().get_bundler(target)?;
    tracing::info!("bundling {} with `{}`", target.label(), bundler.name());
    bundler.bundle(
        cx,
        BundleOptions {
            config: &target.bundle.config,
            data: upstream,
            target,
            project,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_graph::assemble;
    use crate::core::label::Label;
    use crate::test_support::fixtures::WorkspaceFixture;

    #[test]
    fn test_project_step_registers_asset_copy() {
        let fixture = WorkspaceFixture::new()
            .project("apps/web", "build = \"copy\"\nsrcs = [\"*.ts\"]\nassets = [\"*.svg\"]\n")
            .file("apps/web/index.ts", "export const a = 1;\n")
            .file("apps/web/logo.svg", "<svg/>");
        let ws = fixture.workspace();
        let label = Label::parse("//apps/web").unwrap();
        let graph = assemble(&ws, &[label]).unwrap();
        let step = graph.get(&label).unwrap();

        let mut cx = BuildContext::new(label, Arc::clone(&ws));
        let providers = step.execute(&mut cx, &[]).unwrap();

        let actions = cx.into_actions();
        let mnemonics: Vec<&str> = actions.iter().map(|a| a.mnemonic.as_str()).collect();
        assert!(mnemonics.contains(&COPY_ASSETS_MNEMONIC));

        let files = DefaultInfo::files(&providers);
        let paths: Vec<PathBuf> = files.iter().map(File::absolute_path).collect();
        assert!(paths.contains(&ws.dist_dir().join("apps/web/logo.svg")));
        assert!(paths.contains(&ws.dist_dir().join("apps/web/index.ts")));
    }

    #[test]
    fn test_project_step_keeps_upstream_first() {
        let fixture = WorkspaceFixture::new()
            .project("libs/a", "build = \"copy\"\n")
            .file("libs/a/index.ts", "");
        let ws = fixture.workspace();
        let label = Label::parse("//libs/a").unwrap();
        let graph = assemble(&ws, &[label]).unwrap();

        let upstream = vec![Provider::default_info(DefaultInfo::with_files(vec![File::new(
            "libs/b/index.ts",
            ws.dist_dir(),
        )]))];
        let mut cx = BuildContext::new(label, Arc::clone(&ws));
        let providers = graph.get(&label).unwrap().execute(&mut cx, &upstream).unwrap();

        assert!(providers[0].is_same(&upstream[0]));
        assert!(matches!(
            &providers[1..],
            [Provider::Default(own), Provider::ExternalModules(_)]
                if own.files == [File::new("libs/a/index.ts", ws.dist_dir())]
        ));
    }

    #[test]
    fn test_sources_without_builder_fail() {
        let fixture = WorkspaceFixture::new()
            .project("libs/a", "test = true\n")
            .file("libs/a/index.ts", "");
        let ws = fixture.workspace();
        let label = Label::parse("//libs/a").unwrap();
        let graph = assemble(&ws, &[label]).unwrap();

        let mut cx = BuildContext::new(label, Arc::clone(&ws));
        let err = graph.get(&label).unwrap().execute(&mut cx, &[]).unwrap_err();
        assert!(format!("{:#}", err).contains("does not have a valid builder"));
    }

    #[test]
    fn test_target_step_returns_bundler_providers_only() {
        let fixture = WorkspaceFixture::new()
            .project("apps/api", "build = \"copy\"\n[targets.api]\nbundle = \"files\"\n")
            .file("apps/api/main.ts", "");
        let ws = fixture.workspace();
        let label = Label::parse("//apps/api:api").unwrap();
        let graph = assemble(&ws, &[label]).unwrap();

        let upstream = vec![Provider::default_info(DefaultInfo::with_files(vec![File::new(
            "apps/api/main.ts",
            ws.dist_dir(),
        )]))];
        let mut cx = BuildContext::new(label, Arc::clone(&ws));
        let providers = graph.get(&label).unwrap().execute(&mut cx, &upstream).unwrap();

        assert!(providers.iter().all(|p| !p.is_same(&upstream[0])));
        let files = DefaultInfo::files(&providers);
        assert_eq!(
            files[0].absolute_path(),
            ws.dist_dir().join("apps/api/api/main.ts")
        );
    }
}
