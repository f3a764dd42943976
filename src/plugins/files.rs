//! `files` bundler - gathers everything a target wraps into one directory.
//!
//! Files of the bundled project land in `<dist>/<project>/<target>/` with
//! the project prefix dropped; files of its dependencies keep their full
//! workspace path below that directory.
//!
//! ```toml
//! [targets.cli]
//! bundle = "files"
//! executable = "bin/cli.sh"
//! ```
//!
//! `executable` names a file of the bundled project, relative to the project
//! directory; its bundled copy is what `keel run` starts.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::build::context::{BuildContext, Root};
use crate::build::file::File;
use crate::build::step::CopyFiles;
use crate::core::plugin::{BundleOptions, Bundler};
use crate::core::provider::{DefaultInfo, ExternalModuleInfo, Provider};
use crate::core::target::Target;

pub const NAME: &str = "files";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    #[serde(default)]
    pub executable: Option<String>,
}

impl FilesConfig {
    fn parse(config: &Value) -> Result<Self> {
        if config.is_null() {
            return Ok(FilesConfig::default());
        }
        serde_json::from_value(config.clone()).context("invalid files configuration")
    }
}

#[derive(Debug, Default)]
pub struct FilesBundler;

/// Where `file` goes inside the bundle of `target`.
fn bundle_path(target: &Target, file: &File) -> PathBuf {
    let project = Path::new(target.project.as_str());
    let relative = file.path().strip_prefix(project).unwrap_or(file.path());
    project.join(target.name.as_str()).join(relative)
}

impl Bundler for FilesBundler {
    fn name(&self) -> &str {
        NAME
    }

    fn bundle(&self, cx: &mut BuildContext, opts: BundleOptions<'_>) -> Result<Vec<Provider>> {
        let config = FilesConfig::parse(opts.config)?;
        let inputs = DefaultInfo::files(opts.data);
        let outputs: Vec<File> = inputs
            .iter()
            .map(|file| cx.file(bundle_path(opts.target, file), Root::Output))
            .collect();

        let executables = match &config.executable {
            Some(executable) => {
                let wanted = Path::new(opts.target.project.as_str())
                    .join(opts.target.name.as_str())
                    .join(executable);
                let file = outputs
                    .iter()
                    .find(|file| file.path() == wanted)
                    .with_context(|| {
                        format!(
                            "executable `{}` is not a file of {}",
                            executable,
                            opts.target.display_name()
                        )
                    })?;
                vec![file.clone()]
            }
            None => Vec::new(),
        };

        if !inputs.is_empty() {
            cx.action(
                format!("Bundle {}", opts.target.display_name()),
                CopyFiles::new(&inputs, &outputs),
                inputs,
                outputs.clone(),
                CopyFiles::run,
            )?;
        }

        Ok(vec![
            Provider::default_info(DefaultInfo {
                files: outputs,
                executables,
            }),
            Provider::external_modules(ExternalModuleInfo::aggregate(opts.data)),
        ])
    }

    fn validate_config(&self, config: &Value) -> std::result::Result<(), String> {
        FilesConfig::parse(config)
            .map(|_| ())
            .map_err(|err| format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::fixtures::WorkspaceFixture;

    #[test]
    fn test_bundle_layout() {
        let fixture = WorkspaceFixture::new()
            .project("apps/api", "build = \"copy\"\n[targets.server]\nbundle = \"files\"\n")
            .file("apps/api/main.ts", "");
        let ws = fixture.workspace();
        let project = ws.load_project("apps/api").unwrap();
        let target = project.target("server").unwrap();

        let data = vec![
            Provider::default_info(DefaultInfo::with_files(vec![
                File::new("libs/util/index.ts", ws.dist_dir()),
                File::new("apps/api/main.ts", ws.dist_dir()),
            ])),
            Provider::external_modules(ExternalModuleInfo::new(["express"])),
        ];
        let mut cx = BuildContext::new(target.label(), Arc::clone(&ws));
        let providers = FilesBundler
            .bundle(
                &mut cx,
                BundleOptions {
                    config: &Value::Null,
                    data: &data,
                    target,
                    project: &project,
                },
            )
            .unwrap();

        let paths: Vec<PathBuf> = DefaultInfo::files(&providers)
            .iter()
            .map(File::absolute_path)
            .collect();
        assert_eq!(
            paths,
            [
                ws.dist_dir().join("apps/api/server/libs/util/index.ts"),
                ws.dist_dir().join("apps/api/server/main.ts"),
            ]
        );
        assert!(ExternalModuleInfo::module_names(&providers).contains("express"));

        let actions = cx.into_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].mnemonic, "Bundle apps/api:server");
    }

    #[test]
    fn test_executable_points_into_the_bundle() {
        let fixture = WorkspaceFixture::new()
            .project(
                "apps/cli",
                "build = \"copy\"\n[targets.cli]\nbundle = \"files\"\nexecutable = \"bin/cli.sh\"\n",
            )
            .file("apps/cli/bin/cli.sh", "");
        let ws = fixture.workspace();
        let project = ws.load_project("apps/cli").unwrap();
        let target = project.target("cli").unwrap();

        let data = vec![Provider::default_info(DefaultInfo::with_files(vec![
            File::new("apps/cli/bin/cli.sh", ws.dist_dir()),
        ]))];
        let bundle = |config: &Value| {
            let mut cx = BuildContext::new(target.label(), Arc::clone(&ws));
            FilesBundler.bundle(
                &mut cx,
                BundleOptions {
                    config,
                    data: &data,
                    target,
                    project: &project,
                },
            )
        };

        let providers = bundle(&target.bundle.config).unwrap();
        assert_eq!(
            DefaultInfo::executables(&providers),
            [File::new("apps/cli/cli/bin/cli.sh", ws.dist_dir())]
        );

        let err = bundle(&serde_json::json!({ "executable": "missing.sh" })).unwrap_err();
        assert!(err.to_string().contains("`missing.sh` is not a file of"), "{}", err);
    }

    #[test]
    fn test_config_validation() {
        assert!(FilesBundler.validate_config(&Value::Null).is_ok());
        assert!(FilesBundler
            .validate_config(&serde_json::json!({ "executable": "main.sh" }))
            .is_ok());
        assert!(FilesBundler
            .validate_config(&serde_json::json!({ "minify": true }))
            .is_err());
        assert!(FilesBundler
            .validate_config(&serde_json::json!({ "executable": 1 }))
            .is_err());
    }

    #[test]
    fn test_empty_bundle_registers_nothing() {
        let fixture = WorkspaceFixture::new().project("apps/api", "[targets.api]\nbundle = \"files\"\n");
        let ws = fixture.workspace();
        let project = ws.load_project("apps/api").unwrap();
        let target = project.target("api").unwrap();

        let mut cx = BuildContext::new(target.label(), Arc::clone(&ws));
        let providers = FilesBundler
            .bundle(
                &mut cx,
                BundleOptions {
                    config: &Value::Null,
                    data: &[],
                    target,
                    project: &project,
                },
            )
            .unwrap();
        assert!(cx.actions().is_empty());
        assert!(DefaultInfo::files(&providers).is_empty());
    }
}
