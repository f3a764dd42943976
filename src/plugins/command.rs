//! `command` builder and deployer - run an external tool.
//!
//! ```toml
//! build = { type = "command", command = ["tsc", "-p", "."], outputs = ["index.js"] }
//!
//! [targets.web]
//! bundle = "files"
//! deploy = { type = "command", command = ["./deploy.sh"] }
//! ```
//!
//! Builds run in the project directory. `outputs` are relative to the
//! project's output directory, which the command finds in `KEEL_OUT_DIR`.
//! `executable`, when set, must be one of `outputs`.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::build::context::{BuildContext, Root};
use crate::build::file::File;
use crate::core::plugin::{BuildOptions, Builder, DeployOptions, Deployer};
use crate::core::provider::{DefaultInfo, Provider};
use crate::core::workspace::Workspace;
use crate::util::fs::to_slash;
use crate::util::process::ProcessBuilder;

pub const NAME: &str = "command";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub command: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub executable: Option<String>,
}

impl CommandConfig {
    fn parse(config: &Value) -> Result<Self> {
        let config: CommandConfig =
            serde_json::from_value(config.clone()).context("invalid command configuration")?;
        anyhow::ensure!(!config.command.is_empty(), "`command` must not be empty");
        if let Some(executable) = &config.executable {
            anyhow::ensure!(
                config.outputs.contains(executable),
                "executable `{}` is not listed in `outputs`",
                executable
            );
        }
        Ok(config)
    }
}

/// What a command action carries to its run function.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunCommand {
    process: ProcessBuilder,
}

impl RunCommand {
    async fn run(self) -> Result<()> {
        tracing::debug!("running `{}`", self.process.display_command());
        self.process.run_inherited().await
    }
}

#[derive(Debug, Default)]
pub struct CommandBuilder;

impl Builder for CommandBuilder {
    fn name(&self) -> &str {
        NAME
    }

    fn build(&self, cx: &mut BuildContext, opts: BuildOptions<'_>) -> Result<Vec<Provider>> {
        let config = CommandConfig::parse(opts.config)?;
        let project = opts.project;
        let out_dir = cx.directory(&project.name, Root::Output);

        let outputs: Vec<File> = config
            .outputs
            .iter()
            .map(|output| cx.file(format!("{}/{}", project.name, output), Root::Output))
            .collect();

        let executables: Vec<File> = config
            .executable
            .iter()
            .map(|executable| cx.file(format!("{}/{}", project.name, executable), Root::Output))
            .collect();

        let mut inputs: Vec<File> = opts.sources.to_vec();
        inputs.extend(DefaultInfo::files(opts.deps));

        let process = ProcessBuilder::from_argv(&config.command)?
            .cwd(&project.root_dir)
            .env("KEEL_OUT_DIR", to_slash(&out_dir.absolute_path()))
            .env("KEEL_ROOT", to_slash(cx.root_dir(Root::Source)))
            .env("KEEL_PROJECT", &project.name);

        cx.action(
            format!("Run {}", config.command.join(" ")),
            RunCommand { process },
            inputs,
            outputs.clone(),
            RunCommand::run,
        )?;

        Ok(vec![Provider::default_info(DefaultInfo {
            files: outputs,
            executables,
        })])
    }

    fn validate_config(&self, config: &Value) -> std::result::Result<(), String> {
        CommandConfig::parse(config)
            .map(|_| ())
            .map_err(|err| format!("{:#}", err))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployCommandConfig {
    pub command: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CommandDeployer;

impl Deployer for CommandDeployer {
    fn name(&self) -> &str {
        NAME
    }

    fn deploy(&self, workspace: &Workspace, opts: DeployOptions<'_>) -> Result<()> {
        let config: DeployCommandConfig = serde_json::from_value(opts.config.clone())
            .context("invalid command deploy configuration")?;

        let mut process = ProcessBuilder::from_argv(&config.command)?
            .cwd(&opts.project.root_dir)
            .env("KEEL_ROOT", to_slash(workspace.root()))
            .env("KEEL_PROJECT", &opts.project.name)
            .env("KEEL_OUT_DIR", to_slash(&opts.project.dist_dir));
        if let Some(target) = opts.target {
            process = process.env("KEEL_TARGET", target.name.as_str());
        }

        tracing::info!("deploying with `{}`", process.display_command());
        process.exec_and_check()
    }
}
