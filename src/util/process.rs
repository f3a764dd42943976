//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Builder for subprocess execution.
///
/// Serializable so a command line can travel as an action's config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessBuilder {
    program: PathBuf,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Build from an argv list such as `["tsc", "-p", "."]`.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("command must not be empty");
        };
        Ok(ProcessBuilder::new(program.as_ref()).args(args.iter().map(|a| a.as_ref())))
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn configure<C>(&self, cmd: &mut C, arg: impl Fn(&mut C, &str), env: impl Fn(&mut C, &str, &str))
    {
        for a in &self.args {
            arg(cmd, a);
        }
        for (key, value) in &self.env {
            env(cmd, key, value);
        }
    }

    fn std_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        self.configure(
            &mut cmd,
            |c, a| {
                c.arg(a);
            },
            |c, k, v| {
                c.env(k, v);
            },
        );
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn tokio_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        self.configure(
            &mut cmd,
            |c, a| {
                c.arg(a);
            },
            |c, k, v| {
                c.env(k, v);
            },
        );
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run to completion with inherited stdio and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        self.std_command()
            .status()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Run to completion with captured output.
    pub fn output(&self) -> Result<std::process::Output> {
        self.std_command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Run with inherited stdio and require success.
    pub fn exec_and_check(&self) -> Result<()> {
        let status = self.status()?;
        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                self.display_command(),
                status.code()
            );
        }
        Ok(())
    }

    /// Async variant of [`exec_and_check`](Self::exec_and_check). The child is
    /// killed if the returned future is dropped.
    pub async fn run_inherited(&self) -> Result<()> {
        let mut cmd = self.tokio_command();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let status = cmd
            .status()
            .await
            .with_context(|| format!("failed to execute `{}`", self.display_command()))?;

        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                self.display_command(),
                status.code()
            );
        }
        Ok(())
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("tsc").args(["-p", "tsconfig.json"]);
        assert_eq!(pb.display_command(), "tsc -p tsconfig.json");
    }

    #[test]
    fn test_from_argv() {
        let pb = ProcessBuilder::from_argv(&["node", "build.js"]).unwrap();
        assert_eq!(pb.get_program(), Path::new("node"));
        assert_eq!(pb.get_args(), ["build.js"]);

        let empty: [&str; 0] = [];
        assert!(ProcessBuilder::from_argv(&empty).is_err());
    }

    #[test]
    fn test_serde_round_trip_as_config() {
        let pb = ProcessBuilder::new("sh").arg("-c").arg("true").cwd("/tmp");
        let value = serde_json::to_value(&pb).unwrap();
        assert_eq!(value["program"], "sh");
        let back: ProcessBuilder = serde_json::from_value(value).unwrap();
        assert_eq!(back, pb);
    }

    #[cfg(unix)]
    #[test]
    fn test_output_captures_stdout() {
        let output = ProcessBuilder::new("echo").arg("hello").output().unwrap();
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_inherited_reports_failure() {
        assert!(ProcessBuilder::new("true").run_inherited().await.is_ok());
        let err = ProcessBuilder::new("false").run_inherited().await.unwrap_err();
        assert!(err.to_string().contains("`false` failed"));
    }
}
