//! Implementation of `keel deploy`.

use anyhow::{Context, Result};

use crate::core::errors::ConfigError;
use crate::core::label::Label;
use crate::core::plugin::DeployOptions;
use crate::core::workspace::Workspace;

/// Deploy the target named by `label`. A project label deploys the
/// project's default target.
pub fn deploy(workspace: &Workspace, label: Label) -> Result<()> {
    let project = workspace.load_project(label.project())?;
    let target = match label.target() {
        Some(name) => project.target(name)?,
        None => project
            .default_target()
            .ok_or_else(|| ConfigError::MissingDeployer {
                target: label.to_string(),
                kind: None,
            })?,
    };

    let deployer = workspace.get_deployer(target)?;
    let config = target
        .deploy
        .as_ref()
        .map(|deploy| deploy.config.clone())
        .unwrap_or_default();

    tracing::info!("deploying {} with `{}`", target.label(), deployer.name());
    deployer
        .deploy(
            workspace,
            DeployOptions {
                config: &config,
                project: &project,
                target: Some(target.as_ref()),
            },
        )
        .with_context(|| format!("failed to deploy {}", target.label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::WorkspaceFixture;

    #[test]
    fn test_missing_deployer() {
        let fixture = WorkspaceFixture::new()
            .project("apps/web", "build = \"copy\"\n[targets.web]\nbundle = \"files\"\n");
        let ws = fixture.workspace();

        let err = deploy(&ws, Label::parse("//apps/web:web").unwrap()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingDeployer { kind: None, .. })
        ));

        let fixture = WorkspaceFixture::new().project("libs/ui", "build = \"copy\"\n");
        let ws = fixture.workspace();
        assert!(deploy(&ws, Label::parse("//libs/ui").unwrap()).is_err());
    }

    #[test]
    fn test_unknown_deployer_kind() {
        let fixture = WorkspaceFixture::new().project(
            "apps/web",
            "[targets.web]\nbundle = \"files\"\ndeploy = \"s3\"\n",
        );
        let ws = fixture.workspace();

        let err = deploy(&ws, Label::parse("//apps/web").unwrap()).unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::MissingDeployer { kind, .. }) => assert_eq!(kind.as_deref(), Some("s3")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_deployer_runs_in_project_dir() {
        let fixture = WorkspaceFixture::new().project(
            "apps/web",
            "[targets.web]\nbundle = \"files\"\ndeploy = { type = \"command\", command = [\"sh\", \"-c\", \"echo $KEEL_TARGET > deployed.txt\"] }\n",
        );
        let ws = fixture.workspace();

        deploy(&ws, Label::parse("//apps/web").unwrap()).unwrap();
        let written = std::fs::read_to_string(fixture.root().join("apps/web/deployed.txt")).unwrap();
        assert_eq!(written.trim(), "web");
    }
}
