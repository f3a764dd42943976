//! Plugins shipped with keel.

pub mod command;
pub mod copy;
pub mod files;

use std::sync::Arc;

use crate::core::errors::ConfigError;
use crate::core::plugin::{Plugin, PluginContext};

pub use command::{CommandBuilder, CommandDeployer};
pub use copy::CopyBuilder;
pub use files::FilesBundler;

/// Registers the `copy` and `command` builders, the `files` bundler and
/// the `command` deployer.
#[derive(Debug, Default)]
pub struct BuiltinPlugin;

impl Plugin for BuiltinPlugin {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, cx: &mut PluginContext<'_>) -> Result<(), ConfigError> {
        cx.on_workspace_config(|ws| {
            ws.add_builder(Arc::new(CopyBuilder::new()))?;
            ws.add_builder(Arc::new(CommandBuilder))?;
            ws.add_bundler(Arc::new(FilesBundler))?;
            ws.add_deployer(Arc::new(CommandDeployer))
        })
    }
}
