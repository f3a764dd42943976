//! Build context - the capability handed to every build step.
//!
//! A step resolves file handles through the context and registers the
//! actions it wants run. Registered actions are merged into the shared
//! action graph once the step returns.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::build::action::{Action, ActionFn, ActionFuture};
use crate::build::file::File;
use crate::core::label::Label;
use crate::core::workspace::Workspace;

/// Which tree a file handle is rooted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// The workspace root.
    Source,
    /// The workspace output directory.
    Output,
}

pub struct BuildContext {
    label: Label,
    workspace: Arc<Workspace>,
    actions: Vec<Action>,
}

impl BuildContext {
    pub fn new(label: Label, workspace: Arc<Workspace>) -> Self {
        BuildContext {
            label,
            workspace,
            actions: Vec::new(),
        }
    }

    /// The step this context belongs to.
    pub fn label(&self) -> Label {
        self.label
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn root_dir(&self, root: Root) -> &Path {
        match root {
            Root::Source => self.workspace.root(),
            Root::Output => self.workspace.dist_dir(),
        }
    }

    pub fn file(&self, path: impl Into<PathBuf>, root: Root) -> File {
        File::new(path, self.root_dir(root))
    }

    pub fn directory(&self, path: impl Into<PathBuf>, root: Root) -> File {
        File::directory(path, self.root_dir(root))
    }

    /// Move `file` to `root`, keeping its relative path.
    pub fn rebase(&self, file: &File, root: Root) -> File {
        file.rebase(self.root_dir(root))
    }

    /// Register an action.
    ///
    /// `config` is stored serialized on the action and handed back to
    /// `run`, so everything the action needs travels with it.
    pub fn action<C, F, Fut>(
        &mut self,
        mnemonic: impl Into<String>,
        config: C,
        inputs: Vec<File>,
        outputs: Vec<File>,
        run: F,
    ) -> Result<()>
    where
        C: Serialize + DeserializeOwned + Send + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mnemonic = mnemonic.into();
        let value = serde_json::to_value(&config)
            .with_context(|| format!("failed to serialize config of `{}`", mnemonic))?;

        let run: ActionFn = Arc::new(move |value: Value| -> ActionFuture {
            match serde_json::from_value::<C>(value) {
                Ok(config) => Box::pin(run(config)),
                Err(err) => Box::pin(async move {
                    Err(anyhow::Error::from(err).context("invalid action config"))
                }),
            }
        });

        self.add_action(Action::new(self.label, mnemonic, inputs, outputs, value, run));
        Ok(())
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("label", &self.label)
            .field("root", &self.workspace.root())
            .field("actions", &self.actions.len())
            .finish()
    }
}
