//! End-to-end tests of the build pipeline through the library API.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use keel::build::build_graph::{assemble, dependencies_of, BuildGraphError};
use keel::build::events::{position, BuildEvent, EventLog};
use keel::build::execution::ExecutionGraph;
use keel::build::executor::execute;
use keel::core::provider::DefaultInfo;
use keel::ops::keel_build::{build, BuildOptions};
use keel::{Label, Workspace};

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn workspace(tmp: &TempDir) -> Arc<Workspace> {
    let root = tmp.path().canonicalize().unwrap();
    keel::ops::init_workspace(&root).unwrap();
    Workspace::load(&root.join("Keel.toml")).unwrap()
}

fn labels(values: &[&str]) -> Vec<Label> {
    values.iter().map(|v| Label::parse(v).unwrap()).collect()
}

/// `apps/web` bundles `libs/ui`, which builds on `libs/util`.
fn monorepo(root: &Path) {
    write(root, "libs/util/Project.toml", "build = \"copy\"\n");
    write(root, "libs/util/index.ts", "export const one = 1;\n");
    write(
        root,
        "libs/ui/Project.toml",
        "build = \"copy\"\n\n[deps]\n\"//libs/util\" = \"build\"\n",
    );
    write(root, "libs/ui/button.ts", "import { one } from \"//libs/util\";\n");
    write(
        root,
        "apps/web/Project.toml",
        "build = \"copy\"\n\n[deps]\n\"//libs/ui\" = \"build\"\n\n[targets.web]\nbundle = \"files\"\n",
    );
    write(root, "apps/web/main.ts", "import \"//libs/ui\";\n");
}

#[test]
fn test_assemble_follows_build_dependencies() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    monorepo(ws.root());

    let graph = assemble(&ws, &labels(&["//apps/web:web"])).unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(
        dependencies_of(&graph, &Label::parse("//apps/web:web").unwrap()),
        labels(&["//apps/web"])
    );
    assert_eq!(
        dependencies_of(&graph, &Label::parse("//libs/ui").unwrap()),
        labels(&["//libs/util"])
    );
}

#[test]
fn test_lint_dependencies_and_external_modules() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    write(ws.root(), "libs/types/Project.toml", "build = \"copy\"\n");
    write(
        ws.root(),
        "libs/ui/Project.toml",
        "build = \"copy\"\n\n[deps]\n\"//libs/types\" = \"lint\"\nreact = \"build\"\n",
    );

    let graph = assemble(&ws, &labels(&["//libs/ui"])).unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(
        dependencies_of(&graph, &Label::parse("//libs/ui").unwrap()),
        labels(&["//libs/types"])
    );
}

#[test]
fn test_cycle_names_every_member() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    for (name, dep) in [("a", "b"), ("b", "c"), ("c", "a")] {
        write(
            ws.root(),
            &format!("libs/{}/Project.toml", name),
            &format!("build = \"copy\"\n\n[deps]\n\"//libs/{}\" = \"build\"\n", dep),
        );
    }

    match assemble(&ws, &labels(&["//libs/a"])) {
        Err(BuildGraphError::Cycle { labels }) => {
            assert_eq!(labels, ["//libs/a", "//libs/b", "//libs/c"])
        }
        other => panic!("expected a cycle, got {:?}", other.map(|g| g.len())),
    }
}

#[tokio::test]
async fn test_reduction_keeps_only_needed_actions() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    monorepo(ws.root());

    let graph = assemble(&ws, &labels(&["//apps/web"])).unwrap();
    let executed = execute(Arc::clone(&ws), &graph, &EventLog::new()).await;
    assert!(executed.failures.is_empty());
    assert_eq!(executed.actions.len(), 3);

    let util = Label::parse("//libs/util").unwrap();
    let outputs: Vec<_> = DefaultInfo::files(executed.providers_of(&util))
        .iter()
        .map(|f| f.absolute_path())
        .collect();
    let reduced = ExecutionGraph::reduce(&executed.actions, &outputs);
    assert_eq!(reduced.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bundle_collects_transitive_outputs() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    monorepo(ws.root());

    let result = build(
        Arc::clone(&ws),
        &labels(&["//apps/web:web"]),
        &BuildOptions {
            jobs: Some(2),
            ..BuildOptions::default()
        },
    )
    .await
    .unwrap();
    assert!(result.is_success(), "{:?}", result);

    let bundle = ws.dist_dir().join("apps/web/web");
    assert!(bundle.join("main.ts").is_file());
    assert!(bundle.join("libs/ui/button.ts").is_file());
    assert!(bundle.join("libs/util/index.ts").is_file());

    let util_done = position(&result.events, |e| {
        matches!(e, BuildEvent::ActionFinished { mnemonic, .. } if mnemonic == "Copy libs/util/index.ts")
    })
    .unwrap();
    let ui_started = position(&result.events, |e| {
        matches!(e, BuildEvent::ActionStarted { mnemonic, .. } if mnemonic == "Copy libs/ui/button.ts")
    })
    .unwrap();
    assert!(util_done < ui_started);
}

#[tokio::test]
async fn test_second_build_reruns_actions() {
    let tmp = TempDir::new().unwrap();
    let ws = workspace(&tmp);
    monorepo(ws.root());
    let targets = labels(&["//libs/util"]);

    let first = build(Arc::clone(&ws), &targets, &BuildOptions::default()).await.unwrap();
    write(ws.root(), "libs/util/index.ts", "export const two = 2;\n");
    let second = build(Arc::clone(&ws), &targets, &BuildOptions::default()).await.unwrap();

    assert_eq!(first.actions_run, 1);
    assert_eq!(second.actions_run, 1);
    assert_eq!(
        fs::read_to_string(ws.dist_dir().join("libs/util/index.ts")).unwrap(),
        "export const two = 2;\n"
    );
}

#[cfg(unix)]
mod failures {
    use super::*;

    /// `apps/web` copies files that depend on the output of a failing
    /// generator; `libs/ok` is independent.
    fn failing_generator(root: &Path) {
        write(
            root,
            "tools/gen/Project.toml",
            "build = { type = \"command\", command = [\"sh\", \"-c\", \"exit 1\"], outputs = [\"gen.ts\"] }\n",
        );
        write(
            root,
            "apps/web/Project.toml",
            "build = \"copy\"\n\n[deps]\n\"//tools/gen\" = \"build\"\n",
        );
        write(root, "apps/web/main.ts", "");
        write(root, "libs/ok/Project.toml", "build = \"copy\"\n");
        write(root, "libs/ok/index.ts", "");
    }

    #[tokio::test]
    async fn test_continue_skips_dependents_only() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        failing_generator(ws.root());

        let result = build(
            Arc::clone(&ws),
            &labels(&["//apps/web", "//libs/ok"]),
            &BuildOptions::default(),
        )
        .await
        .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.action_failures.len(), 1);
        assert_eq!(result.action_failures[0].mnemonic, "Run sh -c exit 1");
        assert_eq!(result.skipped_actions.len(), 1);
        assert!(ws.dist_dir().join("libs/ok/index.ts").is_file());
        assert!(!ws.dist_dir().join("apps/web/main.ts").exists());
        assert!(result.events.iter().any(|e| matches!(
            &e.event,
            BuildEvent::ActionSkipped { mnemonic, .. } if mnemonic == "Copy apps/web/main.ts"
        )));
    }

    #[tokio::test]
    async fn test_fail_fast_stops_scheduling() {
        let tmp = TempDir::new().unwrap();
        let ws = workspace(&tmp);
        failing_generator(ws.root());

        let result = build(
            Arc::clone(&ws),
            &labels(&["//apps/web"]),
            &BuildOptions {
                jobs: Some(1),
                fail_fast: true,
                progress: false,
            },
        )
        .await
        .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.action_failures.len(), 1);
        assert_eq!(result.actions_run, 0);
        assert!(!ws.dist_dir().join("apps/web/main.ts").exists());
        assert!(matches!(
            result.events.last().map(|e| &e.event),
            Some(BuildEvent::BuildFinished { success: false, .. })
        ));
    }
}
