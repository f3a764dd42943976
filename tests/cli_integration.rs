//! CLI integration tests for Keel.
//!
//! These tests run the `keel` binary against small workspaces on disk.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the keel binary command, isolated from the user's global config.
fn keel(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("keel").unwrap();
    cmd.current_dir(cwd).env("HOME", cwd).env_remove("KEEL_LOG");
    cmd
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// An initialized workspace with a library and an app that imports it.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    keel(tmp.path()).arg("init").assert().success();

    write(tmp.path(), "libs/util/Project.toml", "build = \"copy\"\n");
    write(tmp.path(), "libs/util/index.ts", "export const one = 1;\n");
    write(
        tmp.path(),
        "apps/web/Project.toml",
        "build = \"copy\"\n\n[deps]\n\"//libs/util\" = \"build\"\n\n[targets.web]\nbundle = \"files\"\n",
    );
    write(
        tmp.path(),
        "apps/web/main.ts",
        "import { one } from \"//libs/util\";\nconsole.log(one);\n",
    );
    tmp
}

// ============================================================================
// keel init
// ============================================================================

#[test]
fn test_init_creates_workspace() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("Created"));

    assert!(tmp.path().join("Keel.toml").is_file());
    assert!(tmp.path().join(".keel").is_dir());
    let gitignore = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains("/dist/"));
}

#[test]
fn test_init_into_new_directory() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path()).args(["init", "repo"]).assert().success();
    assert!(tmp.path().join("repo/Keel.toml").is_file());
}

#[test]
fn test_init_fails_if_workspace_exists() {
    let tmp = workspace();

    keel(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ============================================================================
// keel list
// ============================================================================

#[test]
fn test_list_projects() {
    let tmp = workspace();

    keel(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout("apps/web\nlibs/util\n");
}

#[test]
fn test_list_targets() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["list", "targets"])
        .assert()
        .success()
        .stdout("apps/web\n");
}

#[test]
fn test_list_from_subdirectory() {
    let tmp = workspace();

    keel(&tmp.path().join("libs/util"))
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("libs/util"));
}

#[test]
fn test_outside_workspace_fails() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find a keel workspace"))
        .stderr(predicate::str::contains("keel init"));
}

// ============================================================================
// keel build
// ============================================================================

#[test]
fn test_build_project_and_dependency() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "//apps/web", "--no-color"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));

    assert!(tmp.path().join("dist/apps/web/main.ts").is_file());
    assert!(tmp.path().join("dist/libs/util/index.ts").is_file());
}

#[test]
fn test_build_target_bundles_files() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "//apps/web:web"])
        .assert()
        .success();

    assert!(tmp.path().join("dist/apps/web/web/main.ts").is_file());
    assert!(tmp
        .path()
        .join("dist/apps/web/web/libs/util/index.ts")
        .is_file());
}

#[test]
fn test_build_by_path() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "libs/util/index.ts"])
        .assert()
        .success();

    assert!(tmp.path().join("dist/libs/util/index.ts").is_file());
    assert!(!tmp.path().join("dist/apps").exists());
}

#[test]
fn test_build_json_events() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "//libs/util", "--message-format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"reason\":\"build-finished\""))
        .stdout(predicate::str::contains("\"success\":true"));
}

#[test]
fn test_build_unknown_message_format() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "//libs/util", "--message-format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'xml'"))
        .stderr(predicate::str::contains("human, json"));
}

#[test]
fn test_build_unknown_project() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["build", "//libs/missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find a project config file"));
}

#[test]
fn test_build_cycle_is_rejected() {
    let tmp = workspace();
    write(
        tmp.path(),
        "libs/util/Project.toml",
        "build = \"copy\"\n\n[deps]\n\"//apps/web\" = \"build\"\n",
    );

    keel(tmp.path())
        .args(["build", "//apps/web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dependency cycle between //apps/web, //libs/util"));

    assert!(!tmp.path().join("dist").exists());
}

#[cfg(unix)]
#[test]
fn test_build_failing_command() {
    let tmp = workspace();
    write(
        tmp.path(),
        "tools/gen/Project.toml",
        "build = { type = \"command\", command = [\"sh\", \"-c\", \"exit 3\"], outputs = [\"gen.ts\"] }\n",
    );

    keel(tmp.path())
        .args(["build", "//tools/gen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build failed"));
}

// ============================================================================
// keel run / keel test
// ============================================================================

#[cfg(unix)]
fn write_script(root: &Path, path: &str, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    write(root, path, content);
    fs::set_permissions(root.join(path), fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_run_passes_arguments() {
    let tmp = workspace();
    write(
        tmp.path(),
        "apps/cli/Project.toml",
        "build = \"copy\"\n\n[targets.cli]\nbundle = \"files\"\nexecutable = \"cli.sh\"\n",
    );
    write_script(tmp.path(), "apps/cli/cli.sh", "#!/bin/sh\necho \"hello $1\"\n");

    keel(tmp.path())
        .args(["run", "//apps/cli:cli", "--", "world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello world"));
}

#[test]
fn test_run_without_executable_fails() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["run", "//apps/web:web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot find an executable for //apps/web:web"));
}

#[test]
fn test_test_without_test_projects_fails() {
    let tmp = workspace();

    keel(tmp.path())
        .arg("test")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to test"));
}

#[cfg(unix)]
#[test]
fn test_test_reports_failing_project() {
    let tmp = workspace();
    write(
        tmp.path(),
        "libs/util/Project.toml",
        "build = \"copy\"\ntest = true\n",
    );
    write(
        tmp.path(),
        "tools/check/Project.toml",
        "test = true\n\n[targets.check]\nbundle = \"files\"\n",
    );

    keel(tmp.path())
        .args(["test", "libs/util"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Passed"));

    write(
        tmp.path(),
        "apps/web/Project.toml",
        "build = { type = \"command\", command = [\"sh\", \"-c\", \"mkdir -p \\\"$KEEL_OUT_DIR\\\" && cp t.sh \\\"$KEEL_OUT_DIR/t.sh\\\"\"], outputs = [\"t.sh\"], executable = \"t.sh\" }\ntest = true\n",
    );
    write_script(tmp.path(), "apps/web/t.sh", "#!/bin/sh\nexit 1\n");

    keel(tmp.path())
        .args(["test", "apps/web", "libs/util"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("//apps/web failed"))
        .stderr(predicate::str::contains("1 of 2 test projects failed"));
}

// ============================================================================
// keel affected
// ============================================================================

#[test]
fn test_affected_includes_dependents() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["affected", "libs/util/index.ts"])
        .assert()
        .success()
        .stdout("apps/web\nlibs/util\n");

    keel(tmp.path())
        .args(["affected", "apps/web/main.ts"])
        .assert()
        .success()
        .stdout("apps/web\n");
}

// ============================================================================
// keel fix / keel deps
// ============================================================================

#[test]
fn test_fix_check_passes_when_clean() {
    let tmp = workspace();

    keel(tmp.path()).args(["fix", "--check"]).assert().success();
}

#[test]
fn test_fix_check_reports_drift_then_fix_writes() {
    let tmp = workspace();
    write(
        tmp.path(),
        "apps/web/main.ts",
        "import { one } from \"//libs/util\";\nimport React from \"react\";\n",
    );

    keel(tmp.path())
        .args(["fix", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stale dependencies"));

    keel(tmp.path()).arg("fix").assert().success();
    let config = fs::read_to_string(tmp.path().join("apps/web/Project.toml")).unwrap();
    assert!(config.contains("react = \"build\""));
    assert!(config.contains("[targets.web]"));

    keel(tmp.path()).args(["fix", "--check"]).assert().success();
}

#[test]
fn test_deps_prints_extracted() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["deps", "apps/web"])
        .assert()
        .success()
        .stdout("\"//libs/util\" = \"build\"\n");
}

// ============================================================================
// keel graph
// ============================================================================

#[test]
fn test_graph_dot() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["graph", "//apps/web:web"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph {"))
        .stdout(predicate::str::contains("\"//apps/web:web\" -> \"//apps/web\";"))
        .stdout(predicate::str::contains("\"//apps/web\" -> \"//libs/util\";"));
}

#[test]
fn test_graph_actions() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["graph", "//apps/web", "--actions"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copy apps/web/main.ts"));

    assert!(!tmp.path().join("dist").exists());
}

// ============================================================================
// keel deploy
// ============================================================================

#[test]
fn test_deploy_without_deployer_fails() {
    let tmp = workspace();

    keel(tmp.path())
        .args(["deploy", "//apps/web:web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not have a valid deployer"));
}

// ============================================================================
// keel completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();

    keel(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keel"));
}
