#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;
use std::fs;

const DESCRIPTOR: &str = r#"{"stack":"s","secrets":{"a":"external","b":{"k":1}},"services":{"svc":{"image":"r/n-linux-amd64","volumes":[{"target":"~:/data"}]}}}"#;

fn stackdeploy() -> Command {
    let mut cmd = Command::cargo_bin("stackdeploy").unwrap();
    for key in [
        "STACKDEPLOY_CONFIG",
        "STACKDEPLOY_REGISTRY",
        "STACKDEPLOY_REGISTRY_USER",
        "STACKDEPLOY_REGISTRY_PASSWORD",
        "STACKDEPLOY_REPO_USER",
        "STACKDEPLOY_REPO_PASSWORD",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// ユーザー設定の影響を受けないよう、設定ディレクトリもテスト用ディレクトリに向ける
fn stackdeploy_in(project: &TestProject) -> Command {
    let mut cmd = stackdeploy();
    cmd.current_dir(project.path())
        .env("HOME", project.path())
        .env("XDG_CONFIG_HOME", project.path().join(".config"));
    cmd
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    stackdeploy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Docker Swarm"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--no-deploy"))
        .stdout(predicate::str::contains("--regpass"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    stackdeploy()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackdeploy"));
}

#[test]
fn test_unknown_flag() {
    stackdeploy()
        .arg("-bogus")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_missing_descriptor() {
    let project = TestProject::new();
    stackdeploy_in(&project)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("デプロイ記述子が見つかりません"));
}

#[test]
fn test_registry_without_credentials() {
    let project = TestProject::new();
    project.write_descriptor(DESCRIPTOR);
    stackdeploy_in(&project)
        .args(["--no-deploy", "--reg", "reg.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reguser"));
}

/// -keep -nodeploy で compose ファイルだけを生成
#[test]
fn test_generate_only_with_legacy_flags() {
    let project = TestProject::new();
    project.write_descriptor(DESCRIPTOR);

    stackdeploy_in(&project)
        .args(["-keep", "-nodeploy"])
        .assert()
        .success();

    let yaml = fs::read_to_string(project.compose_path()).unwrap();
    assert!(yaml.starts_with("version: '3.5'\n"));
    assert!(yaml.contains("node.platform.os == linux"));
    assert!(yaml.contains("target: /data"));
    assert!(!yaml.contains("stack:"));
    assert!(project.root.path().join("b").exists());
}

/// 削除を有効にすると生成ファイルは残らない
#[test]
fn test_generated_files_removed() {
    let project = TestProject::new();
    let input = project.write_descriptor(DESCRIPTOR);

    stackdeploy_in(&project)
        .args(["--no-deploy", "-c"])
        .arg(&input)
        .assert()
        .success();

    assert!(!project.compose_path().exists());
    assert!(!project.root.path().join("b").exists());
}

/// -v で生成したYAMLを表示
#[test]
fn test_verbose_echoes_yaml() {
    let project = TestProject::new();
    project.write_descriptor(DESCRIPTOR);

    stackdeploy_in(&project)
        .args(["-v", "--no-deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("version: '3.5'"))
        .stdout(predicate::str::contains("Cleanup"));
}

#[test]
fn test_custom_output() {
    let project = TestProject::new();
    project.write_descriptor(DESCRIPTOR);
    let output = project.root.path().join("out").join("stack.yml");
    fs::create_dir_all(output.parent().unwrap()).unwrap();

    stackdeploy_in(&project)
        .args(["--keep", "--no-deploy", "-o"])
        .arg(&output)
        .assert()
        .success();

    assert!(output.exists());
    // インラインシークレットは出力先のディレクトリに書かれる
    assert!(project.root.path().join("out").join("b").exists());
}
