#![allow(dead_code)]

use async_trait::async_trait;
use stackdeploy_container::{CommandRunner, CommandSpec, ContainerError};
use stackdeploy_core::registry::{ExistingSecret, SecretRegistry, find_in};
use stackdeploy_core::{CertificateIssuer, GeneratedCert};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// docker-compose.json を置くテスト用ディレクトリ
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_descriptor(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("docker-compose.json");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn compose_path(&self) -> PathBuf {
        self.root.path().join("docker-compose.yml")
    }
}

/// 実行したコマンドを記録するランナー
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<CommandSpec>>,
    /// このサブコマンドで失敗させる（例: "stack"）
    pub fail_on: Option<&'static str>,
}

impl RecordingRunner {
    pub fn failing_on(subcommand: &'static str) -> Self {
        Self {
            fail_on: Some(subcommand),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// `docker login` のように先頭2語を並べたもの
    pub fn labels(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::label).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> stackdeploy_container::Result<()> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.fail_on.is_some_and(|sub| spec.args.first().is_some_and(|a| a == sub)) {
            return Err(ContainerError::CommandFailed {
                command: spec.label(),
                code: 1,
            });
        }
        Ok(())
    }
}

/// 固定のシークレット一覧を返すレジストリ
#[derive(Default)]
pub struct FakeRegistry {
    pub secrets: Vec<ExistingSecret>,
}

#[async_trait]
impl SecretRegistry for FakeRegistry {
    async fn find(
        &self,
        stack: &str,
        name: &str,
    ) -> stackdeploy_core::Result<Option<ExistingSecret>> {
        Ok(find_in(&self.secrets, stack, name).cloned())
    }
}

/// RSA鍵を生成しない軽量な証明書発行
pub struct FakeIssuer;

impl CertificateIssuer for FakeIssuer {
    fn issue(&self, common_name: &str) -> stackdeploy_core::Result<GeneratedCert> {
        Ok(GeneratedCert {
            pkcs12_der: vec![0x30, 0x00],
            public_pem: format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n", common_name),
        })
    }
}
