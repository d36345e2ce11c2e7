//! docker CLI の呼び出し
//!
//! `docker stack deploy` などSwarm関連の操作はEngine APIではなくCLIで行います。

use crate::error::Result;
use crate::process::{CommandRunner, CommandSpec};
use std::path::Path;
use tracing::info;

const DOCKER: &str = "docker";

/// `docker login`（パスワードは標準入力で渡す）
pub fn login_command(registry: &str, user: &str, password: &str) -> CommandSpec {
    CommandSpec::new(DOCKER)
        .args(["login", "-u", user, "--password-stdin", registry])
        .stdin(password)
}

pub fn logout_command(registry: &str) -> CommandSpec {
    CommandSpec::new(DOCKER).args(["logout", registry])
}

/// `docker build -f <dockerfile> -t <tag> -t <image>:latest <context>`
pub fn build_command(dockerfile: &Path, tag: &str, image: &str, context: &Path) -> CommandSpec {
    CommandSpec::new(DOCKER)
        .arg("build")
        .arg("-f")
        .arg(dockerfile.to_string_lossy())
        .args(["-t", tag])
        .arg("-t")
        .arg(format!("{}:latest", image))
        .arg(context.to_string_lossy())
}

pub fn stack_deploy_command(compose_file: &Path, stack: &str) -> CommandSpec {
    CommandSpec::new(DOCKER)
        .args(["stack", "deploy", "--prune", "--with-registry-auth", "-c"])
        .arg(compose_file.to_string_lossy())
        .arg(stack)
}

/// docker CLI 操作をまとめたクライアント
pub struct DockerCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> DockerCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    pub async fn login(&self, registry: &str, user: &str, password: &str) -> Result<()> {
        info!(registry, user, "docker login");
        self.runner
            .run(&login_command(registry, user, password))
            .await
    }

    pub async fn logout(&self, registry: &str) -> Result<()> {
        info!(registry, "docker logout");
        self.runner.run(&logout_command(registry)).await
    }

    pub async fn build(&self, dockerfile: &Path, tag: &str, image: &str, context: &Path) -> Result<()> {
        info!(tag, context = %context.display(), "docker build");
        self.runner
            .run(&build_command(dockerfile, tag, image, context))
            .await
    }

    pub async fn stack_deploy(&self, compose_file: &Path, stack: &str) -> Result<()> {
        info!(stack, compose = %compose_file.display(), "docker stack deploy");
        self.runner
            .run(&stack_deploy_command(compose_file, stack))
            .await
    }
}
