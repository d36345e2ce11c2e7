//! ビルドコンテキストのgitリポジトリ同期
//!
//! 認証情報は引数に含めず、環境変数を読むインラインの credential helper 経由で渡します。

use crate::error::{BuildError, Result};
use colored::Colorize;
use stackdeploy_container::{CommandRunner, CommandSpec};
use std::path::Path;
use tracing::info;

const USER_ENV: &str = "STACKDEPLOY_GIT_USERNAME";
const PASSWORD_ENV: &str = "STACKDEPLOY_GIT_PASSWORD";

/// リポジトリの認証情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl GitCredentials {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.password.is_none()
    }
}

pub struct GitSync<'a> {
    runner: &'a dyn CommandRunner,
    credentials: GitCredentials,
}

impl<'a> GitSync<'a> {
    pub fn new(runner: &'a dyn CommandRunner, credentials: GitCredentials) -> Self {
        Self {
            runner,
            credentials,
        }
    }

    /// `context` が存在すれば pull、なければ clone
    pub async fn sync(&self, repo: &str, context: &Path) -> Result<()> {
        let spec = if context.is_dir() {
            println!("  {} {}", "↻ Pulling changes to".cyan(), context.display());
            info!(repo, context = %context.display(), "git pull");
            self.pull_command(context)
        } else {
            println!(
                "  {} {} → {}",
                "⬇ Cloning".cyan(),
                repo,
                context.display()
            );
            info!(repo, context = %context.display(), "git clone");
            self.clone_command(repo, context)
        };

        self.runner
            .run(&spec)
            .await
            .map_err(|source| BuildError::GitFailed {
                repo: repo.to_string(),
                source,
            })
    }

    pub fn clone_command(&self, repo: &str, context: &Path) -> CommandSpec {
        self.base_command()
            .args(["clone", repo])
            .arg(context.to_string_lossy())
    }

    pub fn pull_command(&self, context: &Path) -> CommandSpec {
        self.base_command().arg("pull").current_dir(context)
    }

    fn base_command(&self) -> CommandSpec {
        // 対話的なパスワード入力で止まらないようにする
        let mut spec = CommandSpec::new("git").env("GIT_TERMINAL_PROMPT", "0");
        if self.credentials.is_empty() {
            return spec;
        }

        // 空の helper で既存の helper をリセットしてから追加する
        spec = spec.args([
            "-c".to_string(),
            "credential.helper=".to_string(),
            "-c".to_string(),
            format!(
                "credential.helper=!f() {{ echo \"username=${{{}}}\"; echo \"password=${{{}}}\"; }}; f",
                USER_ENV, PASSWORD_ENV
            ),
        ]);
        spec.env(
            USER_ENV,
            self.credentials.user.clone().unwrap_or_default(),
        )
        .env(
            PASSWORD_ENV,
            self.credentials.password.clone().unwrap_or_default(),
        )
    }
}
