use stackdeploy_container::ContainerError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Git operation failed for {repo}: {source}")]
    GitFailed {
        repo: String,
        #[source]
        source: ContainerError,
    },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. Dockerfileのパスを確認してください\n\
                     2. build.dockerfile でパスを明示的に指定してください",
                    path.display()
                )
            }
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドコンテキストが見つかりません: {}\n\
                     \n\
                     build.context のパスを確認してください。",
                    path.display()
                )
            }
            BuildError::GitFailed { repo, source } => {
                format!(
                    "リポジトリ {} の取得に失敗しました: {}\n\
                     \n\
                     --repouser / --repopass の認証情報を確認してください。",
                    repo, source
                )
            }
            _ => format!("{}", self),
        }
    }
}

impl From<BuildError> for stackdeploy_core::DeployError {
    fn from(err: BuildError) -> Self {
        stackdeploy_core::DeployError::Build(err.user_message())
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
pub type Result<T> = BuildResult<T>;
