use crate::error::{BuildError, Result};
use stackdeploy_core::BuildSpec;
use std::path::{Path, PathBuf};

const DEFAULT_CONTEXT: &str = ".";
const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// 解決済みのビルド対象
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    pub context: PathBuf,
    pub dockerfile: PathBuf,
}

impl ResolvedBuild {
    /// コンテキストとDockerfileが存在するか確認
    ///
    /// リポジトリを取得する場合は取得後に呼び出します。
    pub fn verify(&self) -> Result<()> {
        if !self.context.is_dir() {
            return Err(BuildError::ContextNotFound(self.context.clone()));
        }
        if !self.dockerfile.is_file() {
            return Err(BuildError::DockerfileNotFound(self.dockerfile.clone()));
        }
        Ok(())
    }
}

pub struct BuildResolver {
    base_dir: PathBuf,
}

impl BuildResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// ビルドコンテキストのパスを解決
    ///
    /// デフォルトは記述子のディレクトリ
    pub fn resolve_context(&self, spec: &BuildSpec) -> PathBuf {
        self.base_dir
            .join(spec.context.as_deref().unwrap_or(DEFAULT_CONTEXT))
    }

    /// Dockerfileのパスを解決（コンテキストからの相対）
    pub fn resolve_dockerfile(&self, context: &Path, spec: &BuildSpec) -> PathBuf {
        context.join(spec.dockerfile.as_deref().unwrap_or(DEFAULT_DOCKERFILE))
    }

    pub fn resolve(&self, spec: &BuildSpec) -> ResolvedBuild {
        let context = self.resolve_context(spec);
        let dockerfile = self.resolve_dockerfile(&context, spec);
        tracing::debug!(
            context = %context.display(),
            dockerfile = %dockerfile.display(),
            "build resolved"
        );
        ResolvedBuild {
            context,
            dockerfile,
        }
    }
}
