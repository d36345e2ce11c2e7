//! stackdeploy のイメージビルド
//!
//! `build` 定義からビルドコンテキストとDockerfileを解決し、必要に応じて
//! gitリポジトリを取得してから docker CLI でイメージをビルドします。

pub mod builder;
pub mod error;
pub mod git;
pub mod resolver;

pub use builder::{ImageBuilder, resolve_tag};
pub use error::{BuildError, BuildResult};
pub use git::{GitCredentials, GitSync};
pub use resolver::{BuildResolver, ResolvedBuild};
