//! サービスの `build` 定義

use crate::document::Node;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// `build` セクション
///
/// 文字列の場合はコンテキストのパスとして扱います（compose の短縮記法）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSpec {
    pub context: Option<String>,
    pub repo: Option<String>,
    pub dockerfile: Option<String>,
}

impl BuildSpec {
    pub fn from_node(node: &Node, path: &str) -> Result<Self> {
        if let Some(context) = node.as_str() {
            return Ok(Self {
                context: Some(context.to_string()),
                ..Default::default()
            });
        }

        let map = node.expect_map(path)?;
        let field = |key: &str| -> Result<Option<String>> {
            map.get(key)
                .map(|v| v.expect_str(&format!("{}.{}", path, key)).map(str::to_string))
                .transpose()
        };

        Ok(Self {
            context: field("context")?,
            repo: field("repo")?,
            dockerfile: field("dockerfile")?,
        })
    }
}

/// ビルド要求
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub service: &'a str,
    /// タグなしのイメージ名（記述子の `image`）
    pub image: &'a str,
    pub spec: &'a BuildSpec,
    /// 相対パスの基準ディレクトリ
    pub base_dir: &'a Path,
}

#[async_trait]
pub trait ImageBuild: Send + Sync {
    /// イメージをビルドし、compose に書き込むタグを返す
    async fn build(&self, request: BuildRequest<'_>) -> Result<String>;
}
