//! デプロイ記述子の読み込み

use crate::document::Node;
use crate::error::{DeployError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// 読み込んだデプロイ記述子
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// スタック名（`stack` キー）
    pub stack: String,
    /// `stack` を除いたドキュメント（キー順は記述子のまま）
    pub document: Node,
    pub path: PathBuf,
    /// 相対パスの基準となる記述子のディレクトリ
    pub base_dir: PathBuf,
}

/// JSON記述子ファイルを読み込む
#[instrument(fields(path = %path.display()))]
pub fn load_descriptor(path: &Path) -> Result<Descriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
    let descriptor = parse_descriptor(&content, path)?;
    info!(stack = %descriptor.stack, "descriptor loaded");
    Ok(descriptor)
}

/// JSON文字列から記述子を構築
pub fn parse_descriptor(json: &str, path: &Path) -> Result<Descriptor> {
    let mut document = Node::from_json_str(json)?;
    let root = document.expect_map_mut("$")?;

    let stack = root
        .shift_remove("stack")
        .ok_or_else(|| DeployError::MissingKey("stack".to_string()))?
        .expect_str("stack")?
        .to_string();

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(Descriptor {
        stack,
        document,
        path: path.to_path_buf(),
        base_dir,
    })
}
