//! compose ファイルの出力

use crate::artifacts::Artifacts;
use crate::document::Node;
use crate::error::{DeployError, Result};
use std::path::Path;
use tracing::debug;

/// compose ファイルの先頭行
pub const COMPOSE_VERSION_LINE: &str = "version: '3.5'";

/// 出力しないトップレベルキー
const OMITTED_KEYS: [&str; 2] = ["stack", "version"];

/// ドキュメントを compose 形式のYAMLに変換
pub fn render(document: &Node) -> Result<String> {
    let body = match document.as_map() {
        Some(map) if OMITTED_KEYS.iter().any(|k| map.contains_key(*k)) => {
            let mut trimmed = map.clone();
            for key in OMITTED_KEYS {
                if trimmed.shift_remove(key).is_some() {
                    debug!(key, "top-level key omitted from compose output");
                }
            }
            serde_yaml::to_string(&Node::Map(trimmed))?
        }
        _ => serde_yaml::to_string(document)?,
    };
    Ok(format!("{}\n{}", COMPOSE_VERSION_LINE, body))
}

/// compose ファイルを書き出す
///
/// 書き込みに失敗した場合も削除できるよう、書き込み前に `artifacts` に登録します。
pub fn write(document: &Node, path: &Path, artifacts: &mut Artifacts, verbose: bool) -> Result<()> {
    let yaml = render(document)?;
    if verbose {
        println!("{}", yaml);
    }

    artifacts.track(path);
    std::fs::write(path, &yaml).map_err(|e| DeployError::io(path, e))?;
    debug!(path = %path.display(), "compose file written");
    Ok(())
}
