//! 生成ファイルの追跡と後片付け

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 実行中に生成したファイル（シークレット、証明書、composeファイル）
#[derive(Debug, Default)]
pub struct Artifacts {
    files: Vec<PathBuf>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// 削除対象として記録
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 記録したファイルをすべて削除する
    ///
    /// 1つの削除に失敗しても残りの削除は続行します。
    /// 戻り値は削除できなかったファイル。
    pub fn cleanup(&mut self, verbose: bool) -> Vec<PathBuf> {
        let mut failed = Vec::new();

        for file in self.files.drain(..) {
            if verbose {
                println!("Cleanup {}", file.display());
            }
            if let Err(e) = remove_file(&file) {
                warn!(
                    path = %file.display(),
                    error = %e,
                    "ファイルを削除できませんでした。残りのファイルの削除を続行します"
                );
                failed.push(file);
            }
        }

        failed
    }
}

fn remove_file(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            Ok(())
        }
        // 作成前に失敗した場合など
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
