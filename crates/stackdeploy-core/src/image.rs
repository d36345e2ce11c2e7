//! イメージ名からデプロイ先OSを判定

use crate::error::{DeployError, Result};
use std::fmt;

/// `~:/` で始まるパスはOSごとのルートに置換される
pub const ROOTED_PATH_PREFIX: &str = "~:/";

/// デプロイ先OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    Windows,
    Linux,
}

impl TargetOs {
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "windows" => Ok(TargetOs::Windows),
            "linux" => Ok(TargetOs::Linux),
            other => Err(DeployError::InvalidOs {
                os: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Windows => "windows",
            TargetOs::Linux => "linux",
        }
    }

    /// コンテナ内パスのルート
    pub fn path_root(&self) -> &'static str {
        match self {
            TargetOs::Windows => "c:/",
            TargetOs::Linux => "/",
        }
    }

    /// Swarmの配置制約
    pub fn placement_constraint(&self) -> String {
        format!("node.platform.os == {}", self.as_str())
    }

    /// `~:/` で始まるパスをOSのルートに置換（それ以外はそのまま）
    pub fn rewrite_rooted(&self, path: &str) -> Option<String> {
        path.strip_prefix(ROOTED_PATH_PREFIX)
            .map(|rest| format!("{}{}", self.path_root(), rest))
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `registry/name-<os>-<arch>` 形式のイメージ参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub image: String,
    pub os: TargetOs,
    pub arch: String,
}

impl ImageRef {
    /// イメージ名を `-` で分割し、末尾から2番目をOS、末尾をアーキテクチャとして解釈
    pub fn parse(image: &str) -> Result<Self> {
        let segments: Vec<&str> = image.split('-').collect();
        if segments.len() < 3 {
            return Err(DeployError::InvalidImageFormat {
                image: image.to_string(),
            });
        }

        let os = TargetOs::from_tag(segments[segments.len() - 2])?;
        Ok(Self {
            image: image.to_string(),
            os,
            arch: segments[segments.len() - 1].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux_image() {
        let image = ImageRef::parse("registry.example.com/app-linux-amd64").unwrap();
        assert_eq!(image.os, TargetOs::Linux);
        assert_eq!(image.arch, "amd64");
    }

    #[test]
    fn test_parse_uses_last_two_segments() {
        let image = ImageRef::parse("r/my-long-app-windows-x64").unwrap();
        assert_eq!(image.os, TargetOs::Windows);
        assert_eq!(image.arch, "x64");
    }

    #[test]
    fn test_parse_rejects_short_image() {
        for image in ["nginx", "r/app-linux", ""] {
            let err = ImageRef::parse(image).unwrap_err();
            assert!(
                matches!(err, DeployError::InvalidImageFormat { .. }),
                "{image} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_unknown_os() {
        let err = ImageRef::parse("r/app-darwin-arm64").unwrap_err();
        assert!(matches!(err, DeployError::InvalidOs { ref os } if os == "darwin"));

        // 大文字小文字は区別する
        assert!(TargetOs::from_tag("Linux").is_err());
    }

    #[test]
    fn test_path_roots() {
        assert_eq!(TargetOs::Windows.path_root(), "c:/");
        assert_eq!(TargetOs::Linux.path_root(), "/");
    }

    #[test]
    fn test_rewrite_rooted() {
        assert_eq!(
            TargetOs::Linux.rewrite_rooted("~:/data/x").as_deref(),
            Some("/data/x")
        );
        assert_eq!(
            TargetOs::Windows.rewrite_rooted("~:/data/x").as_deref(),
            Some("c:/data/x")
        );
        assert_eq!(TargetOs::Linux.rewrite_rooted("/already/absolute"), None);
        assert_eq!(TargetOs::Linux.rewrite_rooted("~/home"), None);
    }

    #[test]
    fn test_placement_constraint() {
        assert_eq!(
            TargetOs::Linux.placement_constraint(),
            "node.platform.os == linux"
        );
    }
}
