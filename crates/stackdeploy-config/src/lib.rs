pub mod error;

pub use error::*;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 記述子を直接指定する環境変数
pub const CONFIG_ENV: &str = "STACKDEPLOY_CONFIG";

/// デフォルトの記述子ファイル名
pub const DEFAULT_INPUT: &str = "docker-compose.json";

/// デフォルトの出力ファイル名（記述子と同じディレクトリ）
pub const DEFAULT_OUTPUT: &str = "docker-compose.yml";

/// stackdeploy の設定ディレクトリ（`~/.config/stackdeploy`）
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackdeploy"))
}

/// ユーザーごとのデフォルト値（`~/.config/stackdeploy/config.yml`）
///
/// パスワードはファイルに保存しない前提のため、項目に含めていません。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserDefaults {
    pub registry: Option<String>,
    pub registry_user: Option<String>,
    pub repo_user: Option<String>,
    pub auto_tag: Option<bool>,
    pub keep: Option<bool>,
}

impl UserDefaults {
    /// 設定ディレクトリから読み込む（ファイルがなければデフォルト）
    pub fn load() -> Result<Self> {
        match get_config_dir() {
            Ok(dir) => Self::load_from(&dir.join("config.yml")),
            Err(ConfigError::ConfigDirNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let defaults = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "user defaults loaded");
        Ok(defaults)
    }
}

/// デプロイ記述子を探す
///
/// 以下の優先順位で検索:
/// 1. 明示的な指定（-c/--config）
/// 2. 環境変数 STACKDEPLOY_CONFIG
/// 3. カレントディレクトリの docker-compose.json
///
/// 見つかったファイルの絶対パスを返します。
pub fn find_input_file(explicit: Option<&Path>) -> Result<PathBuf> {
    let candidate = match explicit {
        Some(path) => path.to_path_buf(),
        None => match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_INPUT),
        },
    };

    if !candidate.is_file() {
        return Err(ConfigError::InputNotFound(candidate));
    }
    Ok(std::path::absolute(&candidate)?)
}

/// レジストリのログイン情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLogin {
    pub registry: String,
    pub user: String,
    pub password: String,
}

/// 解決済みのデプロイ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// デプロイ記述子（絶対パス）
    pub input: PathBuf,
    /// 出力する compose ファイル
    pub output: PathBuf,
    pub verbose: bool,
    /// 生成したファイルを削除しない
    pub keep: bool,
    /// `build` のあるサービスをビルドする
    pub build: bool,
    pub auto_tag: bool,
    pub deploy: bool,
    pub registry: Option<String>,
    pub registry_user: Option<String>,
    pub registry_password: Option<String>,
    pub repo_user: Option<String>,
    pub repo_password: Option<String>,
}

impl DeployConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = input.with_file_name(DEFAULT_OUTPUT);
        Self {
            input,
            output,
            verbose: false,
            keep: false,
            build: false,
            auto_tag: true,
            deploy: true,
            registry: None,
            registry_user: None,
            registry_password: None,
            repo_user: None,
            repo_password: None,
        }
    }

    /// 未指定の項目をユーザーデフォルトで補う
    pub fn with_defaults(mut self, defaults: &UserDefaults) -> Self {
        if self.registry.is_none() {
            self.registry = defaults.registry.clone();
        }
        if self.registry_user.is_none() {
            self.registry_user = defaults.registry_user.clone();
        }
        if self.repo_user.is_none() {
            self.repo_user = defaults.repo_user.clone();
        }
        self.keep |= defaults.keep.unwrap_or(false);
        self.auto_tag &= defaults.auto_tag.unwrap_or(true);
        self
    }

    /// 記述子のディレクトリ
    pub fn input_dir(&self) -> &Path {
        self.input.parent().unwrap_or_else(|| Path::new("."))
    }

    /// compose ファイルと生成ファイルの出力先ディレクトリ
    pub fn output_dir(&self) -> &Path {
        match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// レジストリが指定されていればログイン情報を返す
    ///
    /// レジストリを指定した場合、ユーザー名とパスワードは必須です。
    pub fn registry_login(&self) -> Result<Option<RegistryLogin>> {
        let Some(registry) = &self.registry else {
            return Ok(None);
        };
        match (&self.registry_user, &self.registry_password) {
            (Some(user), Some(password)) => Ok(Some(RegistryLogin {
                registry: registry.clone(),
                user: user.clone(),
                password: password.clone(),
            })),
            _ => Err(ConfigError::MissingRegistryCredentials {
                registry: registry.clone(),
            }),
        }
    }
}
