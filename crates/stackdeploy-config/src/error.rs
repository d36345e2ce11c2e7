use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "デプロイ記述子が見つかりません: {0}\n\
        -c/--config で指定するか、STACKDEPLOY_CONFIG 環境変数で直接指定できます"
    )]
    InputNotFound(PathBuf),

    #[error(
        "レジストリ '{registry}' にログインするにはユーザー名とパスワードが必要です\n\
        ヒント: --reguser と --regpass を指定してください"
    )]
    MissingRegistryCredentials { registry: String },

    #[error("設定ファイルの読み込みに失敗しました: {path}\n理由: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
