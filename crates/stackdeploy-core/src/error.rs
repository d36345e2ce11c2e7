use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(
        "イメージ形式が不正です: '{image}'\nヒント: イメージは registry/image-os-arch の形式で指定してください"
    )]
    InvalidImageFormat { image: String },

    #[error("不正なOS '{os}' です。'windows' または 'linux' を指定してください")]
    InvalidOs { os: String },

    #[error("型が一致しません: {path} は {expected} である必要があります（実際: {actual}）")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("必須キーがありません: {0}")]
    MissingKey(String),

    #[error("シークレット '{secret}' のファイルが見つかりません: {path}")]
    SecretFileNotFound { secret: String, path: PathBuf },

    #[error(
        "'{owner}' の書き出し先 '{name}' はファイル名として使用できません\nヒント: パス区切りや '..' を含まない名前にしてください"
    )]
    InvalidOutputName { owner: String, name: String },

    #[error("'{owner}' の書き出し先が入力または出力ファイルと重なります: {path}")]
    OutputCollision { owner: String, path: PathBuf },

    #[error("サービス '{service}' の genssl には target の指定が必要です")]
    GensslTargetMissing { service: String },

    #[error(
        "既存のシークレット '{secret}' から公開証明書を取得できません\nヒント: docker secret rm {secret} で削除すると再生成されます"
    )]
    PublicCertUnavailable { secret: String },

    #[error("IO エラー: {path}\n理由: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSONパースエラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML生成エラー: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("証明書の生成に失敗しました: {0}")]
    Certificate(#[from] openssl::error::ErrorStack),

    #[error("シークレットの照会に失敗しました: {0}")]
    Registry(String),

    #[error("イメージのビルドに失敗しました: {0}")]
    Build(String),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
