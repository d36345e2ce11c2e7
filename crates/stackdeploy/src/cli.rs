use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// 旧来の単一ダッシュ形式のオプションと、対応する現在の形式
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-keep", "--keep"),
    ("-build", "--build"),
    ("-noAutoTag", "--no-auto-tag"),
    ("-nodeploy", "--no-deploy"),
    ("-reg", "--registry"),
    ("-user", "--reguser"),
    ("-reguser", "--reguser"),
    ("-pass", "--regpass"),
    ("-regpass", "--regpass"),
    ("-repouser", "--repouser"),
    ("-repopass", "--repopass"),
];

/// 次の引数を値として取るオプション（正規化後の表記）
const VALUE_OPTIONS: &[&str] = &[
    "-c",
    "--config",
    "-o",
    "--output",
    "--registry",
    "--reg",
    "--reguser",
    "--user",
    "--regpass",
    "--pass",
    "--repouser",
    "--repopass",
];

#[derive(Parser, Debug)]
#[command(name = "stackdeploy", version)]
#[command(about = "JSONのデプロイ記述子から Docker Swarm スタックをデプロイ", long_about = None)]
pub struct Cli {
    /// デプロイ記述子（デフォルト: ./docker-compose.json）
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 出力する compose ファイル（デフォルト: 記述子と同じディレクトリの docker-compose.yml）
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// 詳細表示（生成したYAMLも表示）
    #[arg(short, long)]
    pub verbose: bool,

    /// 生成したファイルを削除しない（シークレットが残るので注意）
    #[arg(long)]
    pub keep: bool,

    /// デプロイ前にイメージをビルド
    #[arg(long)]
    pub build: bool,

    /// ビルドしたイメージに日時タグを付けない
    #[arg(long = "no-auto-tag")]
    pub no_auto_tag: bool,

    /// デプロイしない（--build と組み合わせてビルドのみ）
    #[arg(long = "no-deploy")]
    pub no_deploy: bool,

    /// 記述子のディレクトリに移動して実行
    #[arg(short = 'l', long)]
    pub local: bool,

    /// ログインするレジストリ
    #[arg(long = "registry", visible_alias = "reg", env = "STACKDEPLOY_REGISTRY")]
    pub registry: Option<String>,

    /// レジストリのユーザー名
    #[arg(
        long = "reguser",
        visible_alias = "user",
        env = "STACKDEPLOY_REGISTRY_USER",
        allow_hyphen_values = true
    )]
    pub registry_user: Option<String>,

    /// レジストリのパスワード
    #[arg(
        long = "regpass",
        visible_alias = "pass",
        env = "STACKDEPLOY_REGISTRY_PASSWORD",
        hide_env_values = true,
        allow_hyphen_values = true
    )]
    pub registry_password: Option<String>,

    /// gitリポジトリのユーザー名
    #[arg(
        long = "repouser",
        env = "STACKDEPLOY_REPO_USER",
        allow_hyphen_values = true
    )]
    pub repo_user: Option<String>,

    /// gitリポジトリのパスワード
    #[arg(
        long = "repopass",
        env = "STACKDEPLOY_REPO_PASSWORD",
        hide_env_values = true,
        allow_hyphen_values = true
    )]
    pub repo_password: Option<String>,
}

impl Cli {
    /// 旧形式のオプションを受け付けてパース
    pub fn parse_normalized() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// 旧来の `-keep` などを clap が解釈できる形式に置き換える
///
/// オプションの値と `--` 以降の引数は置き換えない。
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut expects_value = false;
    let mut passthrough = false;

    for arg in args.into_iter().map(Into::into) {
        if passthrough || expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let arg = LEGACY_FLAGS
            .iter()
            .find(|(legacy, _)| arg == *legacy)
            .map(|(_, current)| OsString::from(current))
            .unwrap_or(arg);
        expects_value = VALUE_OPTIONS.iter().any(|option| arg == *option);
        normalized.push(arg);
    }
    normalized
}
