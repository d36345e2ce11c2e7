//! stackdeploy
//!
//! JSONのデプロイ記述子を Docker Swarm 用の compose ファイルに変換し、
//! `docker stack deploy` でデプロイします。

pub mod cli;
pub mod pipeline;

pub use cli::{Cli, normalize_args};
pub use pipeline::{Collaborators, run};

use stackdeploy_config::{DeployConfig, UserDefaults, find_input_file};

/// コマンドライン引数とユーザーデフォルトから設定を組み立てる
pub fn resolve_config(cli: &Cli, defaults: &UserDefaults) -> stackdeploy_config::Result<DeployConfig> {
    let input = find_input_file(cli.config.as_deref())?;
    let mut config = DeployConfig::new(input);
    if let Some(output) = &cli.output {
        config.output = std::path::absolute(output)?;
    }
    config.verbose = cli.verbose;
    config.keep = cli.keep;
    config.build = cli.build;
    config.auto_tag = !cli.no_auto_tag;
    config.deploy = !cli.no_deploy;
    config.registry = cli.registry.clone();
    config.registry_user = cli.registry_user.clone();
    config.registry_password = cli.registry_password.clone();
    config.repo_user = cli.repo_user.clone();
    config.repo_password = cli.repo_password.clone();
    Ok(config.with_defaults(defaults))
}
