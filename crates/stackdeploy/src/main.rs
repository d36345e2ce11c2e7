use colored::Colorize;
use stackdeploy::{Cli, Collaborators, resolve_config};
use stackdeploy_config::UserDefaults;
use stackdeploy_container::{ProcessRunner, SwarmSecrets};
use stackdeploy_core::SelfSignedIssuer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_normalized();

    // ログはstderrに出力（RUST_LOG が優先）
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let defaults = UserDefaults::load()?;
    let config = resolve_config(&cli, &defaults)?;

    if cli.local {
        let dir = config.input_dir();
        std::env::set_current_dir(dir)?;
        tracing::debug!(dir = %dir.display(), "changed working directory");
    }

    println!(
        "{} {}",
        "デプロイ記述子:".blue(),
        config.input.display().to_string().cyan()
    );

    let registry = SwarmSecrets::lazy();
    stackdeploy::run(
        &config,
        Collaborators {
            runner: &ProcessRunner,
            registry: &registry,
            issuer: &SelfSignedIssuer,
        },
    )
    .await
}
