//! デプロイパイプライン
//!
//! ログイン → 記述子の変換 → compose 出力 → stack deploy の順に実行し、
//! 成否にかかわらず生成ファイルの削除とログアウトを行います。

use colored::Colorize;
use stackdeploy_build::{GitCredentials, ImageBuilder};
use stackdeploy_config::DeployConfig;
use stackdeploy_container::{CommandRunner, DockerCli};
use stackdeploy_core::{
    Artifacts, CertificateIssuer, SecretRegistry, TransformOptions, Transformer, emit,
    load_descriptor,
};
use tracing::{info, instrument, warn};

/// パイプラインが利用する外部とのやり取り
pub struct Collaborators<'a> {
    pub runner: &'a dyn CommandRunner,
    pub registry: &'a dyn SecretRegistry,
    pub issuer: &'a dyn CertificateIssuer,
}

/// デプロイを実行
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn run(config: &DeployConfig, deps: Collaborators<'_>) -> anyhow::Result<()> {
    let docker = DockerCli::new(deps.runner);

    let login = config.registry_login()?;
    if let Some(login) = &login {
        println!("{} {}", "レジストリにログイン中:".blue(), login.registry.cyan());
        docker
            .login(&login.registry, &login.user, &login.password)
            .await?;
    }

    let mut artifacts = Artifacts::new();
    let result = deploy(config, &docker, &deps, &mut artifacts).await;

    if config.keep {
        if !artifacts.is_empty() {
            println!(
                "{}",
                "⚠ --keep が指定されたため生成ファイルを残します（シークレットを含みます）".yellow()
            );
        }
    } else {
        artifacts.cleanup(config.verbose);
    }

    if let Some(login) = &login
        && let Err(e) = docker.logout(&login.registry).await
    {
        warn!(registry = %login.registry, error = %e, "docker logout failed");
    }

    result
}

async fn deploy(
    config: &DeployConfig,
    docker: &DockerCli<'_>,
    deps: &Collaborators<'_>,
    artifacts: &mut Artifacts,
) -> anyhow::Result<()> {
    let descriptor = load_descriptor(&config.input)?;
    let stack = descriptor.stack;
    let mut document = descriptor.document;
    println!("{} {}", "スタック:".blue(), stack.cyan());

    let builder = ImageBuilder::new(deps.runner)
        .with_auto_tag(config.auto_tag)
        .with_git_credentials(GitCredentials {
            user: config.repo_user.clone(),
            password: config.repo_password.clone(),
        });

    let protected = [config.input.clone(), config.output.clone()];
    Transformer::new(
        &stack,
        config.input_dir(),
        config.output_dir(),
        deps.registry,
        deps.issuer,
    )
    .with_options(TransformOptions {
        build: config.build,
        deploy: config.deploy,
    })
    .with_builder(&builder)
    .with_protected(&protected)
    .transform(&mut document, artifacts)
    .await?;

    emit::write(&document, &config.output, artifacts, config.verbose)?;
    println!(
        "{} {}",
        "✓ compose ファイルを生成しました:".green(),
        config.output.display()
    );

    if config.deploy {
        docker.stack_deploy(&config.output, &stack).await?;
        println!("{}", format!("✓ スタック '{}' をデプロイしました", stack).green().bold());
    } else {
        info!("deploy skipped");
    }

    Ok(())
}
