use crate::error::Result;
use crate::git::{GitCredentials, GitSync};
use crate::resolver::BuildResolver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colored::Colorize;
use stackdeploy_container::{CommandRunner, DockerCli};
use stackdeploy_core::{BuildRequest, ImageBuild};

/// 自動タグの書式（UTC）
pub const AUTO_TAG_FORMAT: &str = "%Y%m%d%H%M%S";

/// イメージに付けるタグを決定
///
/// 自動タグが有効なら `image:yyyyMMddHHmmss`、無効なら `image` のまま。
pub fn resolve_tag(image: &str, auto_tag: bool, now: DateTime<Utc>) -> String {
    if auto_tag {
        format!("{}:{}", image, now.format(AUTO_TAG_FORMAT))
    } else {
        image.to_string()
    }
}

/// docker CLI でイメージをビルドする
pub struct ImageBuilder<'a> {
    runner: &'a dyn CommandRunner,
    auto_tag: bool,
    credentials: GitCredentials,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            auto_tag: true,
            credentials: GitCredentials::default(),
        }
    }

    pub fn with_auto_tag(mut self, auto_tag: bool) -> Self {
        self.auto_tag = auto_tag;
        self
    }

    pub fn with_git_credentials(mut self, credentials: GitCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// イメージをビルドしてタグを返す
    pub async fn build_image(&self, request: &BuildRequest<'_>) -> Result<String> {
        let resolved = BuildResolver::new(request.base_dir).resolve(request.spec);

        if let Some(repo) = &request.spec.repo {
            GitSync::new(self.runner, self.credentials.clone())
                .sync(repo, &resolved.context)
                .await?;
        }
        resolved.verify()?;

        let tag = resolve_tag(request.image, self.auto_tag, Utc::now());
        println!(
            "{} {} ({})",
            "🔨 Building".green().bold(),
            tag.cyan(),
            request.service
        );
        tracing::info!(
            service = request.service,
            image = request.image,
            tag = %tag,
            context = %resolved.context.display(),
            dockerfile = %resolved.dockerfile.display(),
            "Building image"
        );

        DockerCli::new(self.runner)
            .build(&resolved.dockerfile, &tag, request.image, &resolved.context)
            .await?;

        tracing::info!("Successfully built: {}", tag);
        Ok(tag)
    }
}

#[async_trait]
impl ImageBuild for ImageBuilder<'_> {
    async fn build(&self, request: BuildRequest<'_>) -> stackdeploy_core::Result<String> {
        Ok(self.build_image(&request).await?)
    }
}
