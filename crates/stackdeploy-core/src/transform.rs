//! サービス定義の変換
//!
//! 記述子の各サービスを Swarm 用の compose 定義に変換します。
//!
//! 1. `image` からデプロイ先OSを判定
//! 2. `build` があればビルド（有効時のみ）し、`build` キーは常に削除
//! 3. `deploy.placement.constraints` にOS制約を追加
//! 4. `volumes` / `secrets` の `~:/` パスをOSのルートに置換
//! 5. `ext.genssl` とラベル内マーカーによるTLS証明書の自動生成（デプロイ時のみ）
//!
//! 最後に `secrets` セクションを実体化し、生成した証明書シークレットをマージします。

use crate::artifacts::Artifacts;
use crate::buildspec::{BuildRequest, BuildSpec, ImageBuild};
use crate::document::{Map, Node, map_of};
use crate::error::{DeployError, Result};
use crate::image::{ImageRef, TargetOs};
use crate::registry::SecretRegistry;
use crate::secrets::{OutputDir, SecretMaterializer, compose_relative, merge_generated};
use crate::tls::CertificateIssuer;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// ラベル内でPEM公開証明書に置換されるマーカー
pub const PUBLIC_CERT_MARKER: &str = "{{ssl.publiccert}}";

/// ラベル経由で生成したシークレットに公開証明書を保存するラベル
pub const PUBLIC_CERT_LABEL: &str = "stackdeploy.publiccert";

const CONSTRAINTS_PATH: [&str; 3] = ["deploy", "placement", "constraints"];

#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    /// `build` のあるサービスをビルドする
    pub build: bool,
    /// デプロイを行う（証明書の照会・生成はデプロイ時のみ）
    pub deploy: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            build: false,
            deploy: true,
        }
    }
}

pub struct Transformer<'a> {
    stack: &'a str,
    input_dir: &'a Path,
    output_dir: &'a Path,
    protected: &'a [PathBuf],
    options: TransformOptions,
    registry: &'a dyn SecretRegistry,
    issuer: &'a dyn CertificateIssuer,
    builder: Option<&'a dyn ImageBuild>,
}

impl<'a> Transformer<'a> {
    pub fn new(
        stack: &'a str,
        input_dir: &'a Path,
        output_dir: &'a Path,
        registry: &'a dyn SecretRegistry,
        issuer: &'a dyn CertificateIssuer,
    ) -> Self {
        Self {
            stack,
            input_dir,
            output_dir,
            protected: &[],
            options: TransformOptions::default(),
            registry,
            issuer,
            builder: None,
        }
    }

    pub fn with_options(mut self, options: TransformOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_builder(mut self, builder: &'a dyn ImageBuild) -> Self {
        self.builder = Some(builder);
        self
    }

    /// 生成ファイルで上書きしてはいけないファイル（記述子、compose ファイル）
    pub fn with_protected(mut self, protected: &'a [PathBuf]) -> Self {
        self.protected = protected;
        self
    }

    fn output(&self) -> OutputDir<'a> {
        OutputDir::new(self.output_dir).with_protected(self.protected)
    }

    /// ドキュメント全体（`stack` 除去済み）を変換
    #[instrument(skip_all, fields(stack = %self.stack))]
    pub async fn transform(&self, document: &mut Node, artifacts: &mut Artifacts) -> Result<()> {
        let root = document.expect_map_mut("$")?;

        let declared = match root.get("secrets") {
            Some(node) => node.expect_map("secrets")?.clone(),
            None => Map::new(),
        };
        let materializer = SecretMaterializer::new(self.stack, self.input_dir, self.output());
        materializer.validate(&declared)?;

        let mut generated = Map::new();
        let services = root
            .get_mut("services")
            .ok_or_else(|| DeployError::MissingKey("services".to_string()))?
            .expect_map_mut("services")?;
        for (name, service) in services.iter_mut() {
            self.transform_service(name, service, &mut generated, artifacts)
                .await?;
        }
        info!(services = services.len(), "services transformed");

        let mut secrets = materializer.materialize(&declared, artifacts)?;
        merge_generated(&mut secrets, generated);

        if !secrets.is_empty() || root.contains_key("secrets") {
            root.insert("secrets".to_string(), Node::Map(secrets));
        }

        Ok(())
    }

    async fn transform_service(
        &self,
        name: &str,
        service: &mut Node,
        generated: &mut Map,
        artifacts: &mut Artifacts,
    ) -> Result<()> {
        let path = format!("services.{}", name);
        let map = service.expect_map_mut(&path)?;

        let image = map
            .get("image")
            .ok_or_else(|| DeployError::MissingKey(format!("{}.image", path)))?
            .expect_str(&format!("{}.image", path))?
            .to_string();
        let image_ref = ImageRef::parse(&image)?;
        let os = image_ref.os;
        debug!(service = name, os = %os, arch = %image_ref.arch, "target platform");

        if let Some(build) = map.shift_remove("build") {
            self.build_image(name, &image, &build, &path, map).await?;
        }
        let ext = map.shift_remove("ext");

        service
            .ensure_path(&path, &CONSTRAINTS_PATH, Node::list())?
            .expect_list_mut(&format!("{}.deploy.placement.constraints", path))?
            .push(os.placement_constraint().into());

        rewrite_volumes(service, os, &path)?;

        if self.options.deploy {
            if let Some(genssl) = ext.as_ref().and_then(|e| e.get("genssl")) {
                self.attach_generated_cert(name, service, genssl, generated, artifacts)
                    .await?;
            }
            self.substitute_label_certs(name, service, generated, artifacts)
                .await?;
        }

        rewrite_secret_targets(service, os, &path)?;
        Ok(())
    }

    async fn build_image(
        &self,
        name: &str,
        image: &str,
        build: &Node,
        path: &str,
        service: &mut Map,
    ) -> Result<()> {
        if !self.options.build {
            return Ok(());
        }
        let Some(builder) = self.builder else {
            debug!(service = name, "no image builder configured, skipping build");
            return Ok(());
        };

        let spec = BuildSpec::from_node(build, &format!("{}.build", path))?;
        let tag = builder
            .build(BuildRequest {
                service: name,
                image,
                spec: &spec,
                base_dir: self.input_dir,
            })
            .await?;
        service.insert("image".to_string(), tag.into());
        Ok(())
    }

    /// `ext.genssl`: 既存のシークレットがあれば外部参照、なければ証明書を生成
    async fn attach_generated_cert(
        &self,
        name: &str,
        service: &mut Node,
        genssl: &Node,
        generated: &mut Map,
        artifacts: &mut Artifacts,
    ) -> Result<()> {
        let path = format!("services.{}", name);
        let target = genssl
            .get("target")
            .ok_or_else(|| DeployError::GensslTargetMissing {
                service: name.to_string(),
            })?
            .expect_str(&format!("{}.ext.genssl.target", path))?
            .to_string();

        let key = format!("auto_ssl_{}_{}", self.stack, name);
        let secret_name = format!("{}_{}_ssl", self.stack, name);

        let entry = match self.registry.find(self.stack, &secret_name).await? {
            Some(_) => {
                info!(
                    secret = %secret_name,
                    "既存のSSLシークレットが見つかりました。既存の証明書を使用します"
                );
                map_of([
                    ("name", secret_name.into()),
                    ("external", Node::Bool(true)),
                ])
            }
            None => {
                info!(secret = %secret_name, "SSLシークレットがないため新規に作成します");
                let cert = self.issuer.issue(&secret_name)?;
                let file = self
                    .output()
                    .file(&format!("{}.ext.genssl", path), &format!("{}Private.pfx", name))?;
                artifacts.track(&file);
                cert.write_pkcs12(&file)?;
                map_of([
                    ("name", secret_name.into()),
                    ("file", compose_relative(&file, self.output_dir).into()),
                ])
            }
        };
        generated.insert(key.clone(), entry);

        service
            .ensure_path(&path, &["secrets"], Node::list())?
            .expect_list_mut(&format!("{}.secrets", path))?
            .push(map_of([("source", key.into()), ("target", target.into())]));
        Ok(())
    }

    /// ラベル内の公開証明書マーカーを置換
    async fn substitute_label_certs(
        &self,
        name: &str,
        service: &mut Node,
        generated: &mut Map,
        artifacts: &mut Artifacts,
    ) -> Result<()> {
        let path = format!("services.{}", name);
        let has_marker = service
            .get("labels")
            .is_some_and(|labels| label_values(labels).any(|v| v.contains(PUBLIC_CERT_MARKER)));
        if !has_marker {
            return Ok(());
        }

        let key = format!("{}-ssl", name);
        let secret_name = format!("{}_{}", self.stack, key);

        let pem = match self.registry.find(self.stack, &secret_name).await? {
            Some(existing) => {
                info!(secret = %secret_name, "既存のSSLシークレットの公開証明書を使用します");
                let pem = existing.labels.get(PUBLIC_CERT_LABEL).cloned().ok_or(
                    DeployError::PublicCertUnavailable {
                        secret: secret_name.clone(),
                    },
                )?;
                generated.insert(
                    key.clone(),
                    map_of([
                        ("name", secret_name.into()),
                        ("external", Node::Bool(true)),
                    ]),
                );
                pem
            }
            None => {
                info!(secret = %secret_name, "SSLシークレットがないため新規に作成します");
                let cert = self.issuer.issue(&secret_name)?;
                let file = self
                    .output()
                    .file(&format!("{}.labels", path), &format!("{}.pfx", key))?;
                artifacts.track(&file);
                cert.write_pkcs12(&file)?;
                generated.insert(
                    key.clone(),
                    map_of([
                        ("name", secret_name.into()),
                        ("file", compose_relative(&file, self.output_dir).into()),
                        (
                            "labels",
                            map_of([(PUBLIC_CERT_LABEL, cert.public_pem.clone().into())]),
                        ),
                    ]),
                );
                cert.public_pem
            }
        };

        if let Some(labels) = service.as_map_mut().and_then(|m| m.get_mut("labels")) {
            replace_marker(labels, &pem);
        }

        let secrets = service
            .ensure_path(&path, &["secrets"], Node::list())?
            .expect_list_mut(&format!("{}.secrets", path))?;
        if !secrets.iter().any(|s| references(s, &key)) {
            secrets.push(key.into());
        }
        Ok(())
    }
}

fn rewrite_target(entry: &mut Node, os: TargetOs) {
    if let Some(Node::String(target)) = entry.as_map_mut().and_then(|m| m.get_mut("target"))
        && let Some(rewritten) = os.rewrite_rooted(target)
    {
        *target = rewritten;
    }
}

fn rewrite_volumes(service: &mut Node, os: TargetOs, path: &str) -> Result<()> {
    let Some(volumes) = service.as_map_mut().and_then(|m| m.get_mut("volumes")) else {
        return Ok(());
    };

    for volume in volumes.expect_list_mut(&format!("{}.volumes", path))? {
        rewrite_target(volume, os);
        // 長い書式では type が必須
        if let Some(entry) = volume.as_map_mut()
            && matches!(entry.get("type"), None | Some(Node::Null))
        {
            entry.insert("type".to_string(), "volume".into());
        }
    }
    Ok(())
}

fn rewrite_secret_targets(service: &mut Node, os: TargetOs, path: &str) -> Result<()> {
    let Some(secrets) = service.as_map_mut().and_then(|m| m.get_mut("secrets")) else {
        return Ok(());
    };

    for secret in secrets.expect_list_mut(&format!("{}.secrets", path))? {
        rewrite_target(secret, os);
    }
    Ok(())
}

fn label_values(labels: &Node) -> Box<dyn Iterator<Item = &str> + '_> {
    match labels {
        Node::List(items) => Box::new(items.iter().filter_map(Node::as_str)),
        Node::Map(entries) => Box::new(entries.values().filter_map(Node::as_str)),
        _ => Box::new(std::iter::empty()),
    }
}

fn replace_marker(labels: &mut Node, pem: &str) {
    let values: Box<dyn Iterator<Item = &mut Node>> = match labels {
        Node::List(items) => Box::new(items.iter_mut()),
        Node::Map(entries) => Box::new(entries.values_mut()),
        _ => return,
    };
    for value in values {
        if let Node::String(s) = value
            && s.contains(PUBLIC_CERT_MARKER)
        {
            *s = s.replace(PUBLIC_CERT_MARKER, pem);
        }
    }
}

/// サービスの secrets エントリが `key` を参照しているか
fn references(entry: &Node, key: &str) -> bool {
    match entry {
        Node::String(s) => s == key,
        other => other.get("source").and_then(Node::as_str) == Some(key),
    }
}
