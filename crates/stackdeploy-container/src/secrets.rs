//! Swarm シークレットの照会（Docker Engine API）

use crate::error::{ContainerError, Result};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::Secret;
use stackdeploy_core::registry::{ExistingSecret, SecretRegistry, find_in};
use tokio::sync::OnceCell;
use tracing::debug;

/// ローカルのDockerソケット経由でSwarmのシークレットを照会する
///
/// 接続は最初の照会時に行います（デプロイしない場合はDockerに接続しない）。
#[derive(Default)]
pub struct SwarmSecrets {
    docker: OnceCell<Docker>,
}

impl SwarmSecrets {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker: OnceCell::new_with(Some(docker)),
        }
    }

    pub fn lazy() -> Self {
        Self::default()
    }

    async fn docker(&self) -> Result<&Docker> {
        self.docker
            .get_or_try_init(|| async {
                Docker::connect_with_local_defaults()
                    .map_err(|e| ContainerError::DockerConnectionFailed(e.to_string()))
            })
            .await
    }

    /// 登録済みシークレットの一覧
    pub async fn list(&self) -> Result<Vec<ExistingSecret>> {
        let secrets = self
            .docker()
            .await?
            .list_secrets(None::<bollard::query_parameters::ListSecretsOptions>)
            .await?;
        Ok(secrets.into_iter().filter_map(to_existing).collect())
    }
}

fn to_existing(secret: Secret) -> Option<ExistingSecret> {
    let spec = secret.spec?;
    Some(ExistingSecret {
        name: spec.name?,
        labels: spec.labels.unwrap_or_default(),
    })
}

#[async_trait]
impl SecretRegistry for SwarmSecrets {
    async fn find(&self, stack: &str, name: &str) -> stackdeploy_core::Result<Option<ExistingSecret>> {
        let secrets = self.list().await?;
        let found = find_in(&secrets, stack, name).cloned();
        debug!(stack, name, found = found.is_some(), "secret lookup");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::SecretSpec;
    use stackdeploy_core::STACK_NAMESPACE_LABEL;
    use std::collections::HashMap;

    #[test]
    fn test_to_existing() {
        let secret = Secret {
            spec: Some(SecretSpec {
                name: Some("shop_web_ssl".to_string()),
                labels: Some(HashMap::from([(
                    STACK_NAMESPACE_LABEL.to_string(),
                    "shop".to_string(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let existing = to_existing(secret).unwrap();
        assert_eq!(existing.name, "shop_web_ssl");
        assert!(existing.belongs_to("shop"));
    }

    #[test]
    fn test_to_existing_without_spec() {
        assert!(to_existing(Secret::default()).is_none());
    }

    #[tokio::test]
    #[ignore = "requires a Docker daemon in swarm mode"]
    async fn test_list_secrets_from_daemon() {
        let swarm = SwarmSecrets::lazy();
        swarm.list().await.unwrap();
    }
}
