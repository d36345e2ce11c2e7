//! Swarm上の既存シークレットの照会

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// スタックの名前空間を表すラベル（`docker stack deploy` が付与する）
pub const STACK_NAMESPACE_LABEL: &str = "com.docker.stack.namespace";

/// Swarmに登録済みのシークレット
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistingSecret {
    pub name: String,
    pub labels: HashMap<String, String>,
}

impl ExistingSecret {
    /// 指定スタックの名前空間に属するか
    pub fn belongs_to(&self, stack: &str) -> bool {
        self.labels
            .get(STACK_NAMESPACE_LABEL)
            .is_some_and(|ns| ns == stack)
    }
}

#[async_trait]
pub trait SecretRegistry: Send + Sync {
    /// スタック `stack` の名前空間にある `name` という名前のシークレットを探す
    async fn find(&self, stack: &str, name: &str) -> Result<Option<ExistingSecret>>;
}

/// シークレット一覧から名前空間と名前が一致するものを選ぶ
pub fn find_in<'a>(
    secrets: &'a [ExistingSecret],
    stack: &str,
    name: &str,
) -> Option<&'a ExistingSecret> {
    secrets
        .iter()
        .find(|s| s.name == name && s.belongs_to(stack))
}
