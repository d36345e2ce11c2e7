//! 記述子ドキュメントツリー
//!
//! JSON記述子を挿入順を保ったまま保持する型付きツリーです。
//! 型が想定と異なる場合はパス付きの `TypeMismatch` を返します。

use crate::error::{DeployError, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// 挿入順を保持するマップ
pub type Map = IndexMap<String, Node>;

/// ドキュメントのノード
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Node>),
    Map(Map),
}

impl Node {
    /// JSON文字列からツリーを生成
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(value.into())
    }

    /// 空のマップノード
    pub fn map() -> Self {
        Node::Map(Map::new())
    }

    /// 空のリストノード
    pub fn list() -> Self {
        Node::List(Vec::new())
    }

    /// エラーメッセージ用の型名
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::List(_) => "list",
            Node::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::List(l) => Some(l),
            _ => None,
        }
    }

    /// マップの子要素を取得（マップ以外は None）
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    pub fn expect_str(&self, path: &str) -> Result<&str> {
        self.as_str().ok_or_else(|| self.mismatch(path, "string"))
    }

    pub fn expect_map(&self, path: &str) -> Result<&Map> {
        match self {
            Node::Map(m) => Ok(m),
            other => Err(other.mismatch(path, "map")),
        }
    }

    pub fn expect_map_mut(&mut self, path: &str) -> Result<&mut Map> {
        match self {
            Node::Map(m) => Ok(m),
            other => Err(other.mismatch(path, "map")),
        }
    }

    pub fn expect_list_mut(&mut self, path: &str) -> Result<&mut Vec<Node>> {
        match self {
            Node::List(l) => Ok(l),
            other => Err(other.mismatch(path, "list")),
        }
    }

    /// キーパスに沿ってノードを取得し、存在しなければ作成する
    ///
    /// 途中のノードは空のマップとして、末端のノードは `leaf` として挿入されます。
    /// 既存の途中ノードがマップでない場合は `TypeMismatch` になります。
    pub fn ensure_path(&mut self, at: &str, keys: &[&str], leaf: Node) -> Result<&mut Node> {
        let Some((last, parents)) = keys.split_last() else {
            return Ok(self);
        };

        let mut current = self;
        let mut trail = at.to_string();
        for key in parents {
            let map = current.expect_map_mut(&trail)?;
            trail = format!("{}.{}", trail, key);
            current = map.entry((*key).to_string()).or_insert_with(Node::map);
        }

        let map = current.expect_map_mut(&trail)?;
        Ok(map.entry((*last).to_string()).or_insert(leaf))
    }

    /// 正規化JSON（コンパクト形式、キー順保持）
    pub fn to_canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn mismatch(&self, path: &str, expected: &'static str) -> DeployError {
        DeployError::TypeMismatch {
            path: path.to_string(),
            expected,
            actual: self.kind(),
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Node::Null,
            serde_json::Value::Bool(b) => Node::Bool(b),
            serde_json::Value::Number(n) => Node::Number(n),
            serde_json::Value::String(s) => Node::String(s),
            serde_json::Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            serde_json::Value::Object(entries) => Node::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<Map> for Node {
    fn from(value: Map) -> Self {
        Node::Map(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::List(value)
    }
}

/// `[(key, value), ...]` からマップノードを組み立てる
pub fn map_of<const N: usize>(entries: [(&str, Node); N]) -> Node {
    Node::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}
