//! シークレットの実体化
//!
//! 記述子の `secrets` を compose の secrets 定義に変換します。
//!
//! - `"external"` → `{external: true}`
//! - 既存ファイル名 → ファイル内容のMD5から名前を決定
//! - それ以外の値 → JSONとしてファイルに書き出し、そのMD5から名前を決定
//!
//! 同じ内容なら常に同じ名前になるため、内容が変わらない限りSwarm上の
//! シークレットは再利用されます。

use crate::artifacts::Artifacts;
use crate::document::{Map, Node, map_of};
use crate::error::{DeployError, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// 外部シークレットを表す値
pub const EXTERNAL: &str = "external";

/// 内容のハッシュからシークレット名を生成（`{stack}_s_{HEX}`）
pub fn secret_name(stack: &str, content: &[u8]) -> String {
    let digest = md5::compute(content);
    format!("{}_s_{}", stack, hex::encode_upper(digest.0))
}

/// compose ファイルから見たパス表記
///
/// compose ファイルのディレクトリ配下なら相対パス、それ以外は絶対パス。
pub fn compose_relative(path: &Path, compose_dir: &Path) -> String {
    path.strip_prefix(compose_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// 生成ファイルの書き出し先
///
/// 書き出すファイル名はパス区切りを含まない単一の名前に限り、
/// 入力の記述子や compose ファイルを上書きしないようにします。
#[derive(Debug, Clone, Copy)]
pub struct OutputDir<'a> {
    dir: &'a Path,
    protected: &'a [PathBuf],
}

impl<'a> OutputDir<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self { dir, protected: &[] }
    }

    /// 上書きしてはいけないファイル
    pub fn with_protected(mut self, protected: &'a [PathBuf]) -> Self {
        self.protected = protected;
        self
    }

    pub fn path(&self) -> &'a Path {
        self.dir
    }

    /// `owner` が書き出すファイル `name` のパス
    pub fn file(&self, owner: &str, name: &str) -> Result<PathBuf> {
        if !is_plain_file_name(name) {
            return Err(DeployError::InvalidOutputName {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }

        let path = self.dir.join(name);
        let resolved = resolve_parent(&path);
        if self.protected.iter().any(|p| resolve_parent(p) == resolved) {
            return Err(DeployError::OutputCollision {
                owner: owner.to_string(),
                path,
            });
        }
        Ok(path)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// 親ディレクトリを正規化したパス（ファイル自体は存在しなくてよい）
fn resolve_parent(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    parent
        .canonicalize()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub struct SecretMaterializer<'a> {
    stack: &'a str,
    input_dir: &'a Path,
    output: OutputDir<'a>,
}

impl<'a> SecretMaterializer<'a> {
    /// * `input_dir` - ファイル参照を解決する基準（記述子のディレクトリ）
    /// * `output` - インラインシークレットの書き出し先（composeファイルのディレクトリ）
    pub fn new(stack: &'a str, input_dir: &'a Path, output: OutputDir<'a>) -> Self {
        Self {
            stack,
            input_dir,
            output,
        }
    }

    /// インラインシークレットの書き出し先を検証（ファイルは書かない）
    pub fn validate(&self, secrets: &Map) -> Result<()> {
        for (key, value) in secrets {
            if !matches!(value, Node::String(_)) {
                self.output.file(&format!("secrets.{}", key), key)?;
            }
        }
        Ok(())
    }

    /// `secrets` マップ全体を変換
    pub fn materialize(&self, secrets: &Map, artifacts: &mut Artifacts) -> Result<Map> {
        self.validate(secrets)?;

        let mut resolved = Map::with_capacity(secrets.len());
        for (key, value) in secrets {
            let entry = self.resolve(key, value, artifacts)?;
            resolved.insert(key.clone(), entry);
        }
        Ok(resolved)
    }

    fn resolve(&self, key: &str, value: &Node, artifacts: &mut Artifacts) -> Result<Node> {
        match value {
            Node::String(s) if s == EXTERNAL => {
                debug!(secret = key, "external secret");
                Ok(map_of([("external", Node::Bool(true))]))
            }
            Node::String(file) => self.resolve_file(key, file),
            other => self.write_inline(key, other, artifacts),
        }
    }

    fn resolve_file(&self, key: &str, file: &str) -> Result<Node> {
        let path = self.input_dir.join(file);
        if !path.is_file() {
            return Err(DeployError::SecretFileNotFound {
                secret: key.to_string(),
                path,
            });
        }

        let content = std::fs::read(&path).map_err(|e| DeployError::io(&path, e))?;
        let name = secret_name(self.stack, &content);
        debug!(secret = key, file = %path.display(), name = %name, "file secret");

        Ok(map_of([
            ("file", compose_relative(&path, self.output.path()).into()),
            ("name", name.into()),
        ]))
    }

    fn write_inline(&self, key: &str, value: &Node, artifacts: &mut Artifacts) -> Result<Node> {
        let json = value.to_canonical_json()?;
        let name = secret_name(self.stack, json.as_bytes());

        let path = self.output.file(&format!("secrets.{}", key), key)?;
        artifacts.track(&path);
        std::fs::write(&path, &json).map_err(|e| DeployError::io(&path, e))?;
        debug!(secret = key, file = %path.display(), name = %name, "inline secret written");

        Ok(map_of([
            ("file", compose_relative(&path, self.output.path()).into()),
            ("name", name.into()),
        ]))
    }
}

/// 証明書などで追加生成したシークレットをマージする
///
/// 記述子側に同じキーがある場合は生成側で置き換えます。
/// サービスの `source` は生成側のエントリを指します。
pub fn merge_generated(secrets: &mut Map, generated: Map) {
    for (key, value) in generated {
        if secrets.insert(key.clone(), value).is_some() {
            warn!(secret = %key, "記述子の同名シークレットを生成したシークレットで置き換えます");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn secrets(json: &str) -> Map {
        Node::from_json_str(json)
            .unwrap()
            .as_map()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_secret_name_format() {
        let name = secret_name("s", br#"{"k":1}"#);
        let hash = name.strip_prefix("s_s_").unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_secret_name_known_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(
            secret_name("app", b""),
            "app_s_D41D8CD98F00B204E9800998ECF8427E"
        );
    }

    #[test]
    fn test_external_secret() {
        let dir = tempdir().unwrap();
        let materializer = SecretMaterializer::new("s", dir.path(), OutputDir::new(dir.path()));
        let mut artifacts = Artifacts::new();

        let out = materializer
            .materialize(&secrets(r#"{"a":"external"}"#), &mut artifacts)
            .unwrap();
        assert_eq!(out["a"], map_of([("external", Node::Bool(true))]));
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_inline_secret_written_and_tracked() {
        let dir = tempdir().unwrap();
        let materializer = SecretMaterializer::new("s", dir.path(), OutputDir::new(dir.path()));
        let mut artifacts = Artifacts::new();

        let out = materializer
            .materialize(&secrets(r#"{"b":{"k":1}}"#), &mut artifacts)
            .unwrap();

        let written = dir.path().join("b");
        assert_eq!(fs::read_to_string(&written).unwrap(), r#"{"k":1}"#);
        assert_eq!(artifacts.files(), &[written]);
        assert_eq!(out["b"].get("file"), Some(&Node::from("b")));
        assert_eq!(
            out["b"].get("name"),
            Some(&Node::from(secret_name("s", br#"{"k":1}"#)))
        );
    }

    #[test]
    fn test_identical_inline_values_share_name() {
        let dir = tempdir().unwrap();
        let materializer = SecretMaterializer::new("s", dir.path(), OutputDir::new(dir.path()));
        let mut artifacts = Artifacts::new();

        let out = materializer
            .materialize(
                &secrets(r#"{"one":{"user":"x","pw":"y"},"two":{"user":"x","pw":"y"},"three":{"user":"x","pw":"z"}}"#),
                &mut artifacts,
            )
            .unwrap();

        assert_eq!(out["one"].get("name"), out["two"].get("name"));
        assert_ne!(out["one"].get("name"), out["three"].get("name"));
    }

    #[test]
    fn test_file_secret_hashed_by_content() {
        let input = tempdir().unwrap();
        fs::write(input.path().join("cert.pem"), "PEM DATA").unwrap();
        let materializer = SecretMaterializer::new("web", input.path(), OutputDir::new(input.path()));
        let mut artifacts = Artifacts::new();

        let out = materializer
            .materialize(&secrets(r#"{"tls":"cert.pem"}"#), &mut artifacts)
            .unwrap();

        assert_eq!(out["tls"].get("file"), Some(&Node::from("cert.pem")));
        assert_eq!(
            out["tls"].get("name"),
            Some(&Node::from(secret_name("web", b"PEM DATA")))
        );
        // 既存ファイルは削除対象にしない
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_file_secret_outside_output_dir_is_absolute() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(input.path().join("key"), "k").unwrap();
        let materializer = SecretMaterializer::new("web", input.path(), OutputDir::new(output.path()));

        let out = materializer
            .materialize(&secrets(r#"{"key":"key"}"#), &mut Artifacts::new())
            .unwrap();
        let expected = input.path().join("key").to_string_lossy().into_owned();
        assert_eq!(out["key"].get("file"), Some(&Node::from(expected)));
    }

    #[test]
    fn test_missing_file_secret_is_error() {
        let dir = tempdir().unwrap();
        let materializer = SecretMaterializer::new("s", dir.path(), OutputDir::new(dir.path()));
        let err = materializer
            .materialize(&secrets(r#"{"gone":"missing.txt"}"#), &mut Artifacts::new())
            .unwrap_err();
        assert!(matches!(err, DeployError::SecretFileNotFound { ref secret, .. } if secret == "gone"));
    }

    #[test]
    fn test_merge_generated_replaces_descriptor_entry() {
        let mut base = secrets(r#"{"a":{"external":true},"b":"external"}"#);
        let generated = secrets(r#"{"a":{"file":"x"},"auto_ssl_s_web":{"name":"s_web_ssl","external":true}}"#);
        merge_generated(&mut base, generated);

        assert_eq!(base["a"], map_of([("file", Node::from("x"))]));
        assert!(base.contains_key("b"));
        assert!(base.contains_key("auto_ssl_s_web"));
    }

    #[test]
    fn test_inline_key_with_path_is_rejected() {
        let root = tempdir().unwrap();
        let output = root.path().join("out");
        fs::create_dir(&output).unwrap();
        let materializer = SecretMaterializer::new("s", root.path(), OutputDir::new(&output));
        let mut artifacts = Artifacts::new();

        for key in ["../escaped", "sub/dir", "..", ".", "", "a\\b"] {
            let json = format!(r#"{{"ok":{{"k":0}},{:?}:{{"k":1}}}}"#, key);
            let err = materializer
                .materialize(&secrets(&json), &mut artifacts)
                .unwrap_err();
            assert!(
                matches!(err, DeployError::InvalidOutputName { ref name, .. } if name == key),
                "{key}: {err:?}"
            );
        }

        // 検証で失敗した場合は何も書き出さない
        assert!(!root.path().join("escaped").exists());
        assert!(!output.join("ok").exists());
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_inline_key_cannot_overwrite_protected_file() {
        let dir = tempdir().unwrap();
        let descriptor = dir.path().join("docker-compose.json");
        fs::write(&descriptor, "{}").unwrap();
        let protected = [descriptor.clone(), dir.path().join("docker-compose.yml")];
        let output = OutputDir::new(dir.path()).with_protected(&protected);
        let materializer = SecretMaterializer::new("s", dir.path(), output);

        for key in ["docker-compose.json", "docker-compose.yml"] {
            let json = format!(r#"{{{:?}:{{"k":1}}}}"#, key);
            let err = materializer
                .materialize(&secrets(&json), &mut Artifacts::new())
                .unwrap_err();
            assert!(matches!(err, DeployError::OutputCollision { .. }), "{key}: {err:?}");
        }
        assert_eq!(fs::read_to_string(&descriptor).unwrap(), "{}");
    }

    #[test]
    fn test_output_dir_relative_protected_path() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let protected = [dir.path().join("sub").join("..").join("input.json")];
        let output = OutputDir::new(dir.path()).with_protected(&protected);

        assert!(output.file("secrets.other", "other").is_ok());
        assert!(matches!(
            output.file("secrets.input.json", "input.json"),
            Err(DeployError::OutputCollision { .. })
        ));
    }
}
