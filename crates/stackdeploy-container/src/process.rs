//! 外部コマンドの実行
//!
//! シェルを介さず、プログラムと引数ベクタで子プロセスを起動します。
//! 標準出力・標準エラーは行単位でそのままコンソールに流します。

use crate::error::{ContainerError, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

/// 実行するコマンド
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 標準入力に渡す内容（パスワードなど）
    pub stdin: Option<String>,
    /// 追加の環境変数
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// ログ・エラー表示用の短い名前（例: `docker stack`）
    pub fn label(&self) -> String {
        match self.args.first() {
            Some(sub) => format!("{} {}", self.program, sub),
            None => self.program.clone(),
        }
    }
}

/// 引数を表示する（標準入力と環境変数の値は表示しない）
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// コマンドを実行し、終了コードが0以外ならエラーを返す
    async fn run(&self, spec: &CommandSpec) -> Result<()>;
}

/// `tokio::process` による実装
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        debug!(command = %spec, "spawning process");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ContainerError::Spawn {
            command: spec.label(),
            source,
        })?;

        if let (Some(input), Some(mut stdin)) = (&spec.stdin, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            // EOF を伝えるために閉じる
            drop(stdin);
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::join!(
            async {
                if let Some(stdout) = stdout {
                    forward_lines(stdout, |line| println!("{}", line)).await;
                }
            },
            async {
                if let Some(stderr) = stderr {
                    forward_lines(stderr, |line| eprintln!("{}", line)).await;
                }
            }
        );

        let status = child.wait().await?;
        if !status.success() {
            return Err(ContainerError::CommandFailed {
                command: spec.label(),
                code: status.code().unwrap_or(-1),
            });
        }

        debug!(command = %spec.label(), "process finished");
        Ok(())
    }
}

/// 出力を行単位で読み、空でない行を `emit` に渡す
///
/// UTF-8 でないバイトは置換文字にして流し続けます。読み取りを途中でやめると
/// 子プロセス側の書き込みが失敗するため、EOF まで読み切ります。
async fn forward_lines<R>(reader: R, mut emit: impl FnMut(&str))
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if !line.is_empty() {
                    emit(line);
                }
            }
            Err(e) => {
                debug!(error = %e, "failed to read process output");
                break;
            }
        }
    }
}
