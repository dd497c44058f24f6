//! 外部コマンドの実行
//!
//! docker などの外部バイナリを起動し、stdout / stderr を行単位で
//! [`LineSink`] に流しながら、終了まで待機します。

use crate::error::{BuildError, CommandFailure, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

const REDACTED: &str = "********";

/// コマンド引数（秘密情報は表示時に伏せる）
#[derive(Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    Secret(String),
}

impl Arg {
    fn value(&self) -> &str {
        match self {
            Arg::Plain(v) | Arg::Secret(v) => v,
        }
    }
}

/// 実行するコマンド
///
/// `Display` / `Debug` はパスワードなどの秘密引数を伏せて表示します。
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    args: Vec<Arg>,
    working_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// ログに出してはいけない引数（パスワード等）
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// プログラム名を除いた実際の引数
    pub fn argv(&self) -> Vec<&str> {
        self.args.iter().map(Arg::value).collect()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// 秘密引数を伏せた引数一覧
    pub fn redacted_argv(&self) -> Vec<&str> {
        self.args
            .iter()
            .map(|a| match a {
                Arg::Plain(v) => v.as_str(),
                Arg::Secret(_) => REDACTED,
            })
            .collect()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.redacted_argv() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &self.redacted_argv())
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

/// 出力元のストリーム
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// コマンドの実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// シグナルで終了した場合は -1
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn into_failure(self, command: &CommandLine) -> CommandFailure {
        CommandFailure {
            command: command.to_string(),
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

/// 実行中のコマンド出力を受け取る
pub trait LineSink: Send + Sync {
    fn line(&self, stream: OutputStream, line: &str);
}

/// 出力を tracing の info レベルで流すデフォルトのシンク
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => tracing::info!(target: "dockstage::process", "{}", line),
            OutputStream::Stderr => {
                tracing::info!(target: "dockstage::process", stream = "stderr", "{}", line)
            }
        }
    }
}

/// 外部コマンドの実行を抽象化
///
/// `run` は終了コードを解釈しません。成否の判断は呼び出し側で行います。
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput>;
}

/// tokio::process によるデフォルト実装
#[derive(Clone)]
pub struct CommandRunner {
    sink: Arc<dyn LineSink>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner {
    pub fn new() -> Self {
        Self {
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(sink: Arc<dyn LineSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        tracing::debug!("Running: {}", command);

        let mut cmd = Command::new(command.program());
        cmd.args(command.argv());
        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let spawn_error = |source: std::io::Error| BuildError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_error)?;

        // 両ストリームを1本のチャネルにまとめ、到着順にシンクへ流す
        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, OutputStream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, OutputStream::Stderr, tx.clone());
        }
        drop(tx);

        let mut output = CommandOutput::default();
        while let Some((stream, line)) = rx.recv().await {
            self.sink.line(stream, &line);
            match stream {
                OutputStream::Stdout => output.stdout.push(line),
                OutputStream::Stderr => output.stderr.push(line),
            }
        }

        let status = child.wait().await.map_err(spawn_error)?;
        output.exit_code = status.code().unwrap_or(-1);

        tracing::debug!("`{}` exited with code {}", command, output.exit_code);
        Ok(output)
    }
}

/// パイプを行単位で読み、チャネルに送る
///
/// UTF-8 でない出力は置換文字で読み進める（読み残すと子プロセスが詰まるため）。
fn forward_lines<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<(OutputStream, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(&['\n', '\r'][..])
                        .to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to read {:?}: {}", stream, e);
                    break;
                }
            }
        }
    });
}
