//! テスト用の ProcessRunner

use crate::error::Result;
use crate::process::{CommandLine, CommandOutput, ProcessRunner};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    exit_code: i32,
    stdout: Vec<String>,
    stderr: Vec<String>,
}

impl FakeResponse {
    pub fn stdout(exit_code: i32, lines: &[&str]) -> Self {
        Self {
            exit_code,
            stdout: lines.iter().map(|l| l.to_string()).collect(),
            stderr: Vec::new(),
        }
    }

    pub fn stderr(exit_code: i32, lines: &[&str]) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// 実行されたコマンドを記録し、登録済みの応答を返す
///
/// 応答が登録されていないコマンドは exit code 0 で成功します。
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandLine>>,
    by_argv: Mutex<Vec<(Vec<String>, FakeResponse)>>,
    by_subcommand: Mutex<HashMap<String, FakeResponse>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 最初の引数（サブコマンド）で応答を登録
    pub fn respond(&self, subcommand: &str, response: FakeResponse) {
        self.by_subcommand
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), response);
    }

    /// 引数列の完全一致で応答を登録（サブコマンドより優先）
    pub fn respond_to(&self, argv: &[&str], response: FakeResponse) {
        self.by_argv.lock().unwrap().push((
            argv.iter().map(|a| a.to_string()).collect(),
            response,
        ));
    }

    pub fn argvs(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.argv().into_iter().map(str::to_string).collect())
            .collect()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.argvs()
            .into_iter()
            .filter_map(|argv| argv.into_iter().next())
            .collect()
    }

    pub fn working_dirs(&self) -> Vec<Option<PathBuf>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.working_dir().map(|d| d.to_path_buf()))
            .collect()
    }

    fn response_for(&self, command: &CommandLine) -> FakeResponse {
        let argv: Vec<String> = command.argv().into_iter().map(str::to_string).collect();

        if let Some((_, response)) = self
            .by_argv
            .lock()
            .unwrap()
            .iter()
            .find(|(expected, _)| *expected == argv)
        {
            return response.clone();
        }

        argv.first()
            .and_then(|sub| self.by_subcommand.lock().unwrap().get(sub).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let response = self.response_for(command);
        Ok(CommandOutput {
            stdout: response.stdout,
            stderr: response.stderr,
            exit_code: response.exit_code,
        })
    }
}
