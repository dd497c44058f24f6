//! Dockerfile 命令とステージング形式への変換

use crate::error::Result;
use crate::stage::{StageSource, StagedBuild};
use std::path::{Path, PathBuf};

/// Dockerfile の命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From(String),
    Run(String),
    Env { key: String, value: String },
    Workdir(String),
    Expose(u16),
    User(String),
    Label { key: String, value: String },
    /// exec 形式で出力
    Entrypoint(Vec<String>),
    /// exec 形式で出力
    Cmd(Vec<String>),
    /// ソースをビルドコンテキストに配置して COPY する
    Copy { source: StageSource, target: String },
    /// そのまま1行として出力
    Raw(String),
}

/// 命令列をステージング形式に変換する
pub trait Processor {
    fn process(&self, instructions: &[Instruction], stage_dir: &Path) -> Result<StagedBuild>;
}

/// デフォルトのプロセッサ
///
/// `Copy` のソースは `<index>/<ファイル名>` に配置されます。
/// index は COPY 命令の出現順（0始まり）。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProcessor;

impl Processor for DefaultProcessor {
    fn process(&self, instructions: &[Instruction], stage_dir: &Path) -> Result<StagedBuild> {
        tracing::debug!(
            "Processing {} instructions for {}",
            instructions.len(),
            stage_dir.display()
        );

        let mut lines = Vec::with_capacity(instructions.len());
        let mut stage_files = Vec::new();

        for instruction in instructions {
            let line = match instruction {
                Instruction::From(image) => format!("FROM {}", image),
                Instruction::Run(command) => format!("RUN {}", command),
                Instruction::Env { key, value } => {
                    format!("ENV {}={}", key, serde_json::to_string(value)?)
                }
                Instruction::Workdir(dir) => format!("WORKDIR {}", dir),
                Instruction::Expose(port) => format!("EXPOSE {}", port),
                Instruction::User(user) => format!("USER {}", user),
                Instruction::Label { key, value } => format!(
                    "LABEL {}={}",
                    serde_json::to_string(key)?,
                    serde_json::to_string(value)?
                ),
                Instruction::Entrypoint(args) => {
                    format!("ENTRYPOINT {}", serde_json::to_string(args)?)
                }
                Instruction::Cmd(args) => format!("CMD {}", serde_json::to_string(args)?),
                Instruction::Copy { source, target } => {
                    let staged_path = staged_path(stage_files.len(), source, target);
                    let line = format!("COPY {} {}", staged_path, target);
                    stage_files.push((source.clone(), PathBuf::from(staged_path)));
                    line
                }
                Instruction::Raw(line) => line.clone(),
            };
            lines.push(line);
        }

        let mut dockerfile = lines.join("\n");
        dockerfile.push('\n');

        Ok(StagedBuild::new(dockerfile, stage_files))
    }
}

/// コンテキスト内の配置先（常に `/` 区切り）
fn staged_path(index: usize, source: &StageSource, target: &str) -> String {
    let name = match source {
        StageSource::File(path) | StageSource::Directory(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        StageSource::Bytes(_) => target
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    };

    format!("{}/{}", index, name.unwrap_or_else(|| "data".to_string()))
}
