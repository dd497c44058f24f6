//! dockerfile ノードのパース

use super::{invalid, positional, string_arg, string_args};
use crate::error::Result;
use dockstage_build::{Instruction, StageSource};
use kdl::KdlNode;
use std::path::Path;

/// dockerfile ノードをパースして命令列を生成
///
/// `copy` のソースは `base_dir` 基準で解決します。
pub fn parse_dockerfile(node: &KdlNode, base_dir: &Path) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    let Some(children) = node.children() else {
        return Ok(instructions);
    };

    for child in children.nodes() {
        let instruction = match child.name().value() {
            "from" => Instruction::From(string_arg(child, 0)?),
            "run" => Instruction::Run(string_arg(child, 0)?),
            "env" => Instruction::Env {
                key: string_arg(child, 0)?,
                value: string_arg(child, 1)?,
            },
            "workdir" => Instruction::Workdir(string_arg(child, 0)?),
            "expose" => {
                let port = positional(child)
                    .first()
                    .and_then(|v| v.as_integer())
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| invalid(child, "ポート番号 (0-65535) が必要です"))?;
                Instruction::Expose(port)
            }
            "user" => Instruction::User(string_arg(child, 0)?),
            "label" => Instruction::Label {
                key: string_arg(child, 0)?,
                value: string_arg(child, 1)?,
            },
            "entrypoint" => Instruction::Entrypoint(non_empty_args(child)?),
            "cmd" => Instruction::Cmd(non_empty_args(child)?),
            "copy" => {
                let source = base_dir.join(string_arg(child, 0)?);
                Instruction::Copy {
                    source: StageSource::from_path(source),
                    target: string_arg(child, 1)?,
                }
            }
            // file "<コンテナ内パス>" "<内容>"
            "file" => {
                let target = string_arg(child, 0)?;
                let contents = string_arg(child, 1)?;
                Instruction::Copy {
                    source: StageSource::Bytes(contents.into_bytes()),
                    target,
                }
            }
            "raw" => Instruction::Raw(string_arg(child, 0)?),
            other => {
                return Err(invalid(child, &format!("未知の命令です: {}", other)));
            }
        };
        instructions.push(instruction);
    }

    Ok(instructions)
}

fn non_empty_args(node: &KdlNode) -> Result<Vec<String>> {
    let args = string_args(node)?;
    if args.is_empty() {
        return Err(invalid(node, "引数が1つ以上必要です"));
    }
    Ok(args)
}
