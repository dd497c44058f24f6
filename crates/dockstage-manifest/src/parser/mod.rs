//! KDLパーサー
//!
//! dockstage のビルドマニフェスト (dockstage.kdl) をパースします。

mod dockerfile;
mod registry;

#[cfg(test)]
mod tests;

use crate::error::{ManifestError, Result};
use crate::model::BuildManifest;
use dockerfile::parse_dockerfile;
use dockstage_build::{BuildOptions, ImageName};
use kdl::{KdlDocument, KdlNode, KdlValue};
use registry::parse_registry;
use std::fs;
use std::path::Path;

/// マニフェストファイルをパース
///
/// 相対パスはマニフェストのあるディレクトリを基準に解決されます。
pub fn parse_manifest_file<P: AsRef<Path>>(path: P) -> Result<BuildManifest> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    tracing::debug!(manifest = %path.display(), "Parsing build manifest");
    parse_manifest_string(&content, base_dir)
}

/// KDL文字列をパース
pub fn parse_manifest_string(content: &str, base_dir: &Path) -> Result<BuildManifest> {
    let doc: KdlDocument = content.parse()?;

    let default_name = base_dir
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let mut manifest = BuildManifest::new(default_name, base_dir);

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                manifest.project = string_arg(node, 0)?;
            }
            "stage_dir" => {
                manifest.stage_dir = Some(base_dir.join(string_arg(node, 0)?));
            }
            "dockerfile" => {
                manifest.instructions = parse_dockerfile(node, base_dir)?;
            }
            "images" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        if child.name().value() == "image" {
                            manifest.images.push(parse_image(child)?);
                        }
                    }
                }
            }
            // images ブロックを使わない単一イメージの記法
            "image" => {
                manifest.images.push(parse_image(node)?);
            }
            "options" => {
                manifest.options = parse_options(node)?;
            }
            "registry" => {
                manifest.registry = Some(parse_registry(node)?);
            }
            other => {
                tracing::warn!("Unknown manifest node ignored: {}", other);
            }
        }
    }

    if manifest.instructions.is_empty() {
        return Err(ManifestError::InvalidConfig(
            "dockerfile ブロックに命令がありません".to_string(),
        ));
    }

    Ok(manifest)
}

fn parse_image(node: &KdlNode) -> Result<ImageName> {
    Ok(ImageName::parse(&string_arg(node, 0)?)?)
}

/// options ノードをパース
fn parse_options(node: &KdlNode) -> Result<BuildOptions> {
    let mut options = BuildOptions::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "cache" => {
                    options.cache = positional(child)
                        .first()
                        .and_then(|v| v.as_bool())
                        .ok_or_else(|| invalid(child, "真偽値 (#true / #false) が必要です"))?;
                }
                "remove" => {
                    options.remove = string_arg(child, 0)?
                        .parse()
                        .map_err(|e: String| invalid(child, &e))?;
                }
                "pull" => {
                    options.pull = string_arg(child, 0)?
                        .parse()
                        .map_err(|e: String| invalid(child, &e))?;
                }
                other => {
                    tracing::warn!("Unknown option ignored: {}", other);
                }
            }
        }
    }

    Ok(options)
}

/// 名前付きプロパティを除いた位置引数
pub(crate) fn positional(node: &KdlNode) -> Vec<&KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| e.value())
        .collect()
}

/// index 番目の位置引数を文字列として取得
pub(crate) fn string_arg(node: &KdlNode, index: usize) -> Result<String> {
    positional(node)
        .get(index)
        .and_then(|v| v.as_string())
        .map(str::to_string)
        .ok_or_else(|| {
            invalid(
                node,
                &format!("{} 番目の引数に文字列が必要です", index + 1),
            )
        })
}

/// 全ての位置引数を文字列として取得
pub(crate) fn string_args(node: &KdlNode) -> Result<Vec<String>> {
    positional(node)
        .into_iter()
        .map(|v| {
            v.as_string()
                .map(str::to_string)
                .ok_or_else(|| invalid(node, "引数は文字列である必要があります"))
        })
        .collect()
}

pub(crate) fn invalid(node: &KdlNode, message: &str) -> ManifestError {
    ManifestError::InvalidConfig(format!("{}: {}", node.name().value(), message))
}
