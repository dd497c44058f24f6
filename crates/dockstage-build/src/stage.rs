//! ビルドコンテキストのステージング
//!
//! [`StagedBuild`] をディスク上のディレクトリに書き出します。
//! 書き出し先は毎回削除してから作り直すため、同じ入力からは常に同じ内容が得られます。

use crate::error::{BuildError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// ステージ先に書き出す Dockerfile のファイル名
pub const DOCKERFILE_NAME: &str = "Dockerfile";

const MAX_CONTEXT_SIZE: u64 = 500 * 1024 * 1024; // 500MB

/// ステージング可能なソース
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageSource {
    /// ホスト上のファイルをコピー
    File(PathBuf),
    /// ホスト上のディレクトリを再帰的にコピー
    Directory(PathBuf),
    /// バイト列をそのまま書き込む
    Bytes(Vec<u8>),
}

impl StageSource {
    /// パスの種類（ファイル / ディレクトリ）に応じたソースを作成
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            StageSource::Directory(path)
        } else {
            StageSource::File(path)
        }
    }

    /// `destination` に自身を書き出し、書き込んだバイト数を返す
    pub fn stage_into(&self, destination: &Path) -> io::Result<u64> {
        match self {
            StageSource::File(source) => {
                prepare_file_target(destination)?;
                fs::copy(source, destination)
            }
            StageSource::Directory(source) => copy_tree(source, destination),
            StageSource::Bytes(data) => {
                prepare_file_target(destination)?;
                fs::write(destination, data)?;
                Ok(data.len() as u64)
            }
        }
    }

    /// ホスト上のパス（バイト列の場合は None）
    pub fn host_path(&self) -> Option<&Path> {
        match self {
            StageSource::File(path) | StageSource::Directory(path) => Some(path),
            StageSource::Bytes(_) => None,
        }
    }

    /// ソースの説明（ログ用）
    pub fn describe(&self) -> String {
        match self {
            StageSource::File(path) => format!("file {}", path.display()),
            StageSource::Directory(path) => format!("directory {}", path.display()),
            StageSource::Bytes(data) => format!("{} bytes", data.len()),
        }
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// ファイルの書き込み先を用意する（先に配置されたディレクトリは置き換える）
fn prepare_file_target(path: &Path) -> io::Result<()> {
    create_parent(path)?;
    if let Ok(meta) = fs::symlink_metadata(path)
        && meta.is_dir()
    {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// ディレクトリの作成先を用意する（先に配置されたファイルは置き換える）
fn prepare_dir_target(path: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::symlink_metadata(path)
        && !meta.is_dir()
    {
        fs::remove_file(path)?;
    }
    fs::create_dir_all(path)
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<u64> {
    if !source.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("source directory not found: {}", source.display()),
        ));
    }

    let mut written = 0;
    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            destination.to_path_buf()
        } else {
            destination.join(relative)
        };

        if entry.file_type().is_dir() {
            prepare_dir_target(&target)?;
        } else {
            prepare_file_target(&target)?;
            written += fs::copy(entry.path(), &target)?;
        }
    }

    Ok(written)
}

/// 存在する祖先までを正規化した絶対パス（ステージ先はまだ無い場合がある）
fn resolve_existing(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Some(canonical);
    }
    if path.is_relative() {
        return resolve_existing(&std::env::current_dir().ok()?.join(path));
    }
    let name = path.file_name()?;
    Some(resolve_existing(path.parent()?)?.join(name))
}

/// ステージング済みのビルド定義
///
/// Dockerfile の本文と、ビルドコンテキストへ配置するファイルの一覧。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBuild {
    instructions: String,
    stage_files: Vec<(StageSource, PathBuf)>,
}

impl StagedBuild {
    pub fn new(instructions: impl Into<String>, stage_files: Vec<(StageSource, PathBuf)>) -> Self {
        Self {
            instructions: instructions.into(),
            stage_files,
        }
    }

    /// Dockerfile の本文
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// (ソース, コンテキスト内の相対パス) の一覧
    pub fn stage_files(&self) -> &[(StageSource, PathBuf)] {
        &self.stage_files
    }
}

/// [`StagedBuild`] をディレクトリに書き出す
pub struct StageWriter;

impl StageWriter {
    /// `dir` を作り直して Dockerfile とファイルを配置する
    ///
    /// 戻り値は書き込んだ合計バイト数。
    pub fn stage(staged: &StagedBuild, dir: &Path) -> Result<u64> {
        tracing::debug!("Staging build context into: {}", dir.display());

        Self::check_sources_outside(staged, dir)?;

        match fs::remove_dir_all(dir) {
            Ok(()) => tracing::debug!("Removed previous stage directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(BuildError::Stage {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        }

        fs::create_dir_all(dir).map_err(|source| BuildError::Stage {
            path: dir.to_path_buf(),
            source,
        })?;

        let dockerfile = dir.join(DOCKERFILE_NAME);
        fs::write(&dockerfile, staged.instructions()).map_err(|source| BuildError::Stage {
            path: dockerfile.clone(),
            source,
        })?;
        let mut total = staged.instructions().len() as u64;

        for (source, destination) in staged.stage_files() {
            let target = Self::resolve_destination(dir, destination)?;
            tracing::debug!("Staging {} -> {}", source.describe(), destination.display());

            total += source
                .stage_into(&target)
                .map_err(|e| BuildError::Stage {
                    path: target.clone(),
                    source: e,
                })?;
        }

        Self::check_context_size(total);
        tracing::debug!("Build context staged: {} bytes", total);

        Ok(total)
    }

    /// コンテキスト外への書き込みを防ぐため、相対パスのみ許可
    fn resolve_destination(dir: &Path, destination: &Path) -> Result<PathBuf> {
        let escapes = destination.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if escapes || destination.as_os_str().is_empty() {
            return Err(BuildError::InvalidConfig(format!(
                "Stage destination must be a relative path inside the build context: {}",
                destination.display()
            )));
        }

        Ok(dir.join(destination))
    }

    /// ステージ先は削除されるため、その中にあるソースは拒否
    fn check_sources_outside(staged: &StagedBuild, dir: &Path) -> Result<()> {
        let Some(dir) = resolve_existing(dir) else {
            return Ok(());
        };

        for (source, _) in staged.stage_files() {
            if let Some(path) = source.host_path()
                && let Ok(path) = path.canonicalize()
                && (path.starts_with(&dir) || dir.starts_with(&path))
            {
                return Err(BuildError::InvalidConfig(format!(
                    "Stage source {} overlaps the stage directory {}",
                    path.display(),
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: u64) {
        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "Build context is large ({}MB); consider staging fewer files",
                size / 1024 / 1024
            );
        }
    }
}
