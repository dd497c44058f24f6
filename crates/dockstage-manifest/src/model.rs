//! ビルドマニフェストのモデル

use crate::error::{ManifestError, Result};
use dockstage_build::{BuildOptions, ImageName, Instruction, RegistryCredentials};
use std::path::{Path, PathBuf};

/// 1つのイメージビルドの定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildManifest {
    /// プロジェクト名
    pub project: String,
    /// マニフェストのあるディレクトリ（相対パスの基準）
    pub root: PathBuf,
    /// ステージディレクトリ（root 基準で解決済み）
    pub stage_dir: Option<PathBuf>,
    /// Dockerfile の命令列
    pub instructions: Vec<Instruction>,
    /// タグ付け・プッシュするイメージ名
    pub images: Vec<ImageName>,
    pub options: BuildOptions,
    /// レジストリ認証情報
    pub registry: Option<RegistryCredentials>,
}

impl BuildManifest {
    pub fn new(project: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            root: root.into(),
            stage_dir: None,
            instructions: Vec::new(),
            images: Vec::new(),
            options: BuildOptions::default(),
            registry: None,
        }
    }

    /// ステージディレクトリ（未指定なら `fallback`）
    pub fn stage_dir_or<'a>(&'a self, fallback: &'a Path) -> &'a Path {
        self.stage_dir.as_deref().unwrap_or(fallback)
    }

    /// プッシュ対象のイメージ名（1つ以上必要）
    pub fn require_images(&self) -> Result<&[ImageName]> {
        if self.images.is_empty() {
            return Err(ManifestError::NoImages);
        }
        Ok(&self.images)
    }
}
