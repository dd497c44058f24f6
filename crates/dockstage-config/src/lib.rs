pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// マニフェストのファイル名（優先順）
pub const MANIFEST_CANDIDATES: [&str; 3] = ["dockstage.local.kdl", "dockstage.kdl", ".dockstage.kdl"];

/// マニフェストを直接指定する環境変数
pub const MANIFEST_ENV: &str = "DOCKSTAGE_MANIFEST";

/// docker 互換バイナリを指定する環境変数
pub const DOCKER_ENV: &str = "DOCKSTAGE_DOCKER";

/// dockstage の設定ディレクトリを取得（なければ作成）
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("dockstage");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// カレントディレクトリからマニフェストを探す
pub fn find_manifest_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_manifest_file_in(&current_dir)
}

/// マニフェストを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DOCKSTAGE_MANIFEST (直接パス指定)
/// 2. `dir` 直下: dockstage.local.kdl, dockstage.kdl, .dockstage.kdl
/// 3. `dir/.dockstage/` 内: 同様の順序
pub fn find_manifest_file_in(dir: &Path) -> Result<PathBuf> {
    if let Ok(manifest_path) = std::env::var(MANIFEST_ENV) {
        let path = PathBuf::from(manifest_path);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(path) = first_existing(dir) {
        return Ok(path);
    }

    let dockstage_dir = dir.join(".dockstage");
    if dockstage_dir.is_dir()
        && let Some(path) = first_existing(&dockstage_dir)
    {
        return Ok(path);
    }

    Err(ConfigError::ManifestNotFound)
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// 使用する docker 互換バイナリ（DOCKSTAGE_DOCKER、未設定なら `docker`）
pub fn docker_binary() -> PathBuf {
    std::env::var_os(DOCKER_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("docker"))
}

/// デフォルトのステージディレクトリ
pub fn default_stage_dir(project_root: &Path) -> PathBuf {
    project_root.join("target").join("docker")
}
