use crate::{DockerArgs, OptionArgs};
use colored::Colorize;
use dockstage_build::{BuildError, BuildOptions, DockerConfigAuth, ImageName, RegistryCredentials};
use dockstage_manifest::{BuildManifest, ManifestError};
use std::path::{Component, Path, PathBuf};

/// マニフェストを読み込む（未指定なら自動検出）
pub fn load_manifest(explicit: Option<&Path>) -> anyhow::Result<(PathBuf, BuildManifest)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => dockstage_config::find_manifest_file()?,
    };
    let manifest = dockstage_manifest::parse_manifest_file(&path)?;
    Ok((path, manifest))
}

pub fn print_manifest_summary(path: &Path, manifest: &BuildManifest) {
    println!("マニフェスト: {}", path.display().to_string().cyan());
    println!("プロジェクト: {}", manifest.project.cyan());
}

/// CLI フラグでマニフェストの options を上書き
pub fn resolve_options(base: BuildOptions, overrides: &OptionArgs) -> BuildOptions {
    BuildOptions {
        cache: base.cache && !overrides.no_cache,
        remove: overrides.remove.unwrap_or(base.remove),
        pull: overrides.pull.unwrap_or(base.pull),
    }
}

/// ステージディレクトリの優先順位: CLI > マニフェスト > <root>/target/docker
///
/// ステージング時にディレクトリごと削除されるため、マニフェストのあるディレクトリ
/// （またはその親）を指すものは拒否する。
pub fn resolve_stage_dir(manifest: &BuildManifest, cli: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let stage_dir = cli.unwrap_or_else(|| {
        manifest
            .stage_dir_or(&dockstage_config::default_stage_dir(&manifest.root))
            .to_path_buf()
    });

    let root = normalize(&manifest.root)?;
    let stage = normalize(&stage_dir)?;
    if root.starts_with(&stage) {
        anyhow::bail!(
            "ステージディレクトリ {} はプロジェクト {} を含んでいます\n\
             ヒント: ステージング時に削除されるため、専用のディレクトリ (例: target/docker) を指定してください",
            stage_dir.display(),
            manifest.root.display()
        );
    }

    Ok(stage_dir)
}

/// 比較用の絶対パス（存在すれば正規化、なければ `.` / `..` を字句的に解決）
fn normalize(path: &Path) -> anyhow::Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let absolute = std::env::current_dir()?.join(path);
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

/// `--tag` 指定時は全イメージのタグを差し替える
pub fn resolve_images(images: &[ImageName], tag: Option<&str>) -> anyhow::Result<Vec<ImageName>> {
    match tag {
        Some(tag) => Ok(images
            .iter()
            .map(|image| image.with_tag(tag))
            .collect::<Result<Vec<_>, _>>()?),
        None => Ok(images.to_vec()),
    }
}

/// docker バイナリの解決
///
/// 相対パス（`./bin/docker` など）はカレントディレクトリ基準の絶対パスにする。
/// ビルドはステージディレクトリで実行されるため。
pub fn resolve_binary(args: &DockerArgs) -> anyhow::Result<PathBuf> {
    let binary = args
        .docker
        .clone()
        .unwrap_or_else(dockstage_config::docker_binary);

    if binary.is_relative() && binary.components().count() > 1 {
        return Ok(std::env::current_dir()?.join(binary));
    }
    Ok(binary)
}

/// 解決済みの認証情報
#[derive(Debug, Default)]
pub struct ResolvedAuth {
    pub credentials: Option<RegistryCredentials>,
    /// docker の config.json 由来（ユーザーのログインを消さないようログアウトしない）
    pub from_docker_config: bool,
}

impl ResolvedAuth {
    pub fn credentials(&self) -> Option<&RegistryCredentials> {
        self.credentials.as_ref()
    }
}

/// 認証情報の解決: マニフェストの registry > docker config.json
pub fn resolve_auth(
    manifest: &BuildManifest,
    images: &[ImageName],
    args: &DockerArgs,
) -> anyhow::Result<ResolvedAuth> {
    if let Some(registry) = &manifest.registry {
        return Ok(ResolvedAuth {
            credentials: Some(registry.clone()),
            from_docker_config: false,
        });
    }

    if !args.docker_config_auth {
        return Ok(ResolvedAuth::default());
    }

    let Some(first) = images.first() else {
        return Ok(ResolvedAuth::default());
    };

    if spans_registries(images) {
        tracing::warn!(
            "Images span several registries; using credentials for {} only",
            first.registry_host()
        );
    }

    let lookup = DockerConfigAuth::new();
    let credentials = lookup.credentials_for(first.registry_host())?;
    if credentials.is_none() {
        tracing::warn!(
            "No credentials for {} in {}",
            first.registry_host(),
            lookup.config_path().display()
        );
    }
    Ok(ResolvedAuth {
        credentials,
        from_docker_config: true,
    })
}

/// イメージ群が複数のレジストリにまたがるか
pub fn spans_registries(images: &[ImageName]) -> bool {
    images
        .windows(2)
        .any(|pair| pair[0].registry_host() != pair[1].registry_host())
}

/// エラーをユーザー向けメッセージに変換
pub fn user_message(error: &anyhow::Error) -> String {
    if let Some(e) = error.downcast_ref::<BuildError>() {
        return e.user_message();
    }
    if let Some(ManifestError::Build(e)) = error.downcast_ref::<ManifestError>() {
        return e.user_message();
    }
    format!("{:#}", error)
}
