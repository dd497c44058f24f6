//! イメージビルド処理
//!
//! ステージしたビルドコンテキストから docker バイナリ経由でイメージをビルドし、
//! 指定されたイメージ名でタグ付けします。

use crate::auth::{self, RegistryCredentials};
use crate::error::{BuildError, Result};
use crate::image::{ImageId, ImageName, parse_image_id};
use crate::options::BuildOptions;
use crate::process::{CommandLine, CommandRunner, ProcessRunner};
use crate::processor::{Instruction, Processor};
use crate::stage::{StageWriter, StagedBuild};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 外部の docker バイナリでイメージをビルドする
///
/// ステージング → (ログイン) → ビルド → イメージID取得 → タグ付け の順に実行し、
/// どこかで失敗した時点で残りの処理を中断します。
pub struct ImageBuilder {
    runner: Arc<dyn ProcessRunner>,
    binary: PathBuf,
}

impl ImageBuilder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, Arc::new(CommandRunner::new()))
    }

    pub fn with_runner(binary: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// 命令列をプロセッサで変換してからビルド
    pub async fn build_instructions(
        &self,
        processor: &dyn Processor,
        instructions: &[Instruction],
        image_names: &[ImageName],
        options: &BuildOptions,
        stage_dir: &Path,
        auth: Option<&RegistryCredentials>,
    ) -> Result<ImageId> {
        let staged = processor.process(instructions, stage_dir)?;
        self.build(&staged, image_names, options, stage_dir, auth)
            .await
    }

    /// イメージをビルドし、全てのイメージ名でタグ付けする
    pub async fn build(
        &self,
        staged: &StagedBuild,
        image_names: &[ImageName],
        options: &BuildOptions,
        stage_dir: &Path,
        auth: Option<&RegistryCredentials>,
    ) -> Result<ImageId> {
        tracing::info!("Staging build context: {}", stage_dir.display());
        StageWriter::stage(staged, stage_dir)?;

        // host 未指定の場合は公開レジストリにログイン済み（または不要）とみなす
        match auth {
            Some(credentials) if credentials.host().is_some() => {
                auth::login(self.runner.as_ref(), &self.binary, credentials).await?;
            }
            Some(_) => tracing::debug!("No registry host given; skipping login before build"),
            None => {}
        }

        let image_id = self.run_build(stage_dir, options).await?;
        tracing::info!("Successfully built: {}", image_id);

        for name in image_names {
            self.tag(&image_id, name).await?;
        }

        Ok(image_id)
    }

    /// `<bin> build <flags...> .` をステージディレクトリで実行
    async fn run_build(&self, stage_dir: &Path, options: &BuildOptions) -> Result<ImageId> {
        let command = CommandLine::new(&self.binary)
            .arg("build")
            .args(options.to_flags())
            .arg(".")
            .current_dir(stage_dir);

        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(BuildError::BuildFailed(output.into_failure(&command)));
        }

        // 終了コードが0でもイメージIDが取れなければ失敗扱い
        parse_image_id(&output.stdout).ok_or_else(|| BuildError::ImageIdNotFound {
            command: command.to_string(),
            output: output.stdout,
        })
    }

    /// `<bin> tag <id> <name>`
    async fn tag(&self, image_id: &ImageId, name: &ImageName) -> Result<()> {
        let image = name.to_string();
        let command = CommandLine::new(&self.binary)
            .arg("tag")
            .arg(image_id.as_str())
            .arg(image.as_str());

        tracing::info!("Tagging {} as {}", image_id, image);
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(BuildError::TagFailed {
                image,
                failure: output.into_failure(&command),
            });
        }
        Ok(())
    }
}
