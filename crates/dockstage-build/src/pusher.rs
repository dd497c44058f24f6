//! イメージプッシュ処理
//!
//! ビルドしたイメージを docker バイナリ経由でレジストリにプッシュします。

use crate::auth::{self, RegistryCredentials};
use crate::error::{BuildError, Result};
use crate::image::ImageName;
use crate::process::{CommandLine, CommandRunner, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    runner: Arc<dyn ProcessRunner>,
    binary: PathBuf,
    keep_login: bool,
}

impl ImagePusher {
    /// 新しい ImagePusher を作成
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self::with_runner(binary, Arc::new(CommandRunner::new()))
    }

    /// ProcessRunner を指定して作成
    pub fn with_runner(binary: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            binary: binary.into(),
            keep_login: false,
        }
    }

    /// プッシュ後のログアウトを行わない
    ///
    /// 認証情報が docker の config.json 由来の場合に使用。ログアウトすると
    /// ユーザーが保存したログインが消えてしまう。
    pub fn keep_login(mut self, keep: bool) -> Self {
        self.keep_login = keep;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// 全てのイメージ名を順番にプッシュ
    ///
    /// イメージ名ごとに ログイン → プッシュ → ログアウト を完了させてから次へ進み、
    /// 最初の失敗で残りのイメージは処理しません。
    pub async fn push(
        &self,
        image_names: &[ImageName],
        auth: Option<&RegistryCredentials>,
    ) -> Result<()> {
        for name in image_names {
            self.push_one(name, auth).await?;
        }
        Ok(())
    }

    async fn push_one(&self, name: &ImageName, auth: Option<&RegistryCredentials>) -> Result<()> {
        // プッシュは公開レジストリでも認証が必要なため host 無しでもログインする
        if let Some(credentials) = auth {
            auth::login(self.runner.as_ref(), &self.binary, credentials).await?;
        }

        let image = name.to_string();
        let command = CommandLine::new(&self.binary)
            .arg("push")
            .arg(image.as_str());

        tracing::info!("Pushing {}", image);
        let output = self.runner.run(&command).await?;
        if !output.success() {
            // ログアウトはプッシュ成功時のみ
            return Err(BuildError::PushFailed {
                image,
                failure: output.into_failure(&command),
            });
        }

        if let Some(credentials) = auth
            && !self.keep_login
        {
            auth::logout(self.runner.as_ref(), &self.binary, credentials.host()).await?;
        }

        tracing::info!("Pushed {}", image);
        Ok(())
    }
}
