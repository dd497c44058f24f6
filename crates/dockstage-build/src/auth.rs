//! レジストリ認証
//!
//! 認証情報はそのまま `docker login` / `docker logout` に渡します。
//! Docker config.json からの読み込みにも対応しています（読み込みのみ）。

use crate::error::{BuildError, Result};
use crate::process::{CommandLine, ProcessRunner};
use base64::Engine;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Docker Hub の config.json 上のキー
const DOCKER_HUB_AUTH_KEY: &str = "https://index.docker.io/v1/";

/// レジストリの認証情報
///
/// `host` が `None` の場合はデフォルトの公開レジストリを意味します。
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    username: String,
    password: String,
    host: Option<String>,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// `<bin> login -u <user> -p <password> [<host>]`
    pub fn login_command(&self, binary: &Path) -> CommandLine {
        let cmd = CommandLine::new(binary)
            .args(["login", "-u", self.username.as_str(), "-p"])
            .secret_arg(self.password.as_str());
        match &self.host {
            Some(host) => cmd.arg(host.as_str()),
            None => cmd,
        }
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"********")
            .field("host", &self.host)
            .finish()
    }
}

/// `<bin> logout [<host>]`
pub fn logout_command(binary: &Path, host: Option<&str>) -> CommandLine {
    let cmd = CommandLine::new(binary).arg("logout");
    match host {
        Some(host) => cmd.arg(host),
        None => cmd,
    }
}

/// ログインを実行（非ゼロ終了は LoginFailed）
pub(crate) async fn login(
    runner: &dyn ProcessRunner,
    binary: &Path,
    credentials: &RegistryCredentials,
) -> Result<()> {
    let command = credentials.login_command(binary);
    tracing::debug!(
        host = credentials.host().unwrap_or("(default)"),
        "Logging in to registry"
    );

    let output = runner.run(&command).await?;
    if !output.success() {
        return Err(BuildError::LoginFailed(output.into_failure(&command)));
    }
    Ok(())
}

/// ログアウトを実行（非ゼロ終了は LogoutFailed）
pub(crate) async fn logout(
    runner: &dyn ProcessRunner,
    binary: &Path,
    host: Option<&str>,
) -> Result<()> {
    let command = logout_command(binary, host);
    tracing::debug!(host = host.unwrap_or("(default)"), "Logging out of registry");

    let output = runner.run(&command).await?;
    if !output.success() {
        return Err(BuildError::LogoutFailed(output.into_failure(&command)));
    }
    Ok(())
}

/// Docker config.json の構造
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DockerConfig {
    /// 認証情報 (レジストリ -> AuthEntry)
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

/// 認証エントリ
#[derive(Debug, Deserialize)]
struct AuthEntry {
    /// Base64エンコードされた "username:password"
    auth: Option<String>,
}

/// Docker config.json から認証情報を引く
#[derive(Debug)]
pub struct DockerConfigAuth {
    config_path: PathBuf,
}

impl Default for DockerConfigAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerConfigAuth {
    /// デフォルトで $DOCKER_CONFIG/config.json か ~/.docker/config.json を使用
    pub fn new() -> Self {
        let config_path = std::env::var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".docker"))
                    .unwrap_or_else(|| PathBuf::from(".docker"))
            })
            .join("config.json");

        Self { config_path }
    }

    /// 指定したパスの config.json を使用
    pub fn with_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// レジストリホストの認証情報を取得
    ///
    /// # Returns
    /// * `Ok(Some(credentials))` - 認証情報が見つかった場合（host 付き）
    /// * `Ok(None)` - config.json が無い、またはエントリが無い場合
    /// * `Err(e)` - config.json の読み込み・デコードに失敗した場合
    pub fn credentials_for(&self, registry: &str) -> Result<Option<RegistryCredentials>> {
        // config.json が存在しない場合は認証なしで続行
        if !self.config_path.exists() {
            tracing::debug!("Docker config.json not found at {:?}", self.config_path);
            return Ok(None);
        }

        let config = self.load_docker_config()?;

        let entry = config.auths.get(registry).or_else(|| {
            if registry == crate::image::DEFAULT_REGISTRY {
                config.auths.get(DOCKER_HUB_AUTH_KEY)
            } else {
                None
            }
        });

        if let Some(auth_entry) = entry
            && let Some(auth_b64) = &auth_entry.auth
            && let Some(credentials) = self.decode_auth(auth_b64, registry)?
        {
            tracing::debug!("Found credentials in auths for {}", registry);
            return Ok(Some(credentials));
        }

        tracing::debug!("No credentials found for {}", registry);
        Ok(None)
    }

    /// Docker config.json を読み込み
    fn load_docker_config(&self) -> Result<DockerConfig> {
        let content =
            std::fs::read_to_string(&self.config_path).map_err(|e| BuildError::AuthLookup {
                registry: self.config_path.display().to_string(),
                message: format!("Failed to read config.json: {}", e),
            })?;

        serde_json::from_str(&content).map_err(|e| BuildError::AuthLookup {
            registry: self.config_path.display().to_string(),
            message: format!("Failed to parse config.json: {}", e),
        })
    }

    /// Base64エンコードされた認証情報をデコード
    fn decode_auth(&self, auth_b64: &str, registry: &str) -> Result<Option<RegistryCredentials>> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(auth_b64)
            .map_err(|e| BuildError::AuthLookup {
                registry: registry.to_string(),
                message: format!("Failed to decode auth: {}", e),
            })?;

        let auth_str = String::from_utf8(decoded).map_err(|e| BuildError::AuthLookup {
            registry: registry.to_string(),
            message: format!("Invalid UTF-8 in auth: {}", e),
        })?;

        Ok(auth_str.split_once(':').map(|(username, password)| {
            RegistryCredentials::new(username, password).with_host(registry)
        }))
    }
}
