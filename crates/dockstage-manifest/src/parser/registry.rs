//! registry ノードのパース

use super::{invalid, string_arg};
use crate::error::{ManifestError, Result};
use dockstage_build::RegistryCredentials;
use kdl::KdlNode;

/// registry ノードをパース
///
/// パスワードは `password_env` で環境変数から読むことを推奨。
pub fn parse_registry(node: &KdlNode) -> Result<RegistryCredentials> {
    let mut host = None;
    let mut username = None;
    let mut password = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "host" => host = Some(string_arg(child, 0)?),
                "username" => username = Some(string_arg(child, 0)?),
                "password" => {
                    tracing::warn!("registry password is written in plain text; prefer password_env");
                    password = Some(string_arg(child, 0)?);
                }
                "password_env" => {
                    let var = string_arg(child, 0)?;
                    let value =
                        std::env::var(&var).map_err(|_| ManifestError::MissingEnv(var.clone()))?;
                    password = Some(value);
                }
                other => {
                    tracing::warn!("Unknown registry field ignored: {}", other);
                }
            }
        }
    }

    let username = username.ok_or_else(|| invalid(node, "username が必要です"))?;
    let password =
        password.ok_or_else(|| invalid(node, "password_env または password が必要です"))?;

    let credentials = RegistryCredentials::new(username, password);
    Ok(match host {
        Some(host) => credentials.with_host(host),
        None => credentials,
    })
}
