//! ビルドオプションとビルダーフラグへの変換

use std::fmt;
use std::str::FromStr;

/// 中間コンテナの削除ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveIntermediate {
    /// ビルド失敗時も含めて常に削除
    Always,
    /// 削除しない
    Never,
    /// ビルド成功時のみ削除
    #[default]
    OnSuccess,
}

/// ベースイメージの pull ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PullBaseImage {
    /// 常に最新を pull
    Always,
    /// ローカルに存在しない場合のみ pull
    #[default]
    IfMissing,
}

/// 1回のビルド呼び出しに渡すオプション
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub cache: bool,
    pub remove: RemoveIntermediate,
    pub pull: PullBaseImage,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cache: true,
            remove: RemoveIntermediate::default(),
            pull: PullBaseImage::default(),
        }
    }
}

impl BuildOptions {
    /// ビルダーに渡すフラグ（キャッシュ・削除・pull の順で常に3つ）
    pub fn to_flags(&self) -> Vec<String> {
        let cache_flag = format!("--no-cache={}", !self.cache);

        let remove_flag = match self.remove {
            RemoveIntermediate::Always => "--force-rm=true",
            RemoveIntermediate::Never => "--rm=false",
            RemoveIntermediate::OnSuccess => "--rm=true",
        };

        let pull_flag = match self.pull {
            PullBaseImage::Always => "--pull=true",
            PullBaseImage::IfMissing => "--pull=false",
        };

        vec![cache_flag, remove_flag.to_string(), pull_flag.to_string()]
    }
}

impl FromStr for RemoveIntermediate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "on-success" | "on_success" => Ok(Self::OnSuccess),
            other => Err(format!(
                "unknown remove policy '{}' (expected always, never or on-success)",
                other
            )),
        }
    }
}

impl fmt::Display for RemoveIntermediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::OnSuccess => "on-success",
        };
        f.write_str(s)
    }
}

impl FromStr for PullBaseImage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "if-missing" | "if_missing" => Ok(Self::IfMissing),
            other => Err(format!(
                "unknown pull policy '{}' (expected always or if-missing)",
                other
            )),
        }
    }
}

impl fmt::Display for PullBaseImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Always => "always",
            Self::IfMissing => "if-missing",
        };
        f.write_str(s)
    }
}
