//! イメージ名とイメージID

use crate::error::{BuildError, Result};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

/// Docker Hub のレジストリ名
pub const DEFAULT_REGISTRY: &str = "docker.io";

static SUCCESSFULLY_BUILT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Successfully built ([0-9a-fA-F]+)$").expect("valid regex"));

/// レジストリ / 名前空間 / リポジトリ / タグ から成るイメージ参照
///
/// 等価性は正規化された文字列表現で判定します。
#[derive(Debug, Clone, Eq)]
pub struct ImageName {
    registry: Option<String>,
    namespace: Option<String>,
    repository: String,
    tag: Option<String>,
}

impl ImageName {
    /// イメージ名をパース
    ///
    /// # Examples
    /// - `ghcr.io/org/app:v1.0` -> registry `ghcr.io`, namespace `org`, repository `app`, tag `v1.0`
    /// - `nginx` -> repository `nginx`
    /// - `localhost:5000/app:dev` -> registry `localhost:5000`
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = |reason: &str| BuildError::InvalidImageName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("image name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("image name must not contain whitespace"));
        }

        // 最後の / より後ろにある : だけをタグの区切りとみなす（ポート番号と区別）
        let last_segment_start = name.rfind('/').map(|p| p + 1).unwrap_or(0);
        let (path, tag) = match name[last_segment_start..].rfind(':') {
            Some(pos) => {
                let split = last_segment_start + pos;
                (&name[..split], Some(&name[split + 1..]))
            }
            None => (name, None),
        };

        if let Some(tag) = tag {
            validate_tag(tag).map_err(|reason| invalid(&reason))?;
        }

        let mut segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty path segment"));
        }

        let registry = if segments.len() >= 2 && is_registry(segments[0]) {
            Some(segments.remove(0).to_string())
        } else {
            None
        };

        if segments
            .iter()
            .any(|s| s.chars().any(|c| c.is_ascii_uppercase()))
        {
            return Err(invalid("repository name must be lowercase"));
        }

        let repository = segments
            .pop()
            .ok_or_else(|| invalid("missing repository"))?
            .to_string();

        let namespace = if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        };

        Ok(Self {
            registry,
            namespace,
            repository,
            tag: tag.map(str::to_string),
        })
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// 認証に使うレジストリホスト（未指定なら Docker Hub）
    pub fn registry_host(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// タグを差し替えたイメージ名を返す
    pub fn with_tag(&self, tag: &str) -> Result<Self> {
        validate_tag(tag).map_err(|reason| BuildError::InvalidImageName {
            name: format!("{}:{}", self.without_tag(), tag),
            reason,
        })?;
        Ok(Self {
            tag: Some(tag.to_string()),
            ..self.clone()
        })
    }

    fn without_tag(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(registry) = &self.registry {
            parts.push(registry);
        }
        if let Some(namespace) = &self.namespace {
            parts.push(namespace);
        }
        parts.push(&self.repository);
        parts.join("/")
    }
}

/// レジストリの判定:
/// - `.` を含む（例: ghcr.io, gcr.io, *.amazonaws.com）
/// - `:` を含む（例: localhost:5000）
/// - `localhost`
fn is_registry(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
fn validate_tag(tag: &str) -> std::result::Result<(), String> {
    if tag.is_empty() {
        return Err("tag is empty".to_string());
    }

    if tag.len() > 128 {
        return Err(format!("tag too long ({} characters, max 128)", tag.len()));
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(format!("tag must not start with '.' or '-': {}", tag));
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(format!("invalid character '{}' in tag: {}", c, tag));
    }

    Ok(())
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.without_tag())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}

impl FromStr for ImageName {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for ImageName {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Hash for ImageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

/// ビルダーが割り当てたイメージID
///
/// ビルド出力のパースでのみ生成されます。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ビルド出力から `Successfully built <id>` を探し、最後に一致したIDを返す
///
/// マルチステージビルドでは複数行が出力されるため、最終イメージは最後の行。
pub fn parse_image_id<S: AsRef<str>>(lines: &[S]) -> Option<ImageId> {
    lines
        .iter()
        .filter_map(|line| SUCCESSFULLY_BUILT.captures(line.as_ref()))
        .last()
        .map(|caps| ImageId(caps[1].to_string()))
}
