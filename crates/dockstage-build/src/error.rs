use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 失敗した外部コマンドの記録
///
/// `command` はパスワードを伏せた表示形式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub command: String,
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl CommandFailure {
    /// 出力の末尾 `n` 行（stderr を優先）
    pub fn tail(&self, n: usize) -> Vec<&str> {
        let lines = if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let start = lines.len().saturating_sub(n);
        lines[start..].iter().map(String::as_str).collect()
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` exited with code {}", self.command, self.exit_code)
    }
}

/// エラーの大分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Stage,
    Process,
    Login,
    Build,
    Tag,
    Push,
    Logout,
    Config,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to stage build context at {path}: {source}")]
    Stage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry login failed: {0}")]
    LoginFailed(CommandFailure),

    #[error("Build failed: {0}")]
    BuildFailed(CommandFailure),

    #[error("Could not find image id in output of `{command}`")]
    ImageIdNotFound { command: String, output: Vec<String> },

    #[error("Failed to tag image as {image}: {failure}")]
    TagFailed {
        image: String,
        failure: CommandFailure,
    },

    #[error("Failed to push image {image}: {failure}")]
    PushFailed {
        image: String,
        failure: CommandFailure,
    },

    #[error("Registry logout failed: {0}")]
    LogoutFailed(CommandFailure),

    #[error("Invalid image name '{name}': {reason}")]
    InvalidImageName { name: String, reason: String },

    #[error("Authentication lookup failed for {registry}: {message}")]
    AuthLookup { registry: String, message: String },

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Stage { .. } => ErrorKind::Stage,
            BuildError::Spawn { .. } => ErrorKind::Process,
            BuildError::LoginFailed(_) => ErrorKind::Login,
            BuildError::BuildFailed(_) | BuildError::ImageIdNotFound { .. } => ErrorKind::Build,
            BuildError::TagFailed { .. } => ErrorKind::Tag,
            BuildError::PushFailed { .. } => ErrorKind::Push,
            BuildError::LogoutFailed(_) => ErrorKind::Logout,
            BuildError::InvalidImageName { .. }
            | BuildError::AuthLookup { .. }
            | BuildError::InvalidConfig(_)
            | BuildError::Json(_) => ErrorKind::Config,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::Spawn { command, source } => {
                format!(
                    "コマンドを起動できません: {}\n理由: {}\n\
                     \n\
                     解決方法:\n\
                     1. docker がインストールされているか確認してください\n\
                     2. --docker または DOCKSTAGE_DOCKER でバイナリのパスを指定してください",
                    command, source
                )
            }
            BuildError::LoginFailed(failure) | BuildError::LogoutFailed(failure) => {
                format!(
                    "{}\n{}\n\
                     \n\
                     レジストリのユーザー名・パスワードを確認してください。",
                    self,
                    indent(&failure.tail(5))
                )
            }
            BuildError::BuildFailed(failure) => {
                format!(
                    "ビルドに失敗しました (exit code {})\n{}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    failure.exit_code,
                    indent(&failure.tail(10))
                )
            }
            BuildError::ImageIdNotFound { output, .. } => {
                let tail: Vec<&str> = output
                    .iter()
                    .rev()
                    .take(5)
                    .rev()
                    .map(String::as_str)
                    .collect();
                format!(
                    "ビルド出力からイメージIDを取得できませんでした\n{}\n\
                     \n\
                     \"Successfully built <id>\" を出力するビルダーを使用してください\n\
                     (BuildKit の場合は DOCKER_BUILDKIT=0 を設定してください)。",
                    indent(&tail)
                )
            }
            BuildError::PushFailed { image, failure } => {
                format!(
                    "イメージのプッシュに失敗しました: {}\n{}\n\
                     \n\
                     レジストリへのアクセス権限を確認してください。",
                    image,
                    indent(&failure.tail(5))
                )
            }
            _ => format!("{}", self),
        }
    }
}

fn indent(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| format!("  | {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(stdout: &[&str], stderr: &[&str]) -> CommandFailure {
        CommandFailure {
            command: "docker push app".to_string(),
            exit_code: 1,
            stdout: stdout.iter().map(|s| s.to_string()).collect(),
            stderr: stderr.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_tail_prefers_stderr() {
        let f = failure(&["out"], &["e1", "e2", "e3"]);
        assert_eq!(f.tail(2), vec!["e2", "e3"]);

        let f = failure(&["o1", "o2"], &[]);
        assert_eq!(f.tail(5), vec!["o1", "o2"]);
    }

    #[test]
    fn test_kind_classification() {
        let err = BuildError::ImageIdNotFound {
            command: "docker build .".to_string(),
            output: vec![],
        };
        assert_eq!(err.kind(), ErrorKind::Build);

        let err = BuildError::PushFailed {
            image: "app".to_string(),
            failure: failure(&[], &["denied"]),
        };
        assert_eq!(err.kind(), ErrorKind::Push);
        assert!(err.to_string().contains("docker push app"));
        assert!(err.user_message().contains("denied"));
    }
}
