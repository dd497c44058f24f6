use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {path}\n理由: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("環境変数 {0} が設定されていません")]
    MissingEnv(String),

    #[error("イメージ名が指定されていません\nヒント: images {{ image \"name:tag\" }} を追加してください")]
    NoImages,

    #[error(transparent)]
    Build(#[from] dockstage_build::BuildError),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
