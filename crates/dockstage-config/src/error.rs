use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "マニフェストファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: dockstage.local.kdl, dockstage.kdl, .dockstage.kdl\n\
        - ./.dockstage/ ディレクトリ\n\
        または DOCKSTAGE_MANIFEST 環境変数、--manifest オプションで直接指定できます"
    )]
    ManifestNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
