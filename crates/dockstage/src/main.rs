mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dockstage_build::{PullBaseImage, RemoveIntermediate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockstage")]
#[command(about = "KDLマニフェストからコンテナイメージをステージ・ビルド・プッシュ", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ビルドコンテキストを作成してイメージをビルド
    Build(BuildArgs),
    /// マニフェストのイメージをプッシュ
    Push(PushArgs),
    /// ビルドコンテキストの作成のみ行う
    Stage(StageArgs),
    /// ビルダーに渡すフラグを表示
    Flags(OptionArgs),
    /// バージョン情報を表示
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    /// マニフェストファイル（省略時は自動検出）
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

/// マニフェストの options を上書きするフラグ
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// キャッシュを使用しない
    #[arg(long)]
    pub no_cache: bool,
    /// 中間コンテナの削除 (always, never, on-success)
    #[arg(long, value_name = "POLICY")]
    pub remove: Option<RemoveIntermediate>,
    /// ベースイメージの pull (always, if-missing)
    #[arg(long, value_name = "POLICY")]
    pub pull: Option<PullBaseImage>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DockerArgs {
    /// docker 互換バイナリ（DOCKSTAGE_DOCKER 環境変数でも指定可）
    #[arg(long, value_name = "BIN")]
    pub docker: Option<PathBuf>,
    /// マニフェストに registry が無い場合 ~/.docker/config.json の認証情報を使う
    #[arg(long)]
    pub docker_config_auth: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
    /// ステージディレクトリ
    #[arg(long, value_name = "DIR")]
    pub stage_dir: Option<PathBuf>,
    #[command(flatten)]
    pub options: OptionArgs,
    /// ビルド後にプッシュする
    #[arg(long)]
    pub push: bool,
    /// 全イメージのタグを上書き
    #[arg(short, long)]
    pub tag: Option<String>,
    #[command(flatten)]
    pub docker: DockerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PushArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
    /// 全イメージのタグを上書き
    #[arg(short, long)]
    pub tag: Option<String>,
    #[command(flatten)]
    pub docker: DockerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
    /// ステージディレクトリ
    #[arg(long, value_name = "DIR")]
    pub stage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // ログは stderr へ（stdout はコマンドの出力用）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), utils::user_message(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build(args) => commands::build::handle(args).await,
        Commands::Push(args) => commands::push::handle(args).await,
        Commands::Stage(args) => commands::stage::handle(args),
        Commands::Flags(args) => {
            commands::flags::handle(&args);
            Ok(())
        }
        Commands::Version => {
            println!("dockstage {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
