mod commands;
mod docker;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zapship")]
#[command(
    about = "OWASP ZAP イメージをビルドし、リリースブランチからだけ公開する",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// ビルドと公開を順番に実行
    Run {
        /// トリガー元ブランチ（省略時は BRANCH_NAME / GIT_BRANCH / git から検出）
        #[arg(short, long)]
        branch: Option<String>,
        /// イメージタグを上書き（環境変数 TAG より優先）
        #[arg(short, long)]
        tag: Option<String>,
        /// キャッシュを使わずにビルド
        #[arg(long)]
        no_cache: bool,
        /// ビルド出力を抑制してスピナーのみ表示
        #[arg(short, long)]
        quiet: bool,
    },
    /// イメージをビルド（公開しない）
    Build {
        /// イメージタグを上書き（環境変数 TAG より優先）
        #[arg(short, long)]
        tag: Option<String>,
        /// キャッシュを使わずにビルド
        #[arg(long)]
        no_cache: bool,
        /// ビルド出力を抑制してスピナーのみ表示
        #[arg(short, long)]
        quiet: bool,
    },
    /// ビルド済みイメージを公開（リリースブランチのみ）
    Publish {
        /// トリガー元ブランチ（省略時は BRANCH_NAME / GIT_BRANCH / git から検出）
        #[arg(short, long)]
        branch: Option<String>,
        /// イメージタグを上書き（環境変数 TAG より優先）
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// 設定と Dockerfile を検証
    Validate,
    /// 解決済みの設定と実行されるステージを表示（Docker には接続しない）
    Plan {
        /// トリガー元ブランチ（省略時は BRANCH_NAME / GIT_BRANCH / git から検出）
        #[arg(short, long)]
        branch: Option<String>,
        /// イメージタグを上書き（環境変数 TAG より優先）
        #[arg(short, long)]
        tag: Option<String>,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout は進捗表示と plan --json に使うので、ログは stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match cli.command {
        Commands::Run {
            branch,
            tag,
            no_cache,
            quiet,
        } => {
            commands::run::handle(branch, tag, no_cache, quiet).await?;
        }
        Commands::Build {
            tag,
            no_cache,
            quiet,
        } => {
            commands::build::handle(tag, no_cache, quiet).await?;
        }
        Commands::Publish { branch, tag } => {
            commands::publish::handle(branch, tag).await?;
        }
        Commands::Validate => {
            commands::validate::handle()?;
        }
        Commands::Plan { branch, tag, json } => {
            commands::plan::handle(branch, tag, json)?;
        }
        Commands::Version => {
            println!("zapship {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
