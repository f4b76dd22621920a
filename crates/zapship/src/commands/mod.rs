pub mod build;
pub mod plan;
pub mod publish;
pub mod run;
pub mod validate;

use colored::Colorize;
use std::path::PathBuf;
use zapship_build::{Recipe, RunOutcome, RunReport, Severity};
use zapship_core::{Overrides, PipelineConfig, PipelineError};

/// 環境変数と CLI 引数を反映してパイプライン設定をロード
pub fn load_config(tag: Option<String>, no_cache: bool) -> anyhow::Result<(PathBuf, PipelineConfig)> {
    let overrides = Overrides::from_env()
        .with_tag(tag)
        .with_no_cache(no_cache);

    match zapship_core::load_pipeline(&overrides) {
        Ok(loaded) => Ok(loaded),
        Err(e @ PipelineError::ProjectRootNotFound(_)) => {
            eprintln!();
            eprintln!("{}", "✗ プロジェクトルートが見つかりません".red().bold());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("pipeline.kdl が存在するディレクトリで実行してください");
            Err(e.into())
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            Err(e.into())
        }
    }
}

/// 設定のサマリーを表示
pub fn print_summary(config: &PipelineConfig) {
    println!("  イメージ: {}", config.image.to_string().cyan());
    println!("  レジストリ: {}", config.registry_host());
    println!("  リリースブランチ: {}", config.release_branch.cyan());
    println!("  コンテキスト: {}", config.context.display());
    println!("  Dockerfile: {}", config.dockerfile.display());
    println!(
        "  認証情報: {} ({} / {})",
        config.credentials.id, config.credentials.username_env, config.credentials.password_env
    );
    if !config.build_args.is_empty() {
        println!("  ビルド引数:");
        for (key, value) in &config.build_args {
            println!("    {}={}", key, value);
        }
    }
}

/// Dockerfile を検査して結果を表示
///
/// エラーレベルの指摘があれば false を返す。
pub fn check_recipe(config: &PipelineConfig) -> anyhow::Result<bool> {
    let recipe = Recipe::from_file(&config.dockerfile_path())?;
    let findings = recipe.lint();

    for finding in &findings {
        let line = finding.to_string();
        match finding.severity {
            Severity::Error => println!("  {} {}", "✗".red(), line.red()),
            Severity::Warning => {
                tracing::warn!(finding = %finding, "Dockerfile lint");
                println!("  {} {}", "⚠".yellow(), line.yellow());
            }
            Severity::Info => println!("  {} {}", "ℹ".blue(), line),
        }
    }

    Ok(!findings.iter().any(|f| f.severity == Severity::Error))
}

/// 実行結果を表示し、失敗時は非ゼロで終了する
pub fn finish(report: &RunReport) -> anyhow::Result<()> {
    println!();
    match &report.outcome {
        RunOutcome::Success { pushed } => {
            println!("{}", "✓ 公開が完了しました".green().bold());
            println!("  {}", pushed.cyan());
        }
        RunOutcome::SkippedPublish { reason } => {
            println!("{}", "✓ 完了しました（公開はスキップ）".green().bold());
            println!("  {}", reason);
        }
        RunOutcome::FailedAtBuild(e) => {
            eprintln!("{}", "✗ ビルドステージで失敗しました".red().bold());
            eprintln!("  {}", e.user_message());
        }
        RunOutcome::FailedAtPush(e) => {
            let title = if e.is_auth_failure() {
                "✗ 公開ステージで認証に失敗しました"
            } else {
                "✗ 公開ステージで失敗しました"
            };
            eprintln!("{}", title.red().bold());
            eprintln!("  {}", e.user_message());
        }
    }

    tracing::info!(outcome = %report.outcome, "Pipeline finished");

    if !report.outcome.is_success() {
        std::process::exit(report.outcome.exit_code());
    }
    Ok(())
}

/// ブランチの表示用文字列
pub fn branch_label(branch: Option<&str>) -> String {
    branch.unwrap_or("(不明)").to_string()
}
