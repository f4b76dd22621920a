use crate::docker;
use colored::Colorize;
use zapship_build::{ImageBuilder, ImagePusher, Pipeline};

pub async fn handle(
    branch: Option<String>,
    tag: Option<String>,
    no_cache: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let (_, config) = super::load_config(tag, no_cache)?;
    let branch = zapship_core::detect_branch(branch.as_deref());

    println!("{}", "パイプラインを実行中...".blue());
    super::print_summary(&config);
    println!("  ブランチ: {}", super::branch_label(branch.as_deref()).cyan());
    println!();

    // 検査結果はビルドを止めない（エラーは docker build 側で報告される）
    if let Err(e) = super::check_recipe(&config) {
        tracing::warn!(error = %e, "Skipping Dockerfile lint");
    }

    let docker = docker::init_docker_with_error_handling().await?;
    let pipeline = Pipeline::new(
        &config,
        ImageBuilder::new(docker.clone()).quiet(quiet),
        ImagePusher::new(docker),
    );

    println!();
    let report = pipeline.run(branch.as_deref()).await;

    super::finish(&report)
}
