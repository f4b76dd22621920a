use crate::docker;
use colored::Colorize;
use zapship_build::{ImageBuilder, ImagePusher, Pipeline, RunOutcome, RunReport};

pub async fn handle(tag: Option<String>, no_cache: bool, quiet: bool) -> anyhow::Result<()> {
    let (_, config) = super::load_config(tag, no_cache)?;

    println!("{}", "イメージをビルド中...".blue());
    super::print_summary(&config);
    println!();

    if let Err(e) = super::check_recipe(&config) {
        tracing::warn!(error = %e, "Skipping Dockerfile lint");
    }

    let docker = docker::init_docker_with_error_handling().await?;
    let pipeline = Pipeline::new(
        &config,
        ImageBuilder::new(docker.clone()).quiet(quiet),
        ImagePusher::new(docker),
    );

    let (built, outcome) = match pipeline.build().await {
        Ok(image) => {
            let reason = format!("{} をビルドしました（build コマンドは公開しません）", image);
            (Some(image), RunOutcome::SkippedPublish { reason })
        }
        Err(e) => (None, RunOutcome::FailedAtBuild(e)),
    };

    super::finish(&RunReport {
        image: config.image.clone(),
        branch: None,
        built,
        outcome,
    })
}
