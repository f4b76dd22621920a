use crate::docker;
use colored::Colorize;
use zapship_build::{BuildError, ImageBuilder, ImagePusher, Pipeline, RunOutcome, RunReport};
use zapship_core::{BranchGate, GateDecision};

pub async fn handle(branch: Option<String>, tag: Option<String>) -> anyhow::Result<()> {
    let (_, config) = super::load_config(tag, false)?;
    let branch = zapship_core::detect_branch(branch.as_deref());

    println!("{}", "イメージを公開中...".blue());
    println!("  イメージ: {}", config.image.to_string().cyan());
    println!("  ブランチ: {}", super::branch_label(branch.as_deref()).cyan());

    let gate = BranchGate::new(config.release_branch.clone());
    if let GateDecision::Skip { reason } = gate.decide(branch.as_deref()) {
        // ゲートを通らない場合は Docker にも認証情報にも触れない
        return super::finish(&RunReport {
            image: config.image.clone(),
            branch,
            built: None,
            outcome: RunOutcome::SkippedPublish { reason },
        });
    }

    let docker = docker::init_docker_with_error_handling().await?;
    let image_builder = ImageBuilder::new(docker.clone());
    let outcome = if image_builder.image_exists(&config.image).await? {
        let pipeline = Pipeline::new(&config, image_builder, ImagePusher::new(docker));
        pipeline.publish(&config.image, branch.as_deref()).await
    } else {
        RunOutcome::FailedAtPush(BuildError::PushFailed {
            message: format!(
                "{} がローカルにありません。先に zapship build を実行してください",
                config.image
            ),
        })
    };

    super::finish(&RunReport {
        image: config.image.clone(),
        branch,
        built: None,
        outcome,
    })
}
