use colored::Colorize;
use serde::Serialize;
use zapship_core::{BranchGate, GateDecision, PipelineConfig};

/// 実行計画（Docker に接続せずに解決した結果）
#[derive(Debug, Serialize)]
struct Plan<'a> {
    config: &'a PipelineConfig,
    branch: Option<&'a str>,
    build: bool,
    publish: GateDecision,
}

pub fn handle(branch: Option<String>, tag: Option<String>, json: bool) -> anyhow::Result<()> {
    let (_, config) = super::load_config(tag, false)?;
    let branch = zapship_core::detect_branch(branch.as_deref());
    let decision = BranchGate::new(config.release_branch.clone()).decide(branch.as_deref());

    let plan = Plan {
        config: &config,
        branch: branch.as_deref(),
        build: true,
        publish: decision,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{}", "実行計画:".blue());
    super::print_summary(&config);
    println!("  ブランチ: {}", super::branch_label(plan.branch).cyan());
    println!();
    println!("  1. build   {} {}", "run".green(), config.image);
    match &plan.publish {
        GateDecision::Publish => {
            println!(
                "  2. publish {} {} -> {}",
                "run".green(),
                config.image,
                config.registry_host()
            );
        }
        GateDecision::Skip { reason } => {
            println!("  2. publish {} ({})", "skip".yellow(), reason);
        }
    }

    Ok(())
}
