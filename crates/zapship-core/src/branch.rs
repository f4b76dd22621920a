//! ブランチ判定
//!
//! 公開ステージはトリガー元ブランチがリリースブランチと完全一致した場合のみ実行されます。

use serde::Serialize;
use std::process::Command;
use tracing::debug;

/// Jenkins マルチブランチが設定するブランチ名（そのまま使う）
pub const BRANCH_NAME_VAR: &str = "BRANCH_NAME";

/// Git プラグインが設定するブランチ名（`origin/` 付き）
pub const GIT_BRANCH_VAR: &str = "GIT_BRANCH";

/// リリースブランチとの完全一致で公開可否を判定する
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchGate {
    release_branch: String,
}

/// ゲート判定の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Publish,
    Skip { reason: String },
}

impl BranchGate {
    pub fn new(release_branch: impl Into<String>) -> Self {
        Self {
            release_branch: release_branch.into(),
        }
    }

    pub fn release_branch(&self) -> &str {
        &self.release_branch
    }

    /// 大文字小文字を区別した完全一致
    pub fn allows(&self, branch: Option<&str>) -> bool {
        branch == Some(self.release_branch.as_str())
    }

    pub fn decide(&self, branch: Option<&str>) -> GateDecision {
        match branch {
            _ if self.allows(branch) => GateDecision::Publish,
            Some(b) => GateDecision::Skip {
                reason: format!(
                    "branch '{}' is not the release branch '{}'",
                    b, self.release_branch
                ),
            },
            None => GateDecision::Skip {
                reason: "branch could not be determined".to_string(),
            },
        }
    }
}

/// 現在のブランチを決定
///
/// 優先順位:
/// 1. CLI の `--branch`（そのまま比較）
/// 2. 環境変数 BRANCH_NAME（そのまま比較）
/// 3. 環境変数 GIT_BRANCH（`origin/` などを除去）
/// 4. `git rev-parse --abbrev-ref HEAD`（detached HEAD は不明扱い）
pub fn detect_branch(cli_branch: Option<&str>) -> Option<String> {
    detect_branch_with(cli_branch, |key| std::env::var(key).ok(), git_head_branch)
}

fn detect_branch_with<E, G>(cli_branch: Option<&str>, env: E, git: G) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
    G: FnOnce() -> Option<String>,
{
    if let Some(branch) = cli_branch.and_then(literal_branch) {
        debug!(branch = %branch, source = "cli", "Detected branch");
        return Some(branch);
    }

    if let Some(branch) = env(BRANCH_NAME_VAR).as_deref().and_then(literal_branch) {
        debug!(branch = %branch, source = BRANCH_NAME_VAR, "Detected branch");
        return Some(branch);
    }

    if let Some(branch) = env(GIT_BRANCH_VAR).as_deref().and_then(normalize_branch) {
        debug!(branch = %branch, source = GIT_BRANCH_VAR, "Detected branch");
        return Some(branch);
    }

    let branch = git().as_deref().and_then(normalize_branch);
    if let Some(b) = &branch {
        debug!(branch = %b, source = "git", "Detected branch");
    }
    branch
}

/// 明示的に渡されたブランチ名（前後の空白だけ除去）
fn literal_branch(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// ブランチ名を正規化
///
/// `origin/master` や `refs/heads/master` を `master` にします。
/// 空文字列と `HEAD` は None。
pub fn normalize_branch(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("refs/heads/")
        .or_else(|| trimmed.strip_prefix("refs/remotes/origin/"))
        .or_else(|| trimmed.strip_prefix("origin/"))
        .unwrap_or(trimmed);

    if stripped.is_empty() || stripped == "HEAD" {
        None
    } else {
        Some(stripped.to_string())
    }
}

fn git_head_branch() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
