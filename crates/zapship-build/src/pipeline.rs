//! パイプライン実行
//!
//! Build → (ブランチ判定) → Publish を厳密に順番に実行します。
//! リトライやロールバックは行いません。

use crate::error::{BuildError, BuildResult};
use crate::pusher::validate_tag;
use async_trait::async_trait;
use std::fmt;
use zapship_core::{BranchGate, Credentials, GateDecision, ImageRef, PipelineConfig};

/// ビルドステージ
#[async_trait]
pub trait ImageBuild: Send + Sync {
    /// 設定どおりにイメージをビルドし、付与したイメージ参照を返す
    async fn build(&self, config: &PipelineConfig) -> BuildResult<ImageRef>;
}

/// 公開ステージ
#[async_trait]
pub trait ImagePublish: Send + Sync {
    /// イメージをプッシュし、プッシュした完全なイメージ名を返す
    async fn publish(
        &self,
        image: &ImageRef,
        credentials: Option<&Credentials>,
        registry: &str,
    ) -> BuildResult<String>;
}

/// 実行結果の終端状態
#[derive(Debug)]
pub enum RunOutcome {
    Success { pushed: String },
    SkippedPublish { reason: String },
    FailedAtBuild(BuildError),
    FailedAtPush(BuildError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunOutcome::Success { .. } | RunOutcome::SkippedPublish { .. }
        )
    }

    /// プロセスの終了コード
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn error(&self) -> Option<&BuildError> {
        match self {
            RunOutcome::FailedAtBuild(e) | RunOutcome::FailedAtPush(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success { pushed } => write!(f, "success: pushed {}", pushed),
            RunOutcome::SkippedPublish { reason } => write!(f, "publish skipped: {}", reason),
            RunOutcome::FailedAtBuild(e) => write!(f, "failed at build: {}", e),
            RunOutcome::FailedAtPush(e) if e.is_auth_failure() => {
                write!(f, "failed at push (authentication): {}", e)
            }
            RunOutcome::FailedAtPush(e) => write!(f, "failed at push: {}", e),
        }
    }
}

/// 1 回の実行の記録
#[derive(Debug)]
pub struct RunReport {
    pub image: ImageRef,
    pub branch: Option<String>,
    /// ビルドステージが付与したイメージ（ビルドしていない場合は None）
    pub built: Option<ImageRef>,
    pub outcome: RunOutcome,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// ビルドと公開を束ねるオーケストレーター
pub struct Pipeline<'a, B, P> {
    config: &'a PipelineConfig,
    builder: B,
    publisher: P,
    gate: BranchGate,
    env: EnvLookup,
}

impl<'a, B, P> Pipeline<'a, B, P>
where
    B: ImageBuild,
    P: ImagePublish,
{
    pub fn new(config: &'a PipelineConfig, builder: B, publisher: P) -> Self {
        Self {
            config,
            builder,
            publisher,
            gate: BranchGate::new(config.release_branch.clone()),
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// 認証情報の参照元を差し替える
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(lookup);
        self
    }

    pub fn gate(&self) -> &BranchGate {
        &self.gate
    }

    /// パイプライン全体を実行
    ///
    /// ビルドが失敗した場合、公開ステージは実行されません。
    pub async fn run(&self, branch: Option<&str>) -> RunReport {
        let built = match self.build().await {
            Ok(image) => image,
            Err(e) => {
                return self.report(branch, None, RunOutcome::FailedAtBuild(e));
            }
        };

        let outcome = self.publish(&built, branch).await;
        self.report(branch, Some(built), outcome)
    }

    /// ビルドステージのみ実行
    pub async fn build(&self) -> BuildResult<ImageRef> {
        validate_tag(self.config.image.tag())?;

        tracing::info!(image = %self.config.image, "Stage: build");
        let built = self.builder.build(self.config).await?;

        if built != self.config.image {
            return Err(BuildError::BuildFailed(format!(
                "builder tagged {} but the pipeline expects {}",
                built, self.config.image
            )));
        }
        Ok(built)
    }

    /// 公開ステージ（ブランチ判定込み）
    ///
    /// ゲートを通過しない場合は認証情報を参照せずにスキップします。
    pub async fn publish(&self, image: &ImageRef, branch: Option<&str>) -> RunOutcome {
        if let GateDecision::Skip { reason } = self.gate.decide(branch) {
            tracing::info!(reason = %reason, "Stage: publish skipped");
            return RunOutcome::SkippedPublish { reason };
        }

        tracing::info!(image = %image, "Stage: publish");
        let credentials = match self.config.credentials.resolve_with(|key| (self.env)(key)) {
            Ok(credentials) => credentials,
            Err(e) => return RunOutcome::FailedAtPush(e.into()),
        };

        match self
            .publisher
            .publish(image, credentials.as_ref(), self.config.registry_host())
            .await
        {
            Ok(pushed) => RunOutcome::Success { pushed },
            Err(e) => RunOutcome::FailedAtPush(e),
        }
    }

    fn report(
        &self,
        branch: Option<&str>,
        built: Option<ImageRef>,
        outcome: RunOutcome,
    ) -> RunReport {
        RunReport {
            image: self.config.image.clone(),
            branch: branch.map(|b| b.to_string()),
            built,
            outcome,
        }
    }
}
