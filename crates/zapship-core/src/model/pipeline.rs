//! パイプライン定義

use super::credentials::CredentialBinding;
use super::image::ImageRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// デフォルトのリリースブランチ
pub const DEFAULT_RELEASE_BRANCH: &str = "master";

/// pipeline.kdl から読み込んだ生の定義
///
/// すべて省略可能で、ローカルオーバーライドとマージされた後に
/// [`PipelineConfig`] へ解決されます。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineDocument {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub registry: Option<String>,
    pub release_branch: Option<String>,
    pub context: Option<PathBuf>,
    pub dockerfile: Option<PathBuf>,
    pub credentials: Option<CredentialBinding>,
    pub build_args: BTreeMap<String, String>,
    pub no_cache: Option<bool>,
    pub pull: Option<bool>,
}

impl PipelineDocument {
    /// 別の定義をマージ（other の値が優先）
    pub fn merge(&mut self, other: PipelineDocument) {
        if other.image.is_some() {
            self.image = other.image;
        }
        if other.tag.is_some() {
            self.tag = other.tag;
        }
        if other.registry.is_some() {
            self.registry = other.registry;
        }
        if other.release_branch.is_some() {
            self.release_branch = other.release_branch;
        }
        if other.context.is_some() {
            self.context = other.context;
        }
        if other.dockerfile.is_some() {
            self.dockerfile = other.dockerfile;
        }
        if other.credentials.is_some() {
            self.credentials = other.credentials;
        }
        if other.no_cache.is_some() {
            self.no_cache = other.no_cache;
        }
        if other.pull.is_some() {
            self.pull = other.pull;
        }
        self.build_args.extend(other.build_args);
    }
}

/// 解決済みのパイプライン設定
///
/// ビルドとプッシュの両ステージに同じ値が参照で渡されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub image: ImageRef,
    /// ビルドコンテキストの絶対パス
    pub context: PathBuf,
    /// コンテキストからの相対パス
    pub dockerfile: PathBuf,
    pub release_branch: String,
    pub registry: Option<String>,
    pub credentials: CredentialBinding,
    pub build_args: BTreeMap<String, String>,
    pub no_cache: bool,
    pub pull: bool,
}

impl PipelineConfig {
    pub fn dockerfile_path(&self) -> PathBuf {
        self.context.join(&self.dockerfile)
    }

    /// プッシュ先のレジストリ（明示指定がなければイメージ名から推定）
    pub fn registry_host(&self) -> &str {
        self.registry
            .as_deref()
            .unwrap_or_else(|| self.image.registry())
    }

    pub fn context_dir(&self) -> &Path {
        &self.context
    }
}
