//! 統合ローダー
//!
//! ファイル発見、パース、オーバーライド適用を統合して
//! [`PipelineConfig`] を生成します。
//!
//! 優先順位（低 → 高）: 組み込みデフォルト → pipeline.kdl →
//! pipeline.local.kdl → 環境変数 IMAGE/TAG → CLI 引数

use crate::discovery::{discover_files, find_project_root};
use crate::error::{PipelineError, Result};
use crate::model::{
    DEFAULT_IMAGE, DEFAULT_RELEASE_BRANCH, DEFAULT_TAG, ImageRef, PipelineConfig,
    PipelineDocument, split_image_tag,
};
use crate::parser::parse_pipeline_file;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// デフォルトのビルドコンテキスト（プロジェクトルートからの相対パス）
pub const DEFAULT_CONTEXT: &str = "image";

/// デフォルトの Dockerfile 名
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// 設定ファイルより優先される値
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub image: Option<String>,
    pub tag: Option<String>,
    pub no_cache: bool,
}

impl Overrides {
    /// 環境変数 IMAGE / TAG から作成
    pub fn from_env() -> Self {
        Self {
            image: std::env::var("IMAGE").ok().filter(|v| !v.is_empty()),
            tag: std::env::var("TAG").ok().filter(|v| !v.is_empty()),
            no_cache: false,
        }
    }

    /// CLI 指定のタグで上書き
    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        if tag.is_some() {
            self.tag = tag;
        }
        self
    }

    pub fn with_no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache |= no_cache;
        self
    }
}

/// カレントディレクトリからプロジェクトを探してロード
#[instrument]
pub fn load_pipeline(overrides: &Overrides) -> Result<(PathBuf, PipelineConfig)> {
    let project_root = find_project_root()?;
    let config = load_pipeline_from_root(&project_root, overrides)?;
    Ok((project_root, config))
}

/// 指定されたルートディレクトリからパイプライン設定をロード
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_pipeline_from_root(project_root: &Path, overrides: &Overrides) -> Result<PipelineConfig> {
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root)?;

    debug!("Step 2: Parsing KDL");
    let mut document = match &discovered.root {
        Some(root) => parse_pipeline_file(root)?,
        None => {
            return Err(PipelineError::ProjectRootNotFound(
                project_root.to_path_buf(),
            ));
        }
    };
    if let Some(local) = &discovered.local_override {
        debug!(file = %local.display(), "Merging local override");
        document.merge(parse_pipeline_file(local)?);
    }

    debug!("Step 3: Resolving configuration");
    let config = resolve(document, project_root, overrides)?;
    info!(
        image = %config.image,
        release_branch = %config.release_branch,
        "Pipeline loaded successfully"
    );

    Ok(config)
}

/// マージ済みの定義とオーバーライドから設定を確定
fn resolve(
    document: PipelineDocument,
    project_root: &Path,
    overrides: &Overrides,
) -> Result<PipelineConfig> {
    // image "liatrio/zap:2.7.0" や IMAGE=liatrio/zap:2.8.0 のようにタグを含む指定も許容
    let (override_name, override_embedded_tag) = split_embedded_tag(overrides.image.as_deref());
    let (doc_name, doc_embedded_tag) = split_embedded_tag(document.image.as_deref());

    let name = override_name
        .or(doc_name)
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    let tag = overrides
        .tag
        .clone()
        .or(override_embedded_tag)
        .or(document.tag)
        .or(doc_embedded_tag)
        .unwrap_or_else(|| DEFAULT_TAG.to_string());
    let mut image = ImageRef::new(name, tag)?;

    // プッシュ先はイメージ名で決まるので、registry 指定をイメージ名に反映する
    let registry = document
        .registry
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    if let Some(registry) = &registry {
        image = image.in_registry(registry)?;
    }

    let context = project_root.join(
        document
            .context
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTEXT)),
    );
    if !context.is_dir() {
        return Err(PipelineError::ContextNotFound(context));
    }

    let release_branch = document
        .release_branch
        .unwrap_or_else(|| DEFAULT_RELEASE_BRANCH.to_string());
    if release_branch.trim().is_empty() {
        return Err(PipelineError::InvalidConfig(
            "release-branch must not be empty".to_string(),
        ));
    }

    Ok(PipelineConfig {
        image,
        context,
        dockerfile: document
            .dockerfile
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCKERFILE)),
        release_branch,
        registry,
        credentials: document.credentials.unwrap_or_default(),
        build_args: document.build_args,
        no_cache: overrides.no_cache || document.no_cache.unwrap_or(false),
        pull: document.pull.unwrap_or(true),
    })
}

/// "name:tag" を名前と（書かれていれば）タグに分ける
fn split_embedded_tag(image: Option<&str>) -> (Option<String>, Option<String>) {
    match image {
        Some(image) => {
            let (name, tag) = split_image_tag(image);
            let embedded = (name.len() != image.len()).then_some(tag);
            (Some(name), embedded)
        }
        None => (None, None),
    }
}
