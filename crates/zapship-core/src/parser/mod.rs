//! KDLパーサー
//!
//! pipeline.kdl をパースして [`PipelineDocument`] を生成します。

use crate::error::{PipelineError, Result};
use crate::model::{CredentialBinding, PipelineDocument};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// KDLファイルをパース
pub fn parse_pipeline_file<P: AsRef<Path>>(path: P) -> Result<PipelineDocument> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PipelineError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_pipeline_string(&content)
}

/// KDL文字列をパース
pub fn parse_pipeline_string(content: &str) -> Result<PipelineDocument> {
    let doc: KdlDocument = content.parse()?;
    let mut pipeline = PipelineDocument::default();

    for node in doc.nodes() {
        match node.name().value() {
            "image" => {
                let image = required_string(node)?;
                pipeline.image = Some(image.to_string());
                // image "liatrio/zap" tag="2.7.0"
                if let Some(tag) = node.get("tag").and_then(|v| v.as_string()) {
                    pipeline.tag = Some(tag.to_string());
                }
            }
            "tag" => {
                pipeline.tag = Some(required_string(node)?.to_string());
            }
            "registry" => {
                pipeline.registry = Some(required_string(node)?.to_string());
            }
            "release-branch" | "branch" => {
                pipeline.release_branch = Some(required_string(node)?.to_string());
            }
            "context" => {
                pipeline.context = Some(PathBuf::from(required_string(node)?));
            }
            "dockerfile" => {
                pipeline.dockerfile = Some(PathBuf::from(required_string(node)?));
            }
            "credentials" => {
                pipeline.credentials = Some(parse_credentials(node)?);
            }
            "build-args" | "build_args" => {
                if let Some(args) = node.children() {
                    for arg in args.nodes() {
                        let key = arg.name().value().to_string();
                        let value = first_arg(arg)
                            .and_then(|e| e.as_string())
                            .unwrap_or("")
                            .to_string();
                        pipeline.build_args.insert(key, value);
                    }
                }
            }
            "no-cache" => {
                pipeline.no_cache = Some(flag(node));
            }
            "pull" => {
                pipeline.pull = Some(flag(node));
            }
            other => {
                warn!(node = %other, "Unknown node in pipeline definition, skipping");
            }
        }
    }

    Ok(pipeline)
}

/// credentials ノードをパース
///
/// `credentials "dockerhub" username-env="dockerUsername" password-env="dockerPassword"`
fn parse_credentials(node: &KdlNode) -> Result<CredentialBinding> {
    let defaults = CredentialBinding::default();
    let id = required_string(node)?.to_string();

    let username_env = node
        .get("username-env")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .unwrap_or(defaults.username_env);
    let password_env = node
        .get("password-env")
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
        .unwrap_or(defaults.password_env);

    Ok(CredentialBinding {
        id,
        username_env,
        password_env,
    })
}

/// 最初の位置引数
fn first_arg(node: &KdlNode) -> Option<&kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn required_string(node: &KdlNode) -> Result<&str> {
    first_arg(node).and_then(|v| v.as_string()).ok_or_else(|| {
        PipelineError::InvalidConfig(format!(
            "{} requires a string argument",
            node.name().value()
        ))
    })
}

/// 引数なしは true として扱う (`no-cache` だけで有効化)
fn flag(node: &KdlNode) -> bool {
    first_arg(node).and_then(|v| v.as_bool()).unwrap_or(true)
}

#[cfg(test)]
mod tests;
