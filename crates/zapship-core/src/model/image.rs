//! イメージ参照

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;

/// デフォルトのイメージ名
pub const DEFAULT_IMAGE: &str = "liatrio/zap";

/// デフォルトのイメージタグ
pub const DEFAULT_TAG: &str = "2.7.0";

/// ビルドとプッシュの両方で使われる (name, tag) の組
///
/// 設定読み込み時に一度だけ作られ、以降は変更されません。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageRef {
    name: String,
    tag: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let tag = tag.into();
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidImage("(empty name)".to_string()));
        }
        if tag.trim().is_empty() {
            return Err(PipelineError::InvalidImage(format!("{}: empty tag", name)));
        }
        Ok(Self { name, tag })
    }

    /// "name:tag" 形式の文字列をパース
    ///
    /// タグが無い場合は "latest" を補います。
    pub fn parse(image: &str) -> Result<Self> {
        let (name, tag) = split_image_tag(image);
        Self::new(name, tag)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// タグだけを差し替えた新しい参照を返す
    pub fn with_tag(&self, tag: impl Into<String>) -> Result<Self> {
        Self::new(self.name.clone(), tag)
    }

    /// レジストリを含むイメージ名からレジストリ部分を取り出す
    ///
    /// # Examples
    /// - `ghcr.io/org/app` -> `ghcr.io`
    /// - `liatrio/zap` -> `docker.io`
    /// - `localhost:5000/app` -> `localhost:5000`
    pub fn registry(&self) -> &str {
        match self.name.split_once('/') {
            Some((first, _)) if first.contains('.') || first.contains(':') => first,
            _ => "docker.io",
        }
    }

    /// 名前の先頭にレジストリが書かれているか
    pub fn has_explicit_registry(&self) -> bool {
        matches!(
            self.name.split_once('/'),
            Some((first, _)) if first.contains('.') || first.contains(':')
        )
    }

    /// 指定レジストリへプッシュできる参照を返す
    ///
    /// レジストリが省略された名前には `registry/` を前置します。
    /// 名前に別のレジストリが明示されている場合はエラー。
    pub fn in_registry(&self, registry: &str) -> Result<Self> {
        if canonical_registry(self.registry()) == canonical_registry(registry) {
            return Ok(self.clone());
        }
        if self.has_explicit_registry() {
            return Err(PipelineError::InvalidConfig(format!(
                "image {} belongs to registry {}, but registry \"{}\" is configured",
                self,
                self.registry(),
                registry
            )));
        }
        Self::new(format!("{}/{}", registry, self.name), self.tag.clone())
    }
}

/// Docker Hub の別名を docker.io にまとめる
fn canonical_registry(registry: &str) -> &str {
    match registry.trim_end_matches('/') {
        "docker.io" | "index.docker.io" | "registry-1.docker.io" => "docker.io",
        other => other,
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `ghcr.io/org/app:v1.0` -> `("ghcr.io/org/app", "v1.0")`
/// - `ghcr.io/org/app` -> `("ghcr.io/org/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
pub fn split_image_tag(image: &str) -> (String, String) {
    if let Some(pos) = image.rfind(':') {
        let potential_tag = &image[pos + 1..];
        let potential_image = &image[..pos];

        // localhost:5000/app のポート番号はタグではない
        if !potential_tag.contains('/') && !potential_tag.chars().all(|c| c.is_ascii_digit()) {
            return (potential_image.to_string(), potential_tag.to_string());
        }
    }

    (image.to_string(), "latest".to_string())
}
