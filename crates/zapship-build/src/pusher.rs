//! イメージプッシュ処理
//!
//! ビルドしたイメージをコンテナレジストリにプッシュします。

use crate::auth::{RegistryAuth, to_docker_credentials};
use crate::error::{BuildError, BuildResult};
use crate::pipeline::ImagePublish;
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::PushImageInfo;
use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;
use zapship_core::{Credentials, ImageRef};

/// 認証エラーとみなすレジストリ応答
const AUTH_ERROR_MARKERS: [&str; 4] = [
    "unauthorized",
    "authentication required",
    "denied",
    "incorrect username or password",
];

/// イメージプッシュを実行するハンドラ
pub struct ImagePusher {
    docker: Docker,
    auth: RegistryAuth,
}

impl ImagePusher {
    /// 新しい ImagePusher を作成
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            auth: RegistryAuth::new(),
        }
    }

    /// 認証情報マネージャーを指定して作成
    pub fn with_auth(docker: Docker, auth: RegistryAuth) -> Self {
        Self { docker, auth }
    }

    /// イメージをレジストリにプッシュ
    ///
    /// 注入された認証情報が無い場合は Docker config.json を参照し、
    /// それでも見つからなければ認証エラーになります。
    ///
    /// # Returns
    /// プッシュ成功時は完全なイメージ名を返す
    pub async fn push(
        &self,
        image: &ImageRef,
        credentials: Option<&Credentials>,
        registry: &str,
    ) -> BuildResult<String> {
        let full_image = image.to_string();
        validate_tag(image.tag())?;

        let docker_credentials = match credentials {
            Some(creds) => to_docker_credentials(creds, registry),
            None => self
                .auth
                .get_credentials(registry)?
                .ok_or_else(|| BuildError::AuthFailed {
                    registry: registry.to_string(),
                    message: "no credentials were injected and none found in Docker config"
                        .to_string(),
                })?,
        };

        #[allow(deprecated)]
        let options = bollard::image::PushImageOptions::<String> {
            tag: image.tag().to_string(),
        };

        println!("  → {}", full_image.cyan());
        tracing::info!(image = %full_image, registry = %registry, "Pushing image");

        #[allow(deprecated)]
        let mut stream =
            self.docker
                .push_image(image.name(), Some(options), Some(docker_credentials));

        let mut last_status = String::new();
        let mut error_message: Option<String> = None;

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(err) = info.error.clone() {
                        error_message = Some(err);
                    } else {
                        self.handle_progress(&info, &mut last_status);
                    }
                }
                Err(e) => {
                    println!();
                    return Err(classify_push_error(registry, e.to_string()));
                }
            }
        }

        println!();

        if let Some(err) = error_message {
            return Err(classify_push_error(registry, err));
        }

        tracing::info!(image = %full_image, "Push completed");
        Ok(full_image)
    }

    /// プッシュ進捗を表示
    fn handle_progress(&self, info: &PushImageInfo, last_status: &mut String) {
        if let Some(status) = &info.status {
            let progress = info.progress.as_deref().unwrap_or("");

            match status.as_str() {
                "Pushing" => {
                    print!("\r  ↑ {} {}     ", status, progress);
                    std::io::stdout().flush().ok();
                }
                "Pushed" => {
                    println!("\r  {} Pushed                    ", "✓".green());
                }
                "Layer already exists" => {
                    println!("\r  {} Layer already exists      ", "✓".green());
                }
                "Preparing" | "Waiting" => {
                    // 準備中は表示をスキップ（ノイズ軽減）
                }
                _ => {
                    if status != last_status {
                        println!("\r  ℹ {}                    ", status);
                        *last_status = status.clone();
                    }
                }
            }
        }
    }
}

#[async_trait]
impl ImagePublish for ImagePusher {
    async fn publish(
        &self,
        image: &ImageRef,
        credentials: Option<&Credentials>,
        registry: &str,
    ) -> BuildResult<String> {
        self.push(image, credentials, registry).await
    }
}

/// レジストリのエラー応答を認証エラーとそれ以外に分類
fn classify_push_error(registry: &str, message: String) -> BuildError {
    let lower = message.to_lowercase();
    if AUTH_ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        BuildError::AuthFailed {
            registry: registry.to_string(),
            message,
        }
    } else {
        BuildError::PushFailed { message }
    }
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
pub fn validate_tag(tag: &str) -> BuildResult<()> {
    if tag.is_empty() {
        return Err(BuildError::InvalidTag {
            tag: "(empty)".to_string(),
        });
    }

    if tag.len() > 128 {
        return Err(BuildError::InvalidTag {
            tag: format!("Tag too long ({} characters, max 128)", tag.len()),
        });
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(BuildError::InvalidTag {
            tag: tag.to_string(),
        });
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(BuildError::InvalidTag {
            tag: format!("Invalid character '{}' in tag: {}", c, tag),
        });
    }

    Ok(())
}
