use crate::context::ContextBuilder;
use crate::error::{BuildError, BuildResult};
use crate::pipeline::ImageBuild;
use crate::progress::BuildProgress;
use async_trait::async_trait;
use bollard::Docker;
use colored::Colorize;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use zapship_core::{ImageRef, PipelineConfig};

/// Docker Engine でイメージをビルドする
pub struct ImageBuilder {
    docker: Docker,
    quiet: bool,
}

impl ImageBuilder {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            quiet: false,
        }
    }

    /// ビルド出力を抑制し、スピナーだけを表示する
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// イメージをビルド
    pub async fn build_image(
        &self,
        context_data: Vec<u8>,
        image: &ImageRef,
        build_args: &HashMap<String, String>,
        no_cache: bool,
        pull: bool,
    ) -> BuildResult<()> {
        let tag = image.to_string();
        tracing::info!("Building image: {}", tag);

        let build_args_refs: HashMap<&str, &str> = build_args
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        #[allow(deprecated)]
        let options = bollard::image::BuildImageOptions {
            dockerfile: "Dockerfile",
            t: tag.as_str(),
            buildargs: build_args_refs,
            nocache: no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull,
            ..Default::default()
        };

        tracing::debug!("Build options: {:?}", options);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context_data));
        let mut stream = self
            .docker
            .build_image(options, None, Some(Either::Left(body)));

        let progress = if self.quiet {
            BuildProgress::new(&tag)
        } else {
            BuildProgress::hidden()
        };

        while let Some(msg) = stream.next().await {
            let result = match msg {
                Ok(output) => self.handle_build_output(output, &progress),
                Err(e) => Err(BuildError::DockerConnection(e)),
            };
            if let Err(e) = result {
                progress.finish_error(&e.to_string());
                return Err(e);
            }
        }

        progress.finish_success();
        tracing::info!("Successfully built: {}", tag);
        Ok(())
    }

    /// ビルド出力の処理
    fn handle_build_output(
        &self,
        output: bollard::models::BuildInfo,
        progress: &BuildProgress,
    ) -> BuildResult<()> {
        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .or(output.error)
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(BuildError::BuildFailed(error_msg));
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed(error));
        }

        if let Some(stream) = output.stream {
            let line = stream.trim_end();
            if self.quiet {
                // "Step 3/12 : RUN ..." の行だけスピナーに反映
                if line.starts_with("Step ") {
                    progress.set_message(line);
                }
            } else if !line.is_empty() {
                progress.println(line);
            }
        }

        if let Some(status) = output.status
            && !self.quiet
        {
            progress.println(&status.cyan().to_string());
        }

        Ok(())
    }

    /// イメージの存在確認
    pub async fn image_exists(&self, image: &ImageRef) -> BuildResult<bool> {
        match self.docker.inspect_image(&image.to_string()).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(BuildError::DockerConnection(e)),
        }
    }
}

#[async_trait]
impl ImageBuild for ImageBuilder {
    async fn build(&self, config: &PipelineConfig) -> BuildResult<ImageRef> {
        let dockerfile_path = config.dockerfile_path();
        if !dockerfile_path.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile_path));
        }

        let context_data = ContextBuilder::create_context(config.context_dir(), &dockerfile_path)?;
        let build_args: HashMap<String, String> = config
            .build_args
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.build_image(
            context_data,
            &config.image,
            &build_args,
            config.no_cache,
            config.pull,
        )
        .await?;

        Ok(config.image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_simple_image() {
        use std::collections::BTreeMap;
        use std::fs;
        use tempfile::tempdir;
        use zapship_core::{CredentialBinding, DEFAULT_RELEASE_BRANCH};

        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = ImageBuilder::new(docker);

        let temp_dir = tempdir().unwrap();
        fs::write(
            temp_dir.path().join("Dockerfile"),
            "FROM alpine:3.8\nCMD echo 'test'",
        )
        .unwrap();

        let config = PipelineConfig {
            image: ImageRef::new("zapship-test", "latest").unwrap(),
            context: temp_dir.path().to_path_buf(),
            dockerfile: "Dockerfile".into(),
            release_branch: DEFAULT_RELEASE_BRANCH.to_string(),
            registry: None,
            credentials: CredentialBinding::default(),
            build_args: BTreeMap::new(),
            no_cache: false,
            pull: false,
        };

        let built = builder.build(&config).await.unwrap();
        assert_eq!(built, config.image);
        assert!(builder.image_exists(&built).await.unwrap());

        // クリーンアップ
        builder
            .docker
            .remove_image(
                "zapship-test:latest",
                None::<bollard::query_parameters::RemoveImageOptions>,
                None,
            )
            .await
            .ok();
    }
}
