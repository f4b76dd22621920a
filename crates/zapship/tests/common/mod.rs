use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PIPELINE_KDL: &str = r#"
image "liatrio/zap" tag="2.7.0"
release-branch "master"
context "image"
credentials "dockerhub" username-env="dockerUsername" password-env="dockerPassword"
"#;

pub const DOCKERFILE: &str = r#"FROM ubuntu:18.04
ARG ZAP_VERSION=2.7.0
ENV ZAP_VERSION=${ZAP_VERSION}
RUN useradd -d /home/zap -m -s /bin/bash zap
USER zap
"#;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    /// pipeline.kdl と image/Dockerfile を揃えたプロジェクト
    pub fn with_defaults() -> Self {
        let project = Self::new();
        project.write_pipeline_kdl(PIPELINE_KDL);
        project.write_dockerfile(DOCKERFILE);
        project
    }

    pub fn write_pipeline_kdl(&self, content: &str) {
        fs::write(self.root.path().join("pipeline.kdl"), content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_local_override(&self, content: &str) {
        fs::write(self.root.path().join("pipeline.local.kdl"), content).unwrap();
    }

    pub fn write_dockerfile(&self, content: &str) {
        let dir = self.root.path().join("image");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Dockerfile"), content).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}

/// 外部の CI 環境変数に影響されないコマンドを作る
#[allow(deprecated)]
pub fn zapship(project_root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("zapship").unwrap();
    cmd.current_dir(project_root)
        .env("ZAPSHIP_PROJECT_ROOT", project_root)
        .env_remove("IMAGE")
        .env_remove("TAG")
        .env_remove("BRANCH_NAME")
        .env_remove("GIT_BRANCH")
        .env_remove("dockerUsername")
        .env_remove("dockerPassword");
    cmd
}
