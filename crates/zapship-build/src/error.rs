use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Dockerfile not found: {0}")]
    DockerfileNotFound(PathBuf),

    #[error("Build context directory not found: {0}")]
    ContextNotFound(PathBuf),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Build failed: {0}")]
    BuildFailed(String),

    #[error("Invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid tag: {tag}")]
    InvalidTag { tag: String },

    #[error("Authentication failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error(transparent)]
    Pipeline(#[from] zapship_core::PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// 認証エラーかどうか
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            BuildError::AuthFailed { .. }
                | BuildError::Pipeline(zapship_core::PipelineError::IncompleteCredentials { .. })
        )
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerfileNotFound(path) => {
                format!(
                    "Dockerfileが見つかりません: {}\n\
                     \n\
                     解決方法:\n\
                     1. Dockerfileのパスを確認してください\n\
                     2. pipeline.kdlで明示的にパスを指定してください:\n\
                        dockerfile \"path/to/Dockerfile\"",
                    path.display()
                )
            }
            BuildError::BuildFailed(msg) => {
                format!(
                    "ビルドに失敗しました: {}\n\
                     \n\
                     Dockerfileの内容を確認してください。",
                    msg
                )
            }
            BuildError::ContextNotFound(path) => {
                format!(
                    "ビルドコンテキストが見つかりません: {}\n\
                     \n\
                     pipeline.kdlでcontextパスを確認してください。",
                    path.display()
                )
            }
            BuildError::AuthFailed { registry, message } => {
                format!(
                    "レジストリ {} への認証に失敗しました: {}\n\
                     \n\
                     CIのシークレット（dockerUsername / dockerPassword）が\n\
                     注入されているか確認してください。",
                    registry, message
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        let err = BuildError::AuthFailed {
            registry: "docker.io".to_string(),
            message: "unauthorized".to_string(),
        };
        assert!(err.is_auth_failure());

        let err = BuildError::Pipeline(zapship_core::PipelineError::IncompleteCredentials {
            id: "dockerhub".to_string(),
            missing: "dockerPassword".to_string(),
        });
        assert!(err.is_auth_failure());

        let err = BuildError::PushFailed {
            message: "connection reset".to_string(),
        };
        assert!(!err.is_auth_failure());
    }

    #[test]
    fn test_user_message_includes_hint() {
        let err = BuildError::DockerfileNotFound(PathBuf::from("image/Dockerfile"));
        let msg = err.user_message();
        assert!(msg.contains("image/Dockerfile"));
        assert!(msg.contains("pipeline.kdl"));
    }
}
