//! レジストリ認証情報

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ユーザー名 / シークレットの組
///
/// CI のシークレットストアから注入され、プッシュの間だけ保持されます。
/// Debug / Display 表示ではシークレットを伏せます。
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:***", self.username)
    }
}

/// 認証情報の注入元
///
/// `id` は CI 側で管理される識別子で、大文字小文字を含めてそのまま扱います。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBinding {
    pub id: String,
    pub username_env: String,
    pub password_env: String,
}

impl Default for CredentialBinding {
    fn default() -> Self {
        Self {
            id: "dockerhub".to_string(),
            username_env: "dockerUsername".to_string(),
            password_env: "dockerPassword".to_string(),
        }
    }
}

impl CredentialBinding {
    /// プロセス環境変数から認証情報を取得
    pub fn resolve(&self) -> Result<Option<Credentials>> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// 任意のルックアップ関数から認証情報を取得
    ///
    /// * 両方揃っていれば `Some`
    /// * 両方とも未設定なら `None`（docker config.json へのフォールバック用）
    /// * 片方だけの場合はエラー
    pub fn resolve_with<F>(&self, lookup: F) -> Result<Option<Credentials>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = lookup(&self.username_env).filter(|v| !v.is_empty());
        let password = lookup(&self.password_env).filter(|v| !v.is_empty());

        match (username, password) {
            (Some(username), Some(password)) => {
                tracing::debug!(binding = %self.id, "Resolved credentials from environment");
                Ok(Some(Credentials::new(username, password)))
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(PipelineError::IncompleteCredentials {
                id: self.id.clone(),
                missing: self.password_env.clone(),
            }),
            (None, Some(_)) => Err(PipelineError::IncompleteCredentials {
                id: self.id.clone(),
                missing: self.username_env.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("bot", "hunter2");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("bot"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_resolve_both_present() {
        let binding = CredentialBinding::default();
        let creds = binding
            .resolve_with(lookup_from(&[
                ("dockerUsername", "bot"),
                ("dockerPassword", "s3cret"),
            ]))
            .unwrap()
            .unwrap();
        assert_eq!(creds.username(), "bot");
        assert_eq!(creds.secret(), "s3cret");
    }

    #[test]
    fn test_resolve_none_present() {
        let binding = CredentialBinding::default();
        assert!(binding.resolve_with(lookup_from(&[])).unwrap().is_none());
    }

    #[test]
    fn test_resolve_empty_values_count_as_missing() {
        let binding = CredentialBinding::default();
        let result = binding.resolve_with(lookup_from(&[
            ("dockerUsername", ""),
            ("dockerPassword", ""),
        ]));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_resolve_partial_is_error() {
        let binding = CredentialBinding::default();
        let err = binding
            .resolve_with(lookup_from(&[("dockerUsername", "bot")]))
            .unwrap_err();
        match err {
            PipelineError::IncompleteCredentials { id, missing } => {
                assert_eq!(id, "dockerhub");
                assert_eq!(missing, "dockerPassword");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_from_process_env() {
        let binding = CredentialBinding {
            id: "Dockerhub".to_string(),
            username_env: "ZAPSHIP_TEST_USER".to_string(),
            password_env: "ZAPSHIP_TEST_PASS".to_string(),
        };
        temp_env::with_vars(
            [
                ("ZAPSHIP_TEST_USER", Some("ci")),
                ("ZAPSHIP_TEST_PASS", Some("token")),
            ],
            || {
                let creds = binding.resolve().unwrap().unwrap();
                assert_eq!(creds.username(), "ci");
            },
        );
    }

    #[test]
    fn test_display_redacts_secret() {
        let creds = Credentials::new("liatrio-ci", "hunter2");
        assert_eq!(creds.to_string(), "liatrio-ci:***");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
