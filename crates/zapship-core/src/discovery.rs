//! ファイル自動発見機能
//!
//! プロジェクトルートと pipeline.kdl / pipeline.local.kdl を探します。

use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ルート定義ファイル名
pub const PIPELINE_FILE: &str = "pipeline.kdl";

/// ローカルオーバーライドファイル名
pub const LOCAL_OVERRIDE_FILE: &str = "pipeline.local.kdl";

/// 隠しディレクトリ
const HIDDEN_DIR: &str = ".zapship";

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (pipeline.kdl)
    pub root: Option<PathBuf>,
    /// ローカルオーバーライドファイル (pipeline.local.kdl)
    pub local_override: Option<PathBuf>,
}

/// プロジェクトルートを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ZAPSHIP_PROJECT_ROOT
/// 2. カレントディレクトリから上に向かって以下を探す:
///    - pipeline.kdl
///    - .zapship/pipeline.kdl
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("ZAPSHIP_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking ZAPSHIP_PROJECT_ROOT");
        if has_pipeline_file(&path) {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    let start_dir = std::env::current_dir()?;
    find_project_root_from(&start_dir)
}

/// 指定ディレクトリから上に向かってプロジェクトルートを探す
pub fn find_project_root_from(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        if has_pipeline_file(&current) {
            info!(project_root = %current.display(), "Found project root");
            return Ok(current);
        }

        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(PipelineError::ProjectRootNotFound(start_dir.to_path_buf()))
}

fn has_pipeline_file(dir: &Path) -> bool {
    dir.join(PIPELINE_FILE).exists() || dir.join(HIDDEN_DIR).join(PIPELINE_FILE).exists()
}

/// プロジェクトルートからファイルを自動発見
///
/// ルート直下のファイルが .zapship/ 配下より優先されます。
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    let discovered = DiscoveredFiles {
        root: first_existing(project_root, PIPELINE_FILE),
        local_override: first_existing(project_root, LOCAL_OVERRIDE_FILE),
    };

    if let Some(root) = &discovered.root {
        debug!(file = %root.display(), "Found root file");
    }
    if let Some(local) = &discovered.local_override {
        debug!(file = %local.display(), "Found local override file");
    }

    Ok(discovered)
}

fn first_existing(project_root: &Path, file_name: &str) -> Option<PathBuf> {
    [
        project_root.join(file_name),
        project_root.join(HIDDEN_DIR).join(file_name),
    ]
    .into_iter()
    .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_files() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(project_root.join("pipeline.kdl"), "// root")?;
        fs::write(project_root.join("pipeline.local.kdl"), "// local")?;

        let discovered = discover_files(project_root)?;
        assert!(discovered.root.unwrap().ends_with("pipeline.kdl"));
        assert!(
            discovered
                .local_override
                .unwrap()
                .ends_with("pipeline.local.kdl")
        );

        Ok(())
    }

    #[test]
    fn test_discover_files_minimal() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("pipeline.kdl"), "// root")?;

        let discovered = discover_files(temp_dir.path())?;
        assert!(discovered.root.is_some());
        assert!(discovered.local_override.is_none());

        Ok(())
    }

    #[test]
    fn test_discover_files_in_hidden_dir() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::create_dir_all(project_root.join(".zapship"))?;
        fs::write(project_root.join(".zapship/pipeline.kdl"), "// hidden")?;

        let discovered = discover_files(project_root)?;
        assert!(
            discovered
                .root
                .as_ref()
                .unwrap()
                .ends_with(".zapship/pipeline.kdl")
        );

        Ok(())
    }

    #[test]
    fn test_root_file_priority_over_hidden_dir() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(project_root.join("pipeline.kdl"), "// root")?;
        fs::create_dir_all(project_root.join(".zapship"))?;
        fs::write(project_root.join(".zapship/pipeline.kdl"), "// hidden")?;

        let discovered = discover_files(project_root)?;
        let root = discovered.root.unwrap();
        assert!(!root.to_string_lossy().contains(".zapship"));

        Ok(())
    }

    #[test]
    fn test_find_project_root_walks_up() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();
        fs::write(project_root.join("pipeline.kdl"), "// root")?;

        let nested = project_root.join("image/scripts");
        fs::create_dir_all(&nested)?;

        let found = find_project_root_from(&nested)?;
        assert_eq!(found, project_root);

        Ok(())
    }

    #[test]
    fn test_find_project_root_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = find_project_root_from(temp_dir.path());
        assert!(matches!(result, Err(PipelineError::ProjectRootNotFound(_))));
    }

    #[test]
    fn test_find_project_root_from_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("pipeline.kdl"), "// root").unwrap();

        temp_env::with_var(
            "ZAPSHIP_PROJECT_ROOT",
            Some(temp_dir.path().as_os_str()),
            || {
                let found = find_project_root().unwrap();
                assert_eq!(found, temp_dir.path());
            },
        );
    }
}
