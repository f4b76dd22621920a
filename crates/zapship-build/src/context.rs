use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::Builder;

/// パターンはコンテキストルート基準で、`*` はディレクトリ区切りをまたがない
const IGNORE_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// コンテキストサイズの警告閾値
const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

/// .dockerignore のパターン集合
///
/// 後に書かれたパターンが優先され、`!` で始まるパターンは除外を取り消します。
#[derive(Debug, Default)]
pub struct DockerIgnore {
    rules: Vec<(Pattern, bool)>,
}

impl DockerIgnore {
    /// コンテキスト直下の .dockerignore を読み込む（無ければ空）
    pub fn load(context_path: &Path) -> BuildResult<Self> {
        let path = context_path.join(".dockerignore");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> BuildResult<Self> {
        let mut rules = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negated, raw) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let normalized = raw.trim_start_matches("./").trim_matches('/');
            if normalized.is_empty() {
                continue;
            }

            let pattern = Pattern::new(normalized).map_err(|e| {
                BuildError::InvalidConfig(format!("Invalid .dockerignore pattern '{}': {}", raw, e))
            })?;
            rules.push((pattern, negated));
        }

        Ok(Self { rules })
    }

    /// 相対パスが除外対象かどうか
    ///
    /// パス自身か、その親ディレクトリのいずれかがパターンに一致すれば対象。
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let mut ignored = false;
        for (pattern, negated) in &self.rules {
            let matched = relative
                .ancestors()
                .filter(|p| !p.as_os_str().is_empty())
                .any(|p| pattern.matches_path_with(p, IGNORE_MATCH_OPTIONS));
            if matched {
                ignored = !negated;
            }
        }
        ignored
    }
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// Dockerfile は .dockerignore に関係なく "Dockerfile" として格納されます。
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> BuildResult<Vec<u8>> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        if !context_path.is_dir() {
            return Err(BuildError::ContextNotFound(context_path.to_path_buf()));
        }
        if !dockerfile_path.is_file() {
            return Err(BuildError::DockerfileNotFound(dockerfile_path.to_path_buf()));
        }

        let ignore = DockerIgnore::load(context_path)?;
        let mut files = Vec::new();
        collect_files(context_path, Path::new(""), &ignore, &mut files)?;

        let dockerfile_abs = dockerfile_path.canonicalize()?;

        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            for relative in &files {
                let absolute = context_path.join(relative);
                // Dockerfile は最後に固定名で追加する
                if absolute.canonicalize().ok().as_deref() == Some(dockerfile_abs.as_path()) {
                    continue;
                }
                tar.append_path_with_name(&absolute, relative)?;
            }

            let dockerfile_content = fs::read(dockerfile_path)?;
            let mut header = tar::Header::new_gnu();
            header.set_path("Dockerfile").map_err(|e| {
                BuildError::InvalidConfig(format!("Failed to set Dockerfile path: {}", e))
            })?;
            header.set_size(dockerfile_content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append(&header, &dockerfile_content[..])?;

            let mut encoder = tar.into_inner()?;
            encoder.flush()?;
            encoder.finish()?;
        }

        tracing::debug!(
            files = files.len(),
            bytes = archive_data.len(),
            "Build context created"
        );

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}

/// 除外されていないファイルを相対パスで収集（名前順）
fn collect_files(
    root: &Path,
    relative_dir: &Path,
    ignore: &DockerIgnore,
    files: &mut Vec<PathBuf>,
) -> BuildResult<()> {
    let mut entries = fs::read_dir(root.join(relative_dir))?
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let relative = relative_dir.join(entry.file_name());
        if ignore.is_ignored(&relative) {
            tracing::debug!(path = %relative.display(), "Excluded by .dockerignore");
            continue;
        }

        if entry.file_type()?.is_dir() {
            collect_files(root, &relative, ignore, files)?;
        } else {
            files.push(relative);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn unpack(archive: Vec<u8>) -> HashSet<String> {
        let decoder = flate2::read::GzDecoder::new(std::io::Cursor::new(archive));
        let mut tar = tar::Archive::new(decoder);
        tar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_create_context() {
        let temp_dir = tempdir().unwrap();

        fs::write(temp_dir.path().join("file1.txt"), "content1").unwrap();
        let subdir = temp_dir.path().join("scripts");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("zap-x.sh"), "#!/bin/sh").unwrap();

        let dockerfile = temp_dir.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine\nRUN echo test").unwrap();

        let archive = ContextBuilder::create_context(temp_dir.path(), &dockerfile).unwrap();
        let names = unpack(archive);

        assert!(names.contains("Dockerfile"));
        assert!(names.contains("file1.txt"));
        assert!(names.contains("scripts/zap-x.sh"));
    }

    #[test]
    fn test_create_context_dockerfile_elsewhere() {
        let temp_dir = tempdir().unwrap();
        let context = temp_dir.path().join("ctx");
        fs::create_dir(&context).unwrap();
        fs::write(context.join("a.txt"), "a").unwrap();

        let dockerfile = temp_dir.path().join("zap.dockerfile");
        fs::write(&dockerfile, "FROM alpine").unwrap();

        let names = unpack(ContextBuilder::create_context(&context, &dockerfile).unwrap());
        assert!(names.contains("Dockerfile"));
        assert!(names.contains("a.txt"));
        assert!(!names.contains("zap.dockerfile"));
    }

    #[test]
    fn test_create_context_respects_dockerignore() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();

        fs::write(root.join(".dockerignore"), "# comment\n*.log\ntmp/\n!keep.log\n").unwrap();
        fs::write(root.join("build.log"), "noise").unwrap();
        fs::write(root.join("keep.log"), "keep").unwrap();
        fs::create_dir(root.join("tmp")).unwrap();
        fs::write(root.join("tmp/cache.bin"), "x").unwrap();
        fs::write(root.join("Dockerfile"), "FROM alpine").unwrap();

        let names = unpack(ContextBuilder::create_context(root, &root.join("Dockerfile")).unwrap());

        assert!(names.contains("Dockerfile"));
        assert!(names.contains("keep.log"));
        assert!(!names.contains("build.log"));
        assert!(!names.iter().any(|n| n.starts_with("tmp")));
    }

    #[test]
    fn test_dockerfile_included_even_if_ignored() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".dockerignore"), "Dockerfile\n").unwrap();
        fs::write(root.join("Dockerfile"), "FROM alpine").unwrap();

        let names = unpack(ContextBuilder::create_context(root, &root.join("Dockerfile")).unwrap());
        assert!(names.contains("Dockerfile"));
    }

    #[test]
    fn test_create_context_missing_dockerfile() {
        let temp_dir = tempdir().unwrap();
        let result =
            ContextBuilder::create_context(temp_dir.path(), &temp_dir.path().join("Dockerfile"));
        assert!(matches!(result, Err(BuildError::DockerfileNotFound(_))));
    }

    #[test]
    fn test_create_context_missing_dir() {
        let result = ContextBuilder::create_context(
            Path::new("/nonexistent/context"),
            Path::new("/nonexistent/context/Dockerfile"),
        );
        assert!(matches!(result, Err(BuildError::ContextNotFound(_))));
    }

    #[test]
    fn test_dockerignore_nested_match() {
        let ignore = DockerIgnore::parse("**/*.pyc\ndocs").unwrap();
        assert!(ignore.is_ignored(Path::new("scripts/cache/x.pyc")));
        assert!(ignore.is_ignored(Path::new("docs/readme.md")));
        assert!(!ignore.is_ignored(Path::new("scripts/zap-x.sh")));
    }

    #[test]
    fn test_dockerignore_star_is_anchored_at_root() {
        let ignore = DockerIgnore::parse("*.sh").unwrap();
        assert!(ignore.is_ignored(Path::new("zap.sh")));
        assert!(!ignore.is_ignored(Path::new("scripts/zap-x.sh")));

        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".dockerignore"), "*.sh
").unwrap();
        fs::write(root.join("zap.sh"), "#!/bin/sh").unwrap();
        fs::create_dir(root.join("scripts")).unwrap();
        fs::write(root.join("scripts/zap-x.sh"), "#!/bin/sh").unwrap();
        fs::write(root.join("Dockerfile"), "FROM alpine").unwrap();

        let names = unpack(ContextBuilder::create_context(root, &root.join("Dockerfile")).unwrap());
        assert!(names.contains("scripts/zap-x.sh"));
        assert!(!names.contains("zap.sh"));
    }
}
