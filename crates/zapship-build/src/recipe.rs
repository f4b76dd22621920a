//! Dockerfile レシピの簡易解析と検査
//!
//! ビルド前に、ベースイメージのタグ固定や最終 USER が非 root であるかを確認します。

use crate::error::BuildResult;
use std::fmt;
use std::path::Path;
use zapship_core::split_image_tag;

/// Dockerfile の 1 命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// 命令が始まる行番号（1 始まり）
    pub line: usize,
    /// 大文字化したキーワード (FROM, RUN, ...)
    pub keyword: String,
    pub args: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// 検査結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub line: Option<usize>,
    pub message: String,
}

impl Finding {
    fn new(severity: Severity, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.severity, line, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Recipe {
    instructions: Vec<Instruction>,
}

impl Recipe {
    pub fn from_file(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// 行継続 (`\`) とコメントを処理して命令列に分解
    pub fn parse(content: &str) -> Self {
        let mut instructions = Vec::new();
        let mut pending: Option<(usize, String)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            // コメントは継続行の途中でも読み飛ばす
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.is_empty() && pending.is_none() {
                continue;
            }

            let (body, continues) = match trimmed.strip_suffix('\\') {
                Some(body) => (body.trim_end(), true),
                None => (trimmed, false),
            };

            let (start, mut text) = pending.take().unwrap_or((line_no, String::new()));
            if !text.is_empty() && !body.is_empty() {
                text.push(' ');
            }
            text.push_str(body);

            if continues {
                pending = Some((start, text));
            } else if let Some(instruction) = Self::split_instruction(start, &text) {
                instructions.push(instruction);
            }
        }

        if let Some((start, text)) = pending
            && let Some(instruction) = Self::split_instruction(start, &text)
        {
            instructions.push(instruction);
        }

        Self { instructions }
    }

    fn split_instruction(line: usize, text: &str) -> Option<Instruction> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (keyword, args) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        Some(Instruction {
            line,
            keyword: keyword.to_ascii_uppercase(),
            args: args.trim().to_string(),
        })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// ベースイメージ（最初の FROM）
    pub fn base_image(&self) -> Option<&str> {
        self.instructions
            .iter()
            .find(|i| i.keyword == "FROM")
            .and_then(|i| from_image(&i.args))
    }

    /// 最後の USER 命令のユーザー
    pub fn final_user(&self) -> Option<&str> {
        self.instructions
            .iter()
            .rev()
            .find(|i| i.keyword == "USER")
            .map(|i| i.args.split(':').next().unwrap_or("").trim())
    }

    /// ENV / ARG で宣言された変数名
    pub fn declared_variables(&self) -> Vec<&str> {
        self.instructions
            .iter()
            .filter(|i| i.keyword == "ENV" || i.keyword == "ARG")
            .flat_map(|i| {
                i.args
                    .split_whitespace()
                    .filter_map(|pair| pair.split('=').next())
            })
            .collect()
    }

    pub fn lint(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        let Some(first) = self.instructions.iter().find(|i| i.keyword != "ARG") else {
            findings.push(Finding::new(
                Severity::Error,
                None,
                "Dockerfile has no instructions",
            ));
            return findings;
        };
        if first.keyword != "FROM" {
            findings.push(Finding::new(
                Severity::Error,
                Some(first.line),
                format!("first instruction must be FROM, found {}", first.keyword),
            ));
        }

        for instruction in &self.instructions {
            match instruction.keyword.as_str() {
                "FROM" => {
                    if let Some(image) = from_image(&instruction.args)
                        && is_floating_image(image)
                    {
                        findings.push(Finding::new(
                            Severity::Warning,
                            Some(instruction.line),
                            format!("base image '{}' is not pinned to a version tag", image),
                        ));
                    }
                }
                "ADD" => {
                    if instruction.args.contains("http://")
                        || instruction.args.contains("https://")
                    {
                        findings.push(Finding::new(
                            Severity::Warning,
                            Some(instruction.line),
                            "ADD from a remote URL; prefer a verified download in RUN",
                        ));
                    }
                }
                _ => {}
            }
        }

        match self.final_user() {
            None => findings.push(Finding::new(
                Severity::Warning,
                None,
                "no USER instruction; the container runs as root",
            )),
            Some("root") | Some("0") => findings.push(Finding::new(
                Severity::Warning,
                self.instructions
                    .iter()
                    .rev()
                    .find(|i| i.keyword == "USER")
                    .map(|i| i.line),
                "final USER is root",
            )),
            Some(_) => {}
        }

        if !self
            .declared_variables()
            .iter()
            .any(|name| name.ends_with("_VERSION"))
        {
            findings.push(Finding::new(
                Severity::Info,
                None,
                "no *_VERSION variable declared; tool versions may be unpinned",
            ));
        }

        findings
    }
}

/// FROM 引数からイメージ名を取り出す（--platform 等のフラグは除く）
fn from_image(args: &str) -> Option<&str> {
    args.split_whitespace().find(|token| !token.starts_with("--"))
}

fn is_floating_image(image: &str) -> bool {
    if image == "scratch" || image.contains('@') || image.contains('$') {
        return false;
    }
    let (_, tag) = split_image_tag(image);
    // split_image_tag はタグ無しを latest として返す
    tag == "latest"
}
