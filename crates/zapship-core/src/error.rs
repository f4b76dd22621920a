use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なイメージ参照: {0}")]
    InvalidImage(String),

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: pipeline.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("ビルドコンテキストが見つかりません: {0}")]
    ContextNotFound(PathBuf),

    #[error("認証情報 '{id}' が不完全です: 環境変数 {missing} が設定されていません")]
    IncompleteCredentials { id: String, missing: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
