//! zapship core
//!
//! パイプライン定義 (pipeline.kdl) の読み込み、イメージ参照・認証情報のモデル、
//! ブランチによる公開ゲートを提供します。

pub mod branch;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use branch::{BranchGate, GateDecision, detect_branch, normalize_branch};
pub use discovery::{DiscoveredFiles, discover_files, find_project_root};
pub use error::{PipelineError, Result};
pub use loader::{Overrides, load_pipeline, load_pipeline_from_root};
pub use model::*;
pub use parser::{parse_pipeline_file, parse_pipeline_string};
