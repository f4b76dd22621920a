//! モデル定義

mod credentials;
mod image;
mod pipeline;

pub use credentials::*;
pub use image::*;
pub use pipeline::*;
