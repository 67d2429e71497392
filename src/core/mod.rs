pub mod errors;
pub mod llm;

pub use errors::{RecommendError, RecommendResult};
