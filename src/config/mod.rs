mod settings;

pub use settings::{
    CatalogConfig, Credentials, LLMConfig, LoggingConfig, PacingConfig, RecommendConfig, Settings,
};
