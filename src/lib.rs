pub mod backoff;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod notifier;
pub mod supervisor;
pub mod targets;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, Result};
