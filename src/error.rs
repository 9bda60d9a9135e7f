use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid target '{name}': {message}")]
    Target { name: String, message: String },

    #[error("Notification error: {0}")]
    Notification(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
