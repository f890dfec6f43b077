use thiserror::Error;

/// Unified error type for gha-ci operations
#[derive(Error, Debug)]
pub enum CiError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Git command `git {args}` failed ({code}): {stderr}")]
    GitCommand {
        args: String,
        code: i32,
        stderr: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("No release label found: the pull request needs one of {0}")]
    MissingReleaseLabel(String),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("GitHub API error ({status}): {message}")]
    GitHub { status: u16, message: String },

    #[error("GitHub request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in gha-ci
pub type Result<T> = std::result::Result<T, CiError>;

impl CiError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        CiError::Config(msg.into())
    }

    /// Create an input validation error with context
    pub fn validation(msg: impl Into<String>) -> Self {
        CiError::Validation(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        CiError::Version(msg.into())
    }

    /// Create a pattern error with context
    pub fn pattern(msg: impl Into<String>) -> Self {
        CiError::Pattern(msg.into())
    }

    /// True for REST failures that mean "resource does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, CiError::GitHub { status: 404, .. })
    }
}
