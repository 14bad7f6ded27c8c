//! Typed errors for skill lookup, path validation and variable stores.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkillError>;

#[derive(Debug, Error)]
pub enum SkillError {
    /// Path escapes its skill directory or is otherwise malformed.
    #[error("{0}")]
    InvalidPath(String),

    #[error("Skill '{0}' does not exist")]
    SkillNotFound(String),

    /// Variable name or value that cannot be stored in a `.env` line.
    #[error("Invalid environment variable: {0}")]
    InvalidVariable(String),

    #[error("Failed to access .env for skill '{skill}': {source}")]
    EnvFile {
        skill: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read skills directory: {0}")]
    Io(#[from] std::io::Error),
}
