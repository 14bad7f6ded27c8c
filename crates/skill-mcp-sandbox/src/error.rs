//! Errors raised before or instead of an [`ExecutionOutcome`](crate::ExecutionOutcome).
//!
//! A script exiting non-zero is not one of these.

use skill_mcp_core::SkillError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecutionError>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("{0}")]
    InvalidPath(String),

    #[error("Skill '{0}' does not exist")]
    SkillNotFound(String),

    #[error("Script '{script}' does not exist in skill '{skill}'")]
    ScriptNotFound { skill: String, script: String },

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("Working directory '{0}' is not a directory")]
    InvalidWorkingDir(String),

    #[error("Invalid skill reference format: '{0}'. Expected 'skill_name:path/to/file.py'")]
    InvalidReference(String),

    #[error("{0}")]
    DependencyInstall(String),

    /// `what` is "Script execution" or "Code execution".
    #[error("{what} timed out ({secs} seconds)")]
    Timeout { what: &'static str, secs: u64 },

    #[error("Failed to execute '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Failed to prepare temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("Failed to read skill variables: {0}")]
    Variables(String),
}

impl From<SkillError> for ExecutionError {
    fn from(e: SkillError) -> Self {
        match e {
            SkillError::InvalidPath(msg) => ExecutionError::InvalidPath(msg),
            SkillError::SkillNotFound(name) => ExecutionError::SkillNotFound(name),
            other => ExecutionError::Variables(other.to_string()),
        }
    }
}
