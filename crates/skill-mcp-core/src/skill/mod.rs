//! Skills: directories under the skills root holding scripts, SKILL.md and
//! an optional `.env` variable store.

pub mod env_store;
pub mod metadata;

use std::path::{Path, PathBuf};

use crate::error::{Result, SkillError};
use crate::path_validation;

pub use env_store::{DotEnvStore, SkillVariableStore, ENV_FILE_NAME};
pub use metadata::{parse_skill_metadata, SkillSummary, SKILL_METADATA_FILE};

/// Read-only view over the skills root.
#[derive(Debug, Clone)]
pub struct SkillStore {
    root: PathBuf,
}

impl SkillStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory-exists predicate keyed by skill name.
    pub fn exists(&self, skill_name: &str) -> bool {
        path_validation::skill_dir(&self.root, skill_name)
            .map(|d| d.is_dir())
            .unwrap_or(false)
    }

    /// Absolute directory of an existing skill.
    pub fn require(&self, skill_name: &str) -> Result<PathBuf> {
        let dir = path_validation::skill_dir(&self.root, skill_name)?;
        if !dir.is_dir() {
            return Err(SkillError::SkillNotFound(skill_name.to_string()));
        }
        Ok(dir)
    }

    /// Summaries of every skill directory, sorted by directory name.
    ///
    /// Directories without a readable SKILL.md are still listed, with the
    /// directory name and no description.
    pub fn list(&self) -> Result<Vec<SkillSummary>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| !n.starts_with('.'))
            })
            .collect();
        dirs.sort();

        let mut skills = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match parse_skill_metadata(&dir) {
                Ok(summary) => skills.push(summary),
                Err(e) => {
                    tracing::warn!("Failed to parse skill at {}: {}", dir.display(), e);
                    skills.push(SkillSummary::from_dir_name(&dir));
                }
            }
        }
        Ok(skills)
    }
}
