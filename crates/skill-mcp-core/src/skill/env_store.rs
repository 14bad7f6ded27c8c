//! Per-skill persisted variables, stored as `<skill>/.env`.
//!
//! Values are handed to child processes only; callers surface variable
//! names, never values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::parse_env_content;
use crate::error::{Result, SkillError};
use crate::path_validation;

pub const ENV_FILE_NAME: &str = ".env";

/// Source of a skill's persisted variables.
pub trait SkillVariableStore: Send + Sync {
    /// Variables of `skill_name`. Fails with [`SkillError::SkillNotFound`]
    /// when the skill directory is absent; a skill without a `.env` yields
    /// an empty map.
    fn load(&self, skill_name: &str) -> Result<BTreeMap<String, String>>;
}

/// `.env` file store rooted at the skills directory.
#[derive(Debug, Clone)]
pub struct DotEnvStore {
    skills_root: PathBuf,
}

impl DotEnvStore {
    pub fn new(skills_root: impl Into<PathBuf>) -> Self {
        Self {
            skills_root: skills_root.into(),
        }
    }

    fn env_file(&self, skill_name: &str) -> Result<PathBuf> {
        let dir = path_validation::skill_dir(&self.skills_root, skill_name)?;
        if !dir.is_dir() {
            return Err(SkillError::SkillNotFound(skill_name.to_string()));
        }
        Ok(dir.join(ENV_FILE_NAME))
    }

    /// Sorted variable names.
    pub fn keys(&self, skill_name: &str) -> Result<Vec<String>> {
        Ok(self.load(skill_name)?.into_keys().collect())
    }

    /// Merge `variables` into the existing set. Nothing is written if any
    /// name or value is rejected.
    pub fn set_variables(&self, skill_name: &str, variables: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in variables {
            validate_variable(key, value)?;
        }
        let mut vars = self.load(skill_name)?;
        vars.extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write(skill_name, &vars)
    }

    /// Remove `keys`; returns how many were present.
    pub fn delete_variables(&self, skill_name: &str, keys: &[String]) -> Result<usize> {
        let mut vars = self.load(skill_name)?;
        let deleted = keys.iter().filter(|k| vars.remove(k.as_str()).is_some()).count();
        self.write(skill_name, &vars)?;
        Ok(deleted)
    }

    pub fn clear(&self, skill_name: &str) -> Result<()> {
        self.write(skill_name, &BTreeMap::new())
    }

    fn write(&self, skill_name: &str, vars: &BTreeMap<String, String>) -> Result<()> {
        let path = self.env_file(skill_name)?;
        let content: String = vars
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, quote_if_needed(v)))
            .collect();
        std::fs::write(&path, content).map_err(|source| SkillError::EnvFile {
            skill: skill_name.to_string(),
            source,
        })?;
        tracing::debug!(skill = %skill_name, count = vars.len(), "Wrote skill variables");
        Ok(())
    }
}

impl SkillVariableStore for DotEnvStore {
    fn load(&self, skill_name: &str) -> Result<BTreeMap<String, String>> {
        let path = self.env_file(skill_name)?;
        read_env_file(&path).map_err(|source| SkillError::EnvFile {
            skill: skill_name.to_string(),
            source,
        })
    }
}

fn read_env_file(path: &Path) -> std::io::Result<BTreeMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_env_content(&content).into_iter().collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e),
    }
}

/// Keys must survive as a single `KEY=` prefix and values as a single line.
fn validate_variable(key: &str, value: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('#')
        || key.contains('=')
        || key.contains('\0')
        || key.chars().any(char::is_whitespace)
    {
        return Err(SkillError::InvalidVariable(format!("invalid name '{}'", key.escape_default())));
    }
    if value.contains(['\n', '\r', '\0']) {
        return Err(SkillError::InvalidVariable(format!(
            "value of '{}' must be a single line",
            key
        )));
    }
    Ok(())
}

/// Parsing strips exactly one pair of matching outer quotes, so wrapping in
/// `"` preserves any inner content verbatim.
fn quote_if_needed(value: &str) -> String {
    let quote_edge = |c: char| c == '"' || c == '\'';
    if value.contains(" #")
        || value != value.trim()
        || value.starts_with(quote_edge)
        || value.ends_with(quote_edge)
    {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
