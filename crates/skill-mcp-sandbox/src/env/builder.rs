//! Build the child environment: host env, then skill variables, then the
//! import search path.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

use skill_mcp_core::config::env_keys::SEARCH_PATH_VAR;
use skill_mcp_core::skill::SkillVariableStore;
use skill_mcp_core::SkillError;

use crate::error::{ExecutionError, Result};

/// Effective environment of one child process.
#[derive(Clone, Default)]
pub struct ResolvedEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ResolvedEnvironment {
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }
}

/// Names only; values never reach logs.
impl fmt::Debug for ResolvedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedEnvironment")
            .field("names", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Compose the environment for a run.
///
/// `base` is copied. Each skill in `skill_names` is loaded in order and its
/// variables override `base` and earlier skills. Later skills winning is
/// what users observe today when two referenced skills set the same key; it
/// is not something they chose explicitly.
///
/// `search_paths` (deduplicated, in order) are prepended to any existing
/// value of the search-path variable.
///
/// A missing skill is fatal. An unreadable `.env` is logged and skipped.
pub fn compose<I>(
    base: I,
    store: &dyn SkillVariableStore,
    skill_names: &[String],
    search_paths: &[PathBuf],
) -> Result<ResolvedEnvironment>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env = ResolvedEnvironment {
        vars: base.into_iter().collect(),
    };

    for skill in skill_names {
        match store.load(skill) {
            Ok(vars) => {
                tracing::debug!(
                    skill = %skill,
                    names = ?vars.keys().collect::<Vec<_>>(),
                    "Applying skill variables"
                );
                for (k, v) in vars {
                    env.set(k, v);
                }
            }
            Err(e @ SkillError::SkillNotFound(_)) | Err(e @ SkillError::InvalidPath(_)) => {
                return Err(e.into())
            }
            Err(e) => tracing::warn!(skill = %skill, "Ignoring skill variables: {}", e),
        }
    }

    if !search_paths.is_empty() {
        let mut entries: Vec<PathBuf> = Vec::new();
        for p in search_paths {
            if !entries.contains(p) {
                entries.push(p.clone());
            }
        }
        if let Some(existing) = env.get(SEARCH_PATH_VAR).filter(|v| !v.is_empty()) {
            entries.extend(std::env::split_paths(existing));
        }
        let joined = std::env::join_paths(&entries).map_err(|e| {
            ExecutionError::InvalidPath(format!("Cannot build {}: {}", SEARCH_PATH_VAR, e))
        })?;
        env.set(SEARCH_PATH_VAR, joined);
    }

    Ok(env)
}
