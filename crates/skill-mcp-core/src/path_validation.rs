//! Path validation utilities.
//!
//! Ensures skill-relative paths stay within `skills_root/<skill>` to prevent
//! path traversal. Resolution is lexical first (so missing files can still be
//! reported as missing rather than invalid), then re-checked against the
//! canonical location when the target exists, which catches symlink escapes.

use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SkillError};

/// Reject skill names that are not a single plain directory component.
pub fn validate_skill_name(skill_name: &str) -> Result<()> {
    let invalid = skill_name.is_empty()
        || skill_name == "."
        || skill_name == ".."
        || skill_name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SkillError::InvalidPath(format!(
            "Invalid skill name: '{}'",
            skill_name
        )));
    }
    Ok(())
}

/// Absolute directory of `skill_name` under `skills_root`. Does not check existence.
pub fn skill_dir(skills_root: &Path, skill_name: &str) -> Result<PathBuf> {
    validate_skill_name(skill_name)?;
    Ok(absolute_root(skills_root).join(skill_name))
}

/// Resolve `relative_path` inside the skill directory.
///
/// Absolute inputs are accepted but still have to land inside the skill
/// directory. The returned path is absolute and starts with
/// [`skill_dir`]`(skills_root, skill_name)`.
pub fn resolve_in_skill(skills_root: &Path, skill_name: &str, relative_path: &str) -> Result<PathBuf> {
    let root = skill_dir(skills_root, skill_name)?;
    if relative_path.contains('\0') {
        return Err(SkillError::InvalidPath(format!(
            "Path contains a NUL byte: {:?}",
            relative_path
        )));
    }
    let candidate = normalize_lexically(&root.join(relative_path));
    if !candidate.starts_with(&root) {
        return Err(escape_error(relative_path, skill_name));
    }

    if let (Ok(real), Ok(real_root)) = (candidate.canonicalize(), root.canonicalize()) {
        if !real.starts_with(&real_root) {
            return Err(escape_error(relative_path, skill_name));
        }
    }
    Ok(candidate)
}

fn escape_error(relative_path: &str, skill_name: &str) -> SkillError {
    SkillError::InvalidPath(format!(
        "Path '{}' escapes the directory of skill '{}'",
        relative_path, skill_name
    ))
}

fn absolute_root(skills_root: &Path) -> PathBuf {
    if let Ok(real) = skills_root.canonicalize() {
        return real;
    }
    if skills_root.is_absolute() {
        normalize_lexically(skills_root)
    } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        normalize_lexically(&cwd.join(skills_root))
    }
}

/// Collapse `.` and `..` without touching the filesystem. `..` never climbs
/// above the root component.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
