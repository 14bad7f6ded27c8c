//! SKILL.md frontmatter: just enough to summarise a skill.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const SKILL_METADATA_FILE: &str = "SKILL.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSummary {
    pub name: String,
    pub description: Option<String>,
    pub has_env_file: bool,
}

impl SkillSummary {
    pub fn from_dir_name(skill_dir: &Path) -> Self {
        Self {
            name: dir_name(skill_dir),
            description: None,
            has_env_file: skill_dir.join(super::ENV_FILE_NAME).is_file(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    name: Option<String>,
    description: Option<String>,
}

/// Summarise a skill from its SKILL.md frontmatter, falling back to the
/// directory name when the file or the `name` field is absent.
pub fn parse_skill_metadata(skill_dir: &Path) -> Result<SkillSummary> {
    let mut summary = SkillSummary::from_dir_name(skill_dir);
    let md = skill_dir.join(SKILL_METADATA_FILE);
    if !md.is_file() {
        return Ok(summary);
    }
    let content = std::fs::read_to_string(&md)
        .with_context(|| format!("Failed to read {}", md.display()))?;
    let front = extract_frontmatter(&content)
        .map(|yaml| serde_yaml::from_str::<Frontmatter>(yaml))
        .transpose()
        .with_context(|| format!("Invalid frontmatter in {}", md.display()))?
        .unwrap_or_default();
    if let Some(name) = front.name.filter(|n| !n.trim().is_empty()) {
        summary.name = name;
    }
    summary.description = front.description.filter(|d| !d.trim().is_empty());
    Ok(summary)
}

/// Text between a leading `---` line and the next `---` line.
fn extract_frontmatter(content: &str) -> Option<&str> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
