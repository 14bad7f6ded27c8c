//! Cross-skill imports for inline code.
//!
//! A reference `calculator:lib/ops.py` puts the `calculator` skill directory
//! on the import search path and contributes the inline dependencies of
//! `lib/ops.py` to the code's manifest.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use skill_mcp_core::path_validation;

use crate::deps::{DependencyManifest, ManifestCodec};
use crate::error::{ExecutionError, Result};

/// `skill_name:relative/path`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillReference {
    pub skill_name: String,
    pub relative_path: String,
}

impl FromStr for SkillReference {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((skill, path)) if !skill.is_empty() && !path.is_empty() => Ok(Self {
                skill_name: skill.to_string(),
                relative_path: path.to_string(),
            }),
            _ => Err(ExecutionError::InvalidReference(s.to_string())),
        }
    }
}

impl fmt::Display for SkillReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.skill_name, self.relative_path)
    }
}

/// What one reference contributed to the merged manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    Extracted(DependencyManifest),
    /// File missing or unreadable; nothing contributed.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceContribution {
    pub reference: SkillReference,
    pub source: DependencySource,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedImports {
    /// One absolute skill directory per referenced skill, first-seen order
    pub search_paths: Vec<PathBuf>,
    /// Referenced skills, first-seen order
    pub skill_names: Vec<String>,
    /// All extracted manifests merged left to right
    pub manifest: DependencyManifest,
    pub contributions: Vec<ReferenceContribution>,
}

/// Resolve `references` against `skills_root`.
///
/// A missing skill or a path escaping its skill aborts the whole call.
pub fn resolve(
    skills_root: &Path,
    references: &[SkillReference],
    codec: &dyn ManifestCodec,
) -> Result<ResolvedImports> {
    let mut out = ResolvedImports::default();

    for reference in references {
        let dir = path_validation::skill_dir(skills_root, &reference.skill_name)?;
        if !dir.is_dir() {
            return Err(ExecutionError::SkillNotFound(reference.skill_name.clone()));
        }
        let file = path_validation::resolve_in_skill(
            skills_root,
            &reference.skill_name,
            &reference.relative_path,
        )?;

        if !out.skill_names.contains(&reference.skill_name) {
            out.skill_names.push(reference.skill_name.clone());
            out.search_paths.push(dir);
        }

        let source = match std::fs::read_to_string(&file) {
            Ok(content) => {
                let found = codec.extract(&content);
                out.manifest = out.manifest.merge(&found);
                DependencySource::Extracted(found)
            }
            Err(e) => {
                tracing::debug!(reference = %reference, "No dependencies from reference: {}", e);
                DependencySource::Unavailable(e.to_string())
            }
        };
        out.contributions.push(ReferenceContribution {
            reference: reference.clone(),
            source,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Pep723Codec;
    use std::fs;

    fn reference(s: &str) -> SkillReference {
        s.parse().unwrap()
    }

    fn fixture() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let calc = tmp.path().join("calculator");
        fs::create_dir_all(calc.join("lib")).unwrap();
        fs::write(
            calc.join("lib/ops.py"),
            "# /// script\n# dependencies = [\"numpy>=1.0\", \"requests>=2.30.0\"]\n# ///\n",
        )
        .unwrap();
        fs::write(calc.join("plain.py"), "def add(a, b):\n    return a + b\n").unwrap();
        let weather = tmp.path().join("weather");
        fs::create_dir_all(&weather).unwrap();
        fs::write(
            weather.join("client.py"),
            "# /// script\n# dependencies = [\"requests>=2.31.0\"]\n# ///\n",
        )
        .unwrap();
        tmp
    }

    #[test]
    fn test_parse_reference() {
        let r = reference("calculator:lib/ops.py");
        assert_eq!(r.skill_name, "calculator");
        assert_eq!(r.relative_path, "lib/ops.py");
        assert_eq!(r.to_string(), "calculator:lib/ops.py");
        // Only the first colon splits.
        assert_eq!(reference("a:b:c").relative_path, "b:c");
    }

    #[test]
    fn test_parse_reference_rejects_bad_format() {
        for bad in ["calculator", ":x.py", "calc:"] {
            let err = bad.parse::<SkillReference>().unwrap_err();
            assert!(err.to_string().contains("Invalid skill reference format"));
        }
    }

    #[test]
    fn test_resolve_merges_in_reference_order() {
        let tmp = fixture();
        let refs = [
            reference("calculator:lib/ops.py"),
            reference("weather:client.py"),
            reference("calculator:plain.py"),
        ];
        let resolved = resolve(tmp.path(), &refs, &Pep723Codec).unwrap();
        assert_eq!(resolved.skill_names, ["calculator", "weather"]);
        assert_eq!(resolved.search_paths.len(), 2);
        assert!(resolved.search_paths[0].ends_with("calculator"));
        assert!(resolved.search_paths[0].is_absolute());
        assert_eq!(
            resolved.manifest.specifiers(),
            &["numpy>=1.0", "requests>=2.31.0"]
        );
        assert_eq!(
            resolved.contributions[2].source,
            DependencySource::Extracted(DependencyManifest::new())
        );
    }

    #[test]
    fn test_missing_file_contributes_nothing() {
        let tmp = fixture();
        let refs = [reference("weather:missing.py")];
        let resolved = resolve(tmp.path(), &refs, &Pep723Codec).unwrap();
        assert!(resolved.manifest.is_empty());
        assert_eq!(resolved.skill_names, ["weather"]);
        assert!(matches!(
            resolved.contributions[0].source,
            DependencySource::Unavailable(_)
        ));
    }

    #[test]
    fn test_missing_skill_is_fatal() {
        let tmp = fixture();
        let refs = [reference("weather:client.py"), reference("ghost:x.py")];
        let err = resolve(tmp.path(), &refs, &Pep723Codec).unwrap_err();
        assert_eq!(err.to_string(), "Skill 'ghost' does not exist");
    }

    #[test]
    fn test_escaping_reference_is_rejected() {
        let tmp = fixture();
        let refs = [reference("weather:../calculator/plain.py")];
        let err = resolve(tmp.path(), &refs, &Pep723Codec).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidPath(_)));
    }
}
