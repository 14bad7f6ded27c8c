//! Inline dependency blocks (PEP 723 `# /// script` metadata).
//!
//! Detection is a line-anchored regex scan, not a TOML parser: the block is
//! pseudo-TOML inside comments with no grammar guarantee. A block written
//! inside a string literal whose lines happen to start with `#` is still
//! treated as real. Callers go through [`ManifestCodec`] so the heuristic can
//! be replaced without touching them.

use std::sync::OnceLock;

use regex::Regex;

/// Ordered dependency specifiers, unique by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest(Vec<String>);

impl DependencyManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from specifiers in order. A repeated package keeps its first
    /// position and its last specifier.
    pub fn from_specifiers<I, S>(specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for spec in specifiers {
            let spec = spec.into();
            let name = package_name(&spec).to_string();
            match out.iter_mut().find(|s| package_name(s) == name) {
                Some(slot) => *slot = spec,
                None => out.push(spec),
            }
        }
        Self(out)
    }

    /// `self` followed by `additional`; on a package clash `additional` wins.
    pub fn merge(&self, additional: &DependencyManifest) -> DependencyManifest {
        Self::from_specifiers(self.0.iter().chain(additional.0.iter()).cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn specifiers(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Package name of a specifier: text before the first `<`, `>`, `=` or `!`.
pub fn package_name(specifier: &str) -> &str {
    specifier
        .split(['<', '>', '=', '!'])
        .next()
        .unwrap_or(specifier)
        .trim()
}

/// Reads and writes an embedded dependency manifest.
pub trait ManifestCodec: Send + Sync {
    /// Best-effort: no block, no list, or a malformed list give an empty manifest.
    fn extract(&self, source: &str) -> DependencyManifest;

    /// Replace the block's list with `manifest`, or prepend a new block.
    /// Returns `source` unchanged when `manifest` is empty.
    fn rewrite(&self, source: &str, manifest: &DependencyManifest) -> String;
}

/// `# /// script` ... `# ///` blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pep723Codec;

static BLOCK_RE: OnceLock<Regex> = OnceLock::new();
static LIST_RE: OnceLock<Regex> = OnceLock::new();
static DEPS_LINE_RE: OnceLock<Regex> = OnceLock::new();
static ITEM_RE: OnceLock<Regex> = OnceLock::new();

/// Group 1 is the block body between the start and end marker lines.
fn block_re() -> &'static Regex {
    BLOCK_RE.get_or_init(|| {
        Regex::new(r"(?m)^#[ \t]*///[ \t]*script[ \t]*\r?\n((?s:.*?))^#[ \t]*///[ \t]*\r?$")
            .expect("block regex")
    })
}

/// Whole `# dependencies = [ ... ]` list; quoted items may contain `]`.
fn list_re() -> &'static Regex {
    LIST_RE.get_or_init(|| {
        Regex::new(r#"(?m)^#[ \t]*dependencies\s*=\s*\[((?:[^\]"']|"[^"]*"|'[^']*')*)\]"#)
            .expect("dependency list regex")
    })
}

fn deps_line_re() -> &'static Regex {
    DEPS_LINE_RE.get_or_init(|| {
        Regex::new(r"(?m)^#[ \t]*dependencies\s*=").expect("dependency line regex")
    })
}

fn item_re() -> &'static Regex {
    ITEM_RE.get_or_init(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("item regex"))
}

fn format_list(manifest: &DependencyManifest) -> String {
    let mut out = String::from("# dependencies = [\n");
    for spec in manifest.iter() {
        out.push_str(&format!("#   \"{}\",\n", spec));
    }
    out.push_str("# ]");
    out
}

impl ManifestCodec for Pep723Codec {
    fn extract(&self, source: &str) -> DependencyManifest {
        let Some(body) = block_re().captures(source).and_then(|c| c.get(1)) else {
            return DependencyManifest::new();
        };
        let Some(list) = list_re().captures(body.as_str()).and_then(|c| c.get(1)) else {
            return DependencyManifest::new();
        };
        DependencyManifest::from_specifiers(item_re().captures_iter(list.as_str()).filter_map(
            |c| c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string()),
        ))
    }

    fn rewrite(&self, source: &str, manifest: &DependencyManifest) -> String {
        if manifest.is_empty() {
            return source.to_string();
        }
        let list = format_list(manifest);

        let Some(body) = block_re().captures(source).and_then(|c| c.get(1)) else {
            return format!("# /// script\n{}\n# ///\n{}", list, source);
        };
        let body_text = body.as_str();
        let new_body = if let Some(m) = list_re().find(body_text) {
            format!("{}{}{}", &body_text[..m.start()], list, &body_text[m.end()..])
        } else if let Some(m) = deps_line_re().find(body_text) {
            // Unterminated list: everything from it to the end marker is replaced.
            format!("{}{}\n", &body_text[..m.start()], list)
        } else {
            format!("{}\n{}", list, body_text)
        };
        format!(
            "{}{}{}",
            &source[..body.start()],
            new_body,
            &source[body.end()..]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(specs: &[&str]) -> DependencyManifest {
        DependencyManifest::from_specifiers(specs.iter().copied())
    }

    const SCRIPT: &str = "# /// script\n\
# requires-python = \">=3.10\"\n\
# dependencies = [\n\
#   \"requests>=2.30.0\",\n\
#   'rich',\n\
# ]\n\
# ///\n\
import requests\n";

    #[test]
    fn test_extract_block() {
        let m = Pep723Codec.extract(SCRIPT);
        assert_eq!(m.specifiers(), &["requests>=2.30.0", "rich"]);
    }

    #[test]
    fn test_extract_without_block_or_list() {
        assert!(Pep723Codec.extract("print('hi')\n").is_empty());
        let no_list = "# /// script\n# requires-python = \">=3.10\"\n# ///\n";
        assert!(Pep723Codec.extract(no_list).is_empty());
    }

    #[test]
    fn test_extract_malformed_list_is_empty() {
        let src = "# /// script\n# dependencies = [\n#   \"requests\",\n# ///\n";
        assert!(Pep723Codec.extract(src).is_empty());
    }

    #[test]
    fn test_extract_ignores_unanchored_markers() {
        let src = "x = '# /// script'\n# dependencies = [\"requests\"]\n";
        assert!(Pep723Codec.extract(src).is_empty());
    }

    #[test]
    fn test_extract_keeps_extras_brackets() {
        let src = "# /// script\n# dependencies = [\"requests[socks]>=2\", \"rich\"]\n# ///\n";
        let m = Pep723Codec.extract(src);
        assert_eq!(m.specifiers(), &["requests[socks]>=2", "rich"]);
    }

    #[test]
    fn test_rewrite_round_trip_from_empty_source() {
        for specs in [
            vec!["requests"],
            vec!["requests>=2.31.0", "pandas", "numpy!=1.0"],
        ] {
            let m = manifest(&specs);
            let text = Pep723Codec.rewrite("", &m);
            assert_eq!(Pep723Codec.extract(&text), m);
        }
    }

    #[test]
    fn test_rewrite_prepends_block() {
        let out = Pep723Codec.rewrite("print('done')\n", &manifest(&["requests"]));
        assert_eq!(
            out,
            "# /// script\n# dependencies = [\n#   \"requests\",\n# ]\n# ///\nprint('done')\n"
        );
    }

    #[test]
    fn test_rewrite_replaces_existing_list() {
        let merged = Pep723Codec.extract(SCRIPT).merge(&manifest(&["requests>=2.31.0", "pandas"]));
        let out = Pep723Codec.rewrite(SCRIPT, &merged);
        assert!(out.contains("# requires-python = \">=3.10\"\n"));
        assert!(out.ends_with("# ///\nimport requests\n"));
        assert_eq!(out.matches("# /// script").count(), 1);
        assert_eq!(
            Pep723Codec.extract(&out).specifiers(),
            &["requests>=2.31.0", "rich", "pandas"]
        );
    }

    #[test]
    fn test_rewrite_adds_list_to_block_without_one() {
        let src = "# /// script\n# requires-python = \">=3.10\"\n# ///\nprint(1)\n";
        let out = Pep723Codec.rewrite(src, &manifest(&["rich"]));
        assert_eq!(Pep723Codec.extract(&out).specifiers(), &["rich"]);
        assert!(out.contains("requires-python"));
    }

    #[test]
    fn test_rewrite_replaces_unterminated_list() {
        let src = "# /// script\n# dependencies = [\n#   \"broken\n# ///\nprint(1)\n";
        let out = Pep723Codec.rewrite(src, &manifest(&["rich"]));
        assert_eq!(Pep723Codec.extract(&out).specifiers(), &["rich"]);
        assert!(out.ends_with("# ///\nprint(1)\n"));
    }

    #[test]
    fn test_rewrite_empty_manifest_is_noop() {
        assert_eq!(Pep723Codec.rewrite(SCRIPT, &DependencyManifest::new()), SCRIPT);
    }

    #[test]
    fn test_merge_later_specifier_wins() {
        let merged = manifest(&["requests>=2.30.0"]).merge(&manifest(&["requests>=2.31.0"]));
        assert_eq!(merged.specifiers(), &["requests>=2.31.0"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = manifest(&["requests>=2.30.0", "rich", "pandas==2.0"]);
        let b = manifest(&["pandas>=2.1", "numpy", "requests"]);
        let ab = a.merge(&b);
        assert_eq!(ab.merge(&b), ab);
        assert_eq!(ab.specifiers(), &["requests", "rich", "pandas>=2.1", "numpy"]);
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("requests>=2.31.0"), "requests");
        assert_eq!(package_name("numpy != 1.0"), "numpy");
        assert_eq!(package_name("  rich "), "rich");
    }
}
