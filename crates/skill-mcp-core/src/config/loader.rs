//! Environment variable loading helpers.
//!
//! Fallback chains (primary key, then aliases, then default) live here so
//! callers never repeat `or_else` ladders.

use std::env;
use std::path::Path;

/// Parse `.env` style content into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are skipped, an `export ` prefix is accepted,
/// matching surrounding quotes are stripped and an unquoted trailing
/// `# comment` is removed. A key repeated later in the file wins at lookup
/// time because callers insert pairs in order.
pub fn parse_env_content(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value = &value[1..value.len() - 1];
        } else if let Some(hash_pos) = value.find(" #") {
            value = value[..hash_pos].trim_end();
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    pairs
}

/// Load `.env` from the current directory into the process environment.
///
/// Existing variables are never overridden. Must run before the async
/// runtime starts any worker threads.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let path = env::current_dir()
            .map(|d| d.join(".env"))
            .unwrap_or_else(|_| std::path::PathBuf::from(".env"));
        load_dotenv_from(&path);
    });
}

fn load_dotenv_from(path: &Path) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };
    for (key, value) in parse_env_content(&content) {
        if env::var_os(&key).is_none() {
            env::set_var(&key, value);
        }
    }
}

/// Read the primary key or the first set alias, falling back to `default`.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    env_optional(primary, aliases).unwrap_or_else(default)
}

/// Read the primary key or the first set alias; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    env::var(primary)
        .ok()
        .or_else(|| aliases.iter().find_map(|a| env::var(a).ok()))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: `0/false/no/off` are false, anything else set is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    match env_optional(primary, aliases) {
        Some(s) => !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => default,
    }
}

/// Positive integer variable; unparsable or zero values fall back to `default`.
pub fn env_u64(primary: &str, aliases: &[&str], default: u64) -> u64 {
    match env_optional(primary, aliases).map(|s| s.parse::<u64>()) {
        Some(Ok(v)) if v > 0 => v,
        Some(_) => {
            tracing::warn!("Ignoring invalid value for {}, using {}", primary, default);
            default
        }
        None => default,
    }
}
