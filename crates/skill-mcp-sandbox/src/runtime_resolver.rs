//! Runtime selection by file extension and inline dependencies.
//!
//! The set of runtimes is closed; adding one means adding a [`Runtime`]
//! variant and its arm in [`Runtime::detect`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use skill_mcp_core::config::ExecutionConfig;

use crate::deps::DependencyManifest;

/// External programs the engine launches.
#[derive(Debug, Clone)]
pub struct InterpreterPaths {
    pub python: PathBuf,
    /// Isolated dependency runner, invoked as `<uv> run <file>`
    pub uv: PathBuf,
    pub node: PathBuf,
    pub npm: PathBuf,
    pub shell: PathBuf,
}

impl InterpreterPaths {
    pub fn from_config(cfg: &ExecutionConfig) -> Self {
        Self {
            python: PathBuf::from(&cfg.python),
            uv: PathBuf::from(&cfg.dependency_runner),
            node: PathBuf::from(&cfg.node),
            npm: PathBuf::from(&cfg.npm),
            shell: PathBuf::from(&cfg.shell),
        }
    }
}

impl Default for InterpreterPaths {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// `.py` without inline dependencies
    Python,
    /// `.py` with inline dependencies, run through the dependency runner
    IsolatedPython,
    /// `.js` / `.mjs`
    Node,
    /// `.sh`
    Shell,
    /// Anything else: the file is executed itself
    Direct,
}

impl Runtime {
    pub fn detect(file: &Path, manifest: &DependencyManifest) -> Self {
        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("py") if manifest.is_empty() => Runtime::Python,
            Some("py") => Runtime::IsolatedPython,
            Some("js") | Some("mjs") => Runtime::Node,
            Some("sh") => Runtime::Shell,
            _ => Runtime::Direct,
        }
    }
}

/// Program and argument vector for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInvocation {
    pub runtime: Runtime,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Node only: directory with a `package.json` but no `node_modules`,
    /// where `npm install` must succeed before the script starts.
    pub install_dir: Option<PathBuf>,
}

/// Map `file` (absolute) to its invocation. Never fails.
pub fn select(
    paths: &InterpreterPaths,
    file: &Path,
    manifest: &DependencyManifest,
    args: &[String],
) -> RuntimeInvocation {
    let runtime = Runtime::detect(file, manifest);
    let mut argv: Vec<OsString> = Vec::with_capacity(args.len() + 2);
    let program = match runtime {
        Runtime::Python => {
            argv.push(file.into());
            paths.python.clone()
        }
        Runtime::IsolatedPython => {
            argv.push("run".into());
            argv.push(file.into());
            paths.uv.clone()
        }
        Runtime::Node => {
            argv.push(file.into());
            paths.node.clone()
        }
        Runtime::Shell => {
            argv.push(file.into());
            paths.shell.clone()
        }
        Runtime::Direct => file.to_path_buf(),
    };
    argv.extend(args.iter().map(OsString::from));

    let install_dir = match runtime {
        Runtime::Node => node_install_dir(file),
        _ => None,
    };
    RuntimeInvocation {
        runtime,
        program,
        args: argv,
        install_dir,
    }
}

fn node_install_dir(file: &Path) -> Option<PathBuf> {
    let dir = file.parent()?;
    if dir.join("package.json").is_file() && !dir.join("node_modules").exists() {
        Some(dir.to_path_buf())
    } else {
        None
    }
}
