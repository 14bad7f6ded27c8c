//! Execution engine: validate, resolve dependencies, compose the
//! environment, pick a runtime, then run one child process under a timeout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use skill_mcp_core::config::{ExecutionConfig, PathsConfig};
use skill_mcp_core::path_validation;
use skill_mcp_core::skill::{DotEnvStore, SkillVariableStore};
use tokio::process::Command;

use crate::common::{
    truncate_output, wait_with_timeout, WaitOutcome, DEFAULT_TIMEOUT_SECS, MAX_OUTPUT_BYTES,
};
use crate::deps::{DependencyManifest, ManifestCodec, Pep723Codec};
use crate::env::{compose, ResolvedEnvironment};
use crate::error::{ExecutionError, Result};
use crate::imports::{self, SkillReference};
use crate::info_log;
use crate::runtime_resolver::{self, InterpreterPaths, RuntimeInvocation};

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    ExistingScript {
        skill_name: String,
        relative_path: String,
    },
    InlineCode {
        code: String,
    },
}

/// One unit of work for [`ExecutionEngine::execute`].
///
/// The source is fixed at construction. `references` only apply to inline
/// code.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    source: ScriptSource,
    pub args: Vec<String>,
    /// Skill-relative; existing scripts only
    pub working_dir: Option<String>,
    /// Falls back to the engine's configured timeout
    pub timeout_secs: Option<u64>,
    pub references: Vec<SkillReference>,
}

impl ExecutionRequest {
    pub fn script(skill_name: impl Into<String>, relative_path: impl Into<String>) -> Self {
        Self::new(ScriptSource::ExistingScript {
            skill_name: skill_name.into(),
            relative_path: relative_path.into(),
        })
    }

    pub fn inline(code: impl Into<String>) -> Self {
        Self::new(ScriptSource::InlineCode { code: code.into() })
    }

    fn new(source: ScriptSource) -> Self {
        Self {
            source,
            args: Vec::new(),
            working_dir: None,
            timeout_secs: None,
            references: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_working_dir(mut self, dir: Option<String>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_references(mut self, references: Vec<SkillReference>) -> Self {
        self.references = references;
        self
    }

    pub fn source(&self) -> &ScriptSource {
        &self.source
    }
}

/// Result of a child process that ran to completion. A non-zero exit code
/// is still an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Phases of one execution, in order. Terminal states are
/// `Completed`, `Failed` and `TimedOut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Validating,
    Resolving,
    Composing,
    Spawning,
    Running,
    Completed,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutionLimits {
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl From<&ExecutionConfig> for ExecutionLimits {
    fn from(cfg: &ExecutionConfig) -> Self {
        Self {
            timeout_secs: cfg.timeout_secs,
            max_output_bytes: cfg.max_output_bytes,
        }
    }
}

/// Everything the engine prepared before spawning.
struct Prepared {
    invocation: RuntimeInvocation,
    cwd: PathBuf,
    env: ResolvedEnvironment,
    timeout_label: &'static str,
    /// Deleted on drop, on every exit path.
    _temp: Option<tempfile::TempPath>,
}

/// Runs skill scripts and inline code. Holds no per-request state, so one
/// engine serves concurrent requests.
pub struct ExecutionEngine {
    skills_root: PathBuf,
    interpreters: InterpreterPaths,
    limits: ExecutionLimits,
    env_store: Arc<dyn SkillVariableStore>,
    codec: Arc<dyn ManifestCodec>,
    scratch_dir: PathBuf,
}

impl ExecutionEngine {
    pub fn new(skills_root: impl Into<PathBuf>, env_store: Arc<dyn SkillVariableStore>) -> Self {
        Self {
            skills_root: skills_root.into(),
            interpreters: InterpreterPaths::default(),
            limits: ExecutionLimits::default(),
            env_store,
            codec: Arc::new(Pep723Codec),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Engine over `.env` variable stores, configured from the environment.
    pub fn from_config(paths: &PathsConfig, exec: &ExecutionConfig) -> Self {
        let store = Arc::new(DotEnvStore::new(&paths.skills_dir));
        Self::new(&paths.skills_dir, store)
            .with_interpreters(InterpreterPaths::from_config(exec))
            .with_limits(ExecutionLimits::from(exec))
    }

    pub fn with_interpreters(mut self, interpreters: InterpreterPaths) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn ManifestCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Directory for inline-code temp files; also their working directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn skills_root(&self) -> &Path {
        &self.skills_root
    }

    pub fn limits(&self) -> ExecutionLimits {
        self.limits
    }

    /// Run `request` to completion.
    ///
    /// Setup failures and timeouts are errors; no child is left running and
    /// any temp file is gone when this returns.
    pub async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome> {
        let result = self.run(request).await;
        if let Err(e) = &result {
            if !matches!(e, ExecutionError::Timeout { .. }) {
                tracing::debug!(phase = ?ExecutionPhase::Failed, "{}", e);
            }
        }
        result
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome> {
        let timeout_secs = request.timeout_secs.unwrap_or(self.limits.timeout_secs);
        let prepared = match request.source() {
            ScriptSource::ExistingScript {
                skill_name,
                relative_path,
            } => self.prepare_script(skill_name, relative_path, request)?,
            ScriptSource::InlineCode { code } => self.prepare_inline(code, &request.references)?,
        };

        tracing::debug!(phase = ?ExecutionPhase::Spawning, runtime = ?prepared.invocation.runtime, env = ?prepared.env);
        let timeout = Duration::from_secs(timeout_secs);
        if let Some(dir) = &prepared.invocation.install_dir {
            self.install_node_dependencies(dir, &prepared.env, timeout_secs).await?;
        }

        tracing::debug!(phase = ?ExecutionPhase::Running, program = %prepared.invocation.program.display());
        let waited = self
            .run_process(
                &prepared.invocation.program,
                &prepared.invocation.args,
                &prepared.cwd,
                &prepared.env,
                timeout,
            )
            .await?;

        match waited {
            WaitOutcome::Exited {
                code,
                stdout,
                stderr,
            } => {
                tracing::debug!(phase = ?ExecutionPhase::Completed, exit_code = code);
                Ok(ExecutionOutcome {
                    exit_code: code,
                    stdout: truncate_output(&stdout, self.limits.max_output_bytes),
                    stderr: truncate_output(&stderr, self.limits.max_output_bytes),
                })
            }
            WaitOutcome::TimedOut => {
                tracing::warn!(phase = ?ExecutionPhase::TimedOut, timeout_secs, "Execution timed out");
                Err(ExecutionError::Timeout {
                    what: prepared.timeout_label,
                    secs: timeout_secs,
                })
            }
        }
    }

    fn prepare_script(
        &self,
        skill_name: &str,
        relative_path: &str,
        request: &ExecutionRequest,
    ) -> Result<Prepared> {
        tracing::debug!(phase = ?ExecutionPhase::Validating, skill = %skill_name, script = %relative_path);
        let skill_dir = path_validation::skill_dir(&self.skills_root, skill_name)?;
        if !skill_dir.is_dir() {
            return Err(ExecutionError::SkillNotFound(skill_name.to_string()));
        }
        let script = path_validation::resolve_in_skill(&self.skills_root, skill_name, relative_path)
            .map_err(|e| ExecutionError::InvalidPath(format!("Invalid script path: {}", e)))?;
        if !script.exists() {
            return Err(ExecutionError::ScriptNotFound {
                skill: skill_name.to_string(),
                script: relative_path.to_string(),
            });
        }
        if !script.is_file() {
            return Err(ExecutionError::NotAFile(relative_path.to_string()));
        }
        let cwd = match &request.working_dir {
            Some(dir) => {
                let resolved = path_validation::resolve_in_skill(&self.skills_root, skill_name, dir)
                    .map_err(|e| {
                        ExecutionError::InvalidPath(format!("Invalid working directory: {}", e))
                    })?;
                if !resolved.is_dir() {
                    return Err(ExecutionError::InvalidWorkingDir(dir.clone()));
                }
                resolved
            }
            None => skill_dir,
        };
        if !request.references.is_empty() {
            tracing::debug!("Skill references are ignored for existing scripts");
        }

        tracing::debug!(phase = ?ExecutionPhase::Resolving);
        // Read in place for runtime selection only; the file is never rewritten.
        let manifest = std::fs::read_to_string(&script)
            .map(|content| self.codec.extract(&content))
            .unwrap_or_default();

        tracing::debug!(phase = ?ExecutionPhase::Composing);
        let env = compose(
            std::env::vars_os(),
            self.env_store.as_ref(),
            &[skill_name.to_string()],
            &[],
        )?;
        let invocation =
            runtime_resolver::select(&self.interpreters, &script, &manifest, &request.args);
        info_log!(
            "Running {}/{} ({:?}, {} dependencies)",
            skill_name,
            relative_path,
            invocation.runtime,
            manifest.len()
        );

        Ok(Prepared {
            invocation,
            cwd,
            env,
            timeout_label: "Script execution",
            _temp: None,
        })
    }

    fn prepare_inline(&self, code: &str, references: &[SkillReference]) -> Result<Prepared> {
        tracing::debug!(phase = ?ExecutionPhase::Resolving, references = references.len());
        let imports = imports::resolve(&self.skills_root, references, self.codec.as_ref())?;
        let code = if imports.manifest.is_empty() {
            code.to_string()
        } else {
            let merged = self.codec.extract(code).merge(&imports.manifest);
            self.codec.rewrite(code, &merged)
        };
        let manifest: DependencyManifest = self.codec.extract(&code);

        tracing::debug!(phase = ?ExecutionPhase::Composing);
        let env = compose(
            std::env::vars_os(),
            self.env_store.as_ref(),
            &imports.skill_names,
            &imports.search_paths,
        )?;
        let temp = self.write_temp_script(&code)?;

        let invocation = runtime_resolver::select(&self.interpreters, &temp, &manifest, &[]);
        info_log!(
            "Running inline code ({:?}, {} dependencies, {} skill references)",
            invocation.runtime,
            manifest.len(),
            references.len()
        );

        Ok(Prepared {
            invocation,
            cwd: self.scratch_dir.clone(),
            env,
            timeout_label: "Code execution",
            _temp: Some(temp),
        })
    }

    fn write_temp_script(&self, code: &str) -> Result<tempfile::TempPath> {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .prefix("skill-mcp-")
            .suffix(".py")
            .tempfile_in(&self.scratch_dir)
            .map_err(ExecutionError::TempFile)?;
        file.write_all(code.as_bytes())
            .and_then(|_| file.flush())
            .map_err(ExecutionError::TempFile)?;
        Ok(file.into_temp_path())
    }

    async fn install_node_dependencies(
        &self,
        dir: &Path,
        env: &ResolvedEnvironment,
        timeout_secs: u64,
    ) -> Result<()> {
        info_log!("Installing node dependencies in {}", dir.display());
        let waited = self
            .run_process(
                &self.interpreters.npm,
                &[OsString::from("install")],
                dir,
                env,
                Duration::from_secs(timeout_secs),
            )
            .await?;
        match waited {
            WaitOutcome::Exited { code: 0, .. } => Ok(()),
            WaitOutcome::Exited { stderr, .. } => Err(ExecutionError::DependencyInstall(format!(
                "npm install failed: {}",
                truncate_output(&stderr, self.limits.max_output_bytes).trim_end()
            ))),
            WaitOutcome::TimedOut => Err(ExecutionError::DependencyInstall(format!(
                "npm install timed out ({} seconds)",
                timeout_secs
            ))),
        }
    }

    async fn run_process(
        &self,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
        env: &ResolvedEnvironment,
        timeout: Duration,
    ) -> Result<WaitOutcome> {
        let resolved = locate_program(program, env, cwd)?;
        let mut cmd = Command::new(&resolved);
        cmd.args(args)
            .current_dir(cwd)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|e| spawn_error(program, e))?;
        wait_with_timeout(child, timeout)
            .await
            .map_err(|e| spawn_error(program, e))
    }
}

/// Bare program names are looked up on the child's PATH; paths are used as is.
fn locate_program(program: &Path, env: &ResolvedEnvironment, cwd: &Path) -> Result<PathBuf> {
    if program.components().count() != 1 || program.is_absolute() {
        return Ok(program.to_path_buf());
    }
    which::which_in(program, env.get("PATH"), cwd).map_err(|_| ExecutionError::Spawn {
        program: program.display().to_string(),
        message: "not found on PATH".to_string(),
    })
}

fn spawn_error(program: &Path, e: std::io::Error) -> ExecutionError {
    ExecutionError::Spawn {
        program: program.display().to_string(),
        message: e.to_string(),
    }
}
