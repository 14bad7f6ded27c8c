//! skill-mcp-sandbox: runs skill scripts and inline code.
//!
//! Inline dependency blocks, runtime dispatch by extension, environment
//! composition across skills, and subprocess execution with timeout and
//! bounded output capture.

pub mod common;
pub mod deps;
pub mod env;
pub mod error;
pub mod imports;
pub mod log;
pub mod runner;
pub mod runtime_resolver;

pub use deps::{DependencyManifest, ManifestCodec, Pep723Codec};
pub use error::{ExecutionError, Result};
pub use imports::{DependencySource, ResolvedImports, SkillReference};
pub use runner::{
    ExecutionEngine, ExecutionLimits, ExecutionOutcome, ExecutionPhase, ExecutionRequest,
    ScriptSource,
};
pub use runtime_resolver::{InterpreterPaths, Runtime, RuntimeInvocation};
