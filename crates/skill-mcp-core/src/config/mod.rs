//! skill-mcp configuration layer.
//!
//! Every environment variable read goes through this module; the rest of the
//! code base consumes the structured configs below instead of calling
//! `std::env::var` directly.
//!
//! - `loader`: `env_or`, `env_optional`, `env_bool`, `env_u64`, `.env` loading
//! - `schema`: `PathsConfig`, `ExecutionConfig`, `ObservabilityConfig`
//! - `env_keys`: key constants and aliases

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, env_u64, load_dotenv, parse_env_content};
pub use schema::{ExecutionConfig, ObservabilityConfig, PathsConfig};
