//! Child-process environment composition.
//!
//! Callers pass skill names; this module layers their persisted variables
//! over the host environment and adds import search paths. The runner
//! receives only a [`ResolvedEnvironment`].

pub mod builder;

pub use builder::{compose, ResolvedEnvironment};
