//! Scope and symbol resolution front end for the phs language.
//!
//! Takes syntax trees produced by an external parser and builds the scope
//! graph of a session: declarations, inheritance and trait composition,
//! name binding and the context rules around them.

pub mod ast;
pub mod config;
pub mod error_codes;
pub mod logging;
pub mod pipeline;
pub mod sema;

pub use config::SessionConfig;
pub use pipeline::{PipelineStats, Session, UnitAnalysis};
