//! Compiles expression trees and select statements into search request documents.

pub mod compile;
pub mod config;
pub mod error;
pub mod select;
pub mod statement;

pub use compile::{Compiled, FieldRef, Inverse, MAX_NEST_DEPTH, Projection, QueryCompiler};
pub use config::{CompilerConfig, EnvGetter};
pub use error::{CompileError, Result};
pub use select::{CompiledSearch, OrderKey, Predicate, SelectQuery};
pub use statement::{OrderBy, SelectStatement};
