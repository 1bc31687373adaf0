//! AST-based mutation generation for Rust
//!
//! Mutation operators inspect nodes of a parsed file and lazily propose
//! replacements of the same syntactic category. The generator walks the file
//! and pushes one [`Mutation`] per proposal to a callback; the applier swaps
//! a mutation into the tree for the duration of a callback and swaps it back
//! afterwards, so only one mutant exists at a time and every mutant parses.
//!
//! # Usage
//!
//! ```
//! use std::ops::ControlFlow;
//! use std::path::Path;
//!
//! use astmut::{generate_source, mutate_source, Generator, OperatorRegistry};
//!
//! let registry = OperatorRegistry::from_names(&["mul-to-div"]).unwrap();
//! let generator = Generator::new(&registry);
//!
//! let mut mutants = Vec::new();
//! mutate_source("fn f() -> i32 { 1 * 2 * 3 }", Path::new("f.rs"), &generator, |_, tree| {
//!     mutants.push(generate_source(tree));
//!     Ok(ControlFlow::Continue(()))
//! })
//! .unwrap();
//!
//! assert!(mutants[0].contains("1 / 2 * 3"));
//! assert!(mutants[1].contains("1 * 2 / 3"));
//! ```
//!
//! # Example Configuration
//!
//! The `astmut test` command reads a YAML file:
//!
//! ```yaml
//! version: "1.0"
//! settings:
//!   timeout: 30
//!   operators: [arithmetic, relational-boundary]
//!
//! targets:
//!   - file: src/math.rs
//!     function: add
//! ```

pub mod applier;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generator;
pub mod mutation;
pub mod node;
pub mod operator;
pub mod operators;
pub mod report;
pub mod runner;

// Re-export main types at crate root
pub use applier::{apply, Applied};
pub use codegen::{generate_source, mutate_source, mutate_tree, parse_source, prepare_mutation};
pub use config::{Config, Settings, TargetConfig};
pub use error::{GenerationError, MutationError, OperatorError, Result};
pub use generator::{GenerationSummary, Generator};
pub use mutation::{Location, Mutation};
pub use node::{Node, NodeKind, NodeRef};
pub use operator::{Candidates, MutationOperator, OperatorRegistry};
pub use report::MutationReport;
pub use runner::{run_mutation_tests, validate_targets, MutationResult, MutationStatus};
