//! Parsing, mutant generation and code generation
//!
//! This module wires the generator to the applier: every discovered mutation
//! is applied to a working copy of the tree, handed to the caller as source
//! or AST, and undone before the next one.

use std::ops::ControlFlow;
use std::path::Path;

use crate::applier;
use crate::error::{GenerationError, MutationError, Result};
use crate::generator::{collect_function_names, GenerationSummary, Generator};
use crate::mutation::Mutation;

/// Generate source code from AST
pub fn generate_source(ast: &syn::File) -> String {
    prettyplease::unparse(ast)
}

/// Parse Rust source; `file` is only used for error messages
pub fn parse_source(source: &str, file: &Path) -> Result<syn::File> {
    syn::parse_file(source).map_err(|e| MutationError::ParseError {
        file: file.to_path_buf(),
        error: e.to_string(),
    })
}

/// Read and parse a Rust source file
pub fn parse_file(file: &Path) -> Result<syn::File> {
    let source = std::fs::read_to_string(file).map_err(|e| MutationError::FileReadError {
        file: file.to_path_buf(),
        error: e.to_string(),
    })?;
    parse_source(&source, file)
}

/// Check that the generator's target function exists in `tree`
pub fn check_function(tree: &syn::File, generator: &Generator<'_>, file: &Path) -> Result<()> {
    let Some(function) = generator.function() else {
        return Ok(());
    };
    let functions = collect_function_names(tree);
    if functions.iter().any(|f| f == function) {
        Ok(())
    } else {
        Err(MutationError::FunctionNotFound {
            file: file.to_path_buf(),
            function: function.to_string(),
            available_functions: functions,
        })
    }
}

/// Generate every mutation of `tree` and hand each mutated tree to `on_mutant`
///
/// `tree` itself is only read. Mutations are applied to a single working copy
/// and undone after each callback.
pub fn mutate_tree<F>(
    tree: &syn::File,
    generator: &Generator<'_>,
    mut on_mutant: F,
) -> std::result::Result<GenerationSummary, GenerationError>
where
    F: FnMut(&Mutation, &syn::File) -> anyhow::Result<ControlFlow<()>>,
{
    let mut working = tree.clone();
    generator.generate(tree, |mutation| {
        applier::apply(&mut working, &mutation, |mutated| on_mutant(&mutation, mutated))
    })
}

/// Parse `source` and run [`mutate_tree`] on it
pub fn mutate_source<F>(
    source: &str,
    file: &Path,
    generator: &Generator<'_>,
    on_mutant: F,
) -> std::result::Result<GenerationSummary, GenerationError>
where
    F: FnMut(&Mutation, &syn::File) -> anyhow::Result<ControlFlow<()>>,
{
    let tree = parse_source(source, file).map_err(|e| GenerationError::new(0, e))?;
    check_function(&tree, generator, file).map_err(|e| GenerationError::new(0, e))?;
    mutate_tree(&tree, generator, on_mutant)
}

/// A rendered mutant
#[derive(Debug, Clone)]
pub struct PreparedMutation {
    pub mutation: Mutation,
    /// The mutated source code
    pub mutated_source: String,
}

/// Render the mutant with the given id, if the file has one
pub fn prepare_mutation(
    source: &str,
    file: &Path,
    generator: &Generator<'_>,
    id: usize,
) -> std::result::Result<Option<PreparedMutation>, GenerationError> {
    let mut found = None;
    mutate_source(source, file, generator, |mutation, mutated| {
        if mutation.id != id {
            return Ok(ControlFlow::Continue(()));
        }
        found = Some(PreparedMutation {
            mutation: mutation.clone(),
            mutated_source: generate_source(mutated),
        });
        Ok(ControlFlow::Break(()))
    })?;
    Ok(found)
}
