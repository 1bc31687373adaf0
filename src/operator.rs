//! Mutation operator contract and registry
//!
//! An operator looks at one node and lazily yields replacement nodes of the
//! same category. There is one method per category, each defaulting to an
//! empty sequence, so an operator only implements the categories it mutates.

use std::fmt;

use crate::error::{MutationError, OperatorError, Result};
use crate::node::{Node, NodeRef};
use crate::operators;

/// Lazily produced replacement candidates
pub type Candidates<'a, T> = Box<dyn Iterator<Item = std::result::Result<T, OperatorError>> + 'a>;

/// An empty candidate sequence
pub fn no_candidates<'a, T: 'a>() -> Candidates<'a, T> {
    Box::new(std::iter::empty())
}

/// A pluggable mutation rule
///
/// Implementations must be pure: the same node always yields the same
/// candidates, and nothing is modified.
pub trait MutationOperator {
    /// Stable name used in configuration and reports
    fn name(&self) -> &str;

    fn mutate_expr<'a>(&'a self, _expr: &'a syn::Expr) -> Candidates<'a, syn::Expr> {
        no_candidates()
    }

    fn mutate_bin_op<'a>(&'a self, _op: &'a syn::BinOp) -> Candidates<'a, syn::BinOp> {
        no_candidates()
    }

    fn mutate_lit<'a>(&'a self, _lit: &'a syn::Lit) -> Candidates<'a, syn::Lit> {
        no_candidates()
    }
}

/// Dispatch a node to the operator method for its category
pub fn candidates<'a>(
    operator: &'a dyn MutationOperator,
    node: NodeRef<'a>,
) -> Candidates<'a, Node> {
    match node {
        NodeRef::Expr(expr) => Box::new(operator.mutate_expr(expr).map(|c| c.map(Node::Expr))),
        NodeRef::BinOp(op) => Box::new(operator.mutate_bin_op(op).map(|c| c.map(Node::BinOp))),
        NodeRef::Lit(lit) => Box::new(operator.mutate_lit(lit).map(|c| c.map(Node::Lit))),
    }
}

/// Ordered set of operators consulted at every site
#[derive(Default)]
pub struct OperatorRegistry {
    operators: Vec<Box<dyn MutationOperator>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in operator, in catalog order
    pub fn builtin() -> Self {
        operators::BUILTIN
            .iter()
            .filter_map(|name| operators::by_name(name))
            .fold(Self::new(), |registry, op| registry.with_boxed(op))
    }

    /// Built-in operators selected by name, in the given order
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            let op = operators::by_name(name).ok_or_else(|| MutationError::ConfigError {
                message: format!(
                    "Unknown operator '{}'\n  Available operators: {}",
                    name,
                    operators::BUILTIN.join(", ")
                ),
            })?;
            registry.push(op);
        }
        Ok(registry)
    }

    pub fn with(self, operator: impl MutationOperator + 'static) -> Self {
        self.with_boxed(Box::new(operator))
    }

    pub fn with_boxed(mut self, operator: Box<dyn MutationOperator>) -> Self {
        self.push(operator);
        self
    }

    pub fn push(&mut self, operator: Box<dyn MutationOperator>) {
        self.operators.push(operator);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn MutationOperator> {
        self.operators.iter().map(|op| op.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|op| op.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
