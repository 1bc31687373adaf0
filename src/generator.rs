//! Mutation discovery
//!
//! The generator walks a file in pre-order, asks every registered operator
//! for candidates at every mutation site and pushes one [`Mutation`] per
//! candidate to the caller. It only ever reads the caller's tree, so a
//! replacement is never itself traversed.

use std::ops::ControlFlow;

use syn::visit::Visit;

use crate::error::{GenerationError, MutationError};
use crate::mutation::{fingerprint, Location, Mutation};
use crate::node::{line_column, NodeRef};
use crate::operator::{candidates, OperatorRegistry};

/// Outcome of a generation run that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Number of mutations whose callback completed
    pub delivered: usize,
    /// Whether the callback stopped the run early
    pub cancelled: bool,
}

/// Drives the operators of a registry over a file
#[derive(Debug)]
pub struct Generator<'r> {
    operators: &'r OperatorRegistry,
    function: Option<String>,
}

impl<'r> Generator<'r> {
    pub fn new(operators: &'r OperatorRegistry) -> Self {
        Self {
            operators,
            function: None,
        }
    }

    /// Only consult operators inside the named function
    ///
    /// Sites outside the function still count towards location indices.
    pub fn within_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// Walk `tree` and hand every discovered mutation to `on_mutation`
    ///
    /// The callback runs to completion before the next candidate is pulled.
    /// Returning `ControlFlow::Break(())` stops the walk; returning an error
    /// aborts it.
    #[tracing::instrument(skip_all, fields(operators = self.operators.len(), function = ?self.function))]
    pub fn generate<F>(
        &self,
        tree: &syn::File,
        on_mutation: F,
    ) -> Result<GenerationSummary, GenerationError>
    where
        F: FnMut(Mutation) -> Result<ControlFlow<()>, MutationError>,
    {
        let mut walker = SiteWalker {
            operators: self.operators,
            function: self.function.as_deref(),
            tree: fingerprint(tree),
            in_scope: self.function.is_none(),
            next_index: 0,
            delivered: 0,
            on_mutation,
            halt: None,
        };
        walker.visit_file(tree);

        tracing::debug!(
            sites = walker.next_index,
            delivered = walker.delivered,
            "generation finished"
        );

        match walker.halt {
            None => Ok(GenerationSummary {
                delivered: walker.delivered,
                cancelled: false,
            }),
            Some(Halt::Cancelled) => Ok(GenerationSummary {
                delivered: walker.delivered,
                cancelled: true,
            }),
            Some(Halt::Failed(e)) => Err(GenerationError::new(walker.delivered, e)),
        }
    }
}

enum Halt {
    Cancelled,
    Failed(MutationError),
}

struct SiteWalker<'g, F> {
    operators: &'g OperatorRegistry,
    function: Option<&'g str>,
    tree: u64,
    in_scope: bool,
    next_index: usize,
    delivered: usize,
    on_mutation: F,
    halt: Option<Halt>,
}

impl<F> SiteWalker<'_, F>
where
    F: FnMut(Mutation) -> Result<ControlFlow<()>, MutationError>,
{
    fn enter_fn(&mut self, ident: &syn::Ident) -> bool {
        let prev = self.in_scope;
        if let Some(function) = self.function {
            self.in_scope = prev || ident == function;
        }
        prev
    }

    fn site(&mut self, node: NodeRef<'_>) {
        let index = self.next_index;
        self.next_index += 1;
        if !self.in_scope {
            return;
        }

        // Built on the first candidate; most sites have none.
        let mut location: Option<(Location, String)> = None;
        let operators = self.operators;

        for operator in operators.iter() {
            for candidate in candidates(operator, node) {
                let (location, original) = location.get_or_insert_with(|| {
                    let (line, column) = line_column(node.span());
                    let location = Location {
                        index,
                        kind: node.kind(),
                        tree: self.tree,
                        line,
                        column,
                    };
                    (location, node.to_source())
                });

                let replacement = match candidate {
                    Ok(replacement) => replacement,
                    Err(source) => {
                        self.halt = Some(Halt::Failed(MutationError::Operator {
                            operator: operator.name().to_string(),
                            location: location.clone(),
                            source,
                        }));
                        return;
                    }
                };

                let mutation = Mutation {
                    id: self.delivered,
                    operator: operator.name().to_string(),
                    location: location.clone(),
                    original: original.clone(),
                    replacement,
                };
                tracing::debug!(
                    id = mutation.id,
                    location = %mutation.location,
                    operator = %mutation.operator,
                    "offering mutation"
                );

                match (self.on_mutation)(mutation) {
                    Ok(ControlFlow::Continue(())) => self.delivered += 1,
                    Ok(ControlFlow::Break(())) => {
                        self.delivered += 1;
                        self.halt = Some(Halt::Cancelled);
                        return;
                    }
                    Err(e) => {
                        self.halt = Some(Halt::Failed(e));
                        return;
                    }
                }
            }
        }
    }
}

impl<'ast, F> Visit<'ast> for SiteWalker<'_, F>
where
    F: FnMut(Mutation) -> Result<ControlFlow<()>, MutationError>,
{
    // Attributes are carried verbatim, never mutated.
    fn visit_attribute(&mut self, _attr: &'ast syn::Attribute) {}

    fn visit_item(&mut self, item: &'ast syn::Item) {
        if self.halt.is_some() {
            return;
        }
        syn::visit::visit_item(self, item);
    }

    fn visit_item_fn(&mut self, func: &'ast syn::ItemFn) {
        let prev = self.enter_fn(&func.sig.ident);
        syn::visit::visit_item_fn(self, func);
        self.in_scope = prev;
    }

    fn visit_impl_item_fn(&mut self, func: &'ast syn::ImplItemFn) {
        let prev = self.enter_fn(&func.sig.ident);
        syn::visit::visit_impl_item_fn(self, func);
        self.in_scope = prev;
    }

    fn visit_trait_item_fn(&mut self, func: &'ast syn::TraitItemFn) {
        let prev = self.enter_fn(&func.sig.ident);
        syn::visit::visit_trait_item_fn(self, func);
        self.in_scope = prev;
    }

    fn visit_expr(&mut self, expr: &'ast syn::Expr) {
        if self.halt.is_some() {
            return;
        }
        self.site(NodeRef::Expr(expr));
        if self.halt.is_some() {
            return;
        }
        syn::visit::visit_expr(self, expr);
    }

    fn visit_bin_op(&mut self, op: &'ast syn::BinOp) {
        if self.halt.is_some() {
            return;
        }
        self.site(NodeRef::BinOp(op));
    }

    fn visit_lit(&mut self, lit: &'ast syn::Lit) {
        if self.halt.is_some() {
            return;
        }
        self.site(NodeRef::Lit(lit));
    }
}

/// Collect all function names in a file
pub fn collect_function_names(ast: &syn::File) -> Vec<String> {
    let mut collector = FunctionCollector {
        functions: Vec::new(),
    };
    collector.visit_file(ast);
    collector.functions
}

struct FunctionCollector {
    functions: Vec<String>,
}

impl<'ast> Visit<'ast> for FunctionCollector {
    fn visit_item_fn(&mut self, func: &'ast syn::ItemFn) {
        self.functions.push(func.sig.ident.to_string());
        syn::visit::visit_item_fn(self, func);
    }

    fn visit_impl_item_fn(&mut self, func: &'ast syn::ImplItemFn) {
        self.functions.push(func.sig.ident.to_string());
        syn::visit::visit_impl_item_fn(self, func);
    }

    fn visit_trait_item_fn(&mut self, func: &'ast syn::TraitItemFn) {
        if func.default.is_some() {
            self.functions.push(func.sig.ident.to_string());
        }
        syn::visit::visit_trait_item_fn(self, func);
    }
}
