//! AST mutation application
//!
//! A mutation is applied by swapping the replacement into its slot and
//! undone by swapping the original back. Nothing outside the slot is cloned.
//! [`Applied`] holds the swapped state and undoes it when dropped, so the
//! tree is restored on every exit path.

use std::mem;
use std::ops::Deref;

use syn::visit_mut::VisitMut;

use crate::error::{MutationError, Result};
use crate::mutation::{fingerprint, Location, Mutation};
use crate::node::{Node, NodeKind, NodeRef};

/// Apply `mutation` to `tree`, run `f` on the mutated tree, then restore it
///
/// The tree is restored before this returns, whether `f` succeeded, failed
/// or panicked.
pub fn apply<T, F>(tree: &mut syn::File, mutation: &Mutation, f: F) -> Result<T>
where
    F: FnOnce(&syn::File) -> anyhow::Result<T>,
{
    let applied = Applied::new(tree, mutation)?;
    let outcome = f(&applied);
    applied.restore()?;
    outcome.map_err(|source| MutationError::Callback {
        mutation: mutation.id,
        source,
    })
}

/// A tree with one mutation swapped in
///
/// Dereferences to the mutated tree. Dropping it swaps the original node back.
#[derive(Debug)]
pub struct Applied<'t> {
    tree: &'t mut syn::File,
    location: Location,
    /// Rendering of the replacement, checked when restoring
    replacement: String,
    original: Option<Node>,
}

impl<'t> Applied<'t> {
    pub fn new(tree: &'t mut syn::File, mutation: &Mutation) -> Result<Self> {
        if mutation.replacement.kind() != mutation.location.kind {
            return Err(MutationError::LocationNotFound {
                location: mutation.location.clone(),
                reason: format!(
                    "replacement is a {}, not a {}",
                    mutation.replacement.kind(),
                    mutation.location.kind
                ),
            });
        }

        if fingerprint(tree) != mutation.location.tree {
            return Err(MutationError::LocationNotFound {
                location: mutation.location.clone(),
                reason: "the mutation was generated from a different tree".to_string(),
            });
        }

        let original = swap(
            tree,
            &mutation.location,
            &mutation.original,
            mutation.replacement.clone(),
        )?;
        tracing::trace!(id = mutation.id, location = %mutation.location, "mutation applied");

        Ok(Self {
            tree,
            location: mutation.location.clone(),
            replacement: mutation.replacement_source(),
            original: Some(original),
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Swap the original node back, reporting failures instead of logging them
    pub fn restore(mut self) -> Result<()> {
        self.undo()
    }

    fn undo(&mut self) -> Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        swap(self.tree, &self.location, &self.replacement, original)?;
        tracing::trace!(location = %self.location, "mutation restored");
        Ok(())
    }
}

impl Deref for Applied<'_> {
    type Target = syn::File;

    fn deref(&self) -> &syn::File {
        &*self.tree
    }
}

impl Drop for Applied<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.undo() {
            tracing::warn!(error = %e, "failed to restore mutated tree");
        }
    }
}

/// Put `incoming` at `location`, returning the node it displaced
///
/// The node currently at `location` must render as `expected`.
fn swap(tree: &mut syn::File, location: &Location, expected: &str, incoming: Node) -> Result<Node> {
    let mut swapper = Swapper {
        target: location.index,
        kind: location.kind,
        expected,
        next_index: 0,
        incoming: Some(incoming),
        outcome: None,
    };
    swapper.visit_file_mut(tree);

    match swapper.outcome {
        Some(Ok(outgoing)) => Ok(outgoing),
        Some(Err(reason)) => Err(MutationError::LocationNotFound {
            location: location.clone(),
            reason,
        }),
        None => Err(MutationError::LocationNotFound {
            location: location.clone(),
            reason: format!("the tree only has {} mutation sites", swapper.next_index),
        }),
    }
}

/// Walks sites in the generator's order and swaps the one at `target`
struct Swapper<'e> {
    target: usize,
    kind: NodeKind,
    expected: &'e str,
    next_index: usize,
    incoming: Option<Node>,
    outcome: Option<std::result::Result<Node, String>>,
}

impl Swapper<'_> {
    /// Count a site; true if it is the target
    fn is_target(&mut self) -> bool {
        let index = self.next_index;
        self.next_index += 1;
        index == self.target
    }

    fn check(&self, found: NodeRef<'_>) -> std::result::Result<(), String> {
        if found.kind() != self.kind {
            return Err(format!("found a {} instead", found.kind()));
        }
        let source = found.to_source();
        if source != self.expected {
            return Err(format!("found `{}` instead of `{}`", source, self.expected));
        }
        Ok(())
    }

    fn swap_expr(&mut self, expr: &mut syn::Expr) {
        self.outcome = Some(self.check(NodeRef::Expr(expr)).and_then(|()| {
            match self.incoming.take() {
                Some(Node::Expr(new)) => Ok(Node::Expr(mem::replace(expr, new))),
                _ => Err("replacement is not an expression".to_string()),
            }
        }));
    }

    fn swap_bin_op(&mut self, op: &mut syn::BinOp) {
        self.outcome = Some(self.check(NodeRef::BinOp(op)).and_then(|()| {
            match self.incoming.take() {
                Some(Node::BinOp(new)) => Ok(Node::BinOp(mem::replace(op, new))),
                _ => Err("replacement is not a binary operator".to_string()),
            }
        }));
    }

    fn swap_lit(&mut self, lit: &mut syn::Lit) {
        self.outcome = Some(self.check(NodeRef::Lit(lit)).and_then(|()| {
            match self.incoming.take() {
                Some(Node::Lit(new)) => Ok(Node::Lit(mem::replace(lit, new))),
                _ => Err("replacement is not a literal".to_string()),
            }
        }));
    }
}

impl VisitMut for Swapper<'_> {
    fn visit_attribute_mut(&mut self, _attr: &mut syn::Attribute) {}

    fn visit_expr_mut(&mut self, expr: &mut syn::Expr) {
        if self.outcome.is_some() {
            return;
        }
        if self.is_target() {
            self.swap_expr(expr);
            return; // Don't recurse into replacement
        }
        syn::visit_mut::visit_expr_mut(self, expr);
    }

    fn visit_bin_op_mut(&mut self, op: &mut syn::BinOp) {
        if self.outcome.is_some() {
            return;
        }
        if self.is_target() {
            self.swap_bin_op(op);
        }
    }

    fn visit_lit_mut(&mut self, lit: &mut syn::Lit) {
        if self.outcome.is_some() {
            return;
        }
        if self.is_target() {
            self.swap_lit(lit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::generate_source;
    use crate::generator::Generator;
    use crate::operator::OperatorRegistry;
    use crate::operators::BinaryOperatorReplacement;
    use pretty_assertions::assert_eq;
    use std::ops::ControlFlow;

    fn mutations_of(registry: &OperatorRegistry, tree: &syn::File) -> Vec<Mutation> {
        let mut out = Vec::new();
        Generator::new(registry)
            .generate(tree, |m| {
                out.push(m);
                Ok(ControlFlow::Continue(()))
            })
            .unwrap();
        out
    }

    #[test]
    fn test_apply_mutation() {
        let source = r#"
fn add(a: i32, b: i32) -> i32 {
    a + b
}
"#;
        let mut ast = syn::parse_file(source).unwrap();
        let registry = OperatorRegistry::new().with(BinaryOperatorReplacement::arithmetic());
        let mutations = mutations_of(&registry, &ast);
        assert_eq!(mutations.len(), 1);

        let mutated_source = apply(&mut ast, &mutations[0], |tree| Ok(generate_source(tree))).unwrap();
        assert!(mutated_source.contains("a - b"));
        assert!(!mutated_source.contains("a + b"));

        // Restored afterwards
        assert!(generate_source(&ast).contains("a + b"));
    }

    #[test]
    fn test_round_trip_restores_every_mutation() {
        let source = r#"
fn calc(a: i32, b: i32, flag: bool) -> i32 {
    let x = a + b * 2;
    if flag && a >= b { x % 3 } else { x - 1 }
}
"#;
        let original = syn::parse_file(source).unwrap();
        let mut tree = original.clone();
        let registry = OperatorRegistry::builtin();
        let mutations = mutations_of(&registry, &original);
        assert!(mutations.len() > 5);

        for mutation in &mutations {
            let changed = apply(&mut tree, mutation, |mutated| Ok(*mutated != original)).unwrap();
            assert!(changed, "mutation {} changed nothing", mutation.description());
            assert_eq!(tree, original);
        }
    }

    #[test]
    fn test_applying_in_either_order_does_not_contaminate() {
        let original = syn::parse_file("fn f() -> i32 { 1 * 2 * 3 }").unwrap();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutations = mutations_of(&registry, &original);
        let (first, second) = (&mutations[0], &mutations[1]);

        let render = |tree: &mut syn::File, m: &Mutation| {
            apply(tree, m, |mutated| Ok(generate_source(mutated))).unwrap()
        };

        let mut forward = original.clone();
        let a1 = render(&mut forward, first);
        let b1 = render(&mut forward, second);

        let mut backward = original.clone();
        let b2 = render(&mut backward, second);
        let a2 = render(&mut backward, first);

        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
        assert!(a1.contains("1 / 2 * 3"));
        assert!(b1.contains("1 * 2 / 3"));
        assert_eq!(forward, original);
        assert_eq!(backward, original);
    }

    #[test]
    fn test_foreign_descriptor_is_location_not_found() {
        let tree_a = syn::parse_file("fn f(a: i32, b: i32) -> i32 { a * b }").unwrap();
        let mut tree_b = syn::parse_file("fn g() -> bool { true }").unwrap();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutation = mutations_of(&registry, &tree_a).remove(0);

        let before = tree_b.clone();
        let err = apply(&mut tree_b, &mutation, |_| Ok(())).unwrap_err();
        assert!(matches!(err, MutationError::LocationNotFound { .. }));
        assert_eq!(tree_b, before);
    }

    #[test]
    fn test_descriptor_from_same_shaped_tree_is_location_not_found() {
        let tree_a = syn::parse_file("fn f(a: i32, b: i32) -> i32 { a * b }").unwrap();
        // Same product at the same site index, different file
        let mut tree_b =
            syn::parse_file("struct S; fn unrelated(x: u8, y: u8) -> u8 { x * y }").unwrap();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutation = mutations_of(&registry, &tree_a).remove(0);
        assert_eq!(mutations_of(&registry, &tree_b)[0].location.index, mutation.location.index);

        let before = tree_b.clone();
        let mut called = false;
        let err = apply(&mut tree_b, &mutation, |_| {
            called = true;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, MutationError::LocationNotFound { .. }));
        assert!(!called);
        assert_eq!(tree_b, before);
    }

    #[test]
    fn test_reparsed_tree_accepts_descriptor() {
        let source = "fn f(a: i32, b: i32) -> i32 { a * b }";
        let tree_a = syn::parse_file(source).unwrap();
        let mut tree_b = syn::parse_file(source).unwrap();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutation = mutations_of(&registry, &tree_a).remove(0);

        let mutated = apply(&mut tree_b, &mutation, |t| Ok(generate_source(t))).unwrap();
        assert!(mutated.contains("a / b"));
        assert_eq!(tree_b, tree_a);
    }

    #[test]
    fn test_stale_descriptor_is_location_not_found() {
        let tree_a = syn::parse_file("fn f(a: i32, b: i32) -> i32 { a * b }").unwrap();
        // Same shape, different operator at the same index
        let mut tree_b = syn::parse_file("fn f(a: i32, b: i32) -> i32 { a - b }").unwrap();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutation = mutations_of(&registry, &tree_a).remove(0);

        let err = apply(&mut tree_b, &mutation, |_| Ok(())).unwrap_err();
        assert!(matches!(err, MutationError::LocationNotFound { .. }));
    }

    #[test]
    fn test_callback_failure_still_restores() {
        let original = syn::parse_file("fn f(a: i32, b: i32) -> i32 { a * b }").unwrap();
        let mut tree = original.clone();
        let registry =
            OperatorRegistry::new().with(BinaryOperatorReplacement::multiplication_to_division());
        let mutation = mutations_of(&registry, &original).remove(0);

        let err = apply(&mut tree, &mutation, |_| -> anyhow::Result<()> {
            anyhow::bail!("tests could not run")
        })
        .unwrap_err();

        assert!(matches!(err, MutationError::Callback { mutation: 0, .. }));
        assert_eq!(tree, original);
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let original = syn::parse_file("fn f() -> bool { 1 < 2 }").unwrap();
        let mut tree = original.clone();
        let registry = OperatorRegistry::new().with(BinaryOperatorReplacement::relational_boundary());
        let mutation = mutations_of(&registry, &original).remove(0);

        {
            let applied = Applied::new(&mut tree, &mutation).unwrap();
            assert!(generate_source(&applied).contains("1 <= 2"));
            assert_eq!(applied.location(), &mutation.location);
        }
        assert_eq!(tree, original);
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let original = syn::parse_file("fn f() -> bool { 1 < 2 }").unwrap();
        let mut tree = original.clone();
        let registry = OperatorRegistry::new().with(BinaryOperatorReplacement::relational_boundary());
        let mutation = mutations_of(&registry, &original).remove(0);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _applied = Applied::new(&mut tree, &mutation).unwrap();
            panic!("callback blew up");
        }));

        assert!(result.is_err());
        assert_eq!(tree, original);
    }
}
