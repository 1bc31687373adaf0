//! Mutation descriptors
//!
//! A [`Mutation`] says "replace the node at this location with that node".
//! It is produced by the generator and consumed once by the applier or by
//! the caller's callback.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::node::{Node, NodeKind};

/// Structural hash of a whole file, spans ignored
///
/// Ties a [`Location`] to the tree it was found in.
pub fn fingerprint(tree: &syn::File) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    tree.hash(&mut hasher);
    hasher.finish()
}

/// Position of a mutation site within a file
///
/// `index` is the pre-order position of the site among all mutation sites of
/// the file (expressions, binary operators and literals, attributes excluded).
/// The applier walks the tree in the same order to find it again, and
/// refuses trees whose [`fingerprint`] differs from `tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub index: usize,
    pub kind: NodeKind,
    /// Fingerprint of the unmutated file
    pub tree: u64,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site {} (line {}, column {})", self.index, self.line, self.column)
    }
}

/// One candidate mutation
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Delivery order within one generation run, starting at 0
    pub id: usize,
    /// Name of the operator that produced the replacement
    pub operator: String,
    pub location: Location,
    /// Token rendering of the node being replaced
    pub original: String,
    pub replacement: Node,
}

impl Mutation {
    pub fn replacement_source(&self) -> String {
        self.replacement.to_source()
    }

    /// Create a description for this mutation
    pub fn description(&self) -> String {
        format!(
            "{} -> {} [{}] at line {}, column {}",
            self.original,
            self.replacement_source(),
            self.operator,
            self.location.line,
            self.location.column
        )
    }
}
