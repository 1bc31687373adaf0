//! Mutable node slots of the host AST
//!
//! A Rust source file parsed by `syn` contains many node types. Only three
//! categories are mutation sites: expressions, binary operator tokens and
//! literals. Every replacement belongs to the same category as the node it
//! replaces, so the mutated file is always syntactically valid.

use std::fmt;

use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use syn::spanned::Spanned;

/// Syntactic category of a mutation site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Expr,
    BinOp,
    Lit,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Expr => "expression",
            NodeKind::BinOp => "binary operator",
            NodeKind::Lit => "literal",
        })
    }
}

/// An owned node of one of the mutable categories
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(syn::Expr),
    BinOp(syn::BinOp),
    Lit(syn::Lit),
}

/// A borrowed node of one of the mutable categories
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Expr(&'a syn::Expr),
    BinOp(&'a syn::BinOp),
    Lit(&'a syn::Lit),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.as_node_ref().kind()
    }

    pub fn as_node_ref(&self) -> NodeRef<'_> {
        match self {
            Node::Expr(expr) => NodeRef::Expr(expr),
            Node::BinOp(op) => NodeRef::BinOp(op),
            Node::Lit(lit) => NodeRef::Lit(lit),
        }
    }

    /// Token rendering of the node, independent of spans and whitespace
    pub fn to_source(&self) -> String {
        self.as_node_ref().to_source()
    }
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Expr(_) => NodeKind::Expr,
            NodeRef::BinOp(_) => NodeKind::BinOp,
            NodeRef::Lit(_) => NodeKind::Lit,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::Expr(expr) => expr.span(),
            NodeRef::BinOp(op) => op.span(),
            NodeRef::Lit(lit) => lit.span(),
        }
    }

    pub fn to_source(&self) -> String {
        self.to_token_stream().to_string()
    }
}

impl ToTokens for Node {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.as_node_ref().to_tokens(tokens);
    }
}

impl ToTokens for NodeRef<'_> {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            NodeRef::Expr(expr) => expr.to_tokens(tokens),
            NodeRef::BinOp(op) => op.to_tokens(tokens),
            NodeRef::Lit(lit) => lit.to_tokens(tokens),
        }
    }
}

/// 1-indexed line and column where a span starts
pub fn line_column(span: Span) -> (usize, usize) {
    let start = span.start();
    (start.line, start.column + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(s: &str) -> syn::Expr {
        syn::parse_str(s).unwrap()
    }

    #[test]
    fn test_kind_follows_variant() {
        let expr = parse_expr("a * b");
        let syn::Expr::Binary(binary) = &expr else {
            panic!("expected a binary expression");
        };

        assert_eq!(NodeRef::Expr(&expr).kind(), NodeKind::Expr);
        assert_eq!(NodeRef::BinOp(&binary.op).kind(), NodeKind::BinOp);
        assert_eq!(Node::BinOp(binary.op.clone()).kind(), NodeKind::BinOp);
    }

    #[test]
    fn test_source_ignores_whitespace() {
        let a = Node::Expr(parse_expr("a+b"));
        let b = Node::Expr(parse_expr("a  +  b"));
        assert_eq!(a.to_source(), b.to_source());
    }

    #[test]
    fn test_line_column_is_one_indexed() {
        let file = syn::parse_file("fn f() {\n    let x = 42;\n}\n").unwrap();
        let syn::Item::Fn(func) = &file.items[0] else {
            panic!("expected a function");
        };
        let syn::Stmt::Local(local) = &func.block.stmts[0] else {
            panic!("expected a let statement");
        };
        let init = local.init.as_ref().unwrap();

        assert_eq!(line_column(NodeRef::Expr(&init.expr).span()), (2, 13));
    }
}
