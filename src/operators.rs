//! Built-in mutation operators
//!
//! Replacements are derived from the original node and reuse its span, so
//! line/column information survives the mutation.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{BinOp, Expr, Lit, Token};

use crate::error::OperatorError;
use crate::operator::{no_candidates, Candidates, MutationOperator};

/// Names of the built-in operators, in catalog order
pub const BUILTIN: &[&str] = &[
    "mul-to-div",
    "arithmetic",
    "relational-boundary",
    "relational-negation",
    "logical",
    "bitwise",
    "boolean-literal",
    "integer-literal",
    "date-format",
    "negate-condition",
];

/// Look up a built-in operator by name
pub fn by_name(name: &str) -> Option<Box<dyn MutationOperator>> {
    let op: Box<dyn MutationOperator> = match name {
        "mul-to-div" => Box::new(BinaryOperatorReplacement::multiplication_to_division()),
        "arithmetic" => Box::new(BinaryOperatorReplacement::arithmetic()),
        "relational-boundary" => Box::new(BinaryOperatorReplacement::relational_boundary()),
        "relational-negation" => Box::new(BinaryOperatorReplacement::relational_negation()),
        "logical" => Box::new(BinaryOperatorReplacement::logical()),
        "bitwise" => Box::new(BinaryOperatorReplacement::bitwise()),
        "boolean-literal" => Box::new(BooleanLiteralFlip),
        "integer-literal" => Box::new(IntegerLiteralReplacement),
        "date-format" => Box::new(DateFormatRewrite),
        "negate-condition" => Box::new(NegateCondition),
        _ => return None,
    };
    Some(op)
}

/// Binary operators, without their tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    BitXor,
    BitAnd,
    BitOr,
    Shl,
    Shr,
    Eq,
    Lt,
    Le,
    Ne,
    Ge,
    Gt,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    BitXorAssign,
    BitAndAssign,
    BitOrAssign,
    ShlAssign,
    ShrAssign,
}

impl BinaryOp {
    pub fn from_syn(op: &BinOp) -> Option<Self> {
        Some(match op {
            BinOp::Add(_) => Self::Add,
            BinOp::Sub(_) => Self::Sub,
            BinOp::Mul(_) => Self::Mul,
            BinOp::Div(_) => Self::Div,
            BinOp::Rem(_) => Self::Rem,
            BinOp::And(_) => Self::And,
            BinOp::Or(_) => Self::Or,
            BinOp::BitXor(_) => Self::BitXor,
            BinOp::BitAnd(_) => Self::BitAnd,
            BinOp::BitOr(_) => Self::BitOr,
            BinOp::Shl(_) => Self::Shl,
            BinOp::Shr(_) => Self::Shr,
            BinOp::Eq(_) => Self::Eq,
            BinOp::Lt(_) => Self::Lt,
            BinOp::Le(_) => Self::Le,
            BinOp::Ne(_) => Self::Ne,
            BinOp::Ge(_) => Self::Ge,
            BinOp::Gt(_) => Self::Gt,
            BinOp::AddAssign(_) => Self::AddAssign,
            BinOp::SubAssign(_) => Self::SubAssign,
            BinOp::MulAssign(_) => Self::MulAssign,
            BinOp::DivAssign(_) => Self::DivAssign,
            BinOp::RemAssign(_) => Self::RemAssign,
            BinOp::BitXorAssign(_) => Self::BitXorAssign,
            BinOp::BitAndAssign(_) => Self::BitAndAssign,
            BinOp::BitOrAssign(_) => Self::BitOrAssign,
            BinOp::ShlAssign(_) => Self::ShlAssign,
            BinOp::ShrAssign(_) => Self::ShrAssign,
            _ => return None,
        })
    }

    pub fn to_syn(self, span: Span) -> BinOp {
        match self {
            Self::Add => BinOp::Add(Token![+](span)),
            Self::Sub => BinOp::Sub(Token![-](span)),
            Self::Mul => BinOp::Mul(Token![*](span)),
            Self::Div => BinOp::Div(Token![/](span)),
            Self::Rem => BinOp::Rem(Token![%](span)),
            Self::And => BinOp::And(Token![&&](span)),
            Self::Or => BinOp::Or(Token![||](span)),
            Self::BitXor => BinOp::BitXor(Token![^](span)),
            Self::BitAnd => BinOp::BitAnd(Token![&](span)),
            Self::BitOr => BinOp::BitOr(Token![|](span)),
            Self::Shl => BinOp::Shl(Token![<<](span)),
            Self::Shr => BinOp::Shr(Token![>>](span)),
            Self::Eq => BinOp::Eq(Token![==](span)),
            Self::Lt => BinOp::Lt(Token![<](span)),
            Self::Le => BinOp::Le(Token![<=](span)),
            Self::Ne => BinOp::Ne(Token![!=](span)),
            Self::Ge => BinOp::Ge(Token![>=](span)),
            Self::Gt => BinOp::Gt(Token![>](span)),
            Self::AddAssign => BinOp::AddAssign(Token![+=](span)),
            Self::SubAssign => BinOp::SubAssign(Token![-=](span)),
            Self::MulAssign => BinOp::MulAssign(Token![*=](span)),
            Self::DivAssign => BinOp::DivAssign(Token![/=](span)),
            Self::RemAssign => BinOp::RemAssign(Token![%=](span)),
            Self::BitXorAssign => BinOp::BitXorAssign(Token![^=](span)),
            Self::BitAndAssign => BinOp::BitAndAssign(Token![&=](span)),
            Self::BitOrAssign => BinOp::BitOrAssign(Token![|=](span)),
            Self::ShlAssign => BinOp::ShlAssign(Token![<<=](span)),
            Self::ShrAssign => BinOp::ShrAssign(Token![>>=](span)),
        }
    }
}

/// Replaces one binary operator with others according to a rule table
///
/// Rules are tried in table order; every rule whose source matches yields one
/// candidate.
#[derive(Debug, Clone)]
pub struct BinaryOperatorReplacement {
    name: String,
    rules: Vec<(BinaryOp, BinaryOp)>,
}

impl BinaryOperatorReplacement {
    pub fn new(name: impl Into<String>, rules: Vec<(BinaryOp, BinaryOp)>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    pub fn multiplication_to_division() -> Self {
        use BinaryOp::*;
        Self::new("mul-to-div", vec![(Mul, Div), (MulAssign, DivAssign)])
    }

    pub fn arithmetic() -> Self {
        use BinaryOp::*;
        Self::new(
            "arithmetic",
            vec![
                (Add, Sub),
                (Sub, Add),
                (Mul, Div),
                (Div, Mul),
                (Rem, Mul),
                (AddAssign, SubAssign),
                (SubAssign, AddAssign),
                (MulAssign, DivAssign),
                (DivAssign, MulAssign),
                (RemAssign, MulAssign),
            ],
        )
    }

    pub fn relational_boundary() -> Self {
        use BinaryOp::*;
        Self::new(
            "relational-boundary",
            vec![(Lt, Le), (Le, Lt), (Gt, Ge), (Ge, Gt)],
        )
    }

    pub fn relational_negation() -> Self {
        use BinaryOp::*;
        Self::new(
            "relational-negation",
            vec![(Eq, Ne), (Ne, Eq), (Lt, Ge), (Le, Gt), (Gt, Le), (Ge, Lt)],
        )
    }

    pub fn logical() -> Self {
        use BinaryOp::*;
        Self::new("logical", vec![(And, Or), (Or, And)])
    }

    pub fn bitwise() -> Self {
        use BinaryOp::*;
        Self::new(
            "bitwise",
            vec![
                (BitAnd, BitOr),
                (BitOr, BitAnd),
                (BitXor, BitAnd),
                (Shl, Shr),
                (Shr, Shl),
                (BitAndAssign, BitOrAssign),
                (BitOrAssign, BitAndAssign),
                (BitXorAssign, BitAndAssign),
                (ShlAssign, ShrAssign),
                (ShrAssign, ShlAssign),
            ],
        )
    }
}

impl MutationOperator for BinaryOperatorReplacement {
    fn name(&self) -> &str {
        &self.name
    }

    fn mutate_bin_op<'a>(&'a self, op: &'a BinOp) -> Candidates<'a, BinOp> {
        let Some(kind) = BinaryOp::from_syn(op) else {
            return no_candidates();
        };
        let span = op.span();
        Box::new(
            self.rules
                .iter()
                .filter(move |(from, _)| *from == kind)
                .map(move |(_, to)| Ok(to.to_syn(span))),
        )
    }
}

/// `true` <-> `false`
#[derive(Debug, Clone, Copy)]
pub struct BooleanLiteralFlip;

impl MutationOperator for BooleanLiteralFlip {
    fn name(&self) -> &str {
        "boolean-literal"
    }

    fn mutate_lit<'a>(&'a self, lit: &'a Lit) -> Candidates<'a, Lit> {
        match lit {
            Lit::Bool(b) => Box::new(std::iter::once(Ok(Lit::Bool(syn::LitBool::new(
                !b.value, b.span,
            ))))),
            _ => no_candidates(),
        }
    }
}

/// `n` -> `0` and `n` -> `n + 1`, keeping the literal's suffix
#[derive(Debug, Clone, Copy)]
pub struct IntegerLiteralReplacement;

impl MutationOperator for IntegerLiteralReplacement {
    fn name(&self) -> &str {
        "integer-literal"
    }

    fn mutate_lit<'a>(&'a self, lit: &'a Lit) -> Candidates<'a, Lit> {
        let Lit::Int(int) = lit else {
            return no_candidates();
        };
        let value = match int.base10_parse::<u128>() {
            Ok(value) => value,
            Err(e) => {
                return Box::new(std::iter::once(Err(OperatorError::new(format!(
                    "cannot read integer literal '{}': {}",
                    int, e
                )))))
            }
        };

        let make = move |n: u128| {
            Lit::Int(syn::LitInt::new(&format!("{}{}", n, int.suffix()), int.span()))
        };
        let zero = (value != 0).then_some(0);
        let next = value.checked_add(1);
        Box::new(zero.into_iter().chain(next).map(move |n| Ok(make(n))))
    }
}

/// Rewrites strftime-style format strings
///
/// Yields, in order: day and month swapped, four-digit year shortened,
/// 24-hour clock turned into 12-hour. Only rewrites that change the string
/// are produced.
#[derive(Debug, Clone, Copy)]
pub struct DateFormatRewrite;

impl DateFormatRewrite {
    fn rewrites(format: &str) -> Vec<String> {
        let mut out = Vec::new();
        if format.contains("%m") && format.contains("%d") {
            out.push(swap_month_and_day(format));
        }
        if format.contains("%Y") {
            out.push(format.replace("%Y", "%y"));
        }
        if format.contains("%H") {
            out.push(format.replace("%H", "%I"));
        }
        out
    }
}

/// Exchange every `%m` with `%d` in one left-to-right pass
fn swap_month_and_day(format: &str) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        out.push(c);
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('m') => out.push('d'),
            Some('d') => out.push('m'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

impl MutationOperator for DateFormatRewrite {
    fn name(&self) -> &str {
        "date-format"
    }

    fn mutate_lit<'a>(&'a self, lit: &'a Lit) -> Candidates<'a, Lit> {
        let Lit::Str(s) = lit else {
            return no_candidates();
        };
        let span = s.span();
        Box::new(
            Self::rewrites(&s.value())
                .into_iter()
                .map(move |f| Ok(Lit::Str(syn::LitStr::new(&f, span)))),
        )
    }
}

/// `if c { .. }` -> `if !(c) { .. }`
///
/// Conditions containing `let` are left alone since `!(let ..)` is not valid.
#[derive(Debug, Clone, Copy)]
pub struct NegateCondition;

impl MutationOperator for NegateCondition {
    fn name(&self) -> &str {
        "negate-condition"
    }

    fn mutate_expr<'a>(&'a self, expr: &'a Expr) -> Candidates<'a, Expr> {
        let Expr::If(if_expr) = expr else {
            return no_candidates();
        };
        if contains_let(&if_expr.cond) {
            return no_candidates();
        }

        let cond = &if_expr.cond;
        let mut negated = if_expr.clone();
        *negated.cond = syn::parse_quote_spanned!(cond.span()=> !(#cond));
        Box::new(std::iter::once(Ok(Expr::If(negated))))
    }
}

fn contains_let(expr: &Expr) -> bool {
    struct LetFinder(bool);

    impl<'ast> Visit<'ast> for LetFinder {
        fn visit_expr_let(&mut self, _: &'ast syn::ExprLet) {
            self.0 = true;
        }
    }

    let mut finder = LetFinder(false);
    finder.visit_expr(expr);
    finder.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;

    fn parse_expr(s: &str) -> Expr {
        syn::parse_str(s).unwrap()
    }

    fn bin_op(s: &str) -> BinOp {
        match parse_expr(s) {
            Expr::Binary(binary) => binary.op,
            other => panic!("expected a binary expression, got {:?}", other),
        }
    }

    fn lit(s: &str) -> Lit {
        match parse_expr(s) {
            Expr::Lit(expr) => expr.lit,
            other => panic!("expected a literal, got {:?}", other),
        }
    }

    fn render<T: ToTokens>(candidates: Candidates<'_, T>) -> Vec<String> {
        candidates
            .map(|c| c.unwrap().to_token_stream().to_string())
            .collect()
    }

    #[test]
    fn test_mul_to_div() {
        let op = BinaryOperatorReplacement::multiplication_to_division();
        assert_eq!(render(op.mutate_bin_op(&bin_op("a * b"))), vec!["/"]);
        assert_eq!(render(op.mutate_bin_op(&bin_op("a *= b"))), vec!["/="]);
    }

    #[test]
    fn test_non_matching_variant_yields_nothing() {
        let op = BinaryOperatorReplacement::multiplication_to_division();
        assert!(render(op.mutate_bin_op(&bin_op("a + b"))).is_empty());
        assert!(render(op.mutate_expr(&parse_expr("a * b"))).is_empty());
        assert!(render(op.mutate_lit(&lit("3"))).is_empty());

        assert!(render(BooleanLiteralFlip.mutate_lit(&lit("3"))).is_empty());
        assert!(render(IntegerLiteralReplacement.mutate_lit(&lit("true"))).is_empty());
        assert!(render(DateFormatRewrite.mutate_lit(&lit("\"plain\""))).is_empty());
        assert!(render(NegateCondition.mutate_expr(&parse_expr("a && b"))).is_empty());
    }

    #[test]
    fn test_relational_operators() {
        let boundary = BinaryOperatorReplacement::relational_boundary();
        assert_eq!(render(boundary.mutate_bin_op(&bin_op("age >= 18"))), vec![">"]);

        let negation = BinaryOperatorReplacement::relational_negation();
        assert_eq!(render(negation.mutate_bin_op(&bin_op("a == b"))), vec!["!="]);
        assert_eq!(render(negation.mutate_bin_op(&bin_op("a < b"))), vec![">="]);
    }

    #[test]
    fn test_logical_and_bitwise() {
        let logical = BinaryOperatorReplacement::logical();
        assert_eq!(render(logical.mutate_bin_op(&bin_op("a && b"))), vec!["||"]);

        let bitwise = BinaryOperatorReplacement::bitwise();
        assert_eq!(render(bitwise.mutate_bin_op(&bin_op("a << 2"))), vec![">>"]);
        assert_eq!(render(bitwise.mutate_bin_op(&bin_op("a ^= b"))), vec!["&="]);
    }

    #[test]
    fn test_replacement_keeps_span() {
        let file = syn::parse_file("fn f() -> i32 {\n    6 * 7\n}\n").unwrap();
        let syn::Item::Fn(func) = &file.items[0] else {
            panic!("expected a function");
        };
        let syn::Stmt::Expr(Expr::Binary(binary), None) = &func.block.stmts[0] else {
            panic!("expected a tail binary expression");
        };

        let op = BinaryOperatorReplacement::multiplication_to_division();
        let replacement = op.mutate_bin_op(&binary.op).next().unwrap().unwrap();
        assert_eq!(replacement.span().start(), binary.op.span().start());
    }

    #[test]
    fn test_boolean_flip() {
        assert_eq!(render(BooleanLiteralFlip.mutate_lit(&lit("true"))), vec!["false"]);
        assert_eq!(render(BooleanLiteralFlip.mutate_lit(&lit("false"))), vec!["true"]);
    }

    #[test]
    fn test_integer_literal() {
        let op = IntegerLiteralReplacement;
        assert_eq!(render(op.mutate_lit(&lit("30"))), vec!["0", "31"]);
        assert_eq!(render(op.mutate_lit(&lit("0"))), vec!["1"]);
        assert_eq!(render(op.mutate_lit(&lit("7u8"))), vec!["0u8", "8u8"]);
    }

    #[test]
    fn test_integer_literal_overflow_is_an_error() {
        let too_big = lit("1000000000000000000000000000000000000000000");
        let mut candidates = IntegerLiteralReplacement.mutate_lit(&too_big);
        assert!(candidates.next().unwrap().is_err());
        assert!(candidates.next().is_none());
    }

    #[test]
    fn test_date_format() {
        let rewritten = render(DateFormatRewrite.mutate_lit(&lit("\"%Y-%m-%d %H:%M\"")));
        assert_eq!(
            rewritten,
            vec![
                "\"%Y-%d-%m %H:%M\"",
                "\"%y-%m-%d %H:%M\"",
                "\"%Y-%m-%d %I:%M\"",
            ]
        );
    }

    #[test]
    fn test_month_day_swap_leaves_other_text_alone() {
        assert_eq!(swap_month_and_day("a\u{0}%m-%d"), "a\u{0}%d-%m");
        assert_eq!(swap_month_and_day("%%m %m/%d/%d"), "%%m %d/%m/%m");
        assert_eq!(swap_month_and_day("100%"), "100%");
    }

    #[test]
    fn test_negate_condition() {
        let expr = parse_expr("if a > b { 1 } else { 2 }");
        let out = render(NegateCondition.mutate_expr(&expr));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], parse_expr("if !(a > b) { 1 } else { 2 }").to_token_stream().to_string());

        let if_let = parse_expr("if let Some(x) = y { x } else { 0 }");
        assert!(render(NegateCondition.mutate_expr(&if_let)).is_empty());
    }

    #[test]
    fn test_candidates_restart_per_call() {
        let op = BinaryOperatorReplacement::arithmetic();
        let node = bin_op("a + b");
        assert_eq!(render(op.mutate_bin_op(&node)), render(op.mutate_bin_op(&node)));
    }

    #[test]
    fn test_every_builtin_resolves() {
        for name in BUILTIN {
            let op = by_name(name).unwrap();
            assert_eq!(op.name(), *name);
        }
        assert!(by_name("unknown").is_none());
    }
}
