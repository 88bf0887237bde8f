//! Sandboxed Expression Evaluator
//!
//! Evaluates single-line arithmetic and comparison expressions against a
//! fixed set of permitted names. Expressions cannot call functions, access
//! attributes or reference anything outside the supplied [`Bindings`].
//!
//! # Pipeline
//! 1. Normalize: strip whitespace and line breaks.
//! 2. Screen: forbidden characters, then call syntax, then attribute access.
//! 3. Identifier whitelist: every name must be bound.
//! 4. Parse with a recursive-descent parser over a closed grammar.
//! 5. Interpret the tree with the bindings as the only scope.
//!
//! The screen is kept in front of the parser so the four rejection classes
//! are reported the same way regardless of how the grammar evolves.

mod ast;
mod lexer;
mod parser;
mod screen;

pub use ast::{BinaryOp, CompareOp, Expr, UnaryOp};
pub use parser::{MAX_CHAIN_LENGTH, MAX_DEPTH};
pub use screen::{OPERATOR_SYMBOLS, normalize};

use crate::environment::Bindings;
use crate::error::EvaluationError;
use crate::value::Value;
use lexer::TokenKind;

/// Evaluate `expression` with `bindings` as the only name scope.
///
/// # Example
/// ```rust
/// use blockflow_core::eval::evaluate;
/// use blockflow_core::Value;
/// use std::collections::BTreeMap;
///
/// let bindings = BTreeMap::from([("a".to_string(), Value::from(2))]);
/// assert_eq!(evaluate("2+3*4", &bindings).unwrap(), Value::from(14));
/// assert_eq!(evaluate("5>a", &bindings).unwrap(), Value::Bool(true));
/// ```
pub fn evaluate<B: Bindings + ?Sized>(
    expression: &str,
    bindings: &B,
) -> Result<Value, EvaluationError> {
    let normalized = normalize(expression);
    screen::screen(&normalized)?;
    screen::check_identifiers(screen::identifiers(&normalized), bindings)?;
    let tree = parse_screened(&normalized)?.0;
    tree.eval(bindings)
}

/// A screened and parsed expression, ready to be evaluated many times.
///
/// Compiling performs every check that does not depend on the bindings.
/// The identifier whitelist is checked on each evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    tree: Expr,
    identifiers: Vec<String>,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self, EvaluationError> {
        let normalized = normalize(source);
        screen::screen(&normalized)?;
        let (tree, identifiers) = parse_screened(&normalized)?;
        Ok(Self {
            source: source.to_string(),
            tree,
            identifiers,
        })
    }

    /// The expression text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Names referenced by the expression, in order of first appearance.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn evaluate<B: Bindings + ?Sized>(&self, bindings: &B) -> Result<Value, EvaluationError> {
        screen::check_identifiers(&self.identifiers, bindings)?;
        self.tree.eval(bindings)
    }
}

fn parse_screened(normalized: &str) -> Result<(Expr, Vec<String>), EvaluationError> {
    let tokens = lexer::tokenize(normalized)?;
    let mut identifiers: Vec<String> = Vec::new();
    for token in &tokens {
        if let TokenKind::Ident(name) = &token.kind {
            if !identifiers.contains(name) {
                identifiers.push(name.clone());
            }
        }
    }
    let tree = parser::parse(&tokens, normalized.len())?;
    Ok((tree, identifiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::{BTreeMap, HashMap};
    use std::str::FromStr;

    fn empty() -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(evaluate("2+3*4", &empty()).unwrap(), Value::from(14));
        assert_eq!(evaluate("(2+3)*4", &empty()).unwrap(), Value::from(20));
        assert_eq!(evaluate("10-4-3", &empty()).unwrap(), Value::from(3));
        assert_eq!(evaluate("-2*-3", &empty()).unwrap(), Value::from(6));
    }

    #[test]
    fn test_comparison_with_binding() {
        let bindings = HashMap::from([("a".to_string(), Value::from(2))]);
        assert_eq!(evaluate("5>a", &bindings).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("5 < a", &bindings).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("1<a<=2", &bindings).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("a==2.0", &bindings).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_decimal_arithmetic_is_exact() {
        assert_eq!(evaluate("0.1+0.2", &empty()).unwrap(), dec("0.3"));
        assert_eq!(evaluate("7/2", &empty()).unwrap(), dec("3.5"));
        assert_eq!(evaluate("-7%3", &empty()).unwrap(), Value::from(2));
    }

    #[test]
    fn test_bools_act_as_numbers_in_arithmetic() {
        let bindings = BTreeMap::from([("t".to_string(), Value::Bool(true))]);
        assert_eq!(evaluate("t+1", &bindings).unwrap(), Value::from(2));
        assert_eq!(evaluate("t==1", &bindings).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_long_operator_chains() {
        let sum = vec!["1"; 100_000].join("+");
        assert_eq!(evaluate(&sum, &empty()).unwrap(), Value::from(100_000));

        let bindings = BTreeMap::from([("x".to_string(), Value::from(1))]);
        let product = vec!["x"; 200_000].join("*");
        assert_eq!(evaluate(&product, &bindings).unwrap(), Value::from(1));

        let mixed = format!("{}-3", vec!["2*1"; 100_000].join("+"));
        assert_eq!(evaluate(&mixed, &empty()).unwrap(), Value::from(199_997));
    }

    #[test]
    fn test_whitespace_and_newlines_ignored() {
        assert_eq!(evaluate(" 1 +\n 1 ", &empty()).unwrap(), Value::from(2));
    }

    #[test]
    fn test_rejection_order() {
        // a forbidden character wins over a call
        assert!(matches!(
            evaluate("f('x')", &empty()),
            Err(EvaluationError::ForbiddenCharacter { character: '\'', .. })
        ));
        // a call wins over attribute access and unknown names
        assert!(matches!(
            evaluate("a.b(1)", &empty()),
            Err(EvaluationError::ForbiddenCall { .. })
        ));
        assert!(matches!(
            evaluate("a.b", &empty()),
            Err(EvaluationError::ForbiddenAttributeAccess { position: 1 })
        ));
        // unknown names are reported before syntax errors
        assert_eq!(
            evaluate("x+", &empty()),
            Err(EvaluationError::UnknownIdentifier("x".into()))
        );
    }

    #[test]
    fn test_dunder_access_is_rejected() {
        let bindings = BTreeMap::from([("x".to_string(), Value::from(1))]);
        assert!(matches!(
            evaluate("x.__class__", &bindings),
            Err(EvaluationError::ForbiddenAttributeAccess { .. })
        ));
        assert!(matches!(
            evaluate("__import__(1)", &bindings),
            Err(EvaluationError::ForbiddenCall { .. })
        ));
        assert_eq!(
            evaluate("__builtins__", &bindings),
            Err(EvaluationError::UnknownIdentifier("__builtins__".into()))
        );
    }

    #[test]
    fn test_runtime_failures() {
        assert_eq!(evaluate("1/0", &empty()), Err(EvaluationError::DivisionByZero));
        assert_eq!(evaluate("1/(2-2)", &empty()), Err(EvaluationError::DivisionByZero));
        assert_eq!(evaluate("", &empty()), Err(EvaluationError::Empty));
        assert_eq!(evaluate("  \n", &empty()), Err(EvaluationError::Empty));
    }

    #[test]
    fn test_compiled_expression_reuses_tree() {
        let expr = Expression::compile("x * 2 + x").unwrap();
        assert_eq!(expr.identifiers(), ["x".to_string()]);
        assert_eq!(expr.source(), "x * 2 + x");

        let one = BTreeMap::from([("x".to_string(), Value::from(1))]);
        let five = BTreeMap::from([("x".to_string(), Value::from(5))]);
        assert_eq!(expr.evaluate(&one).unwrap(), Value::from(3));
        assert_eq!(expr.evaluate(&five).unwrap(), Value::from(15));
        assert_eq!(
            expr.evaluate(&empty()),
            Err(EvaluationError::UnknownIdentifier("x".into()))
        );
    }

    #[test]
    fn test_compile_rejects_without_bindings() {
        assert!(matches!(
            Expression::compile("len(x)"),
            Err(EvaluationError::ForbiddenCall { .. })
        ));
        assert!(matches!(
            Expression::compile("x="),
            Err(EvaluationError::Syntax { .. })
        ));
        assert!(Expression::compile("unknown_name + 1").is_ok());
    }
}
