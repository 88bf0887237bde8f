//! Recursive-descent parser over the evaluator grammar.
//!
//! ```text
//! comparison := additive (("<" | ">" | "<=" | ">=" | "==") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/" | "%") unary)*
//! unary      := ("+" | "-") unary | primary
//! primary    := NUMBER | IDENT | "(" comparison ")"
//! ```

use super::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use super::lexer::{Token, TokenKind};
use crate::error::EvaluationError;

/// Nesting limit for parentheses and unary operators.
///
/// Binary operator chains do not count towards it: `1+2+...+n` parses into
/// one flat [`Expr::Chain`] per precedence level, at most
/// [`MAX_CHAIN_LENGTH`] operands long.
pub const MAX_DEPTH: usize = 64;

/// Operand limit for one chain of same-precedence binary operators.
pub const MAX_CHAIN_LENGTH: usize = 1 << 20;

pub(crate) fn parse(tokens: &[Token], source_len: usize) -> Result<Expr, EvaluationError> {
    if tokens.is_empty() {
        return Err(EvaluationError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        source_len,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error_at(token.position, "unexpected trailing input")),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    source_len: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, position: usize, message: &str) -> EvaluationError {
        EvaluationError::Syntax {
            position,
            message: message.to_string(),
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error_at(position, "expression nests too deeply"));
        }
        Ok(())
    }

    fn comparison(&mut self) -> Result<Expr, EvaluationError> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(|t| compare_op(&t.kind)) {
            self.pos += 1;
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn additive(&mut self) -> Result<Expr, EvaluationError> {
        let first = self.term()?;
        let mut rest = Vec::new();
        loop {
            let Some(token) = self.peek() else { break };
            let op = match token.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.extend_chain(rest.len() + 1, token.position)?;
            self.pos += 1;
            rest.push((op, self.term()?));
        }
        Ok(chain(first, rest))
    }

    fn term(&mut self) -> Result<Expr, EvaluationError> {
        let first = self.unary()?;
        let mut rest = Vec::new();
        loop {
            let Some(token) = self.peek() else { break };
            let op = match token.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.extend_chain(rest.len() + 1, token.position)?;
            self.pos += 1;
            rest.push((op, self.unary()?));
        }
        Ok(chain(first, rest))
    }

    /// Fails when a chain of `operands` operands cannot take one more.
    fn extend_chain(&self, operands: usize, position: usize) -> Result<(), EvaluationError> {
        if operands >= MAX_CHAIN_LENGTH {
            return Err(self.error_at(position, "operator chain is too long"));
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        let op = match self.peek() {
            Some(Token {
                kind: TokenKind::Plus,
                ..
            }) => UnaryOp::Plus,
            Some(Token {
                kind: TokenKind::Minus,
                ..
            }) => UnaryOp::Minus,
            _ => return self.primary(),
        };
        let position = self.tokens[self.pos].position;
        self.pos += 1;
        self.enter(position)?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        let Some(token) = self.advance() else {
            return Err(self.error_at(self.source_len, "unexpected end of expression"));
        };
        match &token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(*n)),
            TokenKind::Ident(name) => Ok(Expr::Ident(name.clone())),
            TokenKind::LParen => {
                self.enter(token.position)?;
                let inner = self.comparison()?;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => {}
                    Some(other) => return Err(self.error_at(other.position, "expected `)`")),
                    None => return Err(self.error_at(self.source_len, "unclosed `(`")),
                }
                self.depth -= 1;
                Ok(inner)
            }
            _ => Err(self.error_at(token.position, "expected a number, name or `(`")),
        }
    }
}

fn chain(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    if rest.is_empty() {
        first
    } else {
        Expr::Chain {
            first: Box::new(first),
            rest,
        }
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Le => Some(CompareOp::Le),
        TokenKind::Ge => Some(CompareOp::Ge),
        TokenKind::EqEq => Some(CompareOp::Eq),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::lexer::tokenize;
    use rust_decimal::Decimal;

    fn parse_str(src: &str) -> Result<Expr, EvaluationError> {
        parse(&tokenize(src)?, src.len())
    }

    #[test]
    fn test_precedence() {
        let n = |v: i64| Expr::Number(Decimal::from(v));
        let expr = parse_str("1+2*3").unwrap();
        assert_eq!(
            expr,
            Expr::Chain {
                first: Box::new(n(1)),
                rest: vec![(
                    BinaryOp::Add,
                    Expr::Chain {
                        first: Box::new(n(2)),
                        rest: vec![(BinaryOp::Mul, n(3))],
                    }
                )],
            }
        );
    }

    #[test]
    fn test_same_precedence_operators_share_one_chain() {
        let Expr::Chain { first, rest } = parse_str("8-4+2-1").unwrap() else {
            panic!("expected operator chain");
        };
        assert_eq!(*first, Expr::Number(Decimal::from(8)));
        let ops: Vec<BinaryOp> = rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, [BinaryOp::Sub, BinaryOp::Add, BinaryOp::Sub]);
    }

    #[test]
    fn test_long_chain_stays_flat() {
        let src = vec!["2"; 100_000].join("*");
        let Expr::Chain { first, rest } = parse_str(&src).unwrap() else {
            panic!("expected operator chain");
        };
        assert_eq!(*first, Expr::Number(Decimal::from(2)));
        assert_eq!(rest.len(), 99_999);
        assert!(rest.iter().all(|(_, e)| matches!(e, Expr::Number(_))));
    }

    #[test]
    fn test_chain_length_limit() {
        let over = vec!["1"; MAX_CHAIN_LENGTH + 1].join("+");
        let err = parse_str(&over).unwrap_err();
        assert!(
            matches!(&err, EvaluationError::Syntax { message, .. } if message.contains("too long")),
            "{err:?}"
        );
    }

    #[test]
    fn test_chained_comparison_shape() {
        let Expr::Compare { rest, .. } = parse_str("1<x<=3").unwrap() else {
            panic!("expected comparison");
        };
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[1].0, CompareOp::Le);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_str(""), Err(EvaluationError::Empty));
        for src in ["1+", "(1", "1)", "*2", "()", "(1)2"] {
            assert!(
                matches!(parse_str(src), Err(EvaluationError::Syntax { .. })),
                "{src} should not parse"
            );
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse_str(&deep),
            Err(EvaluationError::Syntax { .. })
        ));
        let shallow = format!("{}1{}", "(".repeat(8), ")".repeat(8));
        assert_eq!(parse_str(&shallow).unwrap(), Expr::Number(Decimal::ONE));
    }
}
