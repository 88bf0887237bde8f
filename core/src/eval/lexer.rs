use crate::error::EvaluationError;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Split screened text into tokens. Input is ASCII only by the time it gets here.
pub(crate) fn tokenize(normalized: &str) -> Result<Vec<Token>, EvaluationError> {
    let bytes = normalized.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i] as char;
        let kind = match c {
            '0'..='9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len() && bytes[i] == b'.' {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                if i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
                    return Err(EvaluationError::Syntax {
                        position: i,
                        message: "identifier cannot follow a number".into(),
                    });
                }
                let literal = &normalized[start..i];
                let value = Decimal::from_str(literal)
                    .map_err(|_| EvaluationError::NumberOutOfRange(literal.to_string()))?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(normalized[start..i].to_string()),
                    position: start,
                });
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '<' | '>' | '=' => {
                let followed_by_eq = bytes.get(i + 1) == Some(&b'=');
                let kind = match (c, followed_by_eq) {
                    ('<', true) => TokenKind::Le,
                    ('<', false) => TokenKind::Lt,
                    ('>', true) => TokenKind::Ge,
                    ('>', false) => TokenKind::Gt,
                    ('=', true) => TokenKind::EqEq,
                    _ => {
                        return Err(EvaluationError::Syntax {
                            position: start,
                            message: "assignment is not an expression; use `==`".into(),
                        });
                    }
                };
                if followed_by_eq {
                    i += 1;
                }
                kind
            }
            other => {
                return Err(EvaluationError::Syntax {
                    position: start,
                    message: format!("unexpected {other:?}"),
                });
            }
        };
        i += 1;
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("a<=10"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Le,
                TokenKind::Number(Decimal::from(10)),
            ]
        );
    }

    #[test]
    fn test_decimal_literal() {
        assert_eq!(kinds("2.50"), vec![TokenKind::Number(Decimal::new(250, 2))]);
    }

    #[test]
    fn test_lone_equals_is_rejected() {
        assert!(matches!(
            tokenize("x=1"),
            Err(EvaluationError::Syntax { position: 1, .. })
        ));
    }

    #[test]
    fn test_number_followed_by_identifier() {
        assert!(matches!(
            tokenize("2x"),
            Err(EvaluationError::Syntax { position: 1, .. })
        ));
    }

    #[test]
    fn test_huge_literal_out_of_range() {
        let src = "9".repeat(40);
        assert_eq!(
            tokenize(&src),
            Err(EvaluationError::NumberOutOfRange(src.clone()))
        );
    }
}
