//! Static screening of expression text.
//!
//! These checks run on the normalized text before it is tokenized. Positions
//! are character offsets into the normalized expression.

use crate::environment::Bindings;
use crate::error::EvaluationError;

/// Operator and grouping symbols accepted by the evaluator.
pub const OPERATOR_SYMBOLS: &str = "()*/+-.<>=%";

pub(crate) fn is_operator_symbol(c: char) -> bool {
    OPERATOR_SYMBOLS.contains(c)
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strip whitespace and line breaks. The grammar has no whitespace-significant
/// tokens, so this never changes the meaning of an accepted expression.
pub fn normalize(source: &str) -> String {
    source
        .chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r' | '\t'))
        .collect()
}

/// Run the character, call and attribute checks in that order.
pub(crate) fn screen(normalized: &str) -> Result<(), EvaluationError> {
    check_characters(normalized)?;
    check_calls(normalized)?;
    check_attribute_access(normalized)
}

/// Every character must be an ASCII letter, digit, underscore or operator symbol.
pub(crate) fn check_characters(normalized: &str) -> Result<(), EvaluationError> {
    match normalized
        .chars()
        .enumerate()
        .find(|(_, c)| !is_identifier_char(*c) && !is_operator_symbol(*c))
    {
        Some((position, character)) => Err(EvaluationError::ForbiddenCharacter {
            character,
            position,
        }),
        None => Ok(()),
    }
}

/// An opening parenthesis must start the expression or follow an operator
/// symbol, which rules out `name(...)` and `(...)(...)`.
pub(crate) fn check_calls(normalized: &str) -> Result<(), EvaluationError> {
    let chars: Vec<char> = normalized.chars().collect();
    for (position, c) in chars.iter().enumerate() {
        if *c != '(' || position == 0 {
            continue;
        }
        let preceding = chars[position - 1];
        if !is_operator_symbol(preceding) || preceding == ')' {
            return Err(EvaluationError::ForbiddenCall { position });
        }
    }
    Ok(())
}

/// A dot is only a decimal point: digits on both sides.
pub(crate) fn check_attribute_access(normalized: &str) -> Result<(), EvaluationError> {
    let chars: Vec<char> = normalized.chars().collect();
    for (position, c) in chars.iter().enumerate() {
        if *c != '.' {
            continue;
        }
        let before = position
            .checked_sub(1)
            .and_then(|i| chars.get(i))
            .is_some_and(|c| c.is_ascii_digit());
        let after = chars.get(position + 1).is_some_and(|c| c.is_ascii_digit());
        if !before || !after {
            return Err(EvaluationError::ForbiddenAttributeAccess { position });
        }
    }
    Ok(())
}

/// Identifiers in order of appearance: maximal runs of letters, digits and
/// underscores that do not start with a digit.
pub(crate) fn identifiers(normalized: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in normalized.char_indices() {
        match (start, is_identifier_char(c)) {
            (None, true) => start = Some(i),
            (Some(s), false) => {
                push_identifier(&mut found, &normalized[s..i]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        push_identifier(&mut found, &normalized[s..]);
    }
    found
}

fn push_identifier<'a>(found: &mut Vec<&'a str>, run: &'a str) {
    if run.starts_with(|c: char| !c.is_ascii_digit()) {
        found.push(run);
    }
}

/// Every identifier must be bound; the first unknown one is reported.
pub(crate) fn check_identifiers<B: Bindings + ?Sized>(
    names: impl IntoIterator<Item = impl AsRef<str>>,
    bindings: &B,
) -> Result<(), EvaluationError> {
    for name in names {
        let name = name.as_ref();
        if !bindings.is_bound(name) {
            return Err(EvaluationError::UnknownIdentifier(name.to_string()));
        }
    }
    Ok(())
}
