//! Whitelist-based JQL validation
//!
//! The upstream accepts raw JQL; without this gate user input could select
//! arbitrary fields or construct pathological queries. Validation is a
//! tokenizer plus a recursive-descent parser whose productions are exactly
//! the allowed grammar, which is strictly stronger than pattern blocklists.

pub mod lexer;
pub mod parser;

use crate::errors::XrayError;
use crate::jql::lexer::{tokenize, Token};
use crate::jql::parser::Parser;

/// Inputs longer than this are rejected before tokenization.
pub const MAX_JQL_LENGTH: usize = 4096;

/// Fields a query may filter or sort on. Matched case-insensitively.
pub const ALLOWED_FIELDS: &[&str] = &[
    "project",
    "issueType",
    "status",
    "summary",
    "description",
    "assignee",
    "reporter",
    "created",
    "updated",
    "resolved",
    "resolution",
    "priority",
    "labels",
    "fixVersion",
    "affectedVersion",
    "component",
    "key",
    "id",
    "text",
];

/// Functions allowed in value position. Matched case-insensitively.
pub const ALLOWED_FUNCTIONS: &[&str] = &[
    "currentUser",
    "now",
    "startOfDay",
    "endOfDay",
    "startOfWeek",
    "endOfWeek",
    "startOfMonth",
    "endOfMonth",
    "startOfYear",
    "endOfYear",
];

pub fn is_allowed_field(name: &str) -> bool {
    ALLOWED_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_allowed_function(name: &str) -> bool {
    ALLOWED_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Validate a JQL expression and return its normalized form.
///
/// Normalization collapses whitespace and re-quotes string literals with
/// double quotes; semantics are untouched. An accepted query re-validates
/// to itself.
pub fn validate_jql(jql: &str) -> Result<String, XrayError> {
    if jql.len() > MAX_JQL_LENGTH {
        return Err(XrayError::Validation(format!(
            "JQL exceeds maximum length of {MAX_JQL_LENGTH} characters"
        )));
    }
    if jql.trim().is_empty() {
        return Err(XrayError::Validation("JQL query cannot be empty".to_string()));
    }

    let tokens = tokenize(jql)?;
    Parser::new(&tokens).parse_query()?;

    Ok(normalize(&tokens))
}

/// Re-emit tokens with canonical spacing.
fn normalize(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && needs_space(&tokens[i - 1], token) {
            out.push(' ');
        }
        out.push_str(&token.render());
    }
    out
}

fn needs_space(prev: &Token, current: &Token) -> bool {
    match current {
        Token::RParen | Token::Comma => false,
        Token::LParen => {
            // Function calls bind tightly; grouping parens do not.
            !matches!(prev, Token::Ident(name) if is_allowed_function(name))
                && !matches!(prev, Token::LParen)
        }
        _ => !matches!(prev, Token::LParen),
    }
}
