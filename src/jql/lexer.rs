//! JQL tokenizer
//!
//! Produces the token alphabet the parser consumes. Any character outside
//! that alphabet is rejected here, before grammar rules are considered.

use crate::errors::XrayError;

/// A single JQL token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `[A-Za-z_][A-Za-z0-9_]*`: fields, keywords, functions, bare values
    Ident(String),
    /// Quoted string, stored unescaped
    Str(String),
    /// Unsigned integer literal
    Number(String),
    /// Relative duration like `-30d` or `+2w`, stored as written
    Duration(String),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Tilde,
    NotTilde,
    LParen,
    RParen,
    Comma,
}

impl Token {
    /// Canonical text used for normalization and error messages.
    pub fn render(&self) -> String {
        match self {
            Token::Ident(s) => s.clone(),
            Token::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
                out
            }
            Token::Number(s) => s.clone(),
            Token::Duration(s) => s.clone(),
            Token::Eq => "=".to_string(),
            Token::Ne => "!=".to_string(),
            Token::Lt => "<".to_string(),
            Token::Le => "<=".to_string(),
            Token::Gt => ">".to_string(),
            Token::Ge => ">=".to_string(),
            Token::Tilde => "~".to_string(),
            Token::NotTilde => "!~".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

const DURATION_SUFFIXES: &[char] = &['d', 'w', 'm', 'y', 'h'];

fn is_duration_suffix(c: char) -> bool {
    DURATION_SUFFIXES.contains(&c.to_ascii_lowercase())
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, XrayError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '~' => {
                chars.next();
                tokens.push(Token::Tilde);
            }
            '!' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Ne);
                    }
                    Some('~') => {
                        chars.next();
                        tokens.push(Token::NotTilde);
                    }
                    _ => {
                        return Err(XrayError::Validation(
                            "Unexpected character '!' in JQL".to_string(),
                        ))
                    }
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Le);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Ge);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '"' | '\'' => {
                tokens.push(lex_string(&mut chars)?);
            }
            '+' | '-' => {
                chars.next();
                tokens.push(lex_duration(c, &mut chars)?);
            }
            c if c.is_ascii_digit() => {
                tokens.push(lex_number(&mut chars)?);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                tokens.push(lex_ident(&mut chars));
            }
            other => {
                return Err(XrayError::Validation(format!(
                    "Unexpected character '{other}' in JQL"
                )))
            }
        }
    }

    Ok(tokens)
}

fn lex_string(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<Token, XrayError> {
    let quote = chars.next().unwrap();
    let mut value = String::new();

    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => {
                    return Err(XrayError::Validation(
                        "Unterminated string literal in JQL".to_string(),
                    ))
                }
            },
            Some(c) if c == quote => return Ok(Token::Str(value)),
            Some(c) => value.push(c),
            None => {
                return Err(XrayError::Validation(
                    "Unterminated string literal in JQL".to_string(),
                ))
            }
        }
    }
}

fn lex_duration(
    sign: char,
    chars: &mut std::iter::Peekable<std::str::Chars>,
) -> Result<Token, XrayError> {
    let mut text = String::new();
    text.push(sign);

    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if text.len() == 1 {
        return Err(XrayError::Validation(format!(
            "Expected digits after '{sign}' in JQL"
        )));
    }

    match chars.peek() {
        Some(&c) if is_duration_suffix(c) => {
            text.push(c);
            chars.next();
        }
        _ => {
            return Err(XrayError::Validation(format!(
                "Signed value '{text}' is missing a duration suffix (d, w, m, y, h)"
            )))
        }
    }

    // A trailing word character would make this an identifier-like blob.
    if let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            return Err(XrayError::Validation(format!(
                "Invalid duration literal starting with '{text}'"
            )));
        }
    }

    Ok(Token::Duration(text))
}

fn lex_number(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<Token, XrayError> {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }

    // Bare `30d` is a duration; `30dx` is noise.
    if let Some(&c) = chars.peek() {
        if is_duration_suffix(c) {
            let mut with_suffix = text.clone();
            with_suffix.push(c);
            chars.next();
            if let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    return Err(XrayError::Validation(format!(
                        "Invalid numeric literal starting with '{with_suffix}'"
                    )));
                }
            }
            return Ok(Token::Duration(with_suffix));
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return Err(XrayError::Validation(format!(
                "Invalid numeric literal starting with '{text}{c}'"
            )));
        }
    }

    Ok(Token::Number(text))
}

fn lex_ident(chars: &mut std::iter::Peekable<std::str::Chars>) -> Token {
    let mut text = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    Token::Ident(text)
}
