//! Recursive-descent JQL parser
//!
//! The grammar productions are exactly the whitelist: a query that parses
//! is a query that is allowed. There is no post-hoc pattern scrubbing.

use crate::errors::XrayError;
use crate::jql::lexer::Token;
use crate::jql::{is_allowed_field, is_allowed_function};

/// Identifiers with grammatical meaning; rejected as bare values.
const RESERVED: &[&str] = &[
    "and", "or", "not", "in", "is", "was", "changed", "order", "by", "asc", "desc", "empty",
    "null",
];

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// query := or_expr order_by? EOF
    pub fn parse_query(&mut self) -> Result<(), XrayError> {
        self.parse_or()?;
        if self.peek_keyword("order") {
            self.parse_order_by()?;
        }
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(XrayError::Validation(format!(
                "Unexpected trailing token: {}",
                tok.render()
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<(), XrayError> {
        self.parse_and()?;
        while self.eat_keyword("or") {
            self.parse_and()?;
        }
        Ok(())
    }

    fn parse_and(&mut self) -> Result<(), XrayError> {
        self.parse_unary()?;
        while self.eat_keyword("and") {
            self.parse_unary()?;
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> Result<(), XrayError> {
        if self.eat_keyword("not") {
            return self.parse_unary();
        }
        if self.eat(&Token::LParen) {
            self.parse_or()?;
            return self.expect(&Token::RParen);
        }
        self.parse_clause()
    }

    /// clause := field predicate
    fn parse_clause(&mut self) -> Result<(), XrayError> {
        let field = match self.next() {
            Some(Token::Ident(name)) => name,
            Some(tok) => {
                return Err(XrayError::Validation(format!(
                    "Expected a field name, found {}",
                    tok.render()
                )))
            }
            None => {
                return Err(XrayError::Validation(
                    "Expected a field name, found end of input".to_string(),
                ))
            }
        };

        if !is_allowed_field(&field) {
            return Err(XrayError::Validation(format!(
                "Unknown or disallowed field: {field}"
            )));
        }

        self.parse_predicate(&field)
    }

    fn parse_predicate(&mut self, field: &str) -> Result<(), XrayError> {
        if self.eat_comparison() {
            return self.parse_value();
        }
        if self.eat_keyword("in") {
            return self.parse_value_list();
        }
        if self.peek_keyword("not") && self.peek_keyword_at(1, "in") {
            self.pos += 2;
            return self.parse_value_list();
        }
        if self.eat_keyword("is") {
            self.eat_keyword("not");
            if self.eat_keyword("empty") || self.eat_keyword("null") {
                return Ok(());
            }
            return Err(self.expected("'empty' or 'null' after 'is'"));
        }
        if self.eat_keyword("was") {
            self.eat_keyword("not");
            if self.eat_keyword("empty") || self.eat_keyword("null") {
                return Ok(());
            }
            return self.parse_value();
        }
        if self.eat_keyword("changed") {
            return Ok(());
        }

        Err(match self.peek() {
            Some(tok) => XrayError::Validation(format!(
                "Expected an operator after field '{field}', found {}",
                tok.render()
            )),
            None => XrayError::Validation(format!(
                "Expected an operator after field '{field}', found end of input"
            )),
        })
    }

    /// value_list := '(' value (',' value)* ')'
    fn parse_value_list(&mut self) -> Result<(), XrayError> {
        self.expect(&Token::LParen)?;
        self.parse_value()?;
        while self.eat(&Token::Comma) {
            self.parse_value()?;
        }
        self.expect(&Token::RParen)
    }

    fn parse_value(&mut self) -> Result<(), XrayError> {
        match self.next() {
            Some(Token::Str(_)) | Some(Token::Number(_)) | Some(Token::Duration(_)) => Ok(()),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    if !is_allowed_function(&name) {
                        return Err(XrayError::Validation(format!(
                            "Unknown or disallowed function: {name}"
                        )));
                    }
                    self.pos += 1;
                    // Date helpers take at most one literal argument.
                    match self.peek() {
                        Some(Token::Str(_)) | Some(Token::Number(_)) | Some(Token::Duration(_)) => {
                            self.pos += 1;
                        }
                        _ => {}
                    }
                    return self.expect(&Token::RParen);
                }
                if RESERVED.iter().any(|kw| name.eq_ignore_ascii_case(kw)) {
                    return Err(XrayError::Validation(format!(
                        "Unexpected keyword in value position: {name}"
                    )));
                }
                Ok(())
            }
            Some(tok) => Err(XrayError::Validation(format!(
                "Expected a value, found {}",
                tok.render()
            ))),
            None => Err(XrayError::Validation(
                "Expected a value, found end of input".to_string(),
            )),
        }
    }

    /// order_by := 'order' 'by' field (asc|desc)? (',' field (asc|desc)?)*
    fn parse_order_by(&mut self) -> Result<(), XrayError> {
        self.eat_keyword("order");
        if !self.eat_keyword("by") {
            return Err(self.expected("'by' after 'order'"));
        }
        loop {
            match self.next() {
                Some(Token::Ident(name)) => {
                    if !is_allowed_field(&name) {
                        return Err(XrayError::Validation(format!(
                            "Unknown or disallowed field: {name}"
                        )));
                    }
                }
                Some(tok) => {
                    return Err(XrayError::Validation(format!(
                        "Expected a sort field, found {}",
                        tok.render()
                    )))
                }
                None => {
                    return Err(XrayError::Validation(
                        "Expected a sort field, found end of input".to_string(),
                    ))
                }
            }
            if !self.eat_keyword("asc") {
                self.eat_keyword("desc");
            }
            if !self.eat(&Token::Comma) {
                return Ok(());
            }
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), XrayError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.expected(&expected.render()))
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek_keyword_at(0, keyword)
    }

    fn peek_keyword_at(&self, offset: usize, keyword: &str) -> bool {
        matches!(
            self.tokens.get(self.pos + offset),
            Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword)
        )
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_comparison(&mut self) -> bool {
        match self.peek() {
            Some(
                Token::Eq
                | Token::Ne
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Tilde
                | Token::NotTilde,
            ) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expected(&self, what: &str) -> XrayError {
        match self.peek() {
            Some(tok) => {
                XrayError::Validation(format!("Expected {what}, found {}", tok.render()))
            }
            None => XrayError::Validation(format!("Expected {what}, found end of input")),
        }
    }
}
