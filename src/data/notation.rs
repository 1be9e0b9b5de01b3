// Reference rust implementation of the Bali virtual machine (BVM).
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2021-2025 UBIDECO Labs,
//     Laboratories for Distributed and Cognitive Computing, Switzerland.
//     All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parser for the document source notation.
//!
//! The notation is the persistence format of the platform: task contexts, procedure contexts and
//! type documents round-trip through it. The grammar is a strict subset of the full component
//! notation: exactly the constructs [`Value`](super::Value) can render.

use core::str::FromStr;

use amplify::hex::{self, FromHex};

use super::{Citation, CitationError, Symbol, SymbolError, Tag, Value};

/// Errors parsing document source notation.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum NotationError {
    /// unexpected end of document source
    UnexpectedEnd,

    /// unexpected character '{0}' at byte {1} of the document source
    UnexpectedChar(char, usize),

    /// invalid number literal "{0}"
    InvalidNumber(String),

    /// invalid symbol literal: {0}
    #[from]
    InvalidSymbol(SymbolError),

    /// invalid tag literal: {0}
    #[from]
    InvalidTag(hex::Error),

    /// invalid binary literal: {0}
    InvalidBinary(hex::Error),

    /// invalid citation literal: {0}
    #[from]
    InvalidCitation(CitationError),

    /// catalog keys must be symbols
    NonSymbolKey,

    /// unbalanced braces in a code literal
    UnbalancedCode,

    /// source continues after the end of the parsed document
    TrailingContent,
}

/// Parses a complete document, requiring the source to contain exactly one value.
pub(super) fn parse(input: &str) -> Result<Value, NotationError> {
    let mut parser = Parser { input, pos: 0 };
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.input.len() {
        return Err(NotationError::TrailingContent);
    }
    Ok(value)
}

struct Parser<'s> {
    input: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Result<char, NotationError> {
        self.input[self.pos..]
            .chars()
            .next()
            .ok_or(NotationError::UnexpectedEnd)
    }

    fn bump(&mut self) -> Result<char, NotationError> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect(&mut self, expected: char) -> Result<(), NotationError> {
        let ch = self.bump()?;
        if ch != expected {
            return Err(NotationError::UnexpectedChar(ch, self.pos - ch.len_utf8()));
        }
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while let Ok(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn take_while(&mut self, cond: impl Fn(char) -> bool) -> &'s str {
        let start = self.pos;
        while let Ok(ch) = self.peek() {
            if !cond(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn keyword(&mut self, word: &str, value: Value) -> Result<Value, NotationError> {
        for expected in word.chars() {
            self.expect(expected)?;
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> Result<Value, NotationError> {
        self.skip_whitespace();
        match self.peek()? {
            'n' => self.keyword("none", Value::NONE),
            't' => self.keyword("true", Value::TRUE),
            'f' => self.keyword("false", Value::FALSE),
            '$' => self.parse_symbol().map(Value::Symbol),
            '#' => self.parse_tag(),
            '"' => self.parse_text(),
            '\'' => self.parse_binary(),
            '<' => self.parse_citation(),
            '[' => self.parse_collection(),
            '{' => self.parse_code(),
            '(' => self.parse_complex(),
            '.' => self.parse_probability(),
            ch if ch.is_ascii_digit() || ch == '-' => self.parse_number(),
            ch => Err(NotationError::UnexpectedChar(ch, self.pos)),
        }
    }

    fn parse_symbol(&mut self) -> Result<Symbol, NotationError> {
        self.expect('$')?;
        let name = self.take_while(|ch| ch.is_ascii_alphanumeric());
        Symbol::with(name).map_err(NotationError::from)
    }

    fn parse_tag(&mut self) -> Result<Value, NotationError> {
        self.expect('#')?;
        let digits = self.take_while(|ch| ch.is_ascii_hexdigit());
        Tag::from_str(digits)
            .map(Value::Tag)
            .map_err(NotationError::from)
    }

    fn parse_text(&mut self) -> Result<Value, NotationError> {
        self.expect('"')?;
        let mut text = String::new();
        loop {
            match self.bump()? {
                '"' => return Ok(Value::Text(text)),
                '\\' => match self.bump()? {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    ch => text.push(ch),
                },
                ch => text.push(ch),
            }
        }
    }

    fn parse_binary(&mut self) -> Result<Value, NotationError> {
        self.expect('\'')?;
        let digits = self.take_while(|ch| ch.is_ascii_hexdigit());
        self.expect('\'')?;
        Vec::<u8>::from_hex(digits)
            .map(Value::Binary)
            .map_err(NotationError::InvalidBinary)
    }

    fn parse_citation(&mut self) -> Result<Value, NotationError> {
        let start = self.pos;
        self.expect('<')?;
        while self.bump()? != '>' {}
        Citation::from_str(&self.input[start..self.pos])
            .map(Value::Reference)
            .map_err(NotationError::from)
    }

    fn parse_collection(&mut self) -> Result<Value, NotationError> {
        self.expect('[')?;
        self.skip_whitespace();
        match self.peek()? {
            ':' => {
                self.expect(':')?;
                self.skip_whitespace();
                self.expect(']')?;
                return Ok(Value::catalog([]));
            }
            ']' => {
                self.expect(']')?;
                return Ok(Value::list([]));
            }
            _ => {}
        }
        let first = self.parse_value()?;
        self.skip_whitespace();
        if self.peek()? == ':' {
            self.parse_catalog_rest(first)
        } else {
            self.parse_list_rest(first)
        }
    }

    fn parse_list_rest(&mut self, first: Value) -> Result<Value, NotationError> {
        let mut items = vec![first];
        loop {
            self.skip_whitespace();
            match self.bump()? {
                ']' => return Ok(Value::List(items)),
                ',' => items.push(self.parse_value()?),
                ch => return Err(NotationError::UnexpectedChar(ch, self.pos - ch.len_utf8())),
            }
        }
    }

    fn parse_catalog_rest(&mut self, first: Value) -> Result<Value, NotationError> {
        let Value::Symbol(key) = first else {
            return Err(NotationError::NonSymbolKey);
        };
        self.expect(':')?;
        let mut assoc = vec![(key, self.parse_value()?)];
        loop {
            self.skip_whitespace();
            match self.bump()? {
                ']' => return Ok(Value::Catalog(assoc)),
                ',' => {
                    self.skip_whitespace();
                    let key = self.parse_symbol()?;
                    self.skip_whitespace();
                    self.expect(':')?;
                    assoc.push((key, self.parse_value()?));
                }
                ch => return Err(NotationError::UnexpectedChar(ch, self.pos - ch.len_utf8())),
            }
        }
    }

    fn parse_code(&mut self) -> Result<Value, NotationError> {
        self.expect('{')?;
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            let Ok(ch) = self.bump() else {
                return Err(NotationError::UnbalancedCode);
            };
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let source = self.input[start..self.pos - 1].trim();
                        return Ok(Value::Code(source.to_owned()));
                    }
                }
                // skip string content so quoted braces do not confuse the balance
                '"' => loop {
                    match self.bump() {
                        Ok('"') => break,
                        Ok('\\') => {
                            let _ = self.bump();
                        }
                        Ok(_) => {}
                        Err(_) => return Err(NotationError::UnbalancedCode),
                    }
                },
                _ => {}
            }
        }
    }

    fn number_token(&mut self) -> &'s str {
        self.take_while(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E'))
    }

    fn parse_number(&mut self) -> Result<Value, NotationError> {
        let token = self.number_token();
        // a trailing dot marks the unit probability (`1.`), not a number
        if token.ends_with('.') {
            return f64::from_str(token)
                .map(Value::Probability)
                .map_err(|_| NotationError::InvalidNumber(token.to_owned()));
        }
        f64::from_str(token)
            .map(Value::number)
            .map_err(|_| NotationError::InvalidNumber(token.to_owned()))
    }

    fn parse_probability(&mut self) -> Result<Value, NotationError> {
        self.expect('.')?;
        let digits = self.take_while(|ch| ch.is_ascii_digit());
        f64::from_str(&format!("0.{digits}"))
            .map(Value::Probability)
            .map_err(|_| NotationError::InvalidNumber(format!(".{digits}")))
    }

    fn parse_complex(&mut self) -> Result<Value, NotationError> {
        self.expect('(')?;
        self.skip_whitespace();
        let re = self.number_token();
        let re = f64::from_str(re).map_err(|_| NotationError::InvalidNumber(re.to_owned()))?;
        self.skip_whitespace();
        self.expect(',')?;
        self.skip_whitespace();
        let im = self.number_token();
        let im = f64::from_str(im).map_err(|_| NotationError::InvalidNumber(im.to_owned()))?;
        self.expect('i')?;
        self.skip_whitespace();
        self.expect(')')?;
        Ok(Value::Number(re, im))
    }
}
