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

//! Value domain of the virtual machine.
//!
//! The component stack, literal, variable and parameter tables, documents, queue messages and
//! published events all hold [`Value`]s. The full component algebra of the platform lives in an
//! upstream library; the machine itself requires only the capabilities implemented here: a total
//! order, equality, 1-based item and keyed attribute access, and a loss-less round-trip through
//! the document source notation.

mod cite;
mod notation;
mod set;

use core::cmp::Ordering;
use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

use amplify::hex::ToHex;

pub use self::cite::{Citation, CitationError, DocDigest, Tag, Version, VersionError};
pub use self::notation::NotationError;
pub use self::set::OrderedSet;

/// Template values: the distinguished constants of the value domain.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum Template {
    /// Absence of a value; also the initial content of every variable cell.
    #[display("none")]
    None,

    /// Boolean truth.
    #[display("true")]
    True,

    /// Boolean falsehood.
    #[display("false")]
    False,
}

/// Symbol value (`$name`).
#[derive(Wrapper, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, From)]
#[wrapper(Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Symbol(String);

/// Error parsing a symbol literal.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display("invalid symbol literal \"{0}\"; symbols must be a letter followed by letters and digits")]
pub struct SymbolError(pub String);

impl Symbol {
    /// Constructs a symbol from a bare name (without the leading `$`), validating its charset.
    pub fn with(name: impl Into<String>) -> Result<Self, SymbolError> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
            && chars.all(|ch| ch.is_ascii_alphanumeric());
        if !valid {
            return Err(SymbolError(name));
        }
        Ok(Symbol(name))
    }

    /// Returns the symbol name without the leading `$`.
    #[inline]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::with(name).unwrap_or_else(|err| panic!("invalid symbol literal: {err}"))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "${}", self.0) }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix('$')
            .ok_or_else(|| SymbolError(s.to_owned()))?;
        Symbol::with(name)
    }
}

/// A value of the machine's abstract value domain.
///
/// Values compare with a total order: first by kind, then by content. The order on complex
/// numbers and probabilities is the IEEE 754 `totalOrder` predicate, so that every value
/// participates in the order and equality stays consistent with it.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum Value {
    /// Template constant (`none`, `true` or `false`).
    Template(Template),

    /// Probability in the `[0, 1]` range (`.5`, `1.`).
    Probability(f64),

    /// Complex number with real and imaginary parts; real numbers have a zero imaginary part.
    Number(f64, f64),

    /// Symbol (`$name`).
    Symbol(Symbol),

    /// Opaque identity (`#A4F1...`).
    Tag(Tag),

    /// Text string (`"..."`).
    Text(String),

    /// Binary blob, base-16 encoded in source form (`'a0ff...'`).
    Binary(Vec<u8>),

    /// Citation of a repository document (`<#TAG/v1/doc:...>`).
    Reference(Citation),

    /// Ordered sequence of values with 1-based indexes.
    List(Vec<Value>),

    /// Ordered sequence of key-value associations with symbol keys.
    Catalog(Vec<(Symbol, Value)>),

    /// Procedure source retained in its unparsed form; parsing belongs to the compiler.
    Code(String),
}

impl Value {
    /// The `none` template.
    pub const NONE: Value = Value::Template(Template::None);
    /// The `true` template.
    pub const TRUE: Value = Value::Template(Template::True);
    /// The `false` template.
    pub const FALSE: Value = Value::Template(Template::False);

    /// Constructs a symbol value from a bare name.
    pub fn symbol(name: &str) -> Value { Value::Symbol(Symbol::from(name)) }

    /// Constructs a real number value.
    pub fn number(re: f64) -> Value { Value::Number(re, 0.0) }

    /// Constructs a text value.
    pub fn text(text: impl Into<String>) -> Value { Value::Text(text.into()) }

    /// Constructs a reference value from a citation.
    pub fn reference(citation: Citation) -> Value { Value::Reference(citation) }

    /// Constructs a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Constructs a catalog value from key-value associations.
    pub fn catalog(assoc: impl IntoIterator<Item = (Symbol, Value)>) -> Value {
        Value::Catalog(assoc.into_iter().collect())
    }

    /// Detects the `none` template.
    #[inline]
    pub fn is_none(&self) -> bool { matches!(self, Value::Template(Template::None)) }

    /// Returns the 1-based item of a list, or the value of the 1-based association of a catalog.
    pub fn get_item(&self, index: usize) -> Option<&Value> {
        let index = index.checked_sub(1)?;
        match self {
            Value::List(items) => items.get(index),
            Value::Catalog(assoc) => assoc.get(index).map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the value associated with a catalog key (given without the leading `$`).
    pub fn get_attribute(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Catalog(assoc) => assoc
                .iter()
                .find(|(symbol, _)| symbol.as_str() == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the citation of a reference value.
    pub fn as_reference(&self) -> Option<&Citation> {
        match self {
            Value::Reference(citation) => Some(citation),
            _ => None,
        }
    }

    /// Returns the identity of a tag value, or of a reference value's tag.
    pub fn as_tag(&self) -> Option<Tag> {
        match self {
            Value::Tag(tag) => Some(*tag),
            Value::Reference(citation) => Some(citation.tag),
            _ => None,
        }
    }

    /// Returns list items as a slice.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns catalog associations as a slice.
    pub fn as_catalog(&self) -> Option<&[(Symbol, Value)]> {
        match self {
            Value::Catalog(assoc) => Some(assoc),
            _ => None,
        }
    }

    /// Returns binary content as a byte slice.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a non-negative integral real number as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(re, im)
                if *im == 0.0 && re.fract() == 0.0 && *re >= 0.0 && *re <= u64::MAX as f64 =>
            {
                Some(*re as u64)
            }
            _ => None,
        }
    }

    /// Ranks the value kind for the total order across kinds.
    fn rank(&self) -> u8 {
        match self {
            Value::Template(_) => 0,
            Value::Probability(_) => 1,
            Value::Number(..) => 2,
            Value::Symbol(_) => 3,
            Value::Tag(_) => 4,
            Value::Text(_) => 5,
            Value::Binary(_) => 6,
            Value::Reference(_) => 7,
            Value::List(_) => 8,
            Value::Catalog(_) => 9,
            Value::Code(_) => 10,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Template(a), Value::Template(b)) => a.cmp(b),
            (Value::Probability(a), Value::Probability(b)) => a.total_cmp(b),
            (Value::Number(are, aim), Value::Number(bre, bim)) => {
                are.total_cmp(bre).then(aim.total_cmp(bim))
            }
            (Value::Symbol(a), Value::Symbol(b)) => a.cmp(b),
            (Value::Tag(a), Value::Tag(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Binary(a), Value::Binary(b)) => a.cmp(b),
            (Value::Reference(a), Value::Reference(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.iter().cmp(b.iter()),
            (Value::Catalog(a), Value::Catalog(b)) => a.iter().cmp(b.iter()),
            (Value::Code(a), Value::Code(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for Value {}

fn fmt_text(text: &str, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            ch => write!(f, "{ch}")?,
        }
    }
    f.write_str("\"")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Template(template) => Display::fmt(template, f),
            Value::Probability(p) if *p >= 1.0 => f.write_str("1."),
            Value::Probability(p) => {
                let s = p.to_string();
                match s.strip_prefix("0.") {
                    Some(frac) => write!(f, ".{frac}"),
                    None => f.write_str(".0"),
                }
            }
            Value::Number(re, im) if *im == 0.0 => write!(f, "{re}"),
            Value::Number(re, im) => write!(f, "({re}, {im}i)"),
            Value::Symbol(symbol) => Display::fmt(symbol, f),
            Value::Tag(tag) => Display::fmt(tag, f),
            Value::Text(text) => fmt_text(text, f),
            Value::Binary(bytes) => write!(f, "'{}'", bytes.to_hex()),
            Value::Reference(citation) => Display::fmt(citation, f),
            Value::List(items) if items.is_empty() => f.write_str("[ ]"),
            Value::List(items) => {
                f.write_str("[")?;
                for (no, item) in items.iter().enumerate() {
                    if no > 0 {
                        f.write_str(", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                f.write_str("]")
            }
            Value::Catalog(assoc) if assoc.is_empty() => f.write_str("[:]"),
            Value::Catalog(assoc) => {
                f.write_str("[")?;
                for (no, (key, value)) in assoc.iter().enumerate() {
                    if no > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("]")
            }
            Value::Code(source) => write!(f, "{{{source}}}"),
        }
    }
}

impl FromStr for Value {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { notation::parse(s) }
}
