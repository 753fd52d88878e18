//! Typed argument values produced by the action parser.
//!
//! Values cover the literal forms a model is expected to write inside an
//! action: strings, integers, floats, booleans, `None`, and nested lists or
//! tuples of those.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Source form that parses back to an equal value.
    pub fn to_literal(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            // Overflowing literals such as `1e999` evaluate to infinity.
            Value::Float(f) if f.is_infinite() && f.is_sign_positive() => "1e999".to_string(),
            Value::Float(f) if f.is_infinite() => "-1e999".to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Str(s) => quote(s),
            Value::List(items) => format!("[{}]", join_literals(items)),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].to_literal()),
            Value::Tuple(items) => format!("({})", join_literals(items)),
        }
    }

    /// Best-effort literal evaluation. Returns `None` when `source` is not a
    /// complete literal.
    pub fn parse_literal(source: &str) -> Option<Value> {
        let mut parser = LiteralParser::new(source.trim());
        let value = parser.value()?;
        parser.skip_whitespace();
        parser.at_end().then_some(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.to_literal()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

fn join_literals(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::to_literal)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Double-quote `raw`, escaping backslashes, double quotes and control
/// characters the same way [`unescape`] decodes them.
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Decode `\"`, `\'`, `\n`, `\t`, `\r` and `\\` in one pass. Unknown escape
/// sequences are kept as written.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.peek() {
            Some('"') => '"',
            Some('\'') => '\'',
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            _ => {
                out.push('\\');
                continue;
            }
        };
        chars.next();
        out.push(decoded);
    }
    out
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            '[' => {
                self.bump();
                let (items, _) = self.sequence(']')?;
                Some(Value::List(items))
            }
            '(' => {
                self.bump();
                let (mut items, trailing_comma) = self.sequence(')')?;
                if items.len() == 1 && !trailing_comma {
                    items.pop()
                } else {
                    Some(Value::Tuple(items))
                }
            }
            '"' | '\'' => self.string(),
            c if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.number(),
            c if c.is_alphabetic() || c == '_' => self.keyword(),
            _ => None,
        }
    }

    /// Comma separated values up to `close`. The flag reports whether the
    /// last element was followed by a comma.
    fn sequence(&mut self, close: char) -> Option<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_whitespace();
            if self.peek()? == close {
                self.bump();
                return Some((items, trailing_comma));
            }
            items.push(self.value()?);
            trailing_comma = false;
            self.skip_whitespace();
            match self.bump()? {
                ',' => trailing_comma = true,
                c if c == close => return Some((items, false)),
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<Value> {
        let quote = self.bump()?;
        let mut raw = String::new();
        loop {
            match self.bump()? {
                '\\' => {
                    raw.push('\\');
                    raw.push(self.bump()?);
                }
                c if c == quote => break,
                c => raw.push(c),
            }
        }
        Some(Value::Str(unescape(&raw)))
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            token.parse::<f64>().ok().map(Value::Float)
        } else {
            token.parse::<i64>().ok().map(Value::Int)
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "none" | "null" => Some(Value::None),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_scalars() {
        assert_eq!(Value::parse_literal("42"), Some(Value::Int(42)));
        assert_eq!(Value::parse_literal(" -7 "), Some(Value::Int(-7)));
        assert_eq!(Value::parse_literal("2.5"), Some(Value::Float(2.5)));
        assert_eq!(Value::parse_literal("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(Value::parse_literal("True"), Some(Value::Bool(true)));
        assert_eq!(Value::parse_literal("false"), Some(Value::Bool(false)));
        assert_eq!(Value::parse_literal("None"), Some(Value::None));
    }

    #[test]
    fn evaluates_nested_aggregates() {
        let parsed = Value::parse_literal("[1, (2, 'x'), [], (3,), (4)]").unwrap();
        assert_eq!(
            parsed,
            Value::List(vec![
                Value::Int(1),
                Value::Tuple(vec![Value::Int(2), Value::Str("x".into())]),
                Value::List(vec![]),
                Value::Tuple(vec![Value::Int(3)]),
                Value::Int(4),
            ])
        );
    }

    #[test]
    fn rejects_non_literals() {
        assert_eq!(Value::parse_literal("foo"), None);
        assert_eq!(Value::parse_literal("1 + 2"), None);
        assert_eq!(Value::parse_literal("[1, 2"), None);
        assert_eq!(Value::parse_literal("[,]"), None);
        assert_eq!(Value::parse_literal(""), None);
        assert_eq!(Value::parse_literal("99999999999999999999"), None);
    }

    #[test]
    fn unescape_handles_escaped_backslash_before_letter() {
        assert_eq!(unescape(r"a\\nb"), "a\\nb");
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"\x"), "\\x");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }

    #[test]
    fn renders_literals() {
        assert_eq!(Value::Str("say \"hi\"\n".into()).to_literal(), r#""say \"hi\"\n""#);
        assert_eq!(Value::Float(3.0).to_literal(), "3.0");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_literal(), "(1,)");
        assert_eq!(
            Value::List(vec![Value::None, Value::Bool(true)]).to_literal(),
            "[None, True]"
        );
    }

    #[test]
    fn display_prints_strings_raw() {
        assert_eq!(Value::Str("plain text".into()).to_string(), "plain text");
        assert_eq!(Value::Int(3).to_string(), "3");
    }
}
