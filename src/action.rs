//! Parser for the action language the model writes inside `<action>` tags.
//!
//! An action is a single call, `name(arg, arg, ...)`. Arguments are split on
//! top-level commas with a one-pass scanner that tracks string literals and
//! bracket depth, then each argument is resolved to a [`Value`].

use std::fmt;

use crate::error::{AgentError, Result};
use crate::value::{unescape, Value};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    pub name: String,
    pub arguments: Vec<Value>,
}

impl fmt::Display for ParsedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.arguments.iter().map(Value::to_literal).collect();
        write!(f, "{}({})", self.name, args.join(", "))
    }
}

/// Parse `name(arg, ...)`. Only the call envelope can fail; arguments that
/// are not recognizable literals degrade to strings.
pub fn parse_action(text: &str) -> Result<ParsedAction> {
    let trimmed = text.trim();
    let malformed = || AgentError::MalformedAction(trimmed.to_string());

    let open = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .ok_or_else(malformed)?;
    if open == 0 || !trimmed[open..].starts_with('(') || !trimmed.ends_with(')') {
        return Err(malformed());
    }
    let close = trimmed.len() - 1;
    if close <= open {
        return Err(malformed());
    }

    let name = trimmed[..open].to_string();
    let arguments = split_arguments(trimmed[open + 1..close].trim())
        .iter()
        .map(|raw| resolve_argument(raw))
        .collect();

    Ok(ParsedAction { name, arguments })
}

/// Split an argument list on commas that sit outside string literals and
/// outside any `()`, `[]` or `{}` nesting. Returned pieces are trimmed.
pub fn split_arguments(body: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth: i32 = 0;

    for c in body.chars() {
        if let Some(open) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Resolve one raw argument: quoted text becomes an unescaped string, other
/// literals are evaluated, anything else is kept verbatim as a string.
pub fn resolve_argument(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.len() >= 2 {
        for quote in ['"', '\''] {
            if raw.starts_with(quote) && raw.ends_with(quote) {
                return Value::Str(unescape(&raw[1..raw.len() - 1]));
            }
        }
    }
    Value::parse_literal(raw).unwrap_or_else(|| Value::Str(raw.to_string()))
}
