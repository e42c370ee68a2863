//! `{name}` placeholder substitution for dynamic claim arguments, URLs and headers.
//!
//! - A string that is exactly one placeholder resolves to the typed value.
//! - Embedded placeholders are replaced by the value's text form.
//! - Reserved bindings (`api_key`, `api_key_id`, `internal_token`) shadow
//!   context entries with the same name.
use serde_json::{Map, Value};

/// What to do with a placeholder that has no binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Function arguments: unresolved names become `""`.
    Empty,
    /// URLs and headers: leave `{name}` in place.
    Keep,
}

/// Resolution scope: reserved bindings first, then the user context.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    reserved: Vec<(&'static str, Value)>,
    context: &'a Map<String, Value>,
}

impl<'a> Placeholders<'a> {
    pub fn new(context: &'a Map<String, Value>) -> Self {
        Self {
            reserved: Vec::new(),
            context,
        }
    }

    pub fn reserve(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.reserved.push((name, value.into()));
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.reserved
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .or_else(|| self.context.get(name))
    }

    /// Substitute inside a JSON value. Only strings are rewritten.
    pub fn substitute_value(&self, value: &Value, unresolved: Unresolved) -> Value {
        match value {
            Value::String(s) => match whole_placeholder(s) {
                Some(name) => match self.lookup(name) {
                    Some(v) => v.clone(),
                    None => match unresolved {
                        Unresolved::Empty => Value::String(String::new()),
                        Unresolved::Keep => value.clone(),
                    },
                },
                None => Value::String(self.substitute_str(s, unresolved)),
            },
            other => other.clone(),
        }
    }

    /// Textual substitution of every `{name}` occurrence.
    pub fn substitute_str(&self, input: &str, unresolved: Unresolved) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let name = &after[..close];

            if !is_valid_name(name) {
                // Not a placeholder: emit the brace and rescan after it.
                out.push('{');
                rest = after;
                continue;
            }

            match self.lookup(name) {
                Some(v) => out.push_str(&stringify(v)),
                None if unresolved == Unresolved::Keep => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
                None => {}
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let name = s.strip_prefix('{')?.strip_suffix('}')?;
    is_valid_name(name).then_some(name)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
