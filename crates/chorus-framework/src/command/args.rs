//! Argument tokenization and the POSIX-like flag parser.
//!
//! Command invocations arrive as free text. [`shell_split`] turns the text
//! into tokens with shell-style quoting rules; [`parse_args`] then sorts
//! tokens into positional arguments and `-x value` / `-x` flag options.

use std::collections::HashMap;

/// A parsed named argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// A bare flag (`-f`).
    Flag,
    /// An option with a value (`-o out`).
    Value(String),
}

/// Structured arguments for one command invocation.
///
/// Positional arguments keep their order; named arguments are keyed by the
/// option name with leading dashes stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    positional: Vec<String>,
    named: HashMap<String, ArgValue>,
}

impl ParsedArgs {
    /// The positional arguments, in invocation order.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Looks up a named argument.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.named.get(key)
    }

    /// The value of `-key value`, if present with a value.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        match self.named.get(key) {
            Some(ArgValue::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether `key` was given at all (flag or value form).
    pub fn has(&self, key: &str) -> bool {
        self.named.contains_key(key)
    }

    /// Iterates over the named argument keys.
    pub fn named_keys(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// True when nothing at all was parsed.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Shell-like argument splitting for plain text.
///
/// Handles:
/// - Space-separated arguments
/// - Quoted strings (single and double quotes)
/// - Escape sequences within double quotes
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ' ' | '\t' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Returns whether a token reads as an option (`-x` / `--long`) rather
/// than a positional that happens to start with a dash (`-`, `-5`).
fn is_option_token(token: &str) -> bool {
    let stripped = token.trim_start_matches('-');
    if stripped.is_empty() || stripped.len() == token.len() {
        return false;
    }
    !stripped.starts_with(|c: char| c.is_ascii_digit())
}

/// Parses tokens into positional and named arguments.
///
/// `-x value` binds the following token as the option's value unless that
/// token is itself an option; a trailing or value-less `-x` becomes a bare
/// flag. Everything else is positional, in order.
pub fn parse_args(tokens: &[String]) -> ParsedArgs {
    let mut args = ParsedArgs::default();
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        if is_option_token(token) {
            let key = token.trim_start_matches('-').to_string();
            let value = match iter.peek() {
                Some(next) if !is_option_token(next) => {
                    ArgValue::Value(iter.next().cloned().unwrap_or_default())
                }
                _ => ArgValue::Flag,
            };
            args.named.insert(key, value);
        } else {
            args.positional.push(token.clone());
        }
    }

    args
}
