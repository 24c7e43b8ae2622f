//! Placeholder rewriting: `IN (?)` expansion, rebinding and `:name` compilation
//!
//! All scanners skip quoted literals plus `--` and `/* */` comments, so a
//! `?` or `:word` inside a string or a comment is never treated as a
//! bindvar. Skipped text is copied through unchanged.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};
use super::value::{NamedArgs, Value};

/// Bindvar syntax understood by a database driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindStyle {
    /// `?`
    #[default]
    Question,
    /// `$1, $2, ...`
    Dollar,
    /// `:arg1, :arg2, ...`
    Named,
    /// `@p1, @p2, ...`
    At,
}

impl BindStyle {
    /// Append the `n`th (1-based) bindvar in this style
    fn push_bindvar(self, out: &mut String, n: usize) {
        // Writing into a String cannot fail
        let _ = match self {
            BindStyle::Question => write!(out, "?"),
            BindStyle::Dollar => write!(out, "${}", n),
            BindStyle::Named => write!(out, ":arg{}", n),
            BindStyle::At => write!(out, "@p{}", n),
        };
    }
}

impl FromStr for BindStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "question" | "?" => Ok(BindStyle::Question),
            "dollar" | "$" => Ok(BindStyle::Dollar),
            "named" | ":" => Ok(BindStyle::Named),
            "at" | "@" => Ok(BindStyle::At),
            other => Err(Error::Config(format!("unknown bind style: {}", other))),
        }
    }
}

#[derive(Default)]
enum State {
    #[default]
    Code,
    Quoted(char),
    LineComment,
    BlockComment { opening: bool, star: bool },
}

/// Tracks whether the scanner is inside a literal or a comment
#[derive(Default)]
struct Scanner(State);

impl Scanner {
    /// Feed one character and a peek at the next; returns true if `ch` is
    /// SQL code rather than part of a literal or comment
    fn is_code(&mut self, ch: char, next: Option<char>) -> bool {
        match &mut self.0 {
            State::Code => match (ch, next) {
                ('\'' | '"', _) => {
                    self.0 = State::Quoted(ch);
                    false
                }
                ('-', Some('-')) => {
                    self.0 = State::LineComment;
                    false
                }
                ('/', Some('*')) => {
                    self.0 = State::BlockComment {
                        opening: true,
                        star: false,
                    };
                    false
                }
                _ => true,
            },
            State::Quoted(q) => {
                if ch == *q {
                    self.0 = State::Code;
                }
                false
            }
            State::LineComment => {
                if ch == '\n' {
                    self.0 = State::Code;
                }
                false
            }
            State::BlockComment { opening, star } => {
                // The `*` of the opening `/*` cannot close the comment
                if *opening {
                    *opening = false;
                } else if *star && ch == '/' {
                    self.0 = State::Code;
                } else {
                    *star = ch == '*';
                }
                false
            }
        }
    }
}

/// Expand `?` bindvars whose argument is a `Value::List` into one bindvar
/// per element, flattening the list into the returned arguments.
///
/// Arguments without any list are returned unchanged.
pub fn expand_in(query: &str, args: &[Value]) -> Result<(String, Vec<Value>)> {
    if !args.iter().any(Value::is_list) {
        return Ok((query.to_string(), args.to_vec()));
    }

    let mut out = String::with_capacity(query.len() + args.len() * 3);
    let mut flat = Vec::with_capacity(args.len());
    let mut scanner = Scanner::default();
    let mut next_arg = 0;
    let mut chars = query.chars().peekable();

    while let Some(ch) = chars.next() {
        if !scanner.is_code(ch, chars.peek().copied()) || ch != '?' {
            out.push(ch);
            continue;
        }

        let arg = args
            .get(next_arg)
            .ok_or_else(|| Error::expansion("number of bindvars exceeds arguments"))?;
        next_arg += 1;

        match arg {
            Value::List(items) => {
                if items.is_empty() {
                    return Err(Error::expansion("empty list passed to IN query"));
                }
                out.push_str(&vec!["?"; items.len()].join(", "));
                flat.extend(items.iter().cloned());
            }
            other => {
                out.push('?');
                flat.push(other.clone());
            }
        }
    }

    if next_arg < args.len() {
        return Err(Error::expansion(
            "number of bindvars less than number of arguments",
        ));
    }

    Ok((out, flat))
}

/// Rewrite `?` bindvars into `style`
pub fn rebind(style: BindStyle, query: &str) -> String {
    if style == BindStyle::Question {
        return query.to_string();
    }

    let mut out = String::with_capacity(query.len() + 8);
    let mut scanner = Scanner::default();
    let mut n = 0;
    let mut chars = query.chars().peekable();

    while let Some(ch) = chars.next() {
        if !scanner.is_code(ch, chars.peek().copied()) || ch != '?' {
            out.push(ch);
            continue;
        }
        n += 1;
        style.push_bindvar(&mut out, n);
    }

    out
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}

/// Replace `:name` parameters with bindvars of `style`
///
/// Returns the rewritten SQL and the parameter names in bindvar order.
/// `::` casts are preserved. With `BindStyle::Named` the original names
/// are kept in place.
pub fn compile_named(query: &str, style: BindStyle) -> (String, Vec<String>) {
    let mut out = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut scanner = Scanner::default();
    let mut chars = query.chars().peekable();

    while let Some(ch) = chars.next() {
        if !scanner.is_code(ch, chars.peek().copied()) || ch != ':' {
            out.push(ch);
            continue;
        }

        match chars.peek() {
            Some(':') => {
                chars.next();
                out.push_str("::");
            }
            Some(&next) if next.is_ascii_alphanumeric() || next == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if style == BindStyle::Named {
                    out.push(':');
                    out.push_str(&name);
                } else {
                    style.push_bindvar(&mut out, names.len() + 1);
                }
                names.push(name);
            }
            _ => out.push(':'),
        }
    }

    (out, names)
}

/// Values for `names`, in order
pub fn lookup_named(names: &[String], args: &NamedArgs) -> Result<Vec<Value>> {
    names
        .iter()
        .map(|name| {
            args.get(name)
                .cloned()
                .ok_or_else(|| Error::bind(format!("could not find name {} in arguments", name)))
        })
        .collect()
}

/// Compile `:name` parameters and pull their values out of `args`
pub fn bind_named(query: &str, style: BindStyle, args: &NamedArgs) -> Result<(String, Vec<Value>)> {
    let (sql, names) = compile_named(query, style);
    let values = lookup_named(&names, args)?;
    Ok((sql, values))
}
