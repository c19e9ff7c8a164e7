//! Variables file parser.
//!
//! A variables file binds names to EL expressions, one per line:
//!
//! | Line                  | Action                                      |
//! |-----------------------|---------------------------------------------|
//! | `<name> = <expr>`     | evaluate `expr`, bind the result to `name`  |
//! | Lines starting with `;` or `#` | comment, ignored                   |
//! | Blank lines           | ignored                                     |
//!
//! Expressions are parsed strictly and may refer to names bound on earlier
//! lines. A bad line is reported and skipped; it never stops the load.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::el::{evaluate, parse_at, EvaluationContext, Location, ParserMode};
use crate::var::VariableTable;

/// A non-fatal error encountered while loading a variables file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl ConfigError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        ConfigError {
            line,
            message: message.into(),
        }
    }
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a variables file held in memory.
///
/// Returns the bound variables and a list of errors for the lines that
/// could not be bound.
pub fn load_str(s: &str) -> (VariableTable, Vec<ConfigError>) {
    let mut vars = VariableTable::new();
    let mut errors = Vec::new();

    for (i, raw) in s.lines().enumerate() {
        let lineno = i + 1;
        let line = raw.trim();

        // blank lines and comments
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        let Some((name, _)) = line.split_once('=') else {
            errors.push(ConfigError::new(lineno, "expected '<name> = <expression>'"));
            continue;
        };
        let name = name.trim();
        if !is_variable_name(name) {
            errors.push(ConfigError::new(lineno, format!("invalid variable name '{name}'")));
            continue;
        }

        // Locate the expression in the raw line so errors point at it.
        let Some(eq) = raw.find('=') else { continue };
        let expr_src = &raw[eq + 1..];
        let column = raw[..=eq].chars().count() + 1;
        let origin = Location::new(lineno, column);

        let value = parse_at(expr_src, ParserMode::Strict, origin)
            .map_err(|e| e.to_string())
            .and_then(|node| {
                evaluate(&node, &EvaluationContext::new(&vars)).map_err(|e| e.to_string())
            });
        match value {
            Ok(value) => {
                debug!(name, %value, "bound variable");
                vars.set(name, value);
            }
            Err(message) => errors.push(ConfigError::new(lineno, message)),
        }
    }

    (vars, errors)
}

/// Read and parse a variables file from disk.
pub fn load_file(path: &Path) -> std::io::Result<(VariableTable, Vec<ConfigError>)> {
    debug!(path = %path.display(), "loading variables file");
    let s = std::fs::read_to_string(path)?;
    Ok(load_str(&s))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
