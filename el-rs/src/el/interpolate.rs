//! `${...}` interpolation into host strings.
//!
//! | Sequence  | Meaning                                                   |
//! |-----------|-----------------------------------------------------------|
//! | `${expr}` | Parse `expr` leniently, evaluate it, substitute as String |
//!
//! All other text passes through unchanged, including a lone `$`. Spans do
//! not nest: the first `}` after `${` closes the span.

use tracing::trace;

use super::error::{Error, EvaluationError, SyntaxError};
use super::eval::EvaluationContext;
use super::expr::Location;
use super::parser::{parse_at, ParserMode};
use crate::var::VariableStore;

/// Tracks the location of the next character of the host text.
struct Cursor {
    location: Location,
}

impl Cursor {
    fn step(&mut self, ch: char) {
        if ch == '\n' {
            self.location.line += 1;
            self.location.column = 1;
        } else {
            self.location.column += 1;
        }
    }
}

/// Substitute every `${...}` span in `text`.
pub fn interpolate(store: &dyn VariableStore, text: &str) -> Result<String, Error> {
    interpolate_at(store, text, Location::default())
}

/// Like [`interpolate`], reporting locations relative to `origin`.
pub fn interpolate_at(
    store: &dyn VariableStore,
    text: &str,
    origin: Location,
) -> Result<String, Error> {
    trace!(text, "interpolating");
    let ctx = EvaluationContext::new(store);
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut cursor = Cursor { location: origin };

    while let Some(ch) = chars.next() {
        let start = cursor.location.clone();
        cursor.step(ch);
        if ch != '$' || chars.peek() != Some(&'{') {
            out.push(ch);
            continue;
        }

        chars.next(); // consume '{'
        cursor.step('{');
        let inner_origin = cursor.location.clone();
        let mut src = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            cursor.step(c);
            if c == '}' {
                closed = true;
                break;
            }
            src.push(c);
        }
        if !closed {
            return Err(SyntaxError::new(start, "unterminated '${' span").into());
        }
        if src.trim().is_empty() {
            return Err(SyntaxError::new(start, "empty '${}' span").into());
        }

        let node = parse_at(&src, ParserMode::Lenient, inner_origin)?;
        let value = ctx.evaluate(&node)?;
        let text = value
            .string_value()
            .map_err(|kind| EvaluationError::new(kind, node.location().cloned()))?;
        out.push_str(&text);
    }
    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::el::Value;
    use crate::var::{NullVariableStore, VariableTable};

    fn interp(text: &str) -> Result<String, Error> {
        interpolate(&NullVariableStore, text)
    }

    fn syntax_err(text: &str) -> SyntaxError {
        match interp(text) {
            Err(Error::Syntax(e)) => e,
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn evaluates_spans() {
        assert_eq!(interp("value=${1+2}").unwrap(), "value=3");
        assert_eq!(interp("${'a' + 'b'}-${ 2 * 2 }").unwrap(), "ab-4");
    }

    #[test]
    fn missing_variable_is_empty() {
        assert_eq!(interp("${missing}").unwrap(), "");
        assert_eq!(interp("[${missing.path}]").unwrap(), "[]");
    }

    #[test]
    fn text_without_spans_is_unchanged() {
        assert_eq!(interp("plain text").unwrap(), "plain text");
        assert_eq!(interp("cost: $5, { braces }, $ {x}").unwrap(), "cost: $5, { braces }, $ {x}");
    }

    #[test]
    fn uses_store_variables() {
        let mut store = VariableTable::new();
        store.set("MODS", Value::Array(vec!["id1".into(), "ad".into()]));
        store.set("MAP_BASE_NAME", "e1m1");
        let out = interpolate(&store, "${MODS[-1]}/maps/${MAP_BASE_NAME}.bsp").unwrap();
        assert_eq!(out, "ad/maps/e1m1.bsp");
    }

    #[test]
    fn unterminated_span() {
        let e = syntax_err("${");
        assert_eq!(e.location, Location::new(1, 1));
        let e = syntax_err("ok ${1 + 2");
        assert_eq!(e.location, Location::new(1, 4));
    }

    #[test]
    fn empty_span() {
        assert!(syntax_err("${}").message.contains("empty"));
        assert!(syntax_err("x${   }").message.contains("empty"));
    }

    #[test]
    fn syntax_error_points_into_host_text() {
        let e = syntax_err("ab ${1 + )}");
        assert_eq!(e.location, Location::new(1, 10));
        let e = syntax_err("line one\n  ${@}");
        assert_eq!(e.location, Location::new(2, 5));
    }

    #[test]
    fn lenient_span_ignores_trailing_input() {
        assert_eq!(interp("${1 2}").unwrap(), "1");
    }

    #[test]
    fn evaluation_errors_propagate() {
        assert!(matches!(interp("${[] - 1}"), Err(Error::Evaluation(_))));
        assert!(matches!(interp("${[1, 2]}"), Err(Error::Evaluation(_))));
    }
}
