//! Tree-walking evaluator.
//!
//! Evaluation is pure: it reads variables through an [`EvaluationContext`]
//! and never mutates the tree or the store. Every call yields exactly one
//! [`Value`] or one [`EvaluationError`].

use std::cmp::Ordering;

use tracing::trace;

use super::error::{Error, EvaluationError, ValueError};
use super::expr::{BinaryOp, ExpressionKind, ExpressionNode, LogicalOp, UnaryOp};
use super::parser::{parse, ParserMode};
use super::value::{ArrayType, IntRange, MapType, Value, ValueType};
use crate::var::VariableStore;

/// Variables visible to an evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    store: &'a dyn VariableStore,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(store: &'a dyn VariableStore) -> Self {
        EvaluationContext { store }
    }

    pub fn store(&self) -> &'a dyn VariableStore {
        self.store
    }

    /// Value of `name`, or `Undefined` when the store does not know it.
    pub fn variable_value(&self, name: &str) -> Value {
        self.store.lookup(name).unwrap_or_default()
    }

    pub fn evaluate(&self, node: &ExpressionNode) -> Result<Value, EvaluationError> {
        evaluate(node, self)
    }
}

/// Run `f` with a fresh context over `store`.
pub fn with_evaluation_context<T>(
    store: &dyn VariableStore,
    f: impl FnOnce(&EvaluationContext<'_>) -> T,
) -> T {
    f(&EvaluationContext::new(store))
}

/// Evaluate `node` against the variables of `ctx`.
pub fn evaluate(node: &ExpressionNode, ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
    trace!(expression = %node, "evaluating expression");
    eval_node(node, ctx)
}

/// Parse `src` and evaluate it in one step.
pub fn eval_str(src: &str, mode: ParserMode, store: &dyn VariableStore) -> Result<Value, Error> {
    let node = parse(src, mode)?;
    Ok(evaluate(&node, &EvaluationContext::new(store))?)
}

fn eval_node(node: &ExpressionNode, ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
    let located = |kind: ValueError| EvaluationError::new(kind, node.location().cloned());

    match node.kind() {
        ExpressionKind::Literal(v) => Ok(v.clone()),

        ExpressionKind::Variable(name) => Ok(ctx.variable_value(name)),

        ExpressionKind::Unary(op, operand) => {
            let v = eval_node(operand, ctx)?;
            match op {
                UnaryOp::Plus => v.arith_plus(),
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Not => Ok(Value::Boolean(!v.is_truthy())),
                UnaryOp::BitNot => v.bit_not(),
            }
            .map_err(located)
        }

        ExpressionKind::Logical(op, lhs, rhs) => {
            let decided = match op {
                LogicalOp::And => false,
                LogicalOp::Or => true,
            };
            if eval_node(lhs, ctx)?.is_truthy() == decided {
                return Ok(Value::Boolean(decided));
            }
            Ok(Value::Boolean(eval_node(rhs, ctx)?.is_truthy()))
        }

        ExpressionKind::Binary(op, lhs, rhs) => {
            let l = eval_node(lhs, ctx)?;
            let r = eval_node(rhs, ctx)?;
            eval_binop(*op, &l, &r).map_err(located)
        }

        ExpressionKind::Subscript(container, index) => {
            let c = eval_node(container, ctx)?;
            let i = eval_node(index, ctx)?;
            subscript(&c, &i).map_err(located)
        }

        ExpressionKind::Array(elements) => {
            let mut out = ArrayType::with_capacity(elements.len());
            for e in elements {
                match eval_node(e, ctx)? {
                    Value::Range(r) => out.extend(
                        r.to_array()
                            .map_err(|kind| EvaluationError::new(kind, e.location().cloned()))?,
                    ),
                    v => out.push(v),
                }
            }
            Ok(Value::Array(out))
        }

        ExpressionKind::Map(entries) => {
            let mut out = MapType::new();
            for (key, e) in entries {
                out.insert(key.clone(), eval_node(e, ctx)?);
            }
            Ok(Value::Map(out))
        }

        ExpressionKind::Range(from, to) => {
            let bound = |e: &ExpressionNode| -> Result<i64, EvaluationError> {
                eval_node(e, ctx)?
                    .integer_value()
                    .map_err(|kind| EvaluationError::new(kind, e.location().cloned()))
            };
            Ok(Value::Range(IntRange::new(bound(from)?, bound(to)?)))
        }

        ExpressionKind::Case(condition, value) => {
            if eval_node(condition, ctx)?.is_truthy() {
                eval_node(value, ctx)
            } else {
                Ok(Value::Undefined)
            }
        }

        ExpressionKind::Switch(cases) => {
            for case in cases {
                match case.kind() {
                    // A matching condition decides the result, even when its value is Undefined.
                    ExpressionKind::Case(condition, value) => {
                        if eval_node(condition, ctx)?.is_truthy() {
                            return eval_node(value, ctx);
                        }
                    }
                    _ => {
                        let v = eval_node(case, ctx)?;
                        if !v.is_undefined() {
                            return Ok(v);
                        }
                    }
                }
            }
            Ok(Value::Undefined)
        }
    }
}

fn eval_binop(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, ValueError> {
    let compare = |accept: fn(Ordering) -> bool| -> Result<Value, ValueError> {
        Ok(Value::Boolean(accept(l.compare_value(r))))
    };
    match op {
        BinaryOp::Add => l.arith_add(r),
        BinaryOp::Sub => l.arith_sub(r),
        BinaryOp::Mul => l.arith_mul(r),
        BinaryOp::Div => l.arith_div(r),
        BinaryOp::Rem => l.arith_rem(r),

        BinaryOp::BitAnd => l.bit_and(r),
        BinaryOp::BitOr => l.bit_or(r),
        BinaryOp::BitXor => l.bit_xor(r),
        BinaryOp::Shl => l.shift_left(r),
        BinaryOp::Shr => l.shift_right(r),

        BinaryOp::Eq => compare(Ordering::is_eq),
        BinaryOp::Ne => compare(Ordering::is_ne),
        BinaryOp::Lt => compare(Ordering::is_lt),
        BinaryOp::Le => compare(Ordering::is_le),
        BinaryOp::Gt => compare(Ordering::is_gt),
        BinaryOp::Ge => compare(Ordering::is_ge),

    }
}

// ── Subscripts ────────────────────────────────────────────────────────────────

/// Positions picked out of a sequence by an index value.
enum Selection {
    One(u64),
    Many(Vec<u64>),
}

fn position(index: i64, length: u64, container: ValueType) -> Result<u64, ValueError> {
    let length_wide = i128::from(length);
    let resolved = if index < 0 {
        length_wide + i128::from(index)
    } else {
        i128::from(index)
    };
    if resolved < 0 || resolved >= length_wide {
        return Err(ValueError::IndexOutOfRange {
            index,
            container,
            length,
        });
    }
    Ok(resolved as u64)
}

fn select(length: u64, container: ValueType, index: &Value) -> Result<Selection, ValueError> {
    let invalid = |index: &Value| ValueError::InvalidSubscript {
        container,
        index: index.value_type(),
    };
    match index {
        Value::Number(n) => position(*n as i64, length, container).map(Selection::One),
        Value::Range(r) => r
            .check_expandable()?
            .iter()
            .map(|i| position(i, length, container))
            .collect::<Result<_, _>>()
            .map(Selection::Many),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Number(n) => position(*n as i64, length, container),
                other => Err(invalid(other)),
            })
            .collect::<Result<_, _>>()
            .map(Selection::Many),
        other => Err(invalid(other)),
    }
}

fn subscript(container: &Value, index: &Value) -> Result<Value, ValueError> {
    match container {
        Value::Undefined => Ok(Value::Undefined),

        Value::Array(elements) => {
            let at = |i: u64| elements[i as usize].clone();
            Ok(match select(elements.len() as u64, ValueType::Array, index)? {
                Selection::One(i) => at(i),
                Selection::Many(picked) => picked.into_iter().map(at).collect(),
            })
        }

        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(match select(chars.len() as u64, ValueType::String, index)? {
                Selection::One(i) => Value::String(chars[i as usize].to_string()),
                Selection::Many(picked) => {
                    Value::String(picked.into_iter().map(|i| chars[i as usize]).collect())
                }
            })
        }

        Value::Range(r) => {
            let at = |i: u64| r.get(i).map(|n| Value::Number(n as f64)).unwrap_or_default();
            Ok(match select(r.len(), ValueType::Range, index)? {
                Selection::One(i) => at(i),
                Selection::Many(picked) => picked.into_iter().map(at).collect(),
            })
        }

        Value::Map(m) => match index {
            Value::String(key) => Ok(m.get(key).cloned().unwrap_or_default()),
            Value::Array(keys) => {
                let mut sub = MapType::new();
                for key in keys {
                    let Value::String(key) = key else {
                        return Err(ValueError::InvalidSubscript {
                            container: ValueType::Map,
                            index: key.value_type(),
                        });
                    };
                    if let Some(v) = m.get(key) {
                        sub.insert(key.clone(), v.clone());
                    }
                }
                Ok(Value::Map(sub))
            }
            other => Err(ValueError::InvalidSubscript {
                container: ValueType::Map,
                index: other.value_type(),
            }),
        },

        other => Err(ValueError::InvalidSubscript {
            container: other.value_type(),
            index: index.value_type(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::el::expr::Location;
    use crate::el::value::MAX_RANGE_ELEMENTS;
    use crate::var::{NullVariableStore, VariableTable};

    fn eval_in(src: &str, store: &dyn VariableStore) -> Result<Value, EvaluationError> {
        let node = parse(src, ParserMode::Strict).expect("parse failed");
        evaluate(&node, &EvaluationContext::new(store))
    }

    fn eval(src: &str) -> Value {
        eval_in(src, &NullVariableStore).expect("eval failed")
    }

    fn eval_err(src: &str) -> EvaluationError {
        eval_in(src, &NullVariableStore).expect_err("eval should fail")
    }

    fn vars(pairs: &[(&str, Value)]) -> VariableTable {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), Value::Number(42.0));
        assert_eq!(eval("\"hello\""), Value::from("hello"));
        assert_eq!(eval("null"), Value::Null);
        assert_eq!(eval("[1, 'a']"), Value::Array(vec![1i64.into(), "a".into()]));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), Value::Number(14.0));
        assert_eq!(eval("10 % 4"), Value::Number(2.0));
        assert_eq!(eval("1 / 0"), Value::Number(f64::INFINITY));
        assert_eq!(eval("'a' + 'b'"), Value::from("ab"));
        assert_eq!(eval("-(3 + 2)"), Value::Number(-5.0));
        assert_eq!(eval("6 & 3 | 8"), Value::Number(10.0));
        assert_eq!(eval("1 << 4"), Value::Number(16.0));
        assert_eq!(eval("~0"), Value::Number(-1.0));
    }

    #[test]
    fn numeric_equality_is_exact() {
        assert_eq!(eval("1.0 == 1"), Value::Boolean(true));
        assert_eq!(eval("0.1 + 0.2 == 0.3"), Value::Boolean(false));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("1 < 2"), Value::Boolean(true));
        assert_eq!(eval("'2' == 2"), Value::Boolean(true));
        assert_eq!(eval("null == 0"), Value::Boolean(false));
        assert_eq!(eval("undefined_name == null"), Value::Boolean(false));
        assert_eq!(eval("'abc' < 'abd'"), Value::Boolean(true));
        assert_eq!(eval("[1, 2] != [1, 2]"), Value::Boolean(false));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval("false && 1 + []"), Value::Boolean(false));
        assert_eq!(eval("true || [][5]"), Value::Boolean(true));
        assert_eq!(eval("1 && 'x'"), Value::Boolean(true));
        assert_eq!(eval("!0"), Value::Boolean(true));
    }

    #[test]
    fn missing_variable_is_undefined() {
        let v = eval("missing");
        assert_eq!(v, Value::Undefined);
        assert_eq!(v.convert_to(ValueType::String), Ok(Value::from("")));
        assert_eq!(eval("missing.path[3]"), Value::Undefined);
    }

    #[test]
    fn variables_are_resolved() {
        let store = vars(&[("spawnflags", 3i64.into()), ("name", "ogre".into())]);
        assert_eq!(eval_in("spawnflags & 2", &store), Ok(Value::Number(2.0)));
        assert_eq!(eval_in("name + '.mdl'", &store), Ok(Value::from("ogre.mdl")));
    }

    #[test]
    fn non_numeric_string_in_bitwise_op_is_located() {
        let store = vars(&[("spawnflags", "a".into())]);
        let err = eval_in("{{ spawnflags & 2 -> 'x' }}", &store).unwrap_err();
        assert!(matches!(err.kind, ValueError::Conversion { .. }));
        assert!(err.kind.is_type_error());
        assert_eq!(err.location, Some(Location::new(1, 4)));
    }

    #[test]
    fn error_reports_deepest_failing_node() {
        let err = eval_err("1 + (2 * 'x')");
        assert_eq!(err.location, Some(Location::new(1, 6)));
        let err = eval_err("1..'a'");
        assert_eq!(err.location, Some(Location::new(1, 4)));
    }

    #[test]
    fn map_indexing() {
        assert_eq!(eval("{'a': 1}['a']"), Value::Number(1.0));
        assert_eq!(eval("{'a': 1}.a"), Value::Number(1.0));
        assert_eq!(eval("{'a': 1}['b']"), Value::Undefined);
        assert_eq!(
            eval("{'a': 1, 'b': 2, 'c': 3}[['a', 'c', 'z']]"),
            eval("{'a': 1, 'c': 3}")
        );
        assert!(eval_err("{'a': 1}[0]").kind.is_type_error());
    }

    #[test]
    fn array_indexing() {
        assert_eq!(eval("[1, 2, 3][0]"), Value::Number(1.0));
        assert_eq!(eval("[1, 2, 3][-1]"), Value::Number(3.0));
        assert_eq!(eval("[1, 2, 3][1..2]"), eval("[2, 3]"));
        assert_eq!(eval("[1, 2, 3][[2, 0]]"), eval("[3, 1]"));
        let err = eval_err("[1, 2, 3][3]");
        assert_eq!(
            err.kind,
            ValueError::IndexOutOfRange {
                index: 3,
                container: ValueType::Array,
                length: 3
            }
        );
        assert!(eval_err("[1][-2]").kind.is_index_error());
    }

    #[test]
    fn string_and_range_indexing() {
        assert_eq!(eval("'hello'[1]"), Value::from("e"));
        assert_eq!(eval("'hello'[1..3]"), Value::from("ell"));
        assert_eq!(eval("'hello'[-1]"), Value::from("o"));
        assert_eq!(eval("(5..1)[1]"), Value::Number(4.0));
        assert!(eval_err("true[0]").kind.is_type_error());
    }

    #[test]
    fn ranges() {
        assert_eq!(eval("1..3"), Value::Range(IntRange::new(1, 3)));
        assert_eq!(eval("1.9..3.2"), Value::Range(IntRange::new(1, 3)));
        assert_eq!(eval("[0, 1..3]"), eval("[0, 1, 2, 3]"));
        assert_eq!(eval("[3..1]"), eval("[3, 2, 1]"));
    }

    #[test]
    fn wide_ranges_fail_instead_of_expanding() {
        let too_large = ValueError::RangeTooLarge {
            from: 0,
            to: 1_000_000_000_000,
            limit: MAX_RANGE_ELEMENTS,
        };
        let err = eval_err("[0..1e12]");
        assert_eq!(err.kind, too_large);
        assert_eq!(err.location, Some(Location::new(1, 2)));
        assert_eq!(eval_err("(0..1e12)[0..1e12]").kind, too_large);
        assert!(!err.kind.is_type_error() && !err.kind.is_index_error());

        // Single elements are computed without expanding the range.
        assert_eq!(eval("(0..1e12)[-1]"), Value::Number(1e12));
        let widest = format!("[0..{}]", MAX_RANGE_ELEMENTS - 1);
        assert_eq!(eval(&widest).as_array().map(Vec::len), Some(MAX_RANGE_ELEMENTS as usize));
    }

    #[test]
    fn range_indexing_at_integer_limits() {
        assert_eq!(eval("(-9e18..9e18)[0]"), Value::Number(-9e18));
        assert_eq!(eval("(-9e18..9e18)[-1]"), Value::Number(9e18));
        assert_eq!(eval("(9e18..-9e18)[-1]"), Value::Number(-9e18));
        assert!(matches!(
            eval_err("[-9e18..9e18]").kind,
            ValueError::RangeTooLarge { .. }
        ));
        assert!(eval_err("(1..3)[3]").kind.is_index_error());
    }

    #[test]
    fn long_flat_sum() {
        let sum = vec!["1"; 130].join(" + ");
        assert_eq!(eval(&sum), Value::Number(130.0));
    }

    #[test]
    fn switch_first_match_wins() {
        let store = vars(&[("a", true.into()), ("b", true.into())]);
        assert_eq!(eval_in("{{ a -> 1, b -> 2, 3 }}", &store), Ok(Value::Number(1.0)));
        assert_eq!(eval_in("{{ !a -> 1, b -> 2, 3 }}", &store), Ok(Value::Number(2.0)));
        assert_eq!(eval_in("{{ !a -> 1, !b -> 2, 3 }}", &store), Ok(Value::Number(3.0)));
    }

    #[test]
    fn switch_without_match_is_undefined() {
        assert_eq!(eval("{{ false -> 1, 0 -> 2 }}"), Value::Undefined);
    }

    #[test]
    fn matching_case_with_undefined_value_stops_the_switch() {
        assert_eq!(eval("{{ true -> missing, 2 }}"), Value::Undefined);
    }

    #[test]
    fn undefined_default_falls_through() {
        let combined = ExpressionNode::combine(
            ExpressionNode::undefined(),
            ExpressionNode::literal("tex_b"),
        );
        let ctx = EvaluationContext::new(&NullVariableStore);
        assert_eq!(ctx.evaluate(&combined), Ok(Value::from("tex_b")));
        let combined = ExpressionNode::combine(
            ExpressionNode::literal("tex_a"),
            ExpressionNode::literal("tex_b"),
        );
        assert_eq!(ctx.evaluate(&combined), Ok(Value::from("tex_a")));
    }

    #[test]
    fn nested_switch_in_map() {
        let store = vars(&[("spawnflags", 1i64.into())]);
        let src = r#"{ "path": {{ spawnflags & 1 -> ":maps/b_bh10.bsp", ":maps/b_bh25.bsp" }} }"#;
        assert_eq!(
            eval_in(src, &store),
            Ok(Value::Map([("path".to_string(), Value::from(":maps/b_bh10.bsp"))].into()))
        );
    }

    #[test]
    fn eval_str_reports_both_error_kinds() {
        assert!(matches!(
            eval_str("1 +", ParserMode::Strict, &NullVariableStore),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            eval_str("[] - 1", ParserMode::Strict, &NullVariableStore),
            Err(Error::Evaluation(_))
        ));
        assert_eq!(
            with_evaluation_context(&NullVariableStore, |ctx| ctx.variable_value("x")),
            Value::Undefined
        );
    }
}
