//! Runtime value type for the expression language.
//!
//! EL is dynamically typed. A [`Value`] is one of a closed set of variants;
//! conversions between them follow a fixed table (see [`Value::convert_to`])
//! and every value can be compared with every other value through a total
//! order that ranks by [`ValueType`] first.
//!
//! Numeric equality is exact. `1.0 == 1` holds because both are the same
//! `f64`, while `0.1 + 0.2 == 0.3` does not: there is no epsilon.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use super::error::ValueError;

/// Variant tag of a [`Value`].
///
/// The declaration order is the cross-type ordering used by [`Value`]'s
/// `Ord` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Map,
    Range,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Undefined => "Undefined",
            ValueType::Null => "Null",
            ValueType::Boolean => "Boolean",
            ValueType::Number => "Number",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Map => "Map",
            ValueType::Range => "Range",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inclusive integer interval. Descending when `from > to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntRange {
    pub from: i64,
    pub to: i64,
}

/// Largest number of elements a range expands to.
pub const MAX_RANGE_ELEMENTS: u64 = 1 << 20;

impl IntRange {
    pub fn new(from: i64, to: i64) -> Self {
        IntRange { from, to }
    }

    /// Number of integers covered by the range, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        self.from.abs_diff(self.to).saturating_add(1)
    }

    /// Never true: an inclusive range always covers at least one integer.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The integer `offset` steps from `from`, if the range covers it.
    pub fn get(&self, offset: u64) -> Option<i64> {
        if offset >= self.len() {
            return None;
        }
        let step = i128::from(offset);
        let n = if self.from <= self.to {
            i128::from(self.from) + step
        } else {
            i128::from(self.from) - step
        };
        i64::try_from(n).ok()
    }

    /// Iterate from `from` towards `to`, both inclusive.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        let range = *self;
        (0..range.len()).map_while(move |i| range.get(i))
    }

    /// Fail with [`ValueError::RangeTooLarge`] when the range covers more
    /// than [`MAX_RANGE_ELEMENTS`] integers.
    pub fn check_expandable(&self) -> Result<&Self, ValueError> {
        if self.len() > MAX_RANGE_ELEMENTS {
            return Err(ValueError::RangeTooLarge {
                from: self.from,
                to: self.to,
                limit: MAX_RANGE_ELEMENTS,
            });
        }
        Ok(self)
    }

    /// The covered integers as an array of numbers.
    pub fn to_array(&self) -> Result<ArrayType, ValueError> {
        Ok(self
            .check_expandable()?
            .iter()
            .map(|i| Value::Number(i as f64))
            .collect())
    }
}

/// Map payload. Sorted by key so that equality ignores insertion order.
pub type MapType = BTreeMap<String, Value>;

/// Array payload.
pub type ArrayType = Vec<Value>;

/// An EL runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absence of a value, e.g. a variable that is not bound.
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(ArrayType),
    Map(MapType),
    Range(IntRange),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Undefined,
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Map(_) => ValueType::Map,
            Value::Range(_) => ValueType::Range,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapType> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Truthiness used by conditions and logical operators.
    ///
    /// Scalars follow the Boolean conversion; arrays and maps are truthy when
    /// non-empty and ranges always are.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => string_truthy(s),
            Value::Array(a) => !a.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Range(_) => true,
        }
    }

    /// Look up `key` if this is a map; anything else yields `Undefined`.
    pub fn at_or_default(&self, key: &str) -> Value {
        match self {
            Value::Map(m) => m.get(key).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    // ── Conversions ───────────────────────────────────────────────────────────

    /// Convert to `target`, or fail with [`ValueError::Conversion`].
    pub fn convert_to(&self, target: ValueType) -> Result<Value, ValueError> {
        if self.value_type() == target {
            return Ok(self.clone());
        }
        if let (Value::Range(r), ValueType::Array) = (self, target) {
            return r.to_array().map(Value::Array);
        }
        let converted = match (self, target) {
            (Value::Boolean(b), ValueType::Number) => Some(Value::Number(if *b { 1.0 } else { 0.0 })),
            (Value::Boolean(b), ValueType::String) => Some(Value::String(b.to_string())),

            (Value::Number(n), ValueType::Boolean) => Some(Value::Boolean(*n != 0.0)),
            (Value::Number(n), ValueType::String) => Some(Value::String(format_number(*n))),

            (Value::String(s), ValueType::Boolean) => Some(Value::Boolean(string_truthy(s))),
            (Value::String(s), ValueType::Number) => parse_number(s).map(Value::Number),

            (Value::Null, ValueType::Boolean) => Some(Value::Boolean(false)),
            (Value::Null, ValueType::Number) => Some(Value::Number(0.0)),
            (Value::Null, ValueType::String) => Some(Value::String(String::new())),

            (Value::Undefined, ValueType::Boolean) => Some(Value::Boolean(false)),
            (Value::Undefined, ValueType::String) => Some(Value::String(String::new())),

            _ => None,
        };
        converted.ok_or_else(|| self.conversion_error(target))
    }

    /// Shorthand for a conversion to `Number`.
    pub fn number_value(&self) -> Result<f64, ValueError> {
        match self.convert_to(ValueType::Number)? {
            Value::Number(n) => Ok(n),
            _ => Err(self.conversion_error(ValueType::Number)),
        }
    }

    /// Shorthand for a conversion to `Number` truncated to an integer.
    pub fn integer_value(&self) -> Result<i64, ValueError> {
        Ok(self.number_value()? as i64)
    }

    /// Shorthand for a conversion to `String`.
    pub fn string_value(&self) -> Result<String, ValueError> {
        match self.convert_to(ValueType::String)? {
            Value::String(s) => Ok(s),
            _ => Err(self.conversion_error(ValueType::String)),
        }
    }

    fn conversion_error(&self, to: ValueType) -> ValueError {
        ValueError::Conversion {
            value: self.describe(),
            from: self.value_type(),
            to,
        }
    }

    /// Render as EL source text (strings quoted and escaped).
    pub fn describe(&self) -> String {
        self.to_string()
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    fn numeric_operands(
        operator: &'static str,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<(f64, f64), ValueError> {
        if !lhs.is_numeric_operand() || !rhs.is_numeric_operand() {
            return Err(ValueError::InvalidOperands {
                operator,
                lhs: lhs.value_type(),
                rhs: rhs.value_type(),
            });
        }
        Ok((lhs.number_value()?, rhs.number_value()?))
    }

    fn integer_operands(
        operator: &'static str,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<(i64, i64), ValueError> {
        let (a, b) = Self::numeric_operands(operator, lhs, rhs)?;
        Ok((a as i64, b as i64))
    }

    fn is_numeric_operand(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_) | Value::Range(_))
    }

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, ValueError> {
        match (self, rhs) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::Map(a), Value::Map(b)) => {
                let mut merged = a.clone();
                merged.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(Value::Map(merged))
            }
            _ => {
                let (a, b) = Self::numeric_operands("+", self, rhs)?;
                Ok(Value::Number(a + b))
            }
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::numeric_operands("-", self, rhs)?;
        Ok(Value::Number(a - b))
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::numeric_operands("*", self, rhs)?;
        Ok(Value::Number(a * b))
    }

    /// IEEE division: `1 / 0` is infinity.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::numeric_operands("/", self, rhs)?;
        Ok(Value::Number(a / b))
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::numeric_operands("%", self, rhs)?;
        Ok(Value::Number(a % b))
    }

    pub fn arith_neg(&self) -> Result<Value, ValueError> {
        Ok(Value::Number(-self.unary_number("-")?))
    }

    pub fn arith_plus(&self) -> Result<Value, ValueError> {
        Ok(Value::Number(self.unary_number("+")?))
    }

    pub fn bit_not(&self) -> Result<Value, ValueError> {
        Ok(Value::Number(!(self.unary_number("~")? as i64) as f64))
    }

    fn unary_number(&self, operator: &'static str) -> Result<f64, ValueError> {
        if !self.is_numeric_operand() {
            return Err(ValueError::InvalidOperand {
                operator,
                operand: self.value_type(),
            });
        }
        self.number_value()
    }

    pub fn bit_and(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::integer_operands("&", self, rhs)?;
        Ok(Value::Number((a & b) as f64))
    }

    pub fn bit_or(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::integer_operands("|", self, rhs)?;
        Ok(Value::Number((a | b) as f64))
    }

    pub fn bit_xor(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::integer_operands("^", self, rhs)?;
        Ok(Value::Number((a ^ b) as f64))
    }

    pub fn shift_left(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::integer_operands("<<", self, rhs)?;
        Ok(Value::Number(a.wrapping_shl((b & 63) as u32) as f64))
    }

    pub fn shift_right(&self, rhs: &Value) -> Result<Value, ValueError> {
        let (a, b) = Self::integer_operands(">>", self, rhs)?;
        Ok(Value::Number(a.wrapping_shr((b & 63) as u32) as f64))
    }

    /// Comparison used by `==`, `<` and friends.
    ///
    /// A number compared with a string or boolean converts the other side to
    /// a number when it can; all other pairs use the structural total order.
    /// `Null` and `Undefined` are never coerced.
    pub fn compare_value(&self, rhs: &Value) -> Ordering {
        let coercible = |v: &Value| matches!(v, Value::String(_) | Value::Boolean(_));
        match (self, rhs) {
            (Value::Number(a), other) if coercible(other) => match other.number_value() {
                Ok(b) => compare_numbers(*a, b),
                Err(_) => self.cmp(rhs),
            },
            (other, Value::Number(b)) if coercible(other) => match other.number_value() {
                Ok(a) => compare_numbers(a, *b),
                Err(_) => self.cmp(rhs),
            },
            _ => self.cmp(rhs),
        }
    }
}

fn string_truthy(s: &str) -> bool {
    !s.is_empty() && s != "false"
}

/// Numbers sort numerically with NaN last; `-0.0` equals `0.0`.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Locale-independent decimal formatting.
///
/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Locale-independent decimal parsing. Blank input is zero.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    let well_formed = s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.chars().any(|c| c.is_ascii_digit());
    if !well_formed {
        return None;
    }
    s.parse().ok()
}

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write_escaped(f, s),
            Value::Array(a) => {
                f.write_str("[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_escaped(f, k)?;
                    write!(f, ": {v}")?;
                }
                f.write_str("}")
            }
            Value::Range(r) => write!(f, "{}..{}", r.from, r.to),
        }
    }
}

// ── Ordering ──────────────────────────────────────────────────────────────────

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => compare_numbers(*a, *b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Range(a), Value::Range(b)) => a.cmp(b),
            _ => self.value_type().cmp(&other.value_type()),
        }
    }
}

// ── Constructors ──────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<ArrayType> for Value {
    fn from(a: ArrayType) -> Self {
        Value::Array(a)
    }
}

impl From<MapType> for Value {
    fn from(m: MapType) -> Self {
        Value::Map(m)
    }
}

impl From<IntRange> for Value {
    fn from(r: IntRange) -> Self {
        Value::Range(r)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        entries.iter().map(|(k, v)| ((*k).to_owned(), v.clone())).collect()
    }

    #[test]
    fn display_number() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(-7.0).to_string(), "-7");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
    }

    #[test]
    fn display_composites() {
        let v = map(&[("b", Value::from(1i64)), ("a", Value::from("x\"y"))]);
        assert_eq!(v.to_string(), r#"{"a": "x\"y", "b": 1}"#);
        let a: Value = vec![Value::Null, Value::Boolean(true)].into();
        assert_eq!(a.to_string(), "[null, true]");
        assert_eq!(Value::Range(IntRange::new(1, 3)).to_string(), "1..3");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }

    #[test]
    fn value_type_tags() {
        assert_eq!(Value::Undefined.value_type(), ValueType::Undefined);
        assert_eq!(Value::from("s").value_type(), ValueType::String);
        assert_eq!(Value::from(IntRange::new(0, 1)).value_type(), ValueType::Range);
        assert_eq!(ValueType::Map.to_string(), "Map");
    }

    #[test]
    fn boolean_number_conversion() {
        assert_eq!(Value::Boolean(true).convert_to(ValueType::Number), Ok(Value::Number(1.0)));
        assert_eq!(Value::Boolean(false).convert_to(ValueType::Number), Ok(Value::Number(0.0)));
        assert_eq!(Value::Number(-2.0).convert_to(ValueType::Boolean), Ok(Value::Boolean(true)));
        assert_eq!(Value::Number(0.0).convert_to(ValueType::Boolean), Ok(Value::Boolean(false)));
    }

    #[test]
    fn string_number_conversion() {
        assert_eq!(Value::from(" 12.5 ").number_value(), Ok(12.5));
        assert_eq!(Value::from("").number_value(), Ok(0.0));
        assert_eq!(Value::from("-1e2").number_value(), Ok(-100.0));
        assert!(Value::from("abc").number_value().is_err());
        assert!(Value::from("inf").number_value().is_err());
        assert_eq!(Value::Number(3.0).string_value(), Ok("3".to_owned()));
        assert_eq!(Value::Number(0.25).string_value(), Ok("0.25".to_owned()));
    }

    #[test]
    fn null_and_undefined_conversion() {
        assert_eq!(Value::Null.string_value(), Ok(String::new()));
        assert_eq!(Value::Undefined.string_value(), Ok(String::new()));
        assert_eq!(Value::Null.convert_to(ValueType::Boolean), Ok(Value::Boolean(false)));
        assert_eq!(Value::Undefined.convert_to(ValueType::Boolean), Ok(Value::Boolean(false)));
        assert_eq!(Value::Null.number_value(), Ok(0.0));
        assert!(Value::Undefined.number_value().is_err());
        assert!(Value::Null.convert_to(ValueType::Array).is_err());
        assert!(Value::Undefined.convert_to(ValueType::Array).is_err());
    }

    #[test]
    fn identity_conversion() {
        let v = map(&[("k", Value::from(1i64))]);
        assert_eq!(v.convert_to(ValueType::Map), Ok(v.clone()));
        assert_eq!(Value::Null.convert_to(ValueType::Null), Ok(Value::Null));
    }

    #[test]
    fn impossible_conversion_is_type_error() {
        let err = Value::Array(vec![]).convert_to(ValueType::Number).unwrap_err();
        assert!(err.is_type_error());
        assert!(matches!(
            err,
            ValueError::Conversion { from: ValueType::Array, to: ValueType::Number, .. }
        ));
    }

    #[test]
    fn range_to_array() {
        let r = Value::Range(IntRange::new(3, 1));
        assert_eq!(
            r.convert_to(ValueType::Array),
            Ok(Value::Array(vec![3i64.into(), 2i64.into(), 1i64.into()]))
        );
    }

    #[test]
    fn exact_numeric_equality() {
        assert_eq!(Value::Number(1.0), Value::from(1i64));
        let sum = Value::Number(0.1).arith_add(&Value::Number(0.2)).unwrap();
        assert_ne!(sum, Value::Number(0.3));
    }

    #[test]
    fn type_order_across_variants() {
        let mut values = vec![
            Value::Range(IntRange::new(0, 0)),
            Value::from("a"),
            Value::Null,
            Value::Number(5.0),
            Value::Undefined,
            Value::Boolean(false),
        ];
        values.sort();
        let tags: Vec<_> = values.iter().map(Value::value_type).collect();
        assert_eq!(
            tags,
            vec![
                ValueType::Undefined,
                ValueType::Null,
                ValueType::Boolean,
                ValueType::Number,
                ValueType::String,
                ValueType::Range,
            ]
        );
    }

    #[test]
    fn map_equality_ignores_insertion_order() {
        let a = map(&[("x", 1i64.into()), ("y", 2i64.into())]);
        let b = map(&[("y", 2i64.into()), ("x", 1i64.into())]);
        assert_eq!(a, b);
    }

    #[test]
    fn addition_variants() {
        assert_eq!(Value::from("ab").arith_add(&Value::from("cd")), Ok(Value::from("abcd")));
        assert_eq!(Value::from("2").arith_add(&Value::Number(3.0)), Ok(Value::Number(5.0)));
        let joined = Value::Array(vec![1i64.into()]).arith_add(&Value::Array(vec![2i64.into()]));
        assert_eq!(joined, Ok(Value::Array(vec![1i64.into(), 2i64.into()])));
        let merged = map(&[("a", 1i64.into())]).arith_add(&map(&[("a", 2i64.into()), ("b", 3i64.into())]));
        assert_eq!(merged, Ok(map(&[("a", 2i64.into()), ("b", 3i64.into())])));
    }

    #[test]
    fn arithmetic_on_composites_fails() {
        let err = Value::Array(vec![]).arith_mul(&Value::Number(2.0)).unwrap_err();
        assert!(matches!(err, ValueError::InvalidOperands { operator: "*", .. }));
        assert!(Value::Undefined.arith_sub(&Value::Number(1.0)).is_err());
    }

    #[test]
    fn division_follows_ieee() {
        assert_eq!(Value::Number(1.0).arith_div(&Value::Number(0.0)), Ok(Value::Number(f64::INFINITY)));
        assert_eq!(Value::Number(7.0).arith_rem(&Value::Number(4.0)), Ok(Value::Number(3.0)));
    }

    #[test]
    fn bitwise() {
        let five = Value::Number(5.0);
        assert_eq!(five.bit_and(&Value::Number(3.0)), Ok(Value::Number(1.0)));
        assert_eq!(five.bit_or(&Value::Number(2.0)), Ok(Value::Number(7.0)));
        assert_eq!(five.bit_xor(&Value::Number(3.0)), Ok(Value::Number(6.0)));
        assert_eq!(Value::Number(1.0).shift_left(&Value::Number(3.0)), Ok(Value::Number(8.0)));
        assert_eq!(Value::Number(8.0).shift_right(&Value::Number(2.0)), Ok(Value::Number(2.0)));
        assert_eq!(Value::Number(0.0).bit_not(), Ok(Value::Number(-1.0)));
        assert!(Value::from("a").bit_and(&Value::Number(2.0)).is_err());
    }

    #[test]
    fn compare_coerces_numeric_strings() {
        assert_eq!(Value::from("1").compare_value(&Value::Number(1.0)), Ordering::Equal);
        assert_eq!(Value::Number(2.0).compare_value(&Value::from("10")), Ordering::Less);
        assert_eq!(Value::Boolean(true).compare_value(&Value::Number(1.0)), Ordering::Equal);
        assert_ne!(Value::Null.compare_value(&Value::Number(0.0)), Ordering::Equal);
        assert_ne!(Value::Undefined.compare_value(&Value::Null), Ordering::Equal);
        // Non-numeric strings fall back to the type order.
        assert_eq!(Value::from("x").compare_value(&Value::Number(1.0)), Ordering::Greater);
    }

    #[test]
    fn truthiness() {
        assert!(Value::from("yes").is_truthy());
        assert!(!Value::from("false").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Undefined.is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Range(IntRange::new(0, 0)).is_truthy());
    }

    #[test]
    fn at_or_default() {
        let m = map(&[("material", "decal1".into())]);
        assert_eq!(m.at_or_default("material"), Value::from("decal1"));
        assert_eq!(m.at_or_default("nope"), Value::Undefined);
        assert_eq!(Value::from("s").at_or_default("material"), Value::Undefined);
    }

    #[test]
    fn int_range_iteration() {
        assert_eq!(IntRange::new(1, 3).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(IntRange::new(-1, -3).iter().collect::<Vec<_>>(), vec![-1, -2, -3]);
        assert_eq!(IntRange::new(4, 4).len(), 1);
    }

    #[test]
    fn int_range_at_integer_limits() {
        let full = IntRange::new(i64::MIN, i64::MAX);
        assert_eq!(full.len(), u64::MAX);
        assert_eq!(full.get(0), Some(i64::MIN));
        assert_eq!(full.get(u64::MAX - 1), Some(i64::MAX - 1));
        assert!(full.check_expandable().is_err());

        let top = IntRange::new(i64::MAX - 1, i64::MAX);
        assert_eq!(top.iter().collect::<Vec<_>>(), vec![i64::MAX - 1, i64::MAX]);
        let bottom = IntRange::new(i64::MIN + 1, i64::MIN);
        assert_eq!(bottom.iter().collect::<Vec<_>>(), vec![i64::MIN + 1, i64::MIN]);
        assert_eq!(bottom.get(2), None);
    }

    #[test]
    fn wide_range_does_not_convert_to_array() {
        let wide = Value::Range(IntRange::new(0, MAX_RANGE_ELEMENTS as i64));
        assert!(matches!(
            wide.convert_to(ValueType::Array),
            Err(ValueError::RangeTooLarge { from: 0, .. })
        ));
        let fits = Value::Range(IntRange::new(1, MAX_RANGE_ELEMENTS as i64));
        assert_eq!(
            fits.convert_to(ValueType::Array).ok().and_then(|v| v.as_array().map(Vec::len)),
            Some(MAX_RANGE_ELEMENTS as usize)
        );
    }
}
