//! Dynamic value representation and SQL-style coercion rules.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The coarse type tag carried by a [`crate::table::Column`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    Text,
    Timestamp,
    Uuid,
    /// Type not yet pinned down; resolved on first non-null insert.
    Any,
}

impl DataType {
    /// Maps the tokenizer's coarse type-name keyword to a `DataType`.
    /// Unknown types are not possible here: the parser falls back to
    /// `Text` for any type keyword it doesn't recognize as a type at all.
    #[must_use]
    pub const fn from_keyword(kw: crate::lexer::Keyword) -> Option<Self> {
        use crate::lexer::Keyword;
        Some(match kw {
            Keyword::Int => Self::Int,
            Keyword::Float => Self::Float,
            Keyword::Bit => Self::Bool,
            Keyword::Varchar => Self::Text,
            Keyword::Datetime => Self::Timestamp,
            Keyword::UniqueIdentifier => Self::Uuid,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Bool => "Bool",
            Self::Text => "Text",
            Self::Timestamp => "Timestamp",
            Self::Uuid => "Uuid",
            Self::Any => "Any",
        }
    }
}

/// A dynamically typed SQL value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Any,
            Self::Bool(_) => DataType::Bool,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Text(_) => DataType::Text,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::Uuid(_) => DataType::Uuid,
        }
    }

    /// Boolean coercion: null is false, numbers are nonzero, text is
    /// nonempty, everything else (timestamps, uuids, bools) is true.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Timestamp(_) | Self::Uuid(_) => true,
        }
    }

    /// Best-effort coercion to `f64` via textual parsing fallback.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Timestamp(_) | Self::Uuid(_) => None,
        }
    }

    /// Best-effort coercion to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Text(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64)),
            Self::Null | Self::Timestamp(_) | Self::Uuid(_) => None,
        }
    }

    /// Returns whether a binary op's operands should be treated as integral
    /// (both sides int-typed and the op is not division).
    #[must_use]
    fn is_int_like(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Bool(_))
            || matches!(self, Self::Text(s) if s.trim().parse::<i64>().is_ok())
    }

    /// Renders the value as display text, used by string functions,
    /// `CONCAT`/`+`, and the `DISTINCT`/`GROUP BY` textual key.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Text(s) => s.clone(),
            Self::Timestamp(t) => t.to_rfc3339(),
            Self::Uuid(u) => u.to_string(),
        }
    }

    /// Numeric `+`/`-`/`*`/`%` between two values, promoting to float unless
    /// both sides are integral. `/` always promotes to float per spec.
    #[must_use]
    pub fn numeric_binary(lhs: &Self, rhs: &Self, op: NumericOp) -> Option<Self> {
        if lhs.is_null() || rhs.is_null() {
            return Some(Self::Null);
        }
        let use_int = op != NumericOp::Div && lhs.is_int_like() && rhs.is_int_like();
        if use_int {
            let a = lhs.as_i64()?;
            let b = rhs.as_i64()?;
            return Some(match op {
                NumericOp::Add => Self::Int(a.wrapping_add(b)),
                NumericOp::Sub => Self::Int(a.wrapping_sub(b)),
                NumericOp::Mul => Self::Int(a.wrapping_mul(b)),
                NumericOp::Mod => {
                    if b == 0 {
                        return None;
                    }
                    Self::Int(a % b)
                }
                NumericOp::Div => unreachable!(),
            });
        }
        let a = lhs.as_f64()?;
        let b = rhs.as_f64()?;
        Some(match op {
            NumericOp::Add => Self::Float(a + b),
            NumericOp::Sub => Self::Float(a - b),
            NumericOp::Mul => Self::Float(a * b),
            NumericOp::Div => {
                if b == 0.0 {
                    return None;
                }
                Self::Float(a / b)
            }
            NumericOp::Mod => {
                if b == 0.0 {
                    return None;
                }
                Self::Float(a % b)
            }
        })
    }

    /// `+`, which is polymorphic: string concatenation if either side is
    /// text, numeric addition otherwise.
    #[must_use]
    pub fn add_or_concat(lhs: &Self, rhs: &Self) -> Self {
        if matches!(lhs, Self::Text(_)) || matches!(rhs, Self::Text(_)) {
            if lhs.is_null() || rhs.is_null() {
                return Self::Null;
            }
            let mut s = lhs.to_display_string();
            s.push_str(&rhs.to_display_string());
            return Self::Text(s);
        }
        Self::numeric_binary(lhs, rhs, NumericOp::Add).unwrap_or(Self::Null)
    }

    /// Equality: case-insensitive for text, numeric for int/float
    /// regardless of the split between the two, structural otherwise.
    #[must_use]
    pub fn values_equal(lhs: &Self, rhs: &Self) -> bool {
        match (lhs, rhs) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Text(a), Self::Text(b)) => a.eq_ignore_ascii_case(b),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Int(_) | Self::Float(_) | Self::Bool(_), Self::Int(_) | Self::Float(_)) => {
                lhs.as_f64() == rhs.as_f64()
            }
            (Self::Int(_) | Self::Float(_), Self::Bool(_)) => lhs.as_f64() == rhs.as_f64(),
            _ => false,
        }
    }

    /// Total order used by `ORDER BY`, `MIN`/`MAX`, and `BETWEEN`: nulls
    /// sort first, numbers compare numerically, timestamps chronologically,
    /// otherwise case-insensitive text comparison.
    #[must_use]
    pub fn compare_total(lhs: &Self, rhs: &Self) -> Ordering {
        match (lhs, rhs) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Int(_) | Self::Float(_) | Self::Bool(_), Self::Int(_) | Self::Float(_) | Self::Bool(_)) => {
                let a = lhs.as_f64().unwrap_or(0.0);
                let b = rhs.as_f64().unwrap_or(0.0);
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            _ => lhs
                .to_display_string()
                .to_ascii_lowercase()
                .cmp(&rhs.to_display_string().to_ascii_lowercase()),
        }
    }

    /// Coerces a value to `target`, used on table writes and by `CAST`.
    /// Nulls always pass through unchanged.
    pub fn coerce(&self, target: DataType) -> Result<Self, crate::error::Error> {
        if self.is_null() {
            return Ok(Self::Null);
        }
        Ok(match target {
            DataType::Any => self.clone(),
            DataType::Int => Self::Int(self.as_i64().ok_or_else(|| mismatch(self, target))?),
            DataType::Float => Self::Float(self.as_f64().ok_or_else(|| mismatch(self, target))?),
            DataType::Bool => Self::Bool(self.is_truthy()),
            DataType::Text => Self::Text(self.to_display_string()),
            DataType::Timestamp => match self {
                Self::Timestamp(t) => Self::Timestamp(*t),
                Self::Text(s) => Self::Timestamp(parse_timestamp(s).ok_or_else(|| mismatch(self, target))?),
                _ => return Err(mismatch(self, target)),
            },
            DataType::Uuid => match self {
                Self::Uuid(u) => Self::Uuid(*u),
                Self::Text(s) => Self::Uuid(Uuid::parse_str(s.trim()).map_err(|_| mismatch(self, target))?),
                _ => return Err(mismatch(self, target)),
            },
        })
    }
}

fn mismatch(value: &Value, target: DataType) -> crate::error::Error {
    crate::error::Error::TypeMismatch {
        value: value.to_display_string(),
        target: target.display_name(),
    }
}

/// Parses an ISO-8601-ish timestamp, falling back to date-only.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(
            date.and_hms_opt(0, 0, 0)?,
            Utc,
        ));
    }
    None
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.0}")
    } else {
        let mut s = format!("{f}");
        if !s.contains('.') && !s.contains('e') {
            s.push_str(".0");
        }
        s
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Self::values_equal(self, other)
    }
}

/// The arithmetic operator family handled by [`Value::numeric_binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_coercion_rules() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Text("x".into()).is_truthy());
    }

    #[test]
    fn plus_is_polymorphic() {
        let sum = Value::add_or_concat(&Value::Int(1), &Value::Int(2));
        assert!(matches!(sum, Value::Int(3)));
        let concat = Value::add_or_concat(&Value::Text("a".into()), &Value::Int(1));
        match concat {
            Value::Text(s) => assert_eq!(s, "a1"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn equality_is_case_insensitive_for_text() {
        assert!(Value::values_equal(
            &Value::Text("Hello".into()),
            &Value::Text("hello".into())
        ));
    }

    #[test]
    fn equality_ignores_int_float_split() {
        assert!(Value::values_equal(&Value::Int(2), &Value::Float(2.0)));
    }

    #[test]
    fn total_order_sorts_null_first() {
        assert_eq!(
            Value::compare_total(&Value::Null, &Value::Int(0)),
            Ordering::Less
        );
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(Value::numeric_binary(&Value::Int(1), &Value::Int(0), NumericOp::Div).is_none());
    }

    #[test]
    fn coerce_text_to_int() {
        let v = Value::Text("42".into()).coerce(DataType::Int).unwrap();
        assert!(matches!(v, Value::Int(42)));
    }

    #[test]
    fn coerce_rejects_non_numeric_text_as_int() {
        assert!(Value::Text("abc".into()).coerce(DataType::Int).is_err());
    }
}
