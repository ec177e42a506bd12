//! Scalar values and the kind lattice used for column type inference.
//!
//! Every non-null value belongs to exactly one [`Kind`]. Kinds are ranked
//! `Integer < Float < Text`; `Text` is the universal fallback. A value's kind
//! is found by an ordered parse attempt: integer first, then float, then text.
//!
//! | Kind      | Native type |
//! |-----------|-------------|
//! | `Integer` | `INT`       |
//! | `Float`   | `DOUBLE`    |
//! | `Text`    | `TEXT`      |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    Integer,
    Float,
    Text,
}

impl Kind {
    /// Native column type emitted in DDL for this kind.
    pub fn native(self) -> &'static str {
        match self {
            Kind::Integer => "INT",
            Kind::Float => "DOUBLE",
            Kind::Text => "TEXT",
        }
    }

    /// Maps an engine type name (as reported by `DESCRIBE` or
    /// `PRAGMA table_info`) back to a kind.
    ///
    /// Matching ignores case, display widths and trailing modifiers, so
    /// `int(11) unsigned`, `INTEGER` and `bigint` are all `Integer`.
    /// Returns `None` for types outside the lattice (dates, blobs, ...).
    pub fn from_native(name: &str) -> Option<Kind> {
        let lowered = name.trim().to_ascii_lowercase();
        let base = lowered
            .split(|c: char| c == '(' || c.is_ascii_whitespace())
            .next()
            .unwrap_or_default();
        match base {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" => {
                Some(Kind::Integer)
            }
            "double" | "float" | "real" | "decimal" | "numeric" => Some(Kind::Float),
            "text" | "tinytext" | "mediumtext" | "longtext" | "varchar" | "char" | "clob" => {
                Some(Kind::Text)
            }
            _ => None,
        }
    }

    /// Kind of raw text: integer if it parses as one, else float, else text.
    pub fn probe(raw: &str) -> Kind {
        if parse_integer(raw).is_some() {
            return Kind::Integer;
        }
        if parse_float(raw).is_some() {
            return Kind::Float;
        }
        Kind::Text
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Kind::Integer => "Integer",
            Kind::Float => "Float",
            Kind::Text => "Text",
        };
        f.write_str(label)
    }
}

pub fn parse_integer(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Non-finite values (`nan`, `inf`) are rejected: no target engine stores them.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Casts raw text to the most specific scalar it parses as.
pub fn cast(raw: &str) -> Scalar {
    if let Some(value) = parse_integer(raw) {
        return Scalar::Integer(value);
    }
    if let Some(value) = parse_float(raw) {
        return Scalar::Float(value);
    }
    Scalar::Text(raw.to_string())
}

/// A single non-null field value. Nulls are represented as `Option::None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Kind of this value. Text is probed, so `"3"` is an `Integer` and
    /// `"5.5"` a `Float`; a stored float is always `Float`.
    pub fn kind(&self) -> Kind {
        match self {
            Scalar::Integer(_) => Kind::Integer,
            Scalar::Float(_) => Kind::Float,
            Scalar::Text(text) => Kind::probe(text),
        }
    }

    /// Converts the value to the representation of a column of `kind`.
    ///
    /// Values that cannot be represented are returned unchanged and left to
    /// the engine.
    pub fn coerce(self, kind: Kind) -> Scalar {
        match (kind, self) {
            (Kind::Integer, Scalar::Text(text)) => match parse_integer(&text) {
                Some(value) => Scalar::Integer(value),
                None => Scalar::Text(text),
            },
            (Kind::Float, Scalar::Integer(value)) => Scalar::Float(value as f64),
            (Kind::Float, Scalar::Text(text)) => match parse_float(&text) {
                Some(value) => Scalar::Float(value),
                None => Scalar::Text(text),
            },
            (Kind::Text, Scalar::Integer(value)) => Scalar::Text(value.to_string()),
            (Kind::Text, Scalar::Float(value)) => Scalar::Text(value.to_string()),
            (_, value) => value,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_rank_integer_below_float_below_text() {
        assert!(Kind::Integer < Kind::Float);
        assert!(Kind::Float < Kind::Text);
    }

    #[test]
    fn probe_tries_integer_then_float_then_text() {
        assert_eq!(Kind::probe("42"), Kind::Integer);
        assert_eq!(Kind::probe(" -7 "), Kind::Integer);
        assert_eq!(Kind::probe("5.5"), Kind::Float);
        assert_eq!(Kind::probe("1e3"), Kind::Float);
        assert_eq!(Kind::probe("abc"), Kind::Text);
        assert_eq!(Kind::probe(""), Kind::Text);
        assert_eq!(Kind::probe("NaN"), Kind::Text);
        assert_eq!(Kind::probe("inf"), Kind::Text);
    }

    #[test]
    fn stored_floats_stay_float_even_when_integral() {
        assert_eq!(Scalar::Float(2.0).kind(), Kind::Float);
        assert_eq!(Scalar::Integer(2).kind(), Kind::Integer);
        assert_eq!(Scalar::from("2").kind(), Kind::Integer);
    }

    #[test]
    fn native_names_map_back_to_kinds() {
        for kind in [Kind::Integer, Kind::Float, Kind::Text] {
            assert_eq!(Kind::from_native(kind.native()), Some(kind));
        }
        assert_eq!(Kind::from_native("int(11) unsigned"), Some(Kind::Integer));
        assert_eq!(Kind::from_native("INTEGER"), Some(Kind::Integer));
        assert_eq!(Kind::from_native("double precision"), Some(Kind::Float));
        assert_eq!(Kind::from_native("decimal(10,2)"), Some(Kind::Float));
        assert_eq!(Kind::from_native("varchar(255)"), Some(Kind::Text));
        assert_eq!(Kind::from_native("datetime"), None);
        assert_eq!(Kind::from_native(""), None);
    }

    #[test]
    fn cast_prefers_the_most_specific_scalar() {
        assert_eq!(cast("3"), Scalar::Integer(3));
        assert_eq!(cast("3.25"), Scalar::Float(3.25));
        assert_eq!(cast("x3"), Scalar::Text("x3".to_string()));
    }

    #[test]
    fn coerce_converts_to_column_representation() {
        assert_eq!(Scalar::from("3").coerce(Kind::Integer), Scalar::Integer(3));
        assert_eq!(Scalar::Integer(3).coerce(Kind::Float), Scalar::Float(3.0));
        assert_eq!(Scalar::from("2.5").coerce(Kind::Float), Scalar::Float(2.5));
        assert_eq!(
            Scalar::Integer(5).coerce(Kind::Text),
            Scalar::Text("5".to_string())
        );
        assert_eq!(
            Scalar::from("abc").coerce(Kind::Integer),
            Scalar::Text("abc".to_string())
        );
    }
}
