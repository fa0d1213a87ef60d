use serde_json::{Number, Value};
use std::borrow::Cow;

/// Tokens read as missing, after trimming.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NULL", "null", "None", "<NA>", "#N/A", "#NA",
];
const NAN_TOKENS: &[&str] = &["NaN", "nan", "-NaN", "-nan"];

/// One stored value, as read from the source file.
///
/// Not-a-number cells stay `Float(NaN)` in storage; they only become null
/// when a row is handed out (see [`Cell::to_json`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Missing,
}

impl Cell {
    pub fn infer(raw: &str) -> Cell {
        let t = raw.trim();
        if t.is_empty() || NA_TOKENS.contains(&t) {
            return Cell::Missing;
        }
        if NAN_TOKENS.contains(&t) {
            return Cell::Float(f64::NAN);
        }
        if let Ok(n) = t.parse::<i64>() {
            // "007" must keep its zeros, so only canonical integers become Int
            if n.to_string() == t {
                return Cell::Int(n);
            }
            return Cell::Text(raw.to_string());
        }
        if t.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = t.parse::<f64>() {
                return Cell::Float(f);
            }
        }
        Cell::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// String form used for key comparison and counting. `None` for nulls.
    pub fn to_key_string(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Cell::Int(n) => Some(Cow::Owned(n.to_string())),
            Cell::Float(f) if f.is_nan() => None,
            Cell::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                Some(Cow::Owned(format!("{:.1}", f)))
            }
            Cell::Float(f) => Some(Cow::Owned(f.to_string())),
            Cell::Missing => None,
        }
    }

    /// Text content for substring matching; numbers and nulls never match names.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(n) => Value::from(*n),
            Cell::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Cell::Missing => Value::Null,
        }
    }
}
