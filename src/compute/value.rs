//! value.rs
//! Per-household columns. A column is shared behind `Arc` between the ledger,
//! the formulas reading it and any data frame built from it.

use crate::store::{Category, Scalar, ValueType};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Float(Arc<Vec<f64>>),
    Bool(Arc<Vec<bool>>),
    Int(Arc<Vec<i64>>),
    Enum(Arc<Vec<u16>>),
}

impl Value {
    pub fn filled(scalar: Scalar, len: usize) -> Value {
        match scalar {
            Scalar::Float(v) => Value::Float(Arc::new(vec![v; len])),
            Scalar::Bool(v) => Value::Bool(Arc::new(vec![v; len])),
            Scalar::Int(v) => Value::Int(Arc::new(vec![v; len])),
            Scalar::Enum(v) => Value::Enum(Arc::new(vec![v; len])),
        }
    }

    /// Reads a numeric column as the given type: truncation for integers,
    /// non-zero for booleans, codes for enums.
    pub fn from_f64s(value_type: ValueType, values: Vec<f64>) -> Result<Value, String> {
        match value_type {
            ValueType::Float => Ok(Value::Float(Arc::new(values))),
            ValueType::Bool => Ok(Value::Bool(Arc::new(values.iter().map(|&v| v != 0.0).collect()))),
            ValueType::Int => Ok(Value::Int(Arc::new(values.iter().map(|&v| v as i64).collect()))),
            ValueType::Enum { variants } => values.iter()
                .map(|&v| {
                    if v >= 0.0 && v.fract() == 0.0 && (v as usize) < variants.len() {
                        Ok(v as u16)
                    } else {
                        Err(format!("{} is not a code of [{}]", v, variants.join(", ")))
                    }
                })
                .collect::<Result<Vec<u16>, String>>()
                .map(|codes| Value::Enum(Arc::new(codes))),
        }
    }

    pub fn from_categories<C: Category>(categories: &[C]) -> Value {
        Value::Enum(Arc::new(categories.iter().map(|c| c.code()).collect()))
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Float(v) => v.len(),
            Value::Bool(v) => v.len(),
            Value::Int(v) => v.len(),
            Value::Enum(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Enum(_) => "enum",
        }
    }

    pub fn matches(&self, value_type: ValueType) -> bool {
        match (self, value_type) {
            (Value::Float(_), ValueType::Float) | (Value::Bool(_), ValueType::Bool) | (Value::Int(_), ValueType::Int) => true,
            (Value::Enum(codes), ValueType::Enum { variants }) => codes.iter().all(|&c| (c as usize) < variants.len()),
            _ => false,
        }
    }

    pub fn as_float(&self) -> Option<&Arc<Vec<f64>>> {
        match self { Value::Float(v) => Some(v), _ => None }
    }

    pub fn as_bool(&self) -> Option<&Arc<Vec<bool>>> {
        match self { Value::Bool(v) => Some(v), _ => None }
    }

    pub fn as_int(&self) -> Option<&Arc<Vec<i64>>> {
        match self { Value::Int(v) => Some(v), _ => None }
    }

    pub fn as_codes(&self) -> Option<&Arc<Vec<u16>>> {
        match self { Value::Enum(v) => Some(v), _ => None }
    }

    /// Numeric view of any column; shares the buffer when it already is a float column.
    pub fn to_f64(&self) -> Arc<Vec<f64>> {
        match self {
            Value::Float(v) => Arc::clone(v),
            Value::Bool(v) => Arc::new(v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()),
            Value::Int(v) => Arc::new(v.iter().map(|&i| i as f64).collect()),
            Value::Enum(v) => Arc::new(v.iter().map(|&c| c as f64).collect()),
        }
    }

    pub fn categories<C: Category>(&self) -> Option<Vec<C>> {
        self.as_codes()?.iter().map(|&c| C::from_code(c)).collect()
    }

    /// Replaces NaN and infinities by zero. Other columns pass through untouched.
    pub fn sanitized(self) -> Value {
        match self {
            Value::Float(v) if v.iter().any(|x| !x.is_finite()) => {
                Value::Float(Arc::new(v.iter().map(|&x| if x.is_finite() { x } else { 0.0 }).collect()))
            }
            other => other,
        }
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Value::Float(Arc::new(v)) }
}

impl From<Arc<Vec<f64>>> for Value {
    fn from(v: Arc<Vec<f64>>) -> Self { Value::Float(v) }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self { Value::Bool(Arc::new(v)) }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self { Value::Int(Arc::new(v)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLORS: &[&str] = &["rouge", "vert"];

    #[test]
    fn test_sanitize_only_touches_non_finite() {
        let v = Value::from(vec![1.0, f64::NAN, f64::INFINITY, -f64::INFINITY, -2.5]);
        assert_eq!(v.sanitized(), Value::from(vec![1.0, 0.0, 0.0, 0.0, -2.5]));

        let finite = Value::from(vec![1.0, 2.0]);
        let buffer = Arc::clone(finite.as_float().unwrap());
        let out = finite.sanitized();
        assert!(Arc::ptr_eq(&buffer, out.as_float().unwrap()));
    }

    #[test]
    fn test_from_f64s() {
        assert_eq!(Value::from_f64s(ValueType::Bool, vec![0.0, 2.0]).unwrap(), Value::from(vec![false, true]));
        assert_eq!(
            Value::from_f64s(ValueType::Enum { variants: COLORS }, vec![1.0, 0.0]).unwrap(),
            Value::Enum(Arc::new(vec![1, 0]))
        );
        assert!(Value::from_f64s(ValueType::Enum { variants: COLORS }, vec![2.0]).is_err());
        assert!(Value::from_f64s(ValueType::Enum { variants: COLORS }, vec![0.5]).is_err());
    }

    #[test]
    fn test_type_matching() {
        let codes = Value::Enum(Arc::new(vec![0, 1]));
        assert!(codes.matches(ValueType::Enum { variants: COLORS }));
        assert!(!Value::Enum(Arc::new(vec![3])).matches(ValueType::Enum { variants: COLORS }));
        assert!(!codes.matches(ValueType::Float));
        assert_eq!(Value::from(vec![true, false]).to_f64().as_slice(), &[1.0, 0.0]);
    }
}
