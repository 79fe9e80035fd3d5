use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a variable in a `VariableRegistry`. Ids survive reforms:
/// a derived registry keeps every id of its base and appends new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct VariableId(pub u32);

impl VariableId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// The unit of observation a variable is computed for. Households only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    #[default]
    Menage,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self { EntityKind::Menage => "menage" }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Float,
    Bool,
    Int,
    /// Codes index into `variants`.
    Enum { variants: &'static [&'static str] },
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Enum { .. } => "enum",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// The constant a variable takes when no formula and no input applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Float(f64),
    Bool(bool),
    Int(i64),
    Enum(u16),
}

impl Scalar {
    pub fn zero_of(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => Scalar::Float(0.0),
            ValueType::Bool => Scalar::Bool(false),
            ValueType::Int => Scalar::Int(0),
            ValueType::Enum { .. } => Scalar::Enum(0),
        }
    }

    pub fn matches(&self, value_type: ValueType) -> bool {
        match (self, value_type) {
            (Scalar::Float(_), ValueType::Float) | (Scalar::Bool(_), ValueType::Bool) | (Scalar::Int(_), ValueType::Int) => true,
            (Scalar::Enum(code), ValueType::Enum { variants }) => (*code as usize) < variants.len(),
            _ => false,
        }
    }
}

/// How a request at a period other than the variable's definition period is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPolicy {
    /// Only the definition period is accepted.
    #[default]
    Strict,
    /// Flows: a coarser request sums the sub-periods, a finer one takes its pro-rata share.
    Divide,
    /// Stocks and attributes: every sub-period carries the value of its enclosing period.
    Dispatch,
}

/// A closed set of labelled codes stored as an enum column.
pub trait Category: Copy + Sized + 'static {
    const VARIANTS: &'static [&'static str];

    fn code(self) -> u16;
    fn from_code(code: u16) -> Option<Self>;

    fn value_type() -> ValueType { ValueType::Enum { variants: Self::VARIANTS } }

    fn label(self) -> &'static str {
        Self::VARIANTS.get(self.code() as usize).copied().unwrap_or("?")
    }
}
