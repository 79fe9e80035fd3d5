//! node.rs
//! Nodes of the legislative parameter tree. A node is never mutated once built:
//! every edit produces a new node sharing its untouched children through `Arc`.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The value of a leaf at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Category(String),
    /// The leaf exists but has no value in force (e.g. a regional surcharge not yet voted).
    Null,
}

impl ParameterValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, ParameterValue::Null) }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self { ParameterValue::Number(v) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    pub start: NaiveDate,
    pub value: ParameterValue,
}

impl ParameterEntry {
    pub fn new(start: NaiveDate, value: impl Into<ParameterValue>) -> Self {
        Self { start, value: value.into() }
    }
}

/// A dated series. Entries are kept sorted by strictly decreasing start date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameter {
    entries: Vec<ParameterEntry>,
    pub description: Option<String>,
}

impl Parameter {
    /// Builds a series from entries in any order. Two entries sharing a start date are rejected.
    pub fn new(mut entries: Vec<ParameterEntry>) -> Result<Self, String> {
        entries.sort_by(|a, b| b.start.cmp(&a.start));
        if let Some(pair) = entries.windows(2).find(|w| w[0].start == w[1].start) {
            return Err(format!("two entries start on {}", pair[0].start));
        }
        Ok(Self { entries, description: None })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn entries(&self) -> &[ParameterEntry] { &self.entries }

    /// The value of the most recent entry starting on or before `instant`.
    pub fn value_at(&self, instant: NaiveDate) -> Option<&ParameterValue> {
        self.entries.iter().find(|e| e.start <= instant).map(|e| &e.value)
    }

    /// `value` applies from `start` onward; history before `start` is preserved.
    pub fn updated_from(&self, start: NaiveDate, value: ParameterValue) -> Parameter {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.push(ParameterEntry { start, value });
        entries.extend(self.entries.iter().filter(|e| e.start < start).cloned());
        Parameter { entries, description: self.description.clone() }
    }

    /// `value` applies on `[start, stop)`; the value previously in force at `stop` resumes there.
    pub fn updated_between(&self, start: NaiveDate, stop: NaiveDate, value: ParameterValue) -> Result<Parameter, String> {
        if stop <= start {
            return Err(format!("update window [{}, {}) is empty", start, stop));
        }
        let mut entries: Vec<ParameterEntry> = self.entries.iter()
            .filter(|e| e.start < start || e.start >= stop)
            .cloned()
            .collect();
        let resumes = self.entries.iter().any(|e| e.start == stop);
        if !resumes {
            if let Some(previous) = self.value_at(stop) {
                entries.push(ParameterEntry { start: stop, value: previous.clone() });
            }
        }
        entries.push(ParameterEntry { start, value });
        let mut updated = Parameter::new(entries)?;
        updated.description = self.description.clone();
        Ok(updated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleKind {
    /// The amount of the highest bracket whose threshold is reached.
    SingleAmount,
    /// Sum over brackets of `rate * (portion of the base inside the bracket)`.
    MarginalRate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub threshold: Parameter,
    pub value: Parameter,
}

/// A bracketed schedule whose thresholds and values are themselves dated series.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    pub kind: ScaleKind,
    pub brackets: Vec<Bracket>,
}

/// A scale frozen at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleAt {
    kind: ScaleKind,
    // Sorted by increasing threshold.
    thresholds: Vec<f64>,
    values: Vec<f64>,
}

impl Scale {
    /// Brackets not in force at `instant` (threshold or value missing or null) are skipped.
    pub fn at(&self, instant: NaiveDate) -> ScaleAt {
        let mut pairs: Vec<(f64, f64)> = self.brackets.iter()
            .filter_map(|b| {
                let threshold = b.threshold.value_at(instant)?.as_number()?;
                let value = b.value.value_at(instant)?.as_number()?;
                Some((threshold, value))
            })
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (thresholds, values) = pairs.into_iter().unzip();
        ScaleAt { kind: self.kind, thresholds, values }
    }
}

impl ScaleAt {
    pub fn len(&self) -> usize { self.thresholds.len() }
    pub fn is_empty(&self) -> bool { self.thresholds.is_empty() }

    pub fn calc(&self, base: &[f64]) -> Vec<f64> {
        base.iter().map(|&x| self.calc_one(x)).collect()
    }

    fn calc_one(&self, x: f64) -> f64 {
        match self.kind {
            ScaleKind::SingleAmount => self.thresholds.iter()
                .zip(&self.values)
                .filter(|(t, _)| x >= **t)
                .last()
                .map(|(_, v)| *v)
                .unwrap_or(0.0),
            ScaleKind::MarginalRate => {
                let mut total = 0.0;
                for (i, (&lower, &rate)) in self.thresholds.iter().zip(&self.values).enumerate() {
                    let upper = self.thresholds.get(i + 1).copied().unwrap_or(f64::INFINITY);
                    if x > lower {
                        total += rate * (x.min(upper) - lower);
                    }
                }
                total
            }
        }
    }
}

/// A point of the tree: a branch of named children, a dated leaf, or a scale.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterNode {
    Branch(Arc<BTreeMap<String, ParameterNode>>),
    Leaf(Arc<Parameter>),
    Scale(Arc<Scale>),
}

impl ParameterNode {
    pub fn empty_branch() -> Self { ParameterNode::Branch(Arc::new(BTreeMap::new())) }

    pub fn leaf(parameter: Parameter) -> Self { ParameterNode::Leaf(Arc::new(parameter)) }

    pub fn scale(scale: Scale) -> Self { ParameterNode::Scale(Arc::new(scale)) }

    pub fn branch(children: impl IntoIterator<Item = (String, ParameterNode)>) -> Self {
        ParameterNode::Branch(Arc::new(children.into_iter().collect()))
    }

    pub fn child(&self, name: &str) -> Option<&ParameterNode> {
        match self {
            ParameterNode::Branch(children) => children.get(name),
            _ => None,
        }
    }

    /// True when both handles point at the same allocation (structural sharing).
    pub fn ptr_eq(&self, other: &ParameterNode) -> bool {
        match (self, other) {
            (ParameterNode::Branch(a), ParameterNode::Branch(b)) => Arc::ptr_eq(a, b),
            (ParameterNode::Leaf(a), ParameterNode::Leaf(b)) => Arc::ptr_eq(a, b),
            (ParameterNode::Scale(a), ParameterNode::Scale(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn series(points: &[(i32, f64)]) -> Parameter {
        Parameter::new(points.iter().map(|&(y, v)| ParameterEntry::new(date(y), v)).collect()).unwrap()
    }

    #[test]
    fn test_entries_sorted_descending() {
        let p = series(&[(2000, 80.0), (2010, 100.0), (2005, 90.0)]);
        let starts: Vec<_> = p.entries().iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![date(2010), date(2005), date(2000)]);
    }

    #[test]
    fn test_duplicate_start_rejected() {
        let err = Parameter::new(vec![ParameterEntry::new(date(2000), 1.0), ParameterEntry::new(date(2000), 2.0)]).unwrap_err();
        assert!(err.contains("2000-01-01"), "Msg: {}", err);
    }

    #[test]
    fn test_updated_from_preserves_history() {
        let p = series(&[(2010, 100.0), (2005, 90.0), (2000, 80.0)]);
        let updated = p.updated_from(date(2007), ParameterValue::Number(95.0));

        assert_eq!(updated.value_at(date(2006)), Some(&ParameterValue::Number(90.0)));
        assert_eq!(updated.value_at(date(2008)), Some(&ParameterValue::Number(95.0)));
        // The 2010 entry is superseded.
        assert_eq!(updated.value_at(date(2015)), Some(&ParameterValue::Number(95.0)));
        assert_eq!(p.value_at(date(2015)), Some(&ParameterValue::Number(100.0)));
    }

    #[test]
    fn test_updated_between_resumes_previous_value() {
        let p = series(&[(2005, 90.0), (2000, 80.0)]);
        let updated = p.updated_between(date(2006), date(2008), ParameterValue::Number(70.0)).unwrap();

        assert_eq!(updated.value_at(date(2005)), Some(&ParameterValue::Number(90.0)));
        assert_eq!(updated.value_at(date(2007)), Some(&ParameterValue::Number(70.0)));
        assert_eq!(updated.value_at(date(2009)), Some(&ParameterValue::Number(90.0)));
        assert!(p.updated_between(date(2008), date(2008), ParameterValue::Null).is_err());
    }

    #[test]
    fn test_single_amount_scale() {
        let scale = Scale {
            kind: ScaleKind::SingleAmount,
            brackets: vec![
                Bracket { threshold: series(&[(2018, 0.0)]), value: series(&[(2018, 194.0)]) },
                Bracket { threshold: series(&[(2018, 5600.0)]), value: series(&[(2018, 146.0)]) },
                Bracket { threshold: series(&[(2018, 7700.0)]), value: series(&[(2018, 0.0)]) },
            ],
        };
        let at = scale.at(date(2019));
        assert_eq!(at.calc(&[1000.0, 6000.0, 9000.0]), vec![194.0, 146.0, 0.0]);
        assert!(scale.at(date(2017)).is_empty());
    }

    #[test]
    fn test_marginal_rate_scale() {
        let scale = Scale {
            kind: ScaleKind::MarginalRate,
            brackets: vec![
                Bracket { threshold: series(&[(2000, 0.0)]), value: series(&[(2000, 0.0)]) },
                Bracket { threshold: series(&[(2000, 100.0)]), value: series(&[(2000, 0.1)]) },
                Bracket { threshold: series(&[(2000, 200.0)]), value: series(&[(2000, 0.5)]) },
            ],
        };
        let out = scale.at(date(2001)).calc(&[50.0, 150.0, 300.0]);
        assert!((out[0] - 0.0).abs() < 1e-12);
        assert!((out[1] - 5.0).abs() < 1e-12);
        assert!((out[2] - 60.0).abs() < 1e-12);
    }
}
