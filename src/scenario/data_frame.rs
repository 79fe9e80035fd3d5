use crate::compute::Value;
use crate::periods::Period;
use crate::store::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Computed columns for one entity and one period, indexed by household id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataFrame {
    pub entity: EntityKind,
    pub period: Period,
    pub index: Vec<i64>,
    pub columns: BTreeMap<String, Value>,
}

impl DataFrame {
    pub fn len(&self) -> usize { self.index.len() }
    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    pub fn column(&self, name: &str) -> Option<&Value> { self.columns.get(name) }

    /// The row of household `id`, as numbers.
    pub fn row(&self, id: i64) -> Option<BTreeMap<&str, f64>> {
        let position = self.index.iter().position(|&i| i == id)?;
        Some(self.columns.iter().map(|(name, value)| (name.as_str(), value.to_f64()[position])).collect())
    }

    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_and_json() {
        let frame = DataFrame {
            entity: EntityKind::Menage,
            period: Period::year(2015).unwrap(),
            index: vec![10, 20],
            columns: [("ticpe_totale".to_string(), Value::from(vec![1.5, 2.5]))].into_iter().collect(),
        };
        assert_eq!(frame.row(20).unwrap()["ticpe_totale"], 2.5);
        assert!(frame.row(30).is_none());
        assert_eq!(frame.to_json().unwrap(), r#"{"entity":"menage","period":"2015","index":[10,20],"columns":{"ticpe_totale":[1.5,2.5]}}"#);
    }
}
