//! loader.rs
//! Builds a `ParameterTree` from a JSON legislative document.
//!
//! Layout:
//! - a leaf is `{"values": {"YYYY-MM-DD": number | string | null | {"value": ...}}}`;
//! - a scale is `{"brackets": [{"threshold": {...}, "amount": {...}}], "kind": "single_amount"}`
//!   (use `"rate"` and `"kind": "marginal_rate"` for marginal-rate schedules);
//! - any other object is a branch. A string `"description"` key on a branch is ignored.

use super::error::ParameterError;
use super::node::{Bracket, Parameter, ParameterEntry, ParameterNode, ParameterValue, Scale, ScaleKind};
use super::tree::ParameterTree;
use chrono::NaiveDate;
use serde_json::{Map, Value as Json};
use std::path::Path;

pub fn load_json_str(document: &str) -> Result<ParameterTree, ParameterError> {
    let json: Json = serde_json::from_str(document)
        .map_err(|e| ParameterError::Load { path: String::new(), reason: e.to_string() })?;
    ParameterTree::from_root(parse_node(&json, "")?)
}

pub fn load_json_file(file: impl AsRef<Path>) -> Result<ParameterTree, ParameterError> {
    let file = file.as_ref();
    let document = std::fs::read_to_string(file)
        .map_err(|e| ParameterError::Load { path: file.display().to_string(), reason: e.to_string() })?;
    load_json_str(&document)
}

fn load_error(path: &str, reason: impl Into<String>) -> ParameterError {
    ParameterError::Load { path: path.to_string(), reason: reason.into() }
}

fn parse_node(json: &Json, path: &str) -> Result<ParameterNode, ParameterError> {
    let object = json.as_object().ok_or_else(|| load_error(path, "expected an object"))?;

    if let Some(values) = object.get("values") {
        let mut parameter = parse_series(values, path)?;
        if let Some(description) = object.get("description").and_then(Json::as_str) {
            parameter = parameter.with_description(description);
        }
        return Ok(ParameterNode::leaf(parameter));
    }
    if let Some(brackets) = object.get("brackets") {
        return parse_scale(object, brackets, path).map(ParameterNode::scale);
    }

    let mut children = Vec::with_capacity(object.len());
    for (name, child) in object {
        if name == "description" && child.is_string() {
            continue;
        }
        let child_path = if path.is_empty() { name.clone() } else { format!("{}.{}", path, name) };
        children.push((name.clone(), parse_node(child, &child_path)?));
    }
    Ok(ParameterNode::branch(children))
}

fn parse_series(json: &Json, path: &str) -> Result<Parameter, ParameterError> {
    let values = json.as_object().ok_or_else(|| load_error(path, "'values' must map dates to values"))?;
    let mut entries = Vec::with_capacity(values.len());
    for (raw_date, raw_value) in values {
        let start = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|e| load_error(path, format!("bad date '{}': {}", raw_date, e)))?;
        entries.push(ParameterEntry { start, value: parse_value(raw_value, path)? });
    }
    Parameter::new(entries).map_err(|reason| ParameterError::InvalidEntries { path: path.to_string(), reason })
}

fn parse_value(json: &Json, path: &str) -> Result<ParameterValue, ParameterError> {
    match json {
        Json::Null => Ok(ParameterValue::Null),
        Json::Number(n) => n.as_f64().map(ParameterValue::Number).ok_or_else(|| load_error(path, "number out of range")),
        Json::String(s) => Ok(ParameterValue::Category(s.clone())),
        Json::Object(inner) => match inner.get("value") {
            Some(value) => parse_value(value, path),
            None => Err(load_error(path, "dated object without a 'value' key")),
        },
        other => Err(load_error(path, format!("unsupported value {}", other))),
    }
}

fn parse_scale(object: &Map<String, Json>, brackets: &Json, path: &str) -> Result<Scale, ParameterError> {
    let kind = match object.get("kind").and_then(Json::as_str) {
        None | Some("single_amount") => ScaleKind::SingleAmount,
        Some("marginal_rate") => ScaleKind::MarginalRate,
        Some(other) => return Err(load_error(path, format!("unknown scale kind '{}'", other))),
    };
    let value_key = match kind {
        ScaleKind::SingleAmount => "amount",
        ScaleKind::MarginalRate => "rate",
    };
    let list = brackets.as_array().ok_or_else(|| load_error(path, "'brackets' must be a list"))?;

    let brackets = list.iter().enumerate()
        .map(|(i, bracket)| {
            let bracket_path = format!("{}.brackets[{}]", path, i);
            let threshold = bracket.get("threshold").ok_or_else(|| load_error(&bracket_path, "missing 'threshold'"))?;
            let value = bracket.get(value_key).ok_or_else(|| load_error(&bracket_path, format!("missing '{}'", value_key)))?;
            Ok(Bracket { threshold: parse_series(threshold, &bracket_path)?, value: parse_series(value, &bracket_path)? })
        })
        .collect::<Result<Vec<_>, ParameterError>>()?;

    Ok(Scale { kind, brackets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "description": "Test legislation",
        "ticpe": {
            "gazole": { "description": "EUR per hectolitre", "values": { "2015-01-01": 45.67, "2012-01-01": { "value": 42.84 } } },
            "majoration": { "values": { "2011-01-01": 1.35, "1990-01-01": null } }
        },
        "contrat": { "values": { "2000-01-01": "base" } },
        "cheque": {
            "kind": "single_amount",
            "brackets": [
                { "threshold": { "2018-01-01": 0 }, "amount": { "2018-01-01": 150 } },
                { "threshold": { "2018-01-01": 7700 }, "amount": { "2018-01-01": 0 } }
            ]
        }
    }"#;

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    #[test]
    fn test_load_document() {
        let tree = load_json_str(DOCUMENT).unwrap();
        assert_eq!(tree.number("ticpe.gazole", jan1(2016)).unwrap(), 45.67);
        assert_eq!(tree.number("ticpe.gazole", jan1(2013)).unwrap(), 42.84);
        assert_eq!(tree.optional_number("ticpe.majoration", jan1(2005)).unwrap(), None);
        assert_eq!(tree.category("contrat", jan1(2010)).unwrap(), "base");
        assert_eq!(tree.scale("cheque", jan1(2019)).unwrap().calc(&[100.0, 8000.0]), vec![150.0, 0.0]);
        assert!(tree.node("description").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let tree = load_json_file(file.path()).unwrap();
        assert_eq!(tree.leaf_paths(), vec!["cheque", "contrat", "ticpe.gazole", "ticpe.majoration"]);
    }

    #[test]
    fn test_load_errors() {
        let bad_date = r#"{ "a": { "values": { "2015-13-01": 1.0 } } }"#;
        assert!(matches!(load_json_str(bad_date), Err(ParameterError::Load { .. })));

        let not_object = r#"{ "a": 3 }"#;
        let err = load_json_str(not_object).unwrap_err();
        assert!(err.to_string().contains("'a'"), "Msg: {}", err);

        let missing = load_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(missing, ParameterError::Load { .. }));
    }
}
