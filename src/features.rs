//! Feature table ingestion
//!
//! Parses user-level behavioral feature tables from NDJSON or a JSON array of
//! objects into a column-ordered frame, coercing loosely-typed cells into f64
//! and stripping identifier columns that must never reach a model.

use crate::error::EngineError;
use crate::types::FeatureVector;
use ndarray::{Array1, Array2};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Columns carrying identity rather than behavior, always stripped on ingest.
const IDENTIFIER_COLUMNS: [&str; 2] = ["user_id", "target_product"];

/// Column-ordered table of user feature vectors
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    feature_names: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl FeatureFrame {
    /// Parses one JSON object per non-empty line.
    pub fn parse_ndjson(input: &str) -> Result<Self, EngineError> {
        let mut objects = Vec::new();
        for (line_no, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(trimmed)
                .map_err(|e| EngineError::ParseError(format!("line {}: {}", line_no + 1, e)))?;
            objects.push(into_object(value, line_no + 1)?);
        }
        Self::from_objects(objects)
    }

    /// Parses a single JSON array of objects.
    pub fn parse_array(input: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(input)?;
        let items = match value {
            Value::Array(items) => items,
            _ => {
                return Err(EngineError::ParseError(
                    "expected a JSON array of objects".to_string(),
                ))
            }
        };
        let mut objects = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            objects.push(into_object(item, index + 1)?);
        }
        Self::from_objects(objects)
    }

    fn from_objects(objects: Vec<Map<String, Value>>) -> Result<Self, EngineError> {
        if objects.is_empty() {
            return Err(EngineError::EmptyFrame);
        }

        // First pass: record column order and whether any cell coerces.
        let mut feature_names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut coercible: HashMap<String, bool> = HashMap::new();
        for object in &objects {
            for (name, value) in object {
                if IDENTIFIER_COLUMNS.contains(&name.as_str()) {
                    continue;
                }
                if seen.insert(name.clone()) {
                    feature_names.push(name.clone());
                }
                let entry = coercible.entry(name.clone()).or_insert(false);
                *entry = *entry || coerce_cell(value).is_some();
            }
        }
        for name in &feature_names {
            if !coercible.get(name).copied().unwrap_or(false) {
                warn!(column = %name, "Dropping feature column with no numeric values");
            }
        }
        feature_names.retain(|name| coercible.get(name).copied().unwrap_or(false));

        // Second pass: build rows. Cells that fail coercion stay absent and
        // read as 0.0 through FeatureVector.
        let rows: Vec<FeatureVector> = objects
            .iter()
            .map(|object| {
                let mut features = FeatureVector::new();
                for name in &feature_names {
                    if let Some(value) = object.get(name).and_then(coerce_cell) {
                        features.set(name, value);
                    }
                }
                features
            })
            .collect();

        info!(
            users = rows.len(),
            features = feature_names.len(),
            "Parsed feature frame"
        );
        Ok(Self {
            feature_names,
            rows,
        })
    }

    /// Retained feature columns, in first-seen order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Materializes the frame as a dense matrix with one column per name.
    ///
    /// The column layout is passed in rather than taken from the frame so a
    /// serving-time frame can be projected onto the columns of a trained model.
    pub fn to_matrix(&self, feature_names: &[String]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((self.rows.len(), feature_names.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, name) in feature_names.iter().enumerate() {
                matrix[[i, j]] = row.get(name);
            }
        }
        matrix
    }

    /// Projects a single feature vector onto a column layout.
    pub fn vector_to_row(features: &FeatureVector, feature_names: &[String]) -> Array1<f64> {
        Array1::from_iter(feature_names.iter().map(|name| features.get(name)))
    }
}

/// Parses a single JSON object of user features with the same cell coercion
/// rules as frame ingestion.
pub fn parse_user(input: &str) -> Result<FeatureVector, EngineError> {
    let value: Value = serde_json::from_str(input)?;
    let object = into_object(value, 1)?;
    let mut features = FeatureVector::new();
    for (name, value) in &object {
        if IDENTIFIER_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        if let Some(number) = coerce_cell(value) {
            features.set(name, number);
        }
    }
    Ok(features)
}

fn into_object(value: Value, position: usize) -> Result<Map<String, Value>, EngineError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EngineError::ParseError(format!(
            "row {} is not a JSON object: {}",
            position, other
        ))),
    }
}

/// Coerces one cell to f64: numbers pass through, numeric strings are parsed,
/// booleans map to 1.0/0.0. Everything else is not a feature value.
fn coerce_cell(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ndjson() -> &'static str {
        "{\"user_id\": \"u1\", \"market_events\": 120, \"engagement_ratio\": \"0.25\", \"is_active\": true}\n\
         {\"user_id\": \"u2\", \"market_events\": 15, \"engagement_ratio\": 0.05, \"is_active\": false}\n"
    }

    #[test]
    fn test_parse_ndjson_strips_identifier_columns() {
        let frame = FeatureFrame::parse_ndjson(sample_ndjson()).unwrap();
        assert_eq!(frame.len(), 2);
        assert!(!frame.feature_names().contains(&"user_id".to_string()));
        assert!(frame.feature_names().contains(&"market_events".to_string()));
    }

    #[test]
    fn test_numeric_strings_and_booleans_coerce() {
        let frame = FeatureFrame::parse_ndjson(sample_ndjson()).unwrap();
        assert_eq!(frame.rows()[0].get("engagement_ratio"), 0.25);
        assert_eq!(frame.rows()[0].get("is_active"), 1.0);
        assert_eq!(frame.rows()[1].get("is_active"), 0.0);
    }

    #[test]
    fn test_column_without_numeric_values_is_dropped() {
        let input = "{\"market_events\": 10, \"segment\": \"retail\"}\n\
                     {\"market_events\": 20, \"segment\": \"smb\"}\n";
        let frame = FeatureFrame::parse_ndjson(input).unwrap();
        assert_eq!(frame.feature_names(), &["market_events".to_string()]);
    }

    #[test]
    fn test_stray_text_in_numeric_column_reads_as_zero() {
        let input = "{\"market_events\": 10}\n{\"market_events\": \"n/a\"}\n";
        let frame = FeatureFrame::parse_ndjson(input).unwrap();
        assert_eq!(frame.rows()[0].get("market_events"), 10.0);
        assert_eq!(frame.rows()[1].get("market_events"), 0.0);
    }

    #[test]
    fn test_parse_array_matches_ndjson() {
        let array = "[{\"market_events\": 10, \"engagement_ratio\": 0.2},\
                      {\"market_events\": 55, \"engagement_ratio\": 0.1}]";
        let frame = FeatureFrame::parse_array(array).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows()[1].get("market_events"), 55.0);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = FeatureFrame::parse_ndjson("\n\n").unwrap_err();
        assert!(matches!(err, EngineError::EmptyFrame));
        let err = FeatureFrame::parse_array("[]").unwrap_err();
        assert!(matches!(err, EngineError::EmptyFrame));
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let input = "{\"market_events\": 10}\nnot json\n";
        let err = FeatureFrame::parse_ndjson(input).unwrap_err();
        match err {
            EngineError::ParseError(message) => assert!(message.contains("line 2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_to_matrix_fills_missing_cells_with_zero() {
        let input = "{\"a\": 1.0, \"b\": 2.0}\n{\"a\": 3.0}\n";
        let frame = FeatureFrame::parse_ndjson(input).unwrap();
        let names = frame.feature_names().to_vec();
        let matrix = frame.to_matrix(&names);
        assert_eq!(matrix.shape(), &[2, 2]);
        let b_col = names.iter().position(|n| n == "b").unwrap();
        assert_eq!(matrix[[1, b_col]], 0.0);
    }

    #[test]
    fn test_vector_to_row_follows_column_layout() {
        let features = FeatureVector::from_pairs(&[("a", 1.0), ("c", 3.0)]);
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let row = FeatureFrame::vector_to_row(&features, &names);
        assert_eq!(row.to_vec(), vec![1.0, 0.0, 3.0]);
    }

    #[test]
    fn test_parse_user_coerces_and_strips() {
        let features =
            parse_user("{\"user_id\": \"u9\", \"market_events\": \"80\", \"note\": null}").unwrap();
        assert_eq!(features.get("market_events"), 80.0);
        assert!(!features.contains("user_id"));
        assert!(!features.contains("note"));
    }
}
