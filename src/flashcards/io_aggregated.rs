// Readers for the aggregated-data layouts.
//
// Two layouts are in circulation and they are treated as distinct, versioned
// schemas rather than one evolving format. Anything else is rejected instead
// of guessed at.
//
// - Legacy: a top-level array of rows keyed `Variable` / `Value` / `count`.
// - Descriptives: an object with a `categorical_descriptives` member holding
//   the rows keyed `variable` / `value` / `count`, either as a plain array or
//   as a JSON-string-wrapped array (the federated client hands the payload
//   back as a string).

use crate::flashcards::*;

use icon_array::CategoricalCount;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::fs;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct LegacyRow {
    #[serde(rename = "Variable")]
    variable: String,
    #[serde(rename = "Value")]
    value: String,
    count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct DescriptiveRow {
    variable: String,
    value: String,
    count: u64,
}

/// Reads an aggregated-data file in any of the recognised layouts.
pub fn read_aggregated(path: &str) -> FcResult<Vec<CategoricalCount>> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu {
        path: path.to_string(),
    })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    let rows = parse_aggregated(&js)?;
    info!("read_aggregated: {} rows from {}", rows.len(), path);
    Ok(rows)
}

/// Dispatches on the top-level shape of the document.
pub fn parse_aggregated(js: &JSValue) -> FcResult<Vec<CategoricalCount>> {
    match js {
        JSValue::Array(_) => parse_legacy(js),
        JSValue::Object(map) => match map.get("categorical_descriptives") {
            Some(inner) => parse_descriptives(inner),
            None => UnrecognizedSchemaSnafu {
                details: "object without a categorical_descriptives member".to_string(),
            }
            .fail(),
        },
        // A whole payload stored as a JSON string, as written by the
        // retrieval stage.
        JSValue::String(s) => {
            debug!("parse_aggregated: unwrapping string payload ({} bytes)", s.len());
            let inner: JSValue =
                serde_json::from_str(s.as_str()).context(ParsingJsonSnafu {})?;
            match inner {
                JSValue::String(_) => UnrecognizedSchemaSnafu {
                    details: "string payload nested inside a string payload".to_string(),
                }
                .fail(),
                _ => parse_aggregated(&inner),
            }
        }
        _ => UnrecognizedSchemaSnafu {
            details: format!("unsupported top-level value: {}", type_name(js)),
        }
        .fail(),
    }
}

fn parse_legacy(js: &JSValue) -> FcResult<Vec<CategoricalCount>> {
    let rows: Vec<LegacyRow> =
        serde_json::from_value(js.clone()).map_err(|e| FlashcardError::UnrecognizedSchema {
            details: format!("array rows do not match the legacy layout: {}", e),
        })?;
    Ok(rows
        .into_iter()
        .map(|r| CategoricalCount {
            variable: r.variable,
            value: r.value,
            count: r.count,
        })
        .collect())
}

fn parse_descriptives(inner: &JSValue) -> FcResult<Vec<CategoricalCount>> {
    let rows: Vec<DescriptiveRow> = match inner {
        JSValue::Array(_) => {
            serde_json::from_value(inner.clone()).map_err(|e| FlashcardError::UnrecognizedSchema {
                details: format!("descriptive rows do not match the expected layout: {}", e),
            })?
        }
        JSValue::String(s) => {
            serde_json::from_str(s.as_str()).map_err(|e| FlashcardError::UnrecognizedSchema {
                details: format!(
                    "string-wrapped descriptive rows do not match the expected layout: {}",
                    e
                ),
            })?
        }
        _ => {
            return UnrecognizedSchemaSnafu {
                details: format!(
                    "categorical_descriptives holds an unsupported value: {}",
                    type_name(inner)
                ),
            }
            .fail()
        }
    };
    Ok(rows
        .into_iter()
        .map(|r| CategoricalCount {
            variable: r.variable,
            value: r.value,
            count: r.count,
        })
        .collect())
}

fn type_name(js: &JSValue) -> &'static str {
    match js {
        JSValue::Null => "null",
        JSValue::Bool(_) => "bool",
        JSValue::Number(_) => "number",
        JSValue::String(_) => "string",
        JSValue::Array(_) => "array",
        JSValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_the_legacy_layout() {
        let js = json!([
            { "Variable": "smoking", "Value": "never", "count": 40 },
            { "Variable": "smoking", "Value": "current", "count": 25 }
        ]);
        let rows = parse_aggregated(&js).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].variable, "smoking");
        assert_eq!(rows[0].value, "never");
        assert_eq!(rows[0].count, 40);
    }

    #[test]
    fn reads_the_descriptives_layout() {
        let js = json!({
            "categorical_descriptives": [
                { "variable": "smoking", "value": "never", "count": 40 }
            ]
        });
        let rows = parse_aggregated(&js).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 40);
    }

    #[test]
    fn reads_a_string_wrapped_descriptives_payload() {
        let inner = r#"{"categorical_descriptives": [{"variable": "smoking", "value": "never", "count": 40}]}"#;
        let js = json!(inner);
        let rows = parse_aggregated(&js).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].variable, "smoking");
    }

    #[test]
    fn reads_string_wrapped_rows_inside_the_descriptives_member() {
        let js = json!({
            "categorical_descriptives":
                "[{\"variable\": \"smoking\", \"value\": \"never\", \"count\": 40}]"
        });
        let rows = parse_aggregated(&js).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn rejects_an_unknown_object_shape() {
        let js = json!({ "descriptives": [] });
        let res = parse_aggregated(&js);
        assert!(matches!(res, Err(FlashcardError::UnrecognizedSchema { .. })));
    }

    #[test]
    fn rejects_mixed_case_rows() {
        // Legacy casing inside the descriptives member is not guessed at.
        let js = json!({
            "categorical_descriptives": [
                { "Variable": "smoking", "Value": "never", "count": 40 }
            ]
        });
        let res = parse_aggregated(&js);
        assert!(matches!(res, Err(FlashcardError::UnrecognizedSchema { .. })));
    }

    #[test]
    fn rejects_scalars() {
        let res = parse_aggregated(&json!(42));
        assert!(matches!(res, Err(FlashcardError::UnrecognizedSchema { .. })));
    }
}
