use crate::flashcards::*;

use icon_array::StrataSelector;
use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fs;

/// One entry of the plotting-information file, keyed by the display name of
/// the variable. The pipeline stages thread their state through this file:
/// `construct` fills in `data_location` and `positive_count`, `publish` fills
/// in `chart_id` and `embedding_code`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VariableEntry {
    pub variable_identifier: String,
    pub chart_id: Option<String>,
    pub chart_title: String,
    pub data_location: Option<String>,
    pub positive_strata: Vec<String>,
    pub negative_strata: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_code: Option<String>,
}

impl VariableEntry {
    pub fn selector(&self) -> StrataSelector {
        StrataSelector {
            positive_strata: self.positive_strata.clone(),
            negative_strata: self.negative_strata.clone(),
        }
    }
}

/// The plotting information, in deterministic key order so that in-place
/// rewrites produce stable diffs.
pub type PlottingInfo = BTreeMap<String, VariableEntry>;

pub fn read_plotting_info(path: &str) -> FcResult<PlottingInfo> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu {
        path: path.to_string(),
    })?;
    let info: PlottingInfo =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_plotting_info: {} variables", info.len());
    Ok(info)
}

pub fn write_plotting_info(path: &str, info: &PlottingInfo) -> FcResult<()> {
    let contents = serde_json::to_string(info).context(ParsingJsonSnafu {})?;
    fs::write(path, contents).context(OpeningFileSnafu {
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
    {
      "Smoking behaviour": {
        "variable_identifier": "smoking_status",
        "chart_id": null,
        "chart_title": "How many people smoke?",
        "data_location": null,
        "positive_strata": ["never"],
        "negative_strata": ["former", "ncit:C25471"]
      }
    }
    "#;

    #[test]
    fn parses_an_initial_file() {
        let info: PlottingInfo = serde_json::from_str(EXAMPLE).unwrap();
        let entry = &info["Smoking behaviour"];
        assert_eq!(entry.variable_identifier, "smoking_status");
        assert_eq!(entry.chart_id, None);
        assert_eq!(entry.positive_count, None);
        assert_eq!(entry.negative_strata.len(), 2);
    }

    #[test]
    fn rewrites_in_place_with_added_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plotting_info.json");
        fs::write(&path, EXAMPLE).unwrap();
        let path_str = path.to_str().unwrap();

        let mut info = read_plotting_info(path_str).unwrap();
        let entry = info.get_mut("Smoking behaviour").unwrap();
        entry.data_location = Some("https://example.org/data.csv".to_string());
        entry.positive_count = Some(67);
        write_plotting_info(path_str, &info).unwrap();

        let round_trip = read_plotting_info(path_str).unwrap();
        let entry = &round_trip["Smoking behaviour"];
        assert_eq!(
            entry.data_location.as_deref(),
            Some("https://example.org/data.csv")
        );
        assert_eq!(entry.positive_count, Some(67));
        // Untouched fields survive the rewrite.
        assert_eq!(entry.chart_title, "How many people smoke?");
    }

    #[test]
    fn absent_chart_id_is_still_serialized_as_null() {
        let info: PlottingInfo = serde_json::from_str(EXAMPLE).unwrap();
        let out = serde_json::to_string(&info).unwrap();
        assert!(out.contains("\"chart_id\":null"));
        // The optional bookkeeping fields only appear once they are set.
        assert!(!out.contains("positive_count"));
        assert!(!out.contains("embedding_code"));
    }
}
