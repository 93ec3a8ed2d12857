//! Client for the Datawrapper REST API.
//!
//! Each operation is a single blocking request. A non-success status is fatal
//! for the running stage: there is no retry, no backoff and no idempotency
//! key. The only guard against duplicated charts is the caller-side check of
//! whether a chart ID is already recorded in the plotting information.

use crate::flashcards::plotting_info::*;
use crate::flashcards::*;

use log::{debug, info, warn};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

const BASE_URL: &str = "https://api.datawrapper.de/v3";

pub struct DatawrapperClient {
    agent: ureq::Agent,
    token: String,
    base_url: String,
}

impl DatawrapperClient {
    pub fn new(token: &str) -> DatawrapperClient {
        DatawrapperClient {
            agent: ureq::Agent::new(),
            token: token.to_string(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", self.token))
    }

    /// Creates a chart configured as a borderless, markdown-enabled table
    /// that points at the externally hosted flashcard CSV. Returns the ID of
    /// the created chart.
    pub fn create_chart(&self, data_location: &str, chart_title: &str) -> FcResult<String> {
        let config = chart_config(chart_title, data_location);
        let response = check_http(self.request("POST", "/charts").send_json(&config))?;
        let body: JSValue = match response.into_json() {
            Ok(js) => js,
            Err(e) => whatever!("Could not parse the chart-creation response: {}", e),
        };
        match body["id"].as_str() {
            Some(id) => {
                info!("Created chart {}", id);
                Ok(id.to_string())
            }
            None => UnexpectedResponseSnafu {
                details: "chart-creation response carries no id".to_string(),
            }
            .fail(),
        }
    }

    /// Replaces the data of an existing chart with the given CSV text.
    pub fn update_data(&self, chart_id: &str, csv_data: &str) -> FcResult<()> {
        check_http(
            self.request("PUT", &format!("/charts/{}/data", chart_id))
                .set("Content-Type", "text/csv")
                .send_string(csv_data),
        )?;
        info!("Dataset uploaded successfully to chart {}", chart_id);
        Ok(())
    }

    /// Publishes an existing chart.
    pub fn publish_chart(&self, chart_id: &str) -> FcResult<()> {
        let response =
            check_http(self.request("POST", &format!("/charts/{}/publish", chart_id)).call())?;
        let body: JSValue = response.into_json().unwrap_or(JSValue::Null);
        match body["url"].as_str() {
            Some(url) => info!("Chart published successfully: {}", url),
            None => info!("Chart {} published successfully", chart_id),
        }
        Ok(())
    }

    /// Retrieves the web-component embedding snippet of a published chart.
    pub fn retrieve_embedding_component(&self, chart_id: &str) -> FcResult<String> {
        let metadata = self.chart_metadata(chart_id)?;
        match metadata["metadata"]["publish"]["embed-codes"]["embed-method-web-component"].as_str()
        {
            Some(snippet) => Ok(snippet.to_string()),
            None => UnexpectedResponseSnafu {
                details: format!("chart {} carries no web-component embed code", chart_id),
            }
            .fail(),
        }
    }

    /// Retrieves the full metadata document of a chart.
    pub fn chart_metadata(&self, chart_id: &str) -> FcResult<JSValue> {
        let response = check_http(self.request("GET", &format!("/charts/{}", chart_id)).call())?;
        match response.into_json() {
            Ok(js) => Ok(js),
            Err(e) => whatever!("Could not parse the chart metadata: {}", e),
        }
    }

    /// Deletes a chart.
    pub fn delete_chart(&self, chart_id: &str) -> FcResult<()> {
        check_http(self.request("DELETE", &format!("/charts/{}", chart_id)).call())?;
        Ok(())
    }
}

/// The chart configuration used for every flashcard: a one-cell table fed by
/// external data, with markdown rendering on and every header, border and
/// pagination element turned off.
pub fn chart_config(chart_title: &str, data_location: &str) -> JSValue {
    json!({
        "title": chart_title,
        "type": "tables",
        "language": "en-GB",
        "metadata": {
            "data": {
                "changes": [],
                "transpose": false,
                "vertical-header": true,
                "horizontal-header": true,
                "external-data": data_location,
                "upload-method": "external-data",
                "external-metadata": "",
                "use-datawrapper-cdn": true
            },
            "describe": {
                "source-name": "",
                "source-url": "",
                "intro": "",
                "byline": "",
                "aria-description": "",
                "number-format": "-",
                "number-divisor": 0,
                "number-append": "",
                "number-prepend": "",
                "hide-title": true
            },
            "visualize": {
                "rows": {
                    "row-0": {
                        "style": {
                            "bold": false,
                            "color": false,
                            "italic": false,
                            "fontSize": 4,
                            "underline": false,
                            "background": false
                        },
                        "format": "0,0.[00]",
                        "moveTo": "top",
                        "sticky": false,
                        "moveRow": false,
                        "stickTo": "top",
                        "borderTop": "none",
                        "borderBottom": "none",
                        "borderTopColor": "#333333",
                        "overrideFormat": false,
                        "borderBottomColor": "#333333"
                    }
                },
                "pagination": {
                    "enabled": false,
                    "position": "top"
                },
                "markdown": true,
                "noHeader": true
            },
            "publish": {
                "embed-width": 1147,
                "get-the-data": false
            }
        }
    })
}

/// Runs the publication stage: every variable without a recorded chart ID
/// gets a chart created, published and its embedding code stored back into
/// the plotting-information file.
pub fn run_publish(api_token: &str, plotting_info_path: &str) -> FcResult<()> {
    let mut info = read_plotting_info(plotting_info_path)?;
    let client = DatawrapperClient::new(api_token);

    for (variable, entry) in info.iter_mut() {
        if entry.chart_id.is_some() {
            debug!("run_publish: {} already has a chart, skipping", variable);
            continue;
        }
        let data_location = match entry.data_location.as_deref() {
            Some(loc) => loc,
            None => whatever!(
                "Variable {} has no data location; run the construct stage first",
                variable
            ),
        };
        let chart_id = client.create_chart(data_location, &entry.chart_title)?;
        client.publish_chart(&chart_id)?;
        let embedding_code = client.retrieve_embedding_component(&chart_id)?;
        entry.chart_id = Some(chart_id);
        entry.embedding_code = Some(embedding_code);
    }

    write_plotting_info(plotting_info_path, &info)
}

/// Prints the full metadata of a chart, pretty-printed.
pub fn run_inspect(api_token: &str, chart_id: &str) -> FcResult<()> {
    let client = DatawrapperClient::new(api_token);
    let metadata = client.chart_metadata(chart_id)?;
    let pretty = serde_json::to_string_pretty(&metadata).context(ParsingJsonSnafu {})?;
    println!("{}", pretty);
    Ok(())
}

/// Deletes the given charts. A failed deletion is reported and does not stop
/// the remaining ones.
pub fn run_remove(api_token: &str, chart_ids: &[String]) -> FcResult<()> {
    let client = DatawrapperClient::new(api_token);
    for chart_id in chart_ids {
        match client.delete_chart(chart_id) {
            Ok(()) => info!("Successfully deleted chart with ID: {}", chart_id),
            Err(e) => warn!("Failed to delete chart with ID: {}: {}", chart_id, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_config_points_at_the_external_data() {
        let config = chart_config("How many people smoke?", "https://example.org/data.csv");
        assert_eq!(config["title"], "How many people smoke?");
        assert_eq!(config["type"], "tables");
        assert_eq!(
            config["metadata"]["data"]["external-data"],
            "https://example.org/data.csv"
        );
        assert_eq!(config["metadata"]["data"]["upload-method"], "external-data");
    }

    #[test]
    fn chart_config_renders_markdown_without_chrome() {
        let config = chart_config("t", "d");
        let visualize = &config["metadata"]["visualize"];
        assert_eq!(visualize["markdown"], true);
        assert_eq!(visualize["noHeader"], true);
        assert_eq!(visualize["pagination"]["enabled"], false);
        assert_eq!(visualize["rows"]["row-0"]["borderTop"], "none");
        assert_eq!(config["metadata"]["describe"]["hide-title"], true);
    }
}
