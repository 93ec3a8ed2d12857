//! Retrieval of federated descriptive statistics from a vantage6 server.
//!
//! The flow is strictly sequential: authenticate, submit the task, poll until
//! the task is done, fetch the result and store it. No timeout is configured
//! at this layer and there is no cancellation, so an unresponsive server
//! stalls the stage. An authentication failure surfaces as a typed
//! [FlashcardError::AuthenticationFailed] so that callers can detect it
//! reliably.

use crate::flashcards::plotting_info::*;
use crate::flashcards::*;

use log::{debug, info};
use serde::Deserialize;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const TASK_NAME: &str = "Non-expert descriptive retrieval";
const TASK_IMAGE: &str = "ghcr.io/strongaya/v6-descriptive-statistics:v1.0.0-beta";
const TASK_DESCRIPTION: &str =
    "Retrieval of descriptive statistics for the non-expert information portal";
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// The server and credential configuration.
///
/// `collaboration` and `aggregating_organisation` are kept as raw JSON
/// values: when the file is assembled from CI secrets the numbers arrive as
/// strings, and the organisation may be a single ID or a list.
#[derive(Debug, Clone, Deserialize)]
pub struct VantageConfig {
    pub server_url: String,
    server_port: JSValue,
    pub server_api: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    organization_key: Option<String>,
    collaboration: JSValue,
    aggregating_organisation: JSValue,
}

impl VantageConfig {
    pub fn collaboration_id(&self) -> FcResult<u64> {
        read_js_uint(&self.collaboration)
    }

    pub fn aggregating_organisations(&self) -> FcResult<Vec<u64>> {
        match &self.aggregating_organisation {
            JSValue::Array(items) => items.iter().map(read_js_uint).collect(),
            single => Ok(vec![read_js_uint(single)?]),
        }
    }

    pub fn server_port(&self) -> FcResult<u64> {
        read_js_uint(&self.server_port)
    }

    /// The private key of the user's organisation; an empty string counts as
    /// not configured.
    pub fn organization_key(&self) -> Option<&str> {
        self.organization_key.as_deref().filter(|k| !k.is_empty())
    }

    fn base_url(&self) -> FcResult<String> {
        Ok(format!(
            "{}:{}{}",
            self.server_url,
            self.server_port()?,
            self.server_api
        ))
    }
}

fn read_js_uint(x: &JSValue) -> FcResult<u64> {
    match x {
        JSValue::Number(n) => n.as_u64().context(ParsingJsonNumberSnafu {}),
        JSValue::String(s) => s.parse::<u64>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

pub fn read_config(path: &str) -> FcResult<VantageConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu {
        path: path.to_string(),
    })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

/// An authenticated session against the coordinator.
pub struct VantageClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: String,
}

/// Authenticates against the coordinator with the configured credentials.
///
/// A rejected login is a recoverable, typed error rather than a fatal one:
/// the caller decides whether to abort or report.
pub fn authenticate(config: &VantageConfig) -> FcResult<VantageClient> {
    let agent = ureq::Agent::new();
    let base_url = config.base_url()?;
    info!("Authenticating against {}", base_url);

    let result = agent
        .post(&format!("{}/token/user", base_url))
        .send_json(json!({
            "username": config.username,
            "password": config.password,
        }));
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            return AuthenticationFailedSnafu { status, body }.fail();
        }
        Err(ureq::Error::Transport(t)) => {
            return HttpTransportSnafu {
                details: t.to_string(),
            }
            .fail()
        }
    };

    let body: JSValue = match response.into_json() {
        Ok(js) => js,
        Err(e) => whatever!("Could not parse the authentication response: {}", e),
    };
    let access_token = match body["access_token"].as_str() {
        Some(token) => token.to_string(),
        None => {
            return UnexpectedResponseSnafu {
                details: "authentication response carries no access token".to_string(),
            }
            .fail()
        }
    };

    if config.organization_key().is_some() {
        // End-to-end payload encryption is handled by the algorithm
        // containers; the key is only validated for presence here.
        debug!("Organisation key configured");
    }

    Ok(VantageClient {
        agent,
        base_url,
        access_token,
    })
}

impl VantageClient {
    fn request(&self, method: &str, path: &str) -> ureq::Request {
        self.agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("Authorization", &format!("Bearer {}", self.access_token))
    }

    /// Submits the descriptive-statistics task and returns its ID.
    pub fn create_task(&self, config: &VantageConfig, variables: &JSValue) -> FcResult<u64> {
        let payload = json!({
            "name": TASK_NAME,
            "image": TASK_IMAGE,
            "description": TASK_DESCRIPTION,
            "collaboration_id": config.collaboration_id()?,
            "organizations": config.aggregating_organisations()?,
            "input": {
                "method": "central",
                "kwargs": { "variables_to_describe": variables }
            },
            "databases": [ { "label": "csv" } ],
        });
        let response = check_http(self.request("POST", "/task").send_json(&payload))?;
        let body: JSValue = match response.into_json() {
            Ok(js) => js,
            Err(e) => whatever!("Could not parse the task-creation response: {}", e),
        };
        match body["id"].as_u64() {
            Some(id) => {
                info!("Created task {}", id);
                Ok(id)
            }
            None => UnexpectedResponseSnafu {
                details: "task-creation response carries no id".to_string(),
            }
            .fail(),
        }
    }

    /// Blocks until the task reports a terminal status.
    pub fn wait_for_results(&self, task_id: u64) -> FcResult<()> {
        info!("Waiting for results");
        loop {
            let response =
                check_http(self.request("GET", &format!("/task/{}", task_id)).call())?;
            let body: JSValue = match response.into_json() {
                Ok(js) => js,
                Err(e) => whatever!("Could not parse the task status: {}", e),
            };
            let status = body["status"].as_str().unwrap_or("unknown");
            debug!("Task {}: status {}", task_id, status);
            match status {
                "completed" | "finished" => return Ok(()),
                "failed" | "crashed" | "killed" => {
                    whatever!("Task {} ended with status {}", task_id, status)
                }
                _ => std::thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Fetches the result payload of a finished task. The algorithm returns
    /// its data as a JSON-encoded string; it is passed through untouched.
    pub fn task_result(&self, task_id: u64) -> FcResult<String> {
        let response = check_http(
            self.request("GET", &format!("/result?task_id={}", task_id))
                .call(),
        )?;
        let body: JSValue = match response.into_json() {
            Ok(js) => js,
            Err(e) => whatever!("Could not parse the task result: {}", e),
        };
        match body["data"][0]["result"].as_str() {
            Some(result) => Ok(result.to_string()),
            None => UnexpectedResponseSnafu {
                details: format!("task {} result carries no data", task_id),
            }
            .fail(),
        }
    }
}

/// One `{datatype: "categorical"}` entry per variable identifier in the
/// plotting information.
pub fn variables_to_describe(info: &PlottingInfo) -> JSValue {
    let mut map: JSMap<String, JSValue> = JSMap::new();
    for entry in info.values() {
        map.insert(
            entry.variable_identifier.clone(),
            json!({ "datatype": "categorical" }),
        );
    }
    JSValue::Object(map)
}

/// Runs the retrieval stage end to end and writes the result payload to
/// `data/raw/vantage6_result.json`.
pub fn run_retrieve(config_path: &str, plotting_info_path: &str) -> FcResult<()> {
    let config = read_config(config_path)?;
    let info = read_plotting_info(plotting_info_path)?;

    let client = authenticate(&config)?;
    let task_id = client.create_task(&config, &variables_to_describe(&info))?;
    client.wait_for_results(task_id)?;
    let result = client.task_result(task_id)?;

    let out_dir: PathBuf = ["data", "raw"].iter().collect();
    fs::create_dir_all(&out_dir).context(WritingFlashcardSnafu {
        path: out_dir.display().to_string(),
    })?;
    let target = out_dir.join("vantage6_result.json");
    // The payload stays string-wrapped, which is one of the layouts the
    // aggregated-data reader accepts.
    let contents =
        serde_json::to_string_pretty(&JSValue::String(result)).context(ParsingJsonSnafu {})?;
    fs::write(&target, contents).context(WritingFlashcardSnafu {
        path: target.display().to_string(),
    })?;
    info!("Wrote federated result to {}", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_js(collaboration: JSValue, organisation: JSValue) -> VantageConfig {
        serde_json::from_value(json!({
            "server_url": "https://server.example.org",
            "server_port": 443,
            "server_api": "/api",
            "username": "user",
            "password": "secret",
            "organization_key": "",
            "collaboration": collaboration,
            "aggregating_organisation": organisation,
        }))
        .unwrap()
    }

    #[test]
    fn accepts_numeric_ids() {
        let config = config_js(json!(3), json!(7));
        assert_eq!(config.collaboration_id().unwrap(), 3);
        assert_eq!(config.aggregating_organisations().unwrap(), vec![7]);
    }

    #[test]
    fn accepts_stringly_typed_ids() {
        // Values coming from CI secrets arrive as strings.
        let config = config_js(json!("3"), json!("7"));
        assert_eq!(config.collaboration_id().unwrap(), 3);
        assert_eq!(config.aggregating_organisations().unwrap(), vec![7]);
    }

    #[test]
    fn accepts_a_list_of_organisations() {
        let config = config_js(json!(3), json!([7, "8"]));
        assert_eq!(config.aggregating_organisations().unwrap(), vec![7, 8]);
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let config = config_js(json!(true), json!(7));
        assert!(matches!(
            config.collaboration_id(),
            Err(FlashcardError::ParsingJsonNumber {})
        ));
    }

    #[test]
    fn empty_organisation_key_counts_as_absent() {
        let config = config_js(json!(3), json!(7));
        assert_eq!(config.organization_key(), None);
    }

    #[test]
    fn builds_the_server_base_url() {
        let config = config_js(json!(3), json!(7));
        assert_eq!(
            config.base_url().unwrap(),
            "https://server.example.org:443/api"
        );
    }

    #[test]
    fn describes_every_variable_as_categorical() {
        let info: PlottingInfo = serde_json::from_value(json!({
            "Smoking behaviour": {
                "variable_identifier": "smoking_status",
                "chart_id": null,
                "chart_title": "How many people smoke?",
                "data_location": null,
                "positive_strata": ["never"],
                "negative_strata": ["current"]
            }
        }))
        .unwrap();
        let vars = variables_to_describe(&info);
        assert_eq!(vars["smoking_status"]["datatype"], "categorical");
    }
}
