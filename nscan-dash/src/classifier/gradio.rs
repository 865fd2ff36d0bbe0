//! Gradio HTTP API client
//!
//! Talks to a model hosted as a Gradio application (e.g. a Hugging Face
//! Space). One classification is three requests:
//!
//! 1. `POST {prefix}/upload` - multipart `files` part, returns server paths
//! 2. `POST {prefix}/call/{api}` - file reference as input, returns `event_id`
//! 3. `GET {prefix}/call/{api}/{event_id}` - `text/event-stream` with the result
//!
//! `{prefix}` is the optional `api_prefix` advertised by `GET /config`
//! (newer Gradio releases serve the API under `/gradio_api`).

use super::{
    ClassificationResult, Classifier, ClassifierError, ConnectionState, Connector, LabelPayload,
    Prediction,
};
use crate::pipeline::transient_original_name;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("NeuroScan/", env!("CARGO_PKG_VERSION"));

/// Establishes connections to a Gradio application
#[derive(Clone)]
pub struct GradioConnector {
    http_client: Client,
    base_url: String,
    api_name: String,
}

impl GradioConnector {
    /// Create connector for `base_url` and endpoint `api_name`
    ///
    /// `timeout` of `None` keeps the transport default.
    pub fn new(
        base_url: &str,
        api_name: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ClassifierError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_name: api_name.trim_start_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_api_prefix(&self) -> Result<String, ClassifierError> {
        let url = format!("{}/config", self.base_url);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), body));
        }

        let config: Value = response.json().await?;
        if !config.is_object() {
            return Err(ClassifierError::Parse(
                "config is not a JSON object".to_string(),
            ));
        }

        Ok(config
            .get("api_prefix")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim_end_matches('/')
            .to_string())
    }
}

#[async_trait]
impl Connector for GradioConnector {
    async fn connect(&self) -> ConnectionState {
        debug!(base_url = %self.base_url, "Connecting to Gradio application");

        match self.fetch_api_prefix().await {
            Ok(api_prefix) => {
                let classifier = GradioClassifier {
                    http_client: self.http_client.clone(),
                    endpoint: format!("{}{}/{}", self.base_url, api_prefix, self.api_name),
                    api_root: format!("{}{}", self.base_url, api_prefix),
                    api_name: self.api_name.clone(),
                };
                info!(endpoint = %classifier.endpoint, "Remote classifier connected");
                ConnectionState::Connected(Arc::new(classifier))
            }
            Err(e) => {
                warn!(base_url = %self.base_url, error = %e, "Remote classifier unreachable");
                ConnectionState::disconnected(e.to_string())
            }
        }
    }
}

/// Connected handle to one Gradio endpoint
pub struct GradioClassifier {
    http_client: Client,
    /// Display form: `{base}{prefix}/{api_name}`
    endpoint: String,
    /// `{base}{prefix}`
    api_root: String,
    api_name: String,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    event_id: String,
}

impl GradioClassifier {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ClassifierError> {
        let form = Form::new().part("files", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .http_client
            .post(format!("{}/upload", self.api_root))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), body));
        }

        let paths: Vec<String> = response.json().await?;
        paths
            .into_iter()
            .next()
            .ok_or_else(|| ClassifierError::Parse("upload returned no file path".to_string()))
    }

    async fn submit(&self, server_path: &str, file_name: &str) -> Result<String, ClassifierError> {
        let body = json!({
            "data": [{
                "path": server_path,
                "orig_name": file_name,
                "meta": {"_type": "gradio.FileData"}
            }]
        });

        let response = self
            .http_client
            .post(format!("{}/call/{}", self.api_root, self.api_name))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), body));
        }

        let call: CallResponse = response.json().await?;
        Ok(call.event_id)
    }

    async fn fetch_result(&self, event_id: &str) -> Result<Value, ClassifierError> {
        let response = self
            .http_client
            .get(format!("{}/call/{}/{}", self.api_root, self.api_name, event_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), body));
        }

        let stream = response.text().await?;
        parse_event_stream(&stream)
    }

    async fn try_classify(&self, image_path: &Path) -> Result<Prediction, ClassifierError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| ClassifierError::Io(format!("{}: {}", image_path.display(), e)))?;
        // Report the user's file name, not the transient one
        let file_name = transient_original_name(image_path)
            .or_else(|| {
                image_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "image".to_string());

        let server_path = self.upload(&file_name, bytes).await?;
        debug!(server_path = %server_path, "Image uploaded to Gradio");

        let event_id = self.submit(&server_path, &file_name).await?;
        debug!(event_id = %event_id, "Prediction queued");

        let output = self.fetch_result(&event_id).await?;
        let payload = output
            .as_array()
            .and_then(|outputs| outputs.first())
            .cloned()
            .ok_or_else(|| ClassifierError::Parse("result has no outputs".to_string()))?;

        let payload: LabelPayload = serde_json::from_value(payload)
            .map_err(|e| ClassifierError::Parse(format!("label payload: {}", e)))?;

        Ok(payload.into_prediction())
    }
}

#[async_trait]
impl Classifier for GradioClassifier {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn classify(&self, image_path: &Path) -> ClassificationResult {
        let result = self.try_classify(image_path).await;
        match &result {
            Ok(prediction) => info!(
                label = %prediction.label,
                confidence = prediction.confidence_percent,
                "Remote classification succeeded"
            ),
            Err(e) => warn!(endpoint = %self.endpoint, error = %e, "Remote classification failed"),
        }
        result
    }
}

/// Extract the result of a Gradio call from its event stream body
///
/// `event: complete` carries the output array; `event: error` is a service
/// failure. Other events (`generating`, `heartbeat`) are skipped.
pub fn parse_event_stream(stream: &str) -> Result<Value, ClassifierError> {
    let mut current_event = "";

    for line in stream.lines() {
        let line = line.trim_end_matches('\r');

        if let Some(name) = line.strip_prefix("event:") {
            current_event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match current_event {
                "complete" => {
                    return serde_json::from_str(data)
                        .map_err(|e| ClassifierError::Parse(format!("result data: {}", e)));
                }
                "error" => {
                    let message = match data {
                        "" | "null" => "remote model reported an error".to_string(),
                        other => other.trim_matches('"').to_string(),
                    };
                    return Err(ClassifierError::Service(message));
                }
                _ => {}
            }
        } else if line.is_empty() {
            current_event = "";
        }
    }

    Err(ClassifierError::Parse(
        "event stream ended without a result".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_normalizes_urls() {
        let connector =
            GradioConnector::new("https://example.hf.space/", "/predict", None).unwrap();
        assert_eq!(connector.base_url(), "https://example.hf.space");
        assert_eq!(connector.api_name, "predict");
    }

    #[test]
    fn test_parse_complete_event() {
        let stream = "event: generating\ndata: null\n\n\
                      event: complete\n\
                      data: [{\"label\": \"Glioma\", \"confidences\": [{\"label\": \"Glioma\", \"confidence\": 0.92}]}]\n\n";

        let value = parse_event_stream(stream).unwrap();
        assert_eq!(value[0]["label"], "Glioma");
    }

    #[test]
    fn test_parse_crlf_stream() {
        let stream = "event: complete\r\ndata: [{\"label\": \"No Tumor\"}]\r\n\r\n";
        let value = parse_event_stream(stream).unwrap();
        assert_eq!(value[0]["label"], "No Tumor");
    }

    #[test]
    fn test_parse_error_event() {
        let err = parse_event_stream("event: error\ndata: \"GPU quota exceeded\"\n\n").unwrap_err();
        assert_eq!(err, ClassifierError::Service("GPU quota exceeded".to_string()));

        let err = parse_event_stream("event: error\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, ClassifierError::Service(_)));
    }

    #[test]
    fn test_parse_stream_without_result() {
        let err = parse_event_stream("event: heartbeat\ndata: null\n\n").unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_event_stream("event: complete\ndata: [not json\n\n").unwrap_err();
        assert!(matches!(err, ClassifierError::Parse(_)));
    }
}
