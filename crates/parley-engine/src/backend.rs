use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use parley_openresponses::{CreateResponsePayload, ResponseResource};

use crate::config::ClientConfig;
use crate::error::{AgentError, BackendError};

/// One non-streaming round trip to the model backend.
pub trait Backend: Send + Sync {
    fn create_response(
        &self,
        payload: CreateResponsePayload,
    ) -> BoxFuture<'_, Result<ResponseResource, BackendError>>;
}

/// `POST {base_url}/responses` over HTTP.
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    headers: HeaderMap,
}

impl HttpBackend {
    pub fn new(http: reqwest::Client, config: &ClientConfig) -> Result<Self, AgentError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| AgentError::NotConfigured("missing API key".to_string()))?
            .to_string();

        let mut headers = HeaderMap::new();
        if let Some(organization) = config.organization.as_deref() {
            insert_header(&mut headers, "OpenAI-Organization", organization)?;
        }
        if let Some(project) = config.project.as_deref() {
            insert_header(&mut headers, "OpenAI-Project", project)?;
        }
        for (name, value) in &config.headers {
            insert_header(&mut headers, name, value)?;
        }

        Ok(Self {
            http,
            endpoint: config.responses_url(),
            api_key,
            headers,
        })
    }

    async fn post(&self, payload: CreateResponsePayload) -> Result<ResponseResource, BackendError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .headers(self.headers.clone())
            .json(payload.body())
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: error_message(&body).unwrap_or(body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;
        let resource = ResponseResource::from_value(body).map_err(BackendError::Decode)?;

        if let Some(error) = resource.error() {
            return Err(BackendError::Api(error.message.clone()));
        }
        if resource.status() == Some("failed") {
            return Err(BackendError::Api("response failed".to_string()));
        }
        Ok(resource)
    }
}

impl Backend for HttpBackend {
    fn create_response(
        &self,
        payload: CreateResponsePayload,
    ) -> BoxFuture<'_, Result<ResponseResource, BackendError>> {
        Box::pin(self.post(payload))
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), AgentError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| AgentError::NotConfigured(format!("invalid header name {name:?}: {err}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| AgentError::NotConfigured(format!("invalid value for header {}: {err}", name.as_str())))?;
    headers.insert(name, value);
    Ok(())
}

/// Pulls `error.message` out of an API error body when there is one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
