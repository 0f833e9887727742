use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use reaper_common::{Condition, PurgeConfig};

use crate::types::{EngineError, ProcessEngine, ProcessInstance};

const HEALTH_PATH: &str = "/engine";
const HISTORY_QUERY_PATH: &str = "/history/process-instance";
const INSTANCE_PATH: &str = "/process-instance";

/// Fully buffered response with a 2xx status.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn json(self) -> Result<Option<Value>, EngineError> {
        decode_body(self.status, &self.body)
    }
}

/// Non-2xx statuses become `HttpStatus`; 204 and empty bodies carry no value.
fn decode_body(status: u16, body: &str) -> Result<Option<Value>, EngineError> {
    if !(200..300).contains(&status) {
        return Err(EngineError::HttpStatus {
            status,
            body: body.to_string(),
        });
    }
    if status == 204 || body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body)
        .map(Some)
        .map_err(|e| EngineError::Parse(e.to_string()))
}

fn instance_ids(value: Option<Value>) -> Result<Vec<String>, EngineError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let instances: Vec<ProcessInstance> =
        serde_json::from_value(value).map_err(|e| EngineError::Parse(e.to_string()))?;
    Ok(instances.into_iter().map(|i| i.id).collect())
}

/// Client for a Camunda-style `engine-rest` API.
#[derive(Debug, Clone)]
pub struct RestProcessEngine {
    base_url: String,
    http: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl RestProcessEngine {
    pub fn new(cfg: &PurgeConfig) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url(),
            http,
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            max_retries: cfg.max_retries,
            retry_backoff: cfg.retry_backoff(),
        })
    }

    /// Issue one logical request and decode a JSON body, if any.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<Option<Value>, EngineError> {
        self.send(method, path, body, headers).await?.json()
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<RawResponse, EngineError> {
        self.send_counted(method, path, body, headers).await.0
    }

    /// Retrying send that also reports how many attempts were made.
    async fn send_counted(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> (Result<RawResponse, EngineError>, u32) {
        let mut attempt = 1u32;
        loop {
            match self.send_once(method.clone(), path, body, headers).await {
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    tracing::warn!(%method, path, attempt, error=%e, "request failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry_backoff).await;
                }
                other => return (other, attempt),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<RawResponse, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.request(method, url);
        if let Some(h) = headers {
            req = req.headers(h.clone());
        }
        if let Some(user) = &self.username {
            req = req.basic_auth(user, self.password.as_ref());
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(EngineError::HttpStatus { status, body });
        }
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl ProcessEngine for RestProcessEngine {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn health(&self) -> Result<(), EngineError> {
        self.send(Method::GET, HEALTH_PATH, None, None).await?;
        Ok(())
    }

    async fn find_instance_ids(&self, condition: &Condition) -> Result<Vec<String>, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = Value::Object(condition.clone());
        let resp = self
            .request(Method::POST, HISTORY_QUERY_PATH, Some(&body), Some(&headers))
            .await?;
        instance_ids(resp)
    }

    async fn delete_instance(&self, id: &str) -> Result<(), EngineError> {
        // Only the status matters; the body of a successful delete is ignored.
        let path = format!("{INSTANCE_PATH}/{}", urlencoding::encode(id));
        match self.send_counted(Method::DELETE, &path, None, None).await {
            (Ok(_), _) => Ok(()),
            // An earlier attempt may have removed the instance before its reply was lost.
            (Err(e), attempts) if attempts > 1 && e.status() == Some(404) => {
                tracing::info!(
                    id,
                    attempts,
                    "instance already gone on retry, delete counted as done"
                );
                Ok(())
            }
            (Err(e), _) => Err(e),
        }
    }
}
