//! HTTP JSON-RPC client for the remote task agent.

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use crate::config::AgentConfig;

use super::error::RemoteError;
use super::types::{
    JsonRpcRequest, JsonRpcResponse, METHOD_MESSAGE_SEND, METHOD_TASKS_GET, MessageSendParams,
    OutboundMessage, Part, SendConfiguration, TaskQueryParams, TaskSnapshot,
};
use super::TaskClient;

/// [`TaskClient`] speaking JSON-RPC 2.0 over HTTP POST.
///
/// Every call is bounded by the configured request timeout; the bound
/// covers connecting, sending and reading the whole response body.
#[derive(Clone)]
pub struct HttpTaskClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTaskClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTaskClient {
    /// Build a client from the agent section of the application config.
    pub fn new(settings: &AgentConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&settings.base_url)?;
        Ok(Self::with_client(
            reqwest::Client::new(),
            endpoint,
            settings.api_key.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        ))
    }

    /// Build a client around an existing reqwest client.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn call<P, R>(&self, method: &'static str, params: P) -> Result<R, RemoteError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest::new(method, params);

        let outcome = tokio::time::timeout(self.timeout, self.exchange(&request))
            .await
            .unwrap_or_else(|_| Err(RemoteError::timeout(method)));

        if let Err(err) = &outcome {
            tracing::warn!(
                method,
                request_id = %request.id,
                code = err.code,
                error = %err.message,
                "Remote call failed"
            );
        }
        outcome
    }

    async fn exchange<P, R>(&self, request: &JsonRpcRequest<P>) -> Result<R, RemoteError>
    where
        P: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        let mut rb = self.http.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            rb = rb.bearer_auth(key);
        }

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::http_status(status.as_u16(), &body));
        }

        let body: JsonRpcResponse<R> = resp.json().await?;
        if let Some(err) = body.error {
            return Err(err.into());
        }
        body.result.ok_or_else(|| {
            RemoteError::parse(format!(
                "{} response carried neither result nor error",
                request.method
            ))
        })
    }
}

#[async_trait::async_trait]
impl TaskClient for HttpTaskClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn submit(
        &self,
        thread_id: &str,
        task_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<TaskSnapshot, RemoteError> {
        let params = MessageSendParams {
            message: OutboundMessage {
                kind: "message",
                role: "user",
                parts: vec![Part::text(text)],
                message_id: message_id.to_string(),
                context_id: thread_id.to_string(),
                task_id: task_id.to_string(),
            },
            configuration: SendConfiguration::default(),
        };
        self.call(METHOD_MESSAGE_SEND, params).await
    }

    #[instrument(skip(self))]
    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot, RemoteError> {
        let params = TaskQueryParams {
            task_id: task_id.to_string(),
        };
        self.call(METHOD_TASKS_GET, params).await
    }
}
