/// Message store collaborator: history fetch and message persistence over HTTP
use crate::error::{Result, SyncError};
use crate::identity::Credential;
use crate::message::{HistoryRecord, SendRequest};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Ordered history between `self_id` and `counterpart_id`
    async fn fetch_history(
        &self,
        self_id: &str,
        counterpart_id: &str,
        credential: &Credential,
    ) -> Result<Vec<HistoryRecord>>;

    /// Store a new message
    async fn persist(&self, request: &SendRequest, credential: &Credential) -> Result<()>;
}

/// REST message store:
///   GET  {base}/api/messages/{self_id}/{counterpart_id}
///   POST {base}/api/messages             body: {"from":..,"to":..,"message":..}
#[derive(Clone)]
pub struct HttpMessageStore {
    base_url: String,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HttpMessageStore {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn call(
        &self,
        method: Method,
        url: String,
        credential: &Credential,
        body: Option<Vec<u8>>,
    ) -> Result<Bytes> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&url)
            .header(AUTHORIZATION, credential.bearer());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| SyncError::Http(format!("Invalid request to {}: {}", url, e)))?;

        debug!("{} {}", method, url);
        let resp = self
            .client
            .request(req)
            .await
            .map_err(|e| SyncError::Http(format!("{} {} failed: {}", method, url, e)))?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| SyncError::Http(format!("Failed to read response body: {}", e)))?
            .to_bytes();

        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        Ok(bytes)
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> SyncError {
    let detail: String = String::from_utf8_lossy(body).chars().take(200).collect();
    SyncError::Store(format!("store answered {}: {}", status, detail.trim()))
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn fetch_history(
        &self,
        self_id: &str,
        counterpart_id: &str,
        credential: &Credential,
    ) -> Result<Vec<HistoryRecord>> {
        let url = self.api_url(&format!(
            "api/messages/{}/{}",
            urlencoding::encode(self_id),
            urlencoding::encode(counterpart_id)
        ));
        let bytes = self.call(Method::GET, url, credential, None).await?;
        let records: Vec<HistoryRecord> = serde_json::from_slice(&bytes)?;
        Ok(records)
    }

    async fn persist(&self, request: &SendRequest, credential: &Credential) -> Result<()> {
        let url = self.api_url("api/messages");
        let body = serde_json::to_vec(request)?;
        self.call(Method::POST, url, credential, Some(body)).await?;
        Ok(())
    }
}
