use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use crate::outcome::ErrorReport;
use crate::transport::{
    BoxFuture, InvocationRequest, RuntimeApi, FUNCTION_ERROR_TYPE, HEADER_FUNCTION_ERROR_TYPE,
    SUCCESS_BODY,
};
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;

const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP implementation of the host's runtime API.
///
/// The underlying client is built once at startup and reused for every
/// poll and report. It carries no request timeout: the poll may block for as
/// long as the host holds it open.
#[derive(Clone, Debug)]
pub struct HttpRuntimeApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRuntimeApi {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a caller-provided reqwest client.
    pub fn with_client(config: &RuntimeConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.base_url(),
            client,
        }
    }

    /// The base URL every protocol path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn fetch_next(&self) -> crate::Result<InvocationRequest> {
        let response = self
            .client
            .get(self.url("/invocation/next"))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(RuntimeError::Protocol(format!(
                "next invocation returned HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await?;
        InvocationRequest::from_parts(headers, body.to_vec())
    }

    async fn send_report(&self, req: reqwest::RequestBuilder) -> crate::Result<()> {
        let response = req
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| RuntimeError::Report(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(RuntimeError::Report(format!(
                "host rejected report with HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )));
        }

        Ok(())
    }
}

impl RuntimeApi for HttpRuntimeApi {
    fn next_invocation(&self) -> BoxFuture<'_, crate::Result<InvocationRequest>> {
        Box::pin(self.fetch_next())
    }

    fn post_response<'a>(&'a self, request_id: &'a str) -> BoxFuture<'a, crate::Result<()>> {
        Box::pin(async move {
            let url = self.url(&format!("/invocation/{}/response", request_id));
            self.send_report(self.client.post(url).body(SUCCESS_BODY))
                .await
        })
    }

    fn post_error<'a>(
        &'a self,
        request_id: &'a str,
        report: &'a ErrorReport,
    ) -> BoxFuture<'a, crate::Result<()>> {
        Box::pin(async move {
            let url = self.url(&format!("/invocation/{}/error", request_id));
            let req = self
                .client
                .post(url)
                .header(HEADER_FUNCTION_ERROR_TYPE, FUNCTION_ERROR_TYPE)
                .body(report.to_json());
            self.send_report(req).await
        })
    }
}
