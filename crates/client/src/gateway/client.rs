//! HTTP client for the database gateway.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use super::GatewayError;
use super::protocol::{
    PipelineRequest, PipelineResponse, Statement, StatementResult, StreamResponse, StreamResult,
};
use crate::config::GatewayConfig;

/// Database gateway client.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct GatewayClient {
    inner: Arc<GatewayClientInner>,
}

struct GatewayClientInner {
    client: reqwest::Client,
    pipeline_url: String,
    auth_token: SecretString,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("pipeline_url", &self.inner.pipeline_url)
            .field("auth_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(GatewayClientInner {
                client,
                pipeline_url: config.pipeline_url.clone(),
                auth_token: config.auth_token.clone(),
            }),
        })
    }

    /// Execute a single statement.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` on network failures, `Status` for a
    /// non-success response, `Parse`/`MalformedResponse` when the body is not
    /// the expected envelope, and `Statement` when the database rejects it.
    #[instrument(skip(self, statement), fields(sql = %statement.sql))]
    pub async fn execute(&self, statement: Statement) -> Result<StatementResult, GatewayError> {
        let mut results = self.execute_batch(vec![statement]).await?;
        results
            .pop()
            .ok_or_else(|| GatewayError::MalformedResponse("missing results".to_string()))
    }

    /// Execute statements in order on one connection.
    ///
    /// Returns one result per statement.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute); the first failing statement aborts
    /// the whole call.
    #[instrument(skip(self, statements), fields(count = statements.len()))]
    pub async fn execute_batch(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, GatewayError> {
        let expected = statements.len();
        let body = PipelineRequest::execute_all(statements);

        let response = self
            .inner
            .client
            .post(&self.inner.pipeline_url)
            .header(
                "Authorization",
                format!("Bearer {}", self.inner.auth_token.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Gateway returned non-success status"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        let parsed: PipelineResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse gateway response"
            );
            GatewayError::Parse(e)
        })?;

        let results = unpack_results(parsed, expected)?;
        debug!(
            rows = results.iter().map(|r| r.rows.len()).sum::<usize>(),
            "Gateway call succeeded"
        );
        Ok(results)
    }
}

/// Pull the statement results out of a pipeline response.
///
/// The response must begin with one `ok`/`execute` result per statement; a
/// trailing `close` result is ignored.
pub(crate) fn unpack_results(
    response: PipelineResponse,
    expected: usize,
) -> Result<Vec<StatementResult>, GatewayError> {
    if response.results.len() < expected {
        return Err(GatewayError::MalformedResponse(format!(
            "expected {expected} results, got {}",
            response.results.len()
        )));
    }

    response
        .results
        .into_iter()
        .take(expected)
        .map(|result| match result {
            StreamResult::Ok {
                response: StreamResponse::Execute { result },
            } => Ok(result),
            StreamResult::Ok {
                response: StreamResponse::Close,
            } => Err(GatewayError::MalformedResponse(
                "close result where execute result expected".to_string(),
            )),
            StreamResult::Error { error } => {
                error!(message = %error.message, code = ?error.code, "Statement failed");
                Err(GatewayError::Statement {
                    message: error.message,
                    code: error.code,
                })
            }
        })
        .collect()
}
