//! Database gateway client.
//!
//! Sends SQL statements to the hosted database's HTTP pipeline endpoint and
//! returns their columnar results.
//!
//! # Architecture
//!
//! - One `POST` per call, bearer-token authorization
//! - Every statement is parameterised; values travel as typed arguments
//! - Statements of one call share a connection, so `last_insert_rowid()`
//!   sees the preceding insert
//! - No retries: failures are returned to the caller as [`GatewayError`]

pub mod client;
pub mod protocol;

pub use client::GatewayClient;
pub use protocol::{Column, Statement, StatementResult, Value};

use thiserror::Error;

/// Errors that can occur when talking to the database gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success status.
    #[error("Gateway returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response JSON did not have the expected shape.
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// The database rejected a statement.
    #[error("Statement failed: {message}")]
    Statement {
        message: String,
        code: Option<String>,
    },
}
