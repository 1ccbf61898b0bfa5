//! Wire types for the database gateway's pipeline endpoint.
//!
//! A request carries a list of stream requests (`execute`, then `close`);
//! the response carries one result per request in the same order. Values are
//! tagged with their SQL type; integers travel as decimal strings so that
//! 64-bit ids survive JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// Body of a `POST` to the pipeline endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRequest {
    pub requests: Vec<StreamRequest>,
}

impl PipelineRequest {
    /// Execute the statements in order on one connection, then close it.
    #[must_use]
    pub fn execute_all(statements: Vec<Statement>) -> Self {
        let mut requests: Vec<_> = statements
            .into_iter()
            .map(|stmt| StreamRequest::Execute { stmt })
            .collect();
        requests.push(StreamRequest::Close);
        Self { requests }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamRequest {
    Execute { stmt: Statement },
    Close,
}

/// A SQL statement with positional `?` arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

impl Statement {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// Bind the next positional argument.
    #[must_use]
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }
}

/// A typed SQL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Value {
    Null,
    Integer {
        #[serde(deserialize_with = "string_or_number")]
        value: String,
    },
    Float {
        value: f64,
    },
    Text {
        value: String,
    },
    Blob {
        base64: String,
    },
}

impl Value {
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Integer {
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float { value }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text { value }
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Accept integer cells encoded either as strings or as JSON numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected integer string, got {other}"
        ))),
    }
}

/// Response body of the pipeline endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineResponse {
    #[serde(default)]
    pub results: Vec<StreamResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: StreamError },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamResponse {
    Execute { result: StatementResult },
    Close,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Columnar result of one statement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub cols: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub affected_row_count: u64,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decltype: Option<String>,
}
