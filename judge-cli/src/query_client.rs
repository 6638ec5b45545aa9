//! Client side of the graph/RRD query RPC (spec §4.B, §6).
//!
//! The RPC server itself is out of scope — this module only issues the
//! request and decodes the response. Every call is wrapped in a finite
//! timeout by the caller (the scheduler's per-group worker), never here,
//! so the timeout budget stays visible at the call site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use judge_core::{History, SamplePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConsolFun {
    #[serde(rename = "AVERAGE")]
    Average,
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "MIN")]
    Min,
}

/// One graph query: a single metric series over a time window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryParam {
    pub start: i64,
    pub end: i64,
    pub consol_fun: ConsolFun,
    pub endpoint: String,
    /// `metric` or `metric/k=v,k=v` — the counter string.
    pub counter: String,
    pub step: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QueryResponse {
    #[allow(dead_code)]
    endpoint: String,
    #[allow(dead_code)]
    counter: String,
    #[allow(dead_code)]
    ds_type: String,
    #[allow(dead_code)]
    step: i64,
    values: Vec<RawPoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPoint {
    timestamp: i64,
    value: f64,
}

/// Queries a history sequence from the graph/RRD backend. Implementations
/// must return the sequence newest-first — out-of-order results are the
/// caller's responsibility to sort, per spec §4.B, but every implementation
/// shipped here already returns in the required order.
#[async_trait]
pub trait GraphQueryClient: Send + Sync {
    async fn query(&self, param: QueryParam) -> Result<History, String>;
}

/// Default HTTP/JSON implementation of [`GraphQueryClient`].
pub struct HttpGraphQueryClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpGraphQueryClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl GraphQueryClient for HttpGraphQueryClient {
    async fn query(&self, param: QueryParam) -> Result<History, String> {
        let response = self
            .http
            .post(format!("{}/graph/history", self.endpoint))
            .json(&param)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("graph backend returned {}", response.status()));
        }

        let decoded: QueryResponse = response.json().await.map_err(|e| e.to_string())?;

        let mut history: History = decoded
            .values
            .into_iter()
            .map(|p| SamplePoint::new(p.timestamp, p.value))
            .collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(history)
    }
}
