//! Scheduler client (spec.md §4.C): submit a rendered job specification to
//! the cluster scheduler and track its allocation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrwsi_protocol::retry::retry_with_backoff;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("scheduler rejected the request: HTTP {0}")]
    Rejected(u16),
    #[error("scheduler response did not match the expected shape: {0}")]
    DataShape(String),
    #[error("scheduler has no record of job {0}")]
    NotFound(String),
}

impl SchedulerError {
    fn is_transient(&self) -> bool {
        matches!(self, SchedulerError::Transport(e) if e.is_timeout() || e.is_connect())
    }
}

/// Allocation status values observed from the scheduler, mapped to an
/// internal enum (spec.md §4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStatus {
    Running,
    Pending,
    Dead,
    Complete,
}

impl AllocationStatus {
    fn from_client_status(raw: &str) -> Option<Self> {
        match raw {
            "running" => Some(AllocationStatus::Running),
            "pending" => Some(AllocationStatus::Pending),
            "dead" => Some(AllocationStatus::Dead),
            "complete" => Some(AllocationStatus::Complete),
            _ => None,
        }
    }

    pub const fn is_live(self) -> bool {
        matches!(self, AllocationStatus::Running | AllocationStatus::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub status: AllocationStatus,
    pub submit_time: DateTime<Utc>,
    pub dispatch_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AllocationSummary {
    pub id: String,
    pub client_status: AllocationStatus,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(rename = "EvalID")]
    evaluation_id: String,
}

#[derive(Debug, Deserialize)]
struct AllocationResponse {
    #[serde(rename = "ClientStatus")]
    client_status: String,
    #[serde(rename = "SubmitTime")]
    submit_time_ns: i64,
    #[serde(rename = "CreateTime")]
    dispatch_time_ns: i64,
}

#[derive(Debug, Deserialize)]
struct AllocationListEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "ClientStatus")]
    client_status: String,
}

fn nanos_to_datetime(nanos: i64) -> DateTime<Utc> {
    let secs = nanos.div_euclid(1_000_000_000);
    let subnanos = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subnanos).unwrap_or_else(Utc::now)
}

#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn submit(&self, job_spec: &str) -> Result<String, SchedulerError>;
    async fn get_allocation(&self, job_id: &str) -> Result<Allocation, SchedulerError>;
    async fn list_allocations(
        &self,
        job_name: &str,
    ) -> Result<Vec<AllocationSummary>, SchedulerError>;
}

/// Production client over the Nomad HTTP API.
pub struct NomadClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl NomadClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    async fn retry<T, F, Fut>(&self, f: F) -> Result<T, SchedulerError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, SchedulerError>>,
    {
        retry_with_backoff(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY,
            SchedulerError::is_transient,
            f,
        )
        .await
    }
}

#[async_trait]
impl SchedulerClient for NomadClient {
    async fn submit(&self, job_spec: &str) -> Result<String, SchedulerError> {
        let url = format!("{}/v1/jobs/dispatch", self.base_url);
        let body: serde_json::Value =
            serde_json::from_str(job_spec).map_err(|e| SchedulerError::DataShape(e.to_string()))?;
        let response: SubmitResponse = self
            .retry(|| {
                let body = body.clone();
                async move {
                    let response = self
                        .http
                        .post(&url)
                        .header("X-Nomad-Token", &self.token)
                        .json(&body)
                        .send()
                        .await
                        .map_err(SchedulerError::Transport)?;
                    if !response.status().is_success() {
                        return Err(SchedulerError::Rejected(response.status().as_u16()));
                    }
                    response
                        .json::<SubmitResponse>()
                        .await
                        .map_err(|e| SchedulerError::DataShape(e.to_string()))
                }
            })
            .await?;
        Ok(response.evaluation_id)
    }

    async fn get_allocation(&self, job_id: &str) -> Result<Allocation, SchedulerError> {
        let url = format!("{}/v1/allocation/{}", self.base_url, job_id);
        let response: AllocationResponse = self
            .retry(|| async {
                let response = self
                    .http
                    .get(&url)
                    .header("X-Nomad-Token", &self.token)
                    .send()
                    .await
                    .map_err(SchedulerError::Transport)?;
                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(SchedulerError::NotFound(job_id.to_string()));
                }
                if !response.status().is_success() {
                    return Err(SchedulerError::Rejected(response.status().as_u16()));
                }
                response
                    .json::<AllocationResponse>()
                    .await
                    .map_err(|e| SchedulerError::DataShape(e.to_string()))
            })
            .await?;
        let status = AllocationStatus::from_client_status(&response.client_status)
            .ok_or_else(|| SchedulerError::DataShape(response.client_status.clone()))?;
        Ok(Allocation {
            status,
            submit_time: nanos_to_datetime(response.submit_time_ns),
            dispatch_time: nanos_to_datetime(response.dispatch_time_ns),
        })
    }

    async fn list_allocations(
        &self,
        job_name: &str,
    ) -> Result<Vec<AllocationSummary>, SchedulerError> {
        let url = format!("{}/v1/job/{}/allocations", self.base_url, job_name);
        let entries: Vec<AllocationListEntry> = self
            .retry(|| async {
                let response = self
                    .http
                    .get(&url)
                    .header("X-Nomad-Token", &self.token)
                    .send()
                    .await
                    .map_err(SchedulerError::Transport)?;
                if !response.status().is_success() {
                    return Err(SchedulerError::Rejected(response.status().as_u16()));
                }
                response
                    .json::<Vec<AllocationListEntry>>()
                    .await
                    .map_err(|e| SchedulerError::DataShape(e.to_string()))
            })
            .await?;
        entries
            .into_iter()
            .map(|entry| {
                let client_status = AllocationStatus::from_client_status(&entry.client_status)
                    .ok_or_else(|| SchedulerError::DataShape(entry.client_status.clone()))?;
                Ok(AllocationSummary {
                    id: entry.id,
                    client_status,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_status_maps_known_values() {
        assert_eq!(
            AllocationStatus::from_client_status("running"),
            Some(AllocationStatus::Running)
        );
        assert_eq!(AllocationStatus::from_client_status("bogus"), None);
    }

    #[test]
    fn live_statuses_are_running_or_pending() {
        assert!(AllocationStatus::Running.is_live());
        assert!(AllocationStatus::Pending.is_live());
        assert!(!AllocationStatus::Dead.is_live());
    }
}
