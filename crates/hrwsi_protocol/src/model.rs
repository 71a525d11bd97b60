//! Persisted entities of the `hrwsi` schema (spec.md §3).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::product_type::{ProductType, RuleName};

/// Harvester operating mode, set via `HRWSI_HARVESTER_RUN_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvestMode {
    Nrt,
    Archive,
}

impl std::str::FromStr for HarvestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NRT" => Ok(HarvestMode::Nrt),
            "ARCHIVE" => Ok(HarvestMode::Archive),
            other => Err(format!("unknown harvest mode: {other}")),
        }
    }
}

/// One upstream item, as discovered by the Harvester. Never mutated after
/// insert; uniqueness is enforced on `identifier`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RawInput {
    pub id: i64,
    pub identifier: String,
    pub product_type: ProductType,
    pub measurement_start: DateTime<Utc>,
    pub publishing_date: DateTime<Utc>,
    pub tile: String,
    pub measurement_day: i32,
    pub relative_orbit: Option<i32>,
    pub input_path: String,
    pub is_partial: bool,
    pub harvesting_date: DateTime<Utc>,
}

/// Static configuration row describing a processing routine's trigger.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TriggeringCondition {
    pub name: String,
    pub routine: String,
}

/// One successful rule evaluation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TriggerValidation {
    pub id: i64,
    pub triggering_condition: String,
    pub validation_date: DateTime<Utc>,
    pub is_nrt: bool,
    pub artificial_measurement_day: Option<i32>,
}

/// Many-to-many edge between a `TriggerValidation` and its constituent
/// `RawInput`s.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Raw2Valid {
    pub trigger_validation_id: i64,
    pub raw_input_id: i64,
}

/// One unit of work derived from a `TriggerValidation`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessingTask {
    pub id: i64,
    pub trigger_validation_id: i64,
    pub creation_date: DateTime<Utc>,
    pub processing_date: Option<i32>,
    pub has_ended: bool,
    pub preceding_input_id: Option<i64>,
    pub intermediate_paths: serde_json::Value,
}

/// One submission of a `ProcessingTask` to the cluster scheduler.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NomadJobDispatch {
    pub id: Uuid,
    pub dispatch_date: DateTime<Utc>,
    pub log_path: String,
}

/// Edge between a `ProcessingTask` and one of its (possibly several)
/// `NomadJobDispatch` rows. Only the latest in time is authoritative.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Pt2Nomad {
    pub processing_task_id: i64,
    pub nomad_job_dispatch_id: Uuid,
}

/// Status for a given dispatch. Enum mirrors the scheduler-observed and
/// sweeper-synthesized states of spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum ProcessingStatus {
    Started,
    Processed,
    Pending,
    InternalError,
    ExternalError,
    Terminated,
}

impl ProcessingStatus {
    pub const fn is_ok_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Processed)
    }

    pub const fn is_error(self) -> bool {
        matches!(
            self,
            ProcessingStatus::InternalError | ProcessingStatus::ExternalError
        )
    }

    pub const fn is_live(self) -> bool {
        matches!(self, ProcessingStatus::Pending | ProcessingStatus::Started)
    }
}

/// Append-only status event for one dispatch.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessingStatusWorkflow {
    pub id: i64,
    pub nomad_job_dispatch_id: Uuid,
    pub status: ProcessingStatus,
    pub status_date: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

/// Per-rule configuration used by the Harvester and Triggerer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SystemParams {
    pub product_type: ProductType,
    pub collection: String,
    pub max_day_since_publication_date: i32,
    pub max_day_since_measurement_date: i32,
    pub tiles: Vec<String>,
    pub geometry: Option<String>,
    pub polarisation: Option<String>,
    pub timeliness: Option<String>,
    pub nrt_harvest_start_date: Option<DateTime<Utc>>,
    pub archive_harvest_start_date: Option<NaiveDate>,
    pub archive_harvest_end_date: Option<NaiveDate>,
}

/// A single raw input together with the rule it should be attributed to,
/// used when bundling a `TriggerValidation`'s edges before insert.
#[derive(Debug, Clone)]
pub struct RuleFiring {
    pub rule: RuleName,
    pub inputs: Vec<i64>,
    pub is_nrt: bool,
    pub artificial_measurement_day: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_status_classifies_error_states() {
        assert!(ProcessingStatus::InternalError.is_error());
        assert!(ProcessingStatus::ExternalError.is_error());
        assert!(!ProcessingStatus::Processed.is_error());
    }

    #[test]
    fn harvest_mode_parses_case_insensitively() {
        assert_eq!("nrt".parse::<HarvestMode>().unwrap(), HarvestMode::Nrt);
        assert_eq!(
            "ARCHIVE".parse::<HarvestMode>().unwrap(),
            HarvestMode::Archive
        );
        assert!("bogus".parse::<HarvestMode>().is_err());
    }
}
