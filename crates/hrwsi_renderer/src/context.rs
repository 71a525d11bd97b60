//! Rendering context assembled from `HCL_INFO_REQUEST` (spec.md §4.G):
//! raw_inputs, routines, and routine durations joined for one task.

use chrono::NaiveDate;

/// One raw input contributing to the task being rendered.
#[derive(Debug, Clone)]
pub struct ContextInput {
    pub identifier: String,
    pub input_path: String,
    pub tile: String,
    pub measurement_day: i32,
}

/// Everything a routine renderer needs to produce a job spec and
/// configuration file for one processing task.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub task_id: i64,
    pub validation_id: i64,
    pub routine: String,
    pub product_type: String,
    pub tile: String,
    pub measurement_day: i32,
    pub inputs: Vec<ContextInput>,
    pub routine_duration_minutes: i64,
    pub s3_bucket_inputs: String,
    pub s3_bucket_outputs: String,
    pub s3_bucket_aux: String,
    pub config_output_dir: String,
}

impl RenderContext {
    pub fn measurement_date(&self) -> Option<NaiveDate> {
        let s = self.measurement_day.to_string();
        NaiveDate::parse_from_str(&s, "%Y%m%d").ok()
    }
}
