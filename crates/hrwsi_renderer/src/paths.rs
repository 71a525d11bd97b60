//! Deterministic S3 destination and auxiliary-data path computation
//! (spec.md §4.H: "(2) computes S3 destination paths, auxiliaries paths
//! (DEM, TCD, water mask, etc.) under deterministic naming patterns").

use crate::context::RenderContext;

/// `s3://<bucket>/<routine>/<tile>/<measurement_day>/`
pub fn output_prefix(ctx: &RenderContext) -> String {
    format!(
        "s3://{}/{}/{}/{}/",
        ctx.s3_bucket_outputs, ctx.routine, ctx.tile, ctx.measurement_day
    )
}

/// Static auxiliary data (DEM, TCD, water mask) keyed only by tile.
pub fn dem_path(ctx: &RenderContext) -> String {
    format!("s3://{}/dem/{}/dem.tif", ctx.s3_bucket_aux, ctx.tile)
}

pub fn tcd_path(ctx: &RenderContext) -> String {
    format!("s3://{}/tcd/{}/tcd.tif", ctx.s3_bucket_aux, ctx.tile)
}

pub fn water_mask_path(ctx: &RenderContext) -> String {
    format!(
        "s3://{}/water_mask/{}/water_mask.tif",
        ctx.s3_bucket_aux, ctx.tile
    )
}

/// Dynamic auxiliary data (CAMS, FMI), keyed by tile and measurement day —
/// these may not yet be available and must be probed before rendering.
pub fn cams_path(ctx: &RenderContext) -> String {
    format!(
        "s3://{}/cams/{}/{}/cams.nc",
        ctx.s3_bucket_aux, ctx.tile, ctx.measurement_day
    )
}

pub fn fmi_path(ctx: &RenderContext) -> String {
    format!(
        "s3://{}/fmi/{}/{}/fmi.nc",
        ctx.s3_bucket_aux, ctx.tile, ctx.measurement_day
    )
}

/// Well-known path the YAML configuration is written to before dispatch.
pub fn config_output_path(ctx: &RenderContext) -> String {
    format!(
        "{}/{}_{}_{}.yaml",
        ctx.config_output_dir, ctx.routine, ctx.tile, ctx.task_id
    )
}
