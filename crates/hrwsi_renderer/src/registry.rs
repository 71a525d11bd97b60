//! Static routine-name → renderer dispatch table (spec.md §4.H, §9).

use std::collections::HashMap;

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::probe::AuxiliaryProbe;
use crate::routine::{GenericRoutineRenderer, RenderOutcome, RoutineRenderer};

/// Routines that require the dynamic (CAMS/FMI) auxiliary probe before
/// rendering. Not specified explicitly by the spec; resolved here per the
/// Open Question decision recorded in DESIGN.md — snow/water-cover
/// routines that ingest meteorological state need it, backscatter and
/// cloud-cover classification do not.
const ROUTINES_NEEDING_DYNAMIC_AUX: &[&str] = &["FSC", "SWS", "WDS"];

/// Build the routine dispatch table. Constructed fresh per renderer
/// invocation; the table itself is pure configuration data, not shared
/// mutable state.
pub fn registry() -> HashMap<&'static str, Box<dyn RoutineRenderer>> {
    let routines = [
        "Sig0", "FSC", "WICS2", "SWS", "WICS1", "WDS", "CC", "WICS1S2", "GFSC",
    ];
    routines
        .into_iter()
        .map(|name| {
            let renderer: Box<dyn RoutineRenderer> = Box::new(GenericRoutineRenderer {
                needs_dynamic_auxiliaries: ROUTINES_NEEDING_DYNAMIC_AUX.contains(&name),
            });
            (name, renderer)
        })
        .collect()
}

/// Render the configuration for `ctx.routine`, dispatching through the
/// static table.
pub async fn render(
    ctx: &RenderContext,
    probe: &dyn AuxiliaryProbe,
) -> Result<RenderOutcome, RenderError> {
    let table = registry();
    let renderer = table
        .get(ctx.routine.as_str())
        .ok_or_else(|| RenderError::UnknownRoutine(ctx.routine.clone()))?;
    renderer.render(ctx, probe).await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysPresent;

    #[async_trait::async_trait]
    impl AuxiliaryProbe for AlwaysPresent {
        async fn exists(&self, _path: &str) -> bool {
            true
        }
    }

    struct AlwaysMissing;

    #[async_trait::async_trait]
    impl AuxiliaryProbe for AlwaysMissing {
        async fn exists(&self, _path: &str) -> bool {
            false
        }
    }

    fn fixture_ctx(routine: &str) -> RenderContext {
        let dir = tempfile::tempdir().unwrap();
        RenderContext {
            task_id: 1,
            validation_id: 1,
            routine: routine.to_string(),
            product_type: "S2_FSC_L2B".to_string(),
            tile: "31TCH".to_string(),
            measurement_day: 20_240_115,
            inputs: vec![],
            routine_duration_minutes: 10,
            s3_bucket_inputs: "inputs".to_string(),
            s3_bucket_outputs: "outputs".to_string(),
            s3_bucket_aux: "aux".to_string(),
            config_output_dir: dir.path().to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn unknown_routine_is_rejected() {
        let ctx = fixture_ctx("NOT_A_ROUTINE");
        let err = render(&ctx, &AlwaysPresent).await.unwrap_err();
        assert!(matches!(err, RenderError::UnknownRoutine(_)));
    }

    #[tokio::test]
    async fn cc_does_not_require_dynamic_auxiliaries() {
        let ctx = fixture_ctx("CC");
        let outcome = render(&ctx, &AlwaysMissing).await.unwrap();
        assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
    }

    #[tokio::test]
    async fn fsc_skips_when_dynamic_auxiliary_missing() {
        let ctx = fixture_ctx("FSC");
        let outcome = render(&ctx, &AlwaysMissing).await.unwrap();
        assert!(matches!(outcome, RenderOutcome::Skip { .. }));
    }

    #[tokio::test]
    async fn fsc_renders_when_dynamic_auxiliary_present() {
        let ctx = fixture_ctx("FSC");
        let outcome = render(&ctx, &AlwaysPresent).await.unwrap();
        assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
    }

    #[tokio::test]
    async fn rejects_invalid_tile() {
        let mut ctx = fixture_ctx("CC");
        ctx.tile = "bogus".to_string();
        let err = render(&ctx, &AlwaysPresent).await.unwrap_err();
        assert!(matches!(err, RenderError::InvalidTile(_)));
    }
}
