//! Per-routine configuration. Each routine is a row in a static dispatch
//! table rather than a class hierarchy (spec.md §9: "a static map from
//! routine name to renderer").

use async_trait::async_trait;
use serde_yaml::Value;
use std::fs;

use crate::context::RenderContext;
use crate::error::RenderError;
use crate::paths::{cams_path, config_output_path, dem_path, fmi_path, output_prefix, tcd_path, water_mask_path};
use crate::probe::AuxiliaryProbe;
use crate::validate::{validate_measurement_day, validate_product_name, validate_tile};

/// Outcome of rendering one routine's configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Configuration written; the Launcher may proceed to dispatch.
    Rendered { config_path: String },
    /// A required dynamic auxiliary was missing; no task is dispatched
    /// this cycle and the re-driver will revisit later (spec.md §7,
    /// `MissingAuxiliary`).
    Skip { reason: String },
}

#[async_trait]
pub trait RoutineRenderer: Send + Sync {
    /// Whether this routine depends on dynamic auxiliaries (CAMS/FMI) that
    /// must be probed before rendering can proceed.
    fn needs_dynamic_auxiliaries(&self) -> bool;

    async fn render(
        &self,
        ctx: &RenderContext,
        probe: &dyn AuxiliaryProbe,
    ) -> Result<RenderOutcome, RenderError>;
}

/// Shared renderer body used by every routine: validate inputs, probe
/// dynamic auxiliaries if required, then write a YAML configuration under
/// the deterministic output path.
pub struct GenericRoutineRenderer {
    pub needs_dynamic_auxiliaries: bool,
}

#[async_trait]
impl RoutineRenderer for GenericRoutineRenderer {
    fn needs_dynamic_auxiliaries(&self) -> bool {
        self.needs_dynamic_auxiliaries
    }

    async fn render(
        &self,
        ctx: &RenderContext,
        probe: &dyn AuxiliaryProbe,
    ) -> Result<RenderOutcome, RenderError> {
        validate_tile(&ctx.tile)?;
        validate_measurement_day(ctx.measurement_day)?;
        for input in &ctx.inputs {
            validate_product_name(&input.identifier)?;
        }

        if self.needs_dynamic_auxiliaries {
            let cams = cams_path(ctx);
            let fmi = fmi_path(ctx);
            if !probe.exists(&cams).await {
                return Ok(RenderOutcome::Skip {
                    reason: format!("missing dynamic auxiliary: {cams}"),
                });
            }
            if !probe.exists(&fmi).await {
                return Ok(RenderOutcome::Skip {
                    reason: format!("missing dynamic auxiliary: {fmi}"),
                });
            }
        }

        let mut doc = serde_yaml::Mapping::new();
        doc.insert("routine".into(), Value::from(ctx.routine.clone()));
        doc.insert("task_id".into(), Value::from(ctx.task_id));
        doc.insert("validation_id".into(), Value::from(ctx.validation_id));
        doc.insert("tile".into(), Value::from(ctx.tile.clone()));
        doc.insert(
            "measurement_day".into(),
            Value::from(ctx.measurement_day),
        );
        doc.insert(
            "inputs".into(),
            Value::Sequence(
                ctx.inputs
                    .iter()
                    .map(|i| Value::from(i.input_path.clone()))
                    .collect(),
            ),
        );
        doc.insert("output_prefix".into(), Value::from(output_prefix(ctx)));
        doc.insert("dem_path".into(), Value::from(dem_path(ctx)));
        doc.insert("tcd_path".into(), Value::from(tcd_path(ctx)));
        doc.insert(
            "water_mask_path".into(),
            Value::from(water_mask_path(ctx)),
        );
        if self.needs_dynamic_auxiliaries {
            doc.insert("cams_path".into(), Value::from(cams_path(ctx)));
            doc.insert("fmi_path".into(), Value::from(fmi_path(ctx)));
        }

        let config_path = config_output_path(ctx);
        let rendered = serde_yaml::to_string(&Value::Mapping(doc))?;
        if let Some(parent) = std::path::Path::new(&config_path).parent() {
            fs::create_dir_all(parent).map_err(|e| RenderError::Io {
                path: config_path.clone(),
                source: e,
            })?;
        }
        fs::write(&config_path, rendered).map_err(|e| RenderError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Ok(RenderOutcome::Rendered { config_path })
    }
}
