//! Job template rendering (spec.md §4.G: "Render the job template:
//! substitute placeholders ... Append credentials files and worker script
//! by tag replacement.").

use uuid::Uuid;

use crate::queries::RoutineConfig;

const JOB_TEMPLATE: &str = r#"{
  "Job": {
    "ID": "{{dispatch_id}}",
    "Name": "{{processing_task_name}}",
    "Type": "batch",
    "Timeout": {{timeout_secs}},
    "TaskGroups": [
      {
        "Name": "{{group}}",
        "Constraints": [
          { "LTarget": "${node.class}", "RValue": "{{flavour}}", "Operand": "=" }
        ],
        "Tasks": [
          {
            "Name": "{{group}}",
            "Driver": "docker",
            "Config": {
              "image": "{{image}}",
              "args": ["--config", "{{config_path}}"]
            },
            "Resources": { "MemoryMB": {{ram_mb}}, "CPU": 2000 },
            "Templates": [
              {{credentials_files}}
            ],
            "Artifacts": [
              { "GetterSource": "{{worker_script}}", "RelativeDest": "local/" }
            ]
          }
        ]
      }
    ]
  }
}"#;

/// Everything beyond `RenderContext`/`RoutineConfig` needed to fill in the
/// job template's remaining placeholders.
pub struct JobTemplateInputs<'a> {
    pub task_id: i64,
    pub dispatch_id: Uuid,
    pub routine: &'a RoutineConfig,
    pub config_path: &'a str,
    pub credentials_files: &'a str,
    pub worker_script: &'a str,
}

/// Fill in `JOB_TEMPLATE` by tag replacement, the way the spec describes
/// the step (no templating engine, just substitution).
pub fn render_job_spec(inputs: &JobTemplateInputs<'_>) -> String {
    JOB_TEMPLATE
        .replace("{{dispatch_id}}", &inputs.dispatch_id.to_string())
        .replace(
            "{{processing_task_name}}",
            &format!("hrwsi-{}-{}", inputs.routine.routine.to_lowercase(), inputs.task_id),
        )
        .replace("{{timeout_secs}}", &job_timeout_secs(inputs.routine).to_string())
        .replace("{{group}}", &inputs.routine.routine)
        .replace("{{flavour}}", &inputs.routine.flavour)
        .replace("{{image}}", &inputs.routine.image)
        .replace("{{ram_mb}}", &inputs.routine.ram_mb.to_string())
        .replace("{{config_path}}", inputs.config_path)
        .replace("{{credentials_files}}", inputs.credentials_files)
        .replace("{{worker_script}}", inputs.worker_script)
}

/// Job timeout, `2 x routine_duration_minutes` (spec.md §4.G), in seconds.
pub fn job_timeout_secs(routine: &RoutineConfig) -> i64 {
    2 * routine.duration_minutes as i64 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine() -> RoutineConfig {
        RoutineConfig {
            routine: "FSC".to_string(),
            flavour: "hma.large".to_string(),
            image: "registry.hrwsi.internal/fsc:latest".to_string(),
            ram_mb: 8192,
            duration_minutes: 20,
        }
    }

    #[test]
    fn placeholders_are_all_substituted() {
        let routine = routine();
        let dispatch_id = Uuid::nil();
        let inputs = JobTemplateInputs {
            task_id: 42,
            dispatch_id,
            routine: &routine,
            config_path: "/etc/hrwsi/configs/fsc_31TCH_42.yaml",
            credentials_files: r#"{ "DestPath": "secrets/creds.env", "EmbeddedTmpl": "..." }"#,
            worker_script: "s3://scripts/worker.sh",
        };
        let rendered = render_job_spec(&inputs);
        assert!(!rendered.contains("{{"));
        assert!(rendered.contains("hrwsi-fsc-42"));
        assert!(rendered.contains("hma.large"));
    }

    #[test]
    fn timeout_is_double_the_routine_duration() {
        assert_eq!(job_timeout_secs(&routine()), 2_400);
    }
}
