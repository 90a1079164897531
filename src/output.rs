//! Output for taskboard CLI commands.
//!
//! With `--json` every command prints one envelope on stdout:
//!
//! ```text
//! { "schema_version": "taskboard.v1", "command": "list", "status": "success", "data": {...} }
//! ```
//!
//! Failures use the same envelope with `"status": "error"` and an `error`
//! body. Without `--json` a [`HumanOutput`] is rendered as plain text.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, JsonError, Result};

pub const SCHEMA_VERSION: &str = "taskboard.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Plain-text report: a header line followed by optional sections.
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, line: impl Into<String>) {
        self.details.push(line.into());
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn push_next_step(&mut self, step: impl Into<String>) {
        self.next_steps.push(step.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }

        for (title, items) in [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ] {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

impl<'a, T: Serialize> Envelope<'a, T> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            kind: None,
            data: Some(data),
            error: None,
            warnings: human.map_or(&[][..], |h| h.warnings.as_slice()),
            next_steps: human.map_or(&[][..], |h| h.next_steps.as_slice()),
        }
        .print();
    }

    if let Some(human) = human.filter(|_| !options.quiet) {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        return Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            kind: Some(error_kind(err)),
            data: None,
            error: Some(JsonError::from(err)),
            warnings: &[],
            next_steps: &next_steps,
        }
        .print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// First positional argument, used to label error envelopes before clap has
/// parsed anything.
pub fn infer_command_name_from_args() -> String {
    std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .unwrap_or_else(|| "taskboard".to_string())
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::TaskNotFound(_) => "taskboard list",
        Error::InvalidConfig(_) => "fix .taskboard.toml then retry",
        Error::LoadFailed(_) => "taskboard refresh",
        Error::LockFailed(_) => "retry once other taskboard processes finish",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_output_skips_empty_sections() {
        let mut human = HumanOutput::new("Tasks");
        human.push_summary("Total", "2");
        human.push_detail("[todo][high] 1 Write docs");

        let text = human.to_string();
        assert_eq!(
            text,
            "Tasks\n\nSummary:\n- Total: 2\n\nDetails:\n- [todo][high] 1 Write docs"
        );
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn error_envelope_shape() {
        let err = Error::TaskNotFound("7".into());
        let envelope = Envelope::<()> {
            schema_version: SCHEMA_VERSION,
            command: "show",
            status: "error",
            kind: Some(error_kind(&err)),
            data: None,
            error: Some(JsonError::from(&err)),
            warnings: &[],
            next_steps: &error_next_steps(&err),
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "user_error");
        assert_eq!(value["error"]["code"], 2);
        assert_eq!(value["next_steps"][0], "taskboard list");
        assert!(value.get("data").is_none());
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn load_failures_are_operation_failures() {
        assert_eq!(error_kind(&Error::LoadFailed("x".into())), "operation_failed");
    }
}
