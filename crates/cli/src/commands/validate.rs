//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DispatchBlueprint, SessionKind};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    delay_threshold_ms: u64,
    tick_interval_ms: u64,
    shutdown_policy: String,
    session_count: usize,
    udp_session_count: usize,
}

impl ConfigSummary {
    fn from_blueprint(blueprint: &DispatchBlueprint) -> Self {
        Self {
            version: format!("{:?}", blueprint.version),
            delay_threshold_ms: blueprint.scheduler.delay_threshold_ms,
            tick_interval_ms: blueprint.scheduler.tick_interval().as_millis() as u64,
            shutdown_policy: format!("{:?}", blueprint.scheduler.shutdown_policy),
            session_count: blueprint.sessions.len(),
            udp_session_count: blueprint
                .sessions
                .iter()
                .filter(|s| s.kind == SessionKind::Udp)
                .count(),
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: config_loader::ConfigLoader::warnings(&blueprint),
            summary: Some(ConfigSummary::from_blueprint(&blueprint)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Delay threshold: {} ms", summary.delay_threshold_ms);
            println!("  Tick interval: {} ms", summary.tick_interval_ms);
            println!("  Shutdown policy: {}", summary.shutdown_policy);
            println!(
                "  Sessions: {} ({} udp)",
                summary.session_count, summary.udp_session_count
            );
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_with_warning() {
        let file = write_config(
            r#"
[scheduler]
delay_threshold_ms = 100
tick_interval_ms = 400

[[sessions]]
id = "peer"
kind = "udp"
params = { addr = "127.0.0.1:7000" }
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.warnings.len(), 1);
        let summary = result.summary.unwrap();
        assert_eq!(summary.tick_interval_ms, 400);
        assert_eq!(summary.udp_session_count, 1);
    }

    #[test]
    fn test_duplicate_session_ids_invalid() {
        let file = write_config(
            r#"
[[sessions]]
id = "twin"

[[sessions]]
id = "twin"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("twin"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/dispatchq.toml"),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
