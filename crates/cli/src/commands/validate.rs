//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{IngestConfig, StoreKind, DEFAULT_TOPICS};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    broker: String,
    topic_count: usize,
    store: String,
    pool_size: usize,
    queue_capacity: usize,
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
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    broker: config.broker.address(),
                    topic_count: config.topics.len(),
                    store: format!("{:?}", config.store.kind),
                    pool_size: config.workers.pool_size,
                    queue_capacity: config.workers.queue_capacity,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &IngestConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.store.kind == StoreKind::Memory {
        warnings.push("store.kind is memory - measurements are not persisted".to_string());
    }

    for topic in DEFAULT_TOPICS {
        if !config.topics.iter().any(|t| t == topic) {
            warnings.push(format!("standard topic '{topic}' is not subscribed"));
        }
    }

    if config.broker.credentials().is_none() {
        warnings.push("no broker credentials configured".to_string());
    }

    if config.workers.queue_capacity < config.workers.pool_size {
        warnings.push(format!(
            "workers.queue_capacity ({}) is smaller than workers.pool_size ({})",
            config.workers.queue_capacity, config.workers.pool_size
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Broker: {}", summary.broker);
            println!("  Topics: {}", summary.topic_count);
            println!("  Store: {}", summary.store);
            println!("  Workers: {}", summary.pool_size);
            println!("  Queue capacity: {}", summary.queue_capacity);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
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

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file_with_warnings() {
        let file = write_config(
            r#"
topics = ["sensor/+/data"]

[store]
kind = "memory"
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("not persisted")));
        assert!(warnings.iter().any(|w| w.contains("pws-packet/+/+/+")));
    }

    #[test]
    fn test_invalid_file() {
        let file = write_config(
            r#"
topics = ["bad/#/topic"]
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("topics[0]"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/router.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
