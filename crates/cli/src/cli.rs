//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Telemetry Router - multi-protocol MQTT ingestion into a sensor store
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-router",
    author,
    version,
    about = "Multi-protocol MQTT telemetry router",
    long_about = "Subscribes to RuuviTag, envelope, packet and mesh gateway topics,\n\
                  normalizes every payload layout into one measurement shape and\n\
                  persists it against an auto-registered sensor identity."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        env = "TELEMETRY_ROUTER_VERBOSE"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_ROUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect, subscribe and ingest until stopped
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display effective configuration and the subscription table
    Info(InfoArgs),

    /// Publish a one-off refresh request to the gateways
    Refresh(RefreshArgs),
}

/// Configuration source plus overrides shared by `run` and `refresh`
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "TELEMETRY_ROUTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override broker host from configuration
    #[arg(long, env = "MQTT_BROKER_HOST")]
    pub broker_host: Option<String>,

    /// Override broker port from configuration
    #[arg(long, env = "MQTT_BROKER_PORT")]
    pub broker_port: Option<u16>,

    /// Broker username
    #[arg(long, env = "MQTT_USERNAME")]
    pub username: Option<String>,

    /// Broker password
    #[arg(long, env = "MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Override database URL from configuration
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: ConfigArgs,

    /// Override worker pool size
    #[arg(long, env = "TELEMETRY_ROUTER_WORKERS")]
    pub workers: Option<usize>,

    /// Keep sensors and measurements in memory instead of Postgres
    #[arg(long)]
    pub memory_store: bool,

    /// Stop after this many processed messages (0 = unlimited)
    #[arg(long, default_value = "0", env = "TELEMETRY_ROUTER_MAX_MESSAGES")]
    pub max_messages: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TELEMETRY_ROUTER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TELEMETRY_ROUTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "router.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults are shown when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `refresh` command
#[derive(Parser, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub source: ConfigArgs,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "telemetry-router",
            "run",
            "--config",
            "router.toml",
            "--broker-host",
            "broker.local",
            "--workers",
            "4",
            "--memory-store",
            "--max-messages",
            "100",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.source.config, Some(PathBuf::from("router.toml")));
        assert_eq!(args.source.broker_host.as_deref(), Some("broker.local"));
        assert_eq!(args.workers, Some(4));
        assert!(args.memory_store);
        assert_eq!(args.max_messages, 100);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["telemetry-router", "-q", "-v", "info"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_default_path() {
        let cli = Cli::try_parse_from(["telemetry-router", "validate", "--json"]).unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.config, PathBuf::from("router.toml"));
        assert!(args.json);
    }
}
