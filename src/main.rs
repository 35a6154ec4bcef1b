//! Reads a clustering request as JSON, writes the cluster report as JSON to stdout.
//!
//! Diagnostics go to stderr. On failure stdout carries `{"error": ..., "type": ...}` and the
//! process exits with code 1.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use cluster_report::{
    HdbscanEngine, NoReduction, PipelineConfig, PipelineError, ReportPipeline, Request,
};
use serde_json::json;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cluster-report")]
#[command(about = "Cluster embedding vectors into a multi-level report with noise reassignment")]
#[command(version)]
struct Args {
    /// Request file; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// TOML file with pipeline settings
    #[arg(short, long, env = "CLUSTER_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum membership score for reassigning a noise point
    #[arg(long, env = "CLUSTER_REPORT_MEMBERSHIP_THRESHOLD")]
    membership_threshold: Option<f64>,

    /// Minimum cluster size of the primary clustering
    #[arg(long, env = "CLUSTER_REPORT_MIN_CLUSTER_SIZE")]
    min_cluster_size: Option<usize>,

    /// Minimum cluster size when re-clustering leftover noise
    #[arg(long, env = "CLUSTER_REPORT_SECONDARY_MIN_CLUSTER_SIZE")]
    secondary_min_cluster_size: Option<usize>,

    /// Maximum number of hierarchy levels
    #[arg(long, env = "CLUSTER_REPORT_MAX_HIERARCHY_LEVELS")]
    max_hierarchy_levels: Option<usize>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cluster_report=info")),
        1 => EnvFilter::new("cluster_report=debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(&args) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            let (message, kind) = match err.downcast_ref::<PipelineError>() {
                Some(pipeline_err) => (pipeline_err.to_string(), pipeline_err.kind()),
                None => (format!("{err:#}"), "Error"),
            };
            println!("{}", json!({ "error": message, "type": kind }));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<String> {
    let config = load_config(args)?;
    let input = read_input(args.input.as_ref())?;
    let request = Request::from_json(&input)?;

    let pipeline = ReportPipeline::new(HdbscanEngine::new(), NoReduction, config);
    let report = pipeline.run_request(&request)?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    output.context("failed to serialize report")
}

/// Defaults, then the config file, then flags and environment.
fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let mut builder = config.to_builder();
    if let Some(threshold) = args.membership_threshold {
        builder = builder.membership_threshold(threshold);
    }
    if let Some(size) = args.min_cluster_size {
        builder = builder.min_cluster_size(size);
    }
    if let Some(size) = args.secondary_min_cluster_size {
        builder = builder.secondary_min_cluster_size(size).all_noise_min_cluster_size(size);
    }
    if let Some(levels) = args.max_hierarchy_levels {
        builder = builder.max_hierarchy_levels(levels);
    }
    Ok(builder.build())
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(PipelineError::from)
            .with_context(|| format!("failed to read request from {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(PipelineError::from)
                .context("failed to read request from stdin")?;
            Ok(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "cluster-report",
            "--membership-threshold",
            "0.3",
            "--secondary-min-cluster-size",
            "4",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(0.3, config.membership_threshold());
        assert_eq!(4, config.secondary_min_cluster_size());
        assert_eq!(4, config.all_noise_min_cluster_size());
        assert_eq!(3, config.min_cluster_size());
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let args = Args::parse_from(["cluster-report", "--config", "/nonexistent/cluster.toml"]);
        let err = load_config(&args).unwrap_err();
        assert_eq!(Some("IoError"), err.downcast_ref::<PipelineError>().map(PipelineError::kind));
    }
}
