//! Command-line interface for fleet_launch

use crate::config::{load_params_file, parse_override, OverrideError};
use crate::runtime::NodeSelection;
use argh::FromArgs;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::time::Duration;

/// Launch the MAVROS fleet (uav1..uav3) and the Foxglove bridge
#[derive(FromArgs, Debug)]
pub struct LaunchArgs {
    /// launch argument overrides (format: key:=value or key=value)
    #[argh(positional, from_str_fn(parse_arg_override))]
    pub overrides: Vec<(String, String)>,

    /// override a launch argument (format: key:=value), may be repeated
    #[argh(option, short = 'a', from_str_fn(parse_arg_override))]
    pub arg: Vec<(String, String)>,

    /// YAML file with launch argument overrides
    #[argh(option)]
    pub params_file: Option<String>,

    /// schedule these nodes even if declared disabled (comma-separated)
    #[argh(option, from_str_fn(parse_nodes))]
    pub enable: Option<Vec<String>>,

    /// never start these nodes (comma-separated)
    #[argh(option, from_str_fn(parse_nodes))]
    pub disable: Option<Vec<String>>,

    /// topic filter passed to foxglove_bridge as --topics
    #[argh(option)]
    pub foxglove_topics: Option<String>,

    /// show the resolved launch plan without executing
    #[argh(switch)]
    pub dry_run: bool,

    /// dry-run output format (text, yaml, json)
    #[argh(option, default = "PlanFormat::Text", from_str_fn(parse_format))]
    pub format: PlanFormat,

    /// list the launch arguments with their defaults and exit
    #[argh(switch)]
    pub list_args: bool,

    /// seconds a node gets to exit after SIGTERM
    #[argh(option, default = "5.0")]
    pub shutdown_timeout_sec: f64,

    /// log level (error, warn, info, debug, trace)
    #[argh(option, short = 'l', default = "String::from(\"info\")")]
    pub log_level: String,
}

/// Output format of `--dry-run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Text,
    Yaml,
    Json,
}

fn parse_arg_override(s: &str) -> Result<(String, String), String> {
    parse_override(s).map_err(|e| e.to_string())
}

/// Parse comma-separated node list
fn parse_nodes(s: &str) -> Result<Vec<String>, String> {
    Ok(s.split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

fn parse_format(s: &str) -> Result<PlanFormat, String> {
    match s.to_lowercase().as_str() {
        "text" => Ok(PlanFormat::Text),
        "yaml" => Ok(PlanFormat::Yaml),
        "json" => Ok(PlanFormat::Json),
        other => Err(format!("Unknown format '{}'. Expected text, yaml or json", other)),
    }
}

impl LaunchArgs {
    /// Overrides in precedence order: params file, positional, then `--arg`
    pub fn arg_overrides(&self) -> Result<IndexMap<String, String>, OverrideError> {
        let mut overrides = match &self.params_file {
            Some(path) => load_params_file(path)?,
            None => IndexMap::new(),
        };

        for (key, value) in self.overrides.iter().chain(self.arg.iter()) {
            overrides.insert(key.clone(), value.clone());
        }

        Ok(overrides)
    }

    pub fn node_selection(&self) -> NodeSelection {
        let to_set =
            |nodes: &Option<Vec<String>>| nodes.iter().flatten().cloned().collect::<HashSet<_>>();

        NodeSelection {
            enable: to_set(&self.enable),
            disable: to_set(&self.disable),
        }
    }

    /// Shutdown timeout, falling back to 5s for nonsensical values
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.shutdown_timeout_sec).unwrap_or(Duration::from_secs(5))
    }

    /// Normalized log level
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        }
    }
}
