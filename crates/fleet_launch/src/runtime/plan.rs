//! Resolution of a launch description into a concrete launch plan

use crate::config::{SubstitutionContext, SubstitutionError};
use crate::description::{Action, LaunchDescription, NodeDescriptor, OutputMode, ResolvedParameter};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// Explicit enable/disable requests, by node key (`uav1`, `foxglove_bridge`, ...)
#[derive(Debug, Clone, Default)]
pub struct NodeSelection {
    /// Nodes to schedule even when their timer is disabled
    pub enable: HashSet<String>,
    /// Nodes to never schedule
    pub disable: HashSet<String>,
}

impl NodeSelection {
    fn is_scheduled(&self, key: &str, parent_enabled: bool) -> bool {
        if self.disable.contains(key) {
            return false;
        }
        parent_enabled || self.enable.contains(key)
    }
}

/// A node with every substitution resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNode {
    /// Key used for enable/disable
    pub key: String,
    pub package: String,
    pub executable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Absolute namespace (`/uav1`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub output: OutputMode,
    pub parameters: IndexMap<String, ResolvedParameter>,
    pub arguments: Vec<String>,
}

impl ResolvedNode {
    /// Resolve a descriptor against the argument context
    pub fn resolve(node: &NodeDescriptor, ctx: &SubstitutionContext) -> Result<Self, PlanError> {
        let context = |what: String| move |source: SubstitutionError| PlanError::Substitution {
            context: format!("node '{}' {}", node.key(), what),
            source,
        };

        let mut parameters = IndexMap::new();
        for (name, value) in &node.parameters {
            let resolved = value
                .resolve(ctx)
                .map_err(context(format!("parameter '{}'", name)))?;
            parameters.insert(name.clone(), resolved);
        }

        let arguments = node
            .arguments
            .iter()
            .map(|arg| arg.resolve(ctx))
            .collect::<Result<Vec<_>, _>>()
            .map_err(context("arguments".to_string()))?;

        Ok(Self {
            key: node.key().to_string(),
            package: node.package.clone(),
            executable: node.executable.clone(),
            name: node.name.clone(),
            namespace: node.namespace.as_deref().map(absolute_namespace),
            output: node.output,
            parameters,
            arguments,
        })
    }

    /// Name used in log lines: `uav1/mavros_node`, `foxglove_bridge`
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or(&self.executable);
        match self.namespace.as_deref().map(|ns| ns.trim_matches('/')) {
            Some(ns) if !ns.is_empty() => format!("{}/{}", ns, name),
            _ => name.to_string(),
        }
    }

    /// ROS arguments: `--ros-args -r __node:=<name> -r __ns:=<ns> -p <k>:=<v>...`
    pub fn ros_arguments(&self) -> Vec<String> {
        let mut args = vec!["--ros-args".to_string()];

        if let Some(name) = &self.name {
            args.push("-r".to_string());
            args.push(format!("__node:={}", name));
        }

        if let Some(namespace) = &self.namespace {
            args.push("-r".to_string());
            args.push(format!("__ns:={}", namespace));
        }

        for (name, value) in &self.parameters {
            args.push("-p".to_string());
            args.push(format!("{}:={}", name, value));
        }

        args
    }
}

fn absolute_namespace(namespace: &str) -> String {
    format!("/{}", namespace.trim_start_matches('/'))
}

/// A group of nodes started together
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    /// Seconds after launch; `None` for immediate entries and for
    /// unscheduled timers whose period is not a valid delay
    pub delay_sec: Option<f64>,
    /// Substituted timer period, as written; `None` starts immediately
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Unscheduled entries are kept for display only
    pub scheduled: bool,
    pub nodes: Vec<ResolvedNode>,
}

impl PlanEntry {
    /// Delay after launch, zero for immediate entries
    pub fn delay(&self) -> Duration {
        self.delay_sec
            .and_then(|sec| Duration::try_from_secs_f64(sec).ok())
            .unwrap_or_default()
    }

    pub fn is_timer(&self) -> bool {
        self.period.is_some()
    }
}

/// A launch description with every argument resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPlan {
    /// Resolved arguments
    pub args: IndexMap<String, String>,
    /// Entries in description order
    pub entries: Vec<PlanEntry>,
}

impl ResolvedPlan {
    /// Scheduled entries started right away
    pub fn immediate(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.scheduled && !e.is_timer())
    }

    /// Scheduled timer entries
    pub fn timers(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.scheduled && e.is_timer())
    }

    /// Entries present in the description that will not run
    pub fn unscheduled(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| !e.scheduled)
    }

    /// Find a node by key, scheduled or not
    pub fn node(&self, key: &str) -> Option<&ResolvedNode> {
        self.entries
            .iter()
            .flat_map(|e| e.nodes.iter())
            .find(|n| n.key == key)
    }

    /// Entry containing the node with this key
    pub fn entry_of(&self, key: &str) -> Option<&PlanEntry> {
        self.entries
            .iter()
            .find(|e| e.nodes.iter().any(|n| n.key == key))
    }
}

impl LaunchDescription {
    /// Resolve every node, parameter and timer period.
    ///
    /// Timers nested in timers accumulate their periods.
    pub fn resolve(
        &self,
        ctx: &SubstitutionContext,
        selection: &NodeSelection,
    ) -> Result<ResolvedPlan, PlanError> {
        let mut entries = Vec::new();

        for action in &self.actions {
            match action {
                Action::DeclareArgument(_) => {}
                Action::Node(node) => {
                    push_group(&[node], Schedule::Immediate, true, ctx, selection, &mut entries)?;
                }
                Action::Timer(_) => {
                    resolve_timer_tree(action, Some(0.0), true, ctx, selection, &mut entries)?;
                }
            }
        }

        Ok(ResolvedPlan {
            args: ctx.args.clone(),
            entries,
        })
    }
}

/// When a group of nodes starts
#[derive(Debug, Clone, Copy)]
enum Schedule<'a> {
    Immediate,
    /// `delay_sec` is `None` when the period, or an enclosing one, is not a
    /// valid delay
    Timer {
        period: &'a str,
        delay_sec: Option<f64>,
    },
}

/// `offset` is the accumulated delay of the enclosing timers, `None` when one
/// of them has an invalid period
fn resolve_timer_tree(
    action: &Action,
    offset: Option<f64>,
    parent_enabled: bool,
    ctx: &SubstitutionContext,
    selection: &NodeSelection,
    entries: &mut Vec<PlanEntry>,
) -> Result<(), PlanError> {
    let Action::Timer(timer) = action else {
        return Ok(());
    };

    let period = timer.period.resolve(ctx).map_err(|source| PlanError::Substitution {
        context: format!("timer period '{}'", timer.period),
        source,
    })?;
    let enabled = parent_enabled && timer.enabled;

    let delay = parse_period(&period)
        .zip(offset)
        .map(|(seconds, offset)| offset + seconds)
        .filter(|total| Duration::try_from_secs_f64(*total).is_ok());

    // A period only has to be valid when something waits on it
    if delay.is_none() && has_scheduled_node(&timer.actions, enabled, selection) {
        return Err(PlanError::InvalidPeriod(period));
    }

    let nodes: Vec<&NodeDescriptor> = timer
        .actions
        .iter()
        .filter_map(|a| match a {
            Action::Node(node) => Some(node),
            _ => None,
        })
        .collect();
    let schedule = Schedule::Timer {
        period: &period,
        delay_sec: delay,
    };
    push_group(&nodes, schedule, enabled, ctx, selection, entries)?;

    for nested in &timer.actions {
        resolve_timer_tree(nested, delay, enabled, ctx, selection, entries)?;
    }

    Ok(())
}

/// Whether any node in these actions, nested timers included, will run
fn has_scheduled_node(actions: &[Action], enabled: bool, selection: &NodeSelection) -> bool {
    actions.iter().any(|action| match action {
        Action::DeclareArgument(_) => false,
        Action::Node(node) => selection.is_scheduled(node.key(), enabled),
        Action::Timer(timer) => {
            has_scheduled_node(&timer.actions, enabled && timer.enabled, selection)
        }
    })
}

/// Split a group of nodes into a scheduled and an unscheduled entry
fn push_group(
    nodes: &[&NodeDescriptor],
    schedule: Schedule<'_>,
    enabled: bool,
    ctx: &SubstitutionContext,
    selection: &NodeSelection,
    entries: &mut Vec<PlanEntry>,
) -> Result<(), PlanError> {
    let mut scheduled = Vec::new();
    let mut unscheduled = Vec::new();

    for node in nodes {
        let resolved = ResolvedNode::resolve(node, ctx)?;
        if selection.is_scheduled(node.key(), enabled) {
            scheduled.push(resolved);
        } else {
            unscheduled.push(resolved);
        }
    }

    let (delay_sec, period) = match schedule {
        Schedule::Immediate => (None, None),
        Schedule::Timer { period, delay_sec } => (delay_sec, Some(period.to_string())),
    };

    for (is_scheduled, nodes) in [(true, scheduled), (false, unscheduled)] {
        if !nodes.is_empty() {
            entries.push(PlanEntry {
                delay_sec,
                period: period.clone(),
                scheduled: is_scheduled,
                nodes,
            });
        }
    }

    Ok(())
}

/// Timer periods are non-negative seconds that fit in a [`Duration`]
fn parse_period(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|period| *period >= 0.0 && Duration::try_from_secs_f64(*period).is_ok())
}

/// Errors that can occur while resolving a launch plan
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Substitution failed in {context}: {source}")]
    Substitution {
        context: String,
        #[source]
        source: SubstitutionError,
    },

    #[error("Invalid timer period '{0}': expected a non-negative number of seconds that fits a duration")]
    InvalidPeriod(String),
}

/// Display the launch plan in a human-readable format
impl std::fmt::Display for ResolvedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Launch Plan")?;
        writeln!(f, "===========")?;
        writeln!(f)?;

        if !self.args.is_empty() {
            writeln!(f, "Arguments:")?;
            for (key, value) in &self.args {
                writeln!(f, "  {}: {}", key, value)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Actions (in description order):")?;
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f)?;
            let when = match (entry.delay_sec, &entry.period) {
                (Some(delay), _) => format!("after {}s", delay),
                (None, Some(period)) => format!("after '{}'", period),
                (None, None) => "immediately".to_string(),
            };
            let state = if entry.scheduled { "" } else { " (not scheduled)" };
            writeln!(f, "  {}. {}{}", i + 1, when, state)?;

            for node in &entry.nodes {
                writeln!(f, "     - {} [{}/{}]", node.display_name(), node.package, node.executable)?;
                if !node.arguments.is_empty() {
                    writeln!(f, "       Arguments: {}", node.arguments.join(" "))?;
                }
                if !node.parameters.is_empty() {
                    writeln!(f, "       Parameters:")?;
                    for (name, value) in &node.parameters {
                        writeln!(f, "         {}: {}", name, value)?;
                    }
                }
            }
        }

        Ok(())
    }
}
