//! Launch actions and the launch description that orders them

use crate::config::{LaunchArgument, Template};
use crate::description::NodeDescriptor;

/// One entry of a launch description
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Declare an overridable argument
    DeclareArgument(LaunchArgument),
    /// Start a node as soon as the launch begins
    Node(NodeDescriptor),
    /// Start a set of actions after a delay
    Timer(TimerAction),
}

/// One-shot deferred trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TimerAction {
    /// Delay in seconds, resolved at launch time
    pub period: Template,
    pub actions: Vec<Action>,
    /// A disabled timer stays in the description but is never armed
    pub enabled: bool,
}

impl TimerAction {
    pub fn new(period: impl Into<Template>, actions: Vec<Action>) -> Self {
        Self {
            period: period.into(),
            actions,
            enabled: true,
        }
    }

    /// Keep the timer in the description without scheduling it
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Ordered list of actions handed to the runtime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchDescription {
    pub actions: Vec<Action>,
}

impl LaunchDescription {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    /// All argument declarations, including ones nested in timers
    pub fn declared_arguments(&self) -> Vec<&LaunchArgument> {
        fn collect<'a>(actions: &'a [Action], out: &mut Vec<&'a LaunchArgument>) {
            for action in actions {
                match action {
                    Action::DeclareArgument(arg) => out.push(arg),
                    Action::Timer(timer) => collect(&timer.actions, out),
                    Action::Node(_) => {}
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.actions, &mut out);
        out
    }

    /// Nodes started without a timer
    pub fn immediate_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.actions.iter().filter_map(|action| match action {
            Action::Node(node) => Some(node),
            _ => None,
        })
    }

    /// Top-level timer actions, enabled or not
    pub fn timers(&self) -> impl Iterator<Item = &TimerAction> {
        self.actions.iter().filter_map(|action| match action {
            Action::Timer(timer) => Some(timer),
            _ => None,
        })
    }

    /// Every node descriptor in the description, scheduled or not
    pub fn nodes(&self) -> Vec<&NodeDescriptor> {
        fn collect<'a>(actions: &'a [Action], out: &mut Vec<&'a NodeDescriptor>) {
            for action in actions {
                match action {
                    Action::Node(node) => out.push(node),
                    Action::Timer(timer) => collect(&timer.actions, out),
                    Action::DeclareArgument(_) => {}
                }
            }
        }

        let mut out = Vec::new();
        collect(&self.actions, &mut out);
        out
    }
}
