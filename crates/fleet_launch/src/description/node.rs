//! Node descriptors and parameter values

use crate::config::{SubstitutionContext, SubstitutionError, Template};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Where a node's stdout/stderr ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Forward output to the launcher's log at info/warn level
    #[default]
    Screen,
    /// Keep output at debug level only
    Log,
    /// Same as screen
    Both,
}

impl OutputMode {
    pub fn is_visible(&self) -> bool {
        matches!(self, OutputMode::Screen | OutputMode::Both)
    }
}

/// A parameter value as declared in a descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Resolved at launch time, then typed by [`ResolvedParameter::infer`]
    Template(Template),
}

impl ParameterValue {
    pub fn resolve(&self, ctx: &SubstitutionContext) -> Result<ResolvedParameter, SubstitutionError> {
        Ok(match self {
            ParameterValue::Bool(b) => ResolvedParameter::Bool(*b),
            ParameterValue::Integer(i) => ResolvedParameter::Integer(*i),
            ParameterValue::Float(f) => ResolvedParameter::Float(*f),
            ParameterValue::Template(template) => ResolvedParameter::infer(&template.resolve(ctx)?),
        })
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<Template> for ParameterValue {
    fn from(value: Template) -> Self {
        ParameterValue::Template(value)
    }
}

/// A concrete, typed parameter value handed to a node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedParameter {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ResolvedParameter {
    /// Type a substituted string the way ROS parameter overrides are typed.
    ///
    /// Every substituted parameter goes through here, so `system_id=255`
    /// becomes an integer for all nodes and `system_id=gcs` stays a string
    /// for all nodes.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return ResolvedParameter::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return ResolvedParameter::Bool(false);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return ResolvedParameter::Integer(i);
        }
        // f64 parsing accepts "inf" and "nan", which are names, not numbers here
        if trimmed.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return ResolvedParameter::Float(f);
                }
            }
        }
        ResolvedParameter::String(raw.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ResolvedParameter::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedParameter::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedParameter::Bool(b) => write!(f, "{}", b),
            ResolvedParameter::Integer(i) => write!(f, "{}", i),
            ResolvedParameter::Float(v) => write!(f, "{:?}", v),
            ResolvedParameter::String(s) => write!(f, "{}", s),
        }
    }
}

/// Declaration of one node to launch
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    /// ROS package providing the executable
    pub package: String,
    /// Executable name within the package
    pub executable: String,
    /// Node name override
    pub name: Option<String>,
    /// Namespace, with or without the leading slash
    pub namespace: Option<String>,
    pub output: OutputMode,
    /// Parameters in declaration order
    pub parameters: IndexMap<String, ParameterValue>,
    /// Arguments passed before `--ros-args`
    pub arguments: Vec<Template>,
}

impl NodeDescriptor {
    pub fn new(package: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            executable: executable.into(),
            name: None,
            namespace: None,
            output: OutputMode::default(),
            parameters: IndexMap::new(),
            arguments: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_argument(mut self, argument: impl Into<Template>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Short name used to enable or disable the node: its namespace, else
    /// its node name, else its executable
    pub fn key(&self) -> &str {
        self.namespace
            .as_deref()
            .map(|ns| ns.trim_matches('/'))
            .filter(|ns| !ns.is_empty())
            .or(self.name.as_deref())
            .unwrap_or(self.executable.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_types() {
        assert_eq!(ResolvedParameter::infer("255"), ResolvedParameter::Integer(255));
        assert_eq!(ResolvedParameter::infer("5.0"), ResolvedParameter::Float(5.0));
        assert_eq!(ResolvedParameter::infer("True"), ResolvedParameter::Bool(true));
        assert_eq!(
            ResolvedParameter::infer("serial:///dev/ttyUSB0:115200"),
            ResolvedParameter::String("serial:///dev/ttyUSB0:115200".to_string())
        );
        assert_eq!(
            ResolvedParameter::infer("nan"),
            ResolvedParameter::String("nan".to_string())
        );
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(ResolvedParameter::Float(15.0).to_string(), "15.0");
    }

    #[test]
    fn test_template_parameter_is_inferred() {
        let ctx = SubstitutionContext::new().with_arg("system_id", "42");
        let value = ParameterValue::from(Template::arg("system_id"));
        assert_eq!(value.resolve(&ctx).unwrap(), ResolvedParameter::Integer(42));

        let ctx = SubstitutionContext::new().with_arg("system_id", "gcs");
        assert_eq!(
            value.resolve(&ctx).unwrap(),
            ResolvedParameter::String("gcs".to_string())
        );
    }

    #[test]
    fn test_node_key() {
        let node = NodeDescriptor::new("mavros", "mavros_node").with_namespace("/uav2");
        assert_eq!(node.key(), "uav2");

        let node = NodeDescriptor::new("foxglove_bridge", "foxglove_bridge").with_name("bridge");
        assert_eq!(node.key(), "bridge");

        let node = NodeDescriptor::new("demo", "talker");
        assert_eq!(node.key(), "talker");
    }
}
