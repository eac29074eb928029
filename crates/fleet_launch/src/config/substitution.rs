//! Substitution engine for $(arg) and $(env) patterns

use indexmap::IndexMap;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Regex for matching substitution patterns: $(type value)
static SUBSTITUTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\((\w+)\s+([^)]+)\)|\$\((\w+)\)").unwrap());

/// A single piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    /// Literal text
    Text(String),
    /// $(arg name) - launch argument reference
    Arg(String),
    /// $(env NAME [default]) - environment variable with optional default
    Env {
        name: String,
        default: Option<String>,
    },
}

impl Substitution {
    fn resolve(&self, ctx: &SubstitutionContext) -> Result<String, SubstitutionError> {
        match self {
            Substitution::Text(text) => Ok(text.clone()),
            Substitution::Arg(name) => ctx.resolve_arg(name),
            Substitution::Env { name, default } => ctx.resolve_env(name).or_else(|err| {
                default.clone().ok_or(err)
            }),
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Text(text) => write!(f, "{}", text),
            Substitution::Arg(name) => write!(f, "$(arg {})", name),
            Substitution::Env {
                name,
                default: Some(default),
            } => write!(f, "$(env {} {})", name, default),
            Substitution::Env { name, default: None } => write!(f, "$(env {})", name),
        }
    }
}

/// A value resolved at launch time: a concatenation of literal text and
/// substitutions.
///
/// `serial:///$(arg port):$(arg baud)` parses into
/// `[Text("serial:///"), Arg("port"), Text(":"), Arg("baud")]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template(Vec<Substitution>);

impl Template {
    /// Parse a template string containing `$(...)` patterns
    pub fn parse(input: &str) -> Result<Self, SubstitutionError> {
        let mut parts = Vec::new();
        let mut last = 0;

        for caps in SUBSTITUTION_PATTERN.captures_iter(input) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                parts.push(Substitution::Text(input[last..whole.start()].to_string()));
            }
            parts.push(parse_capture(&caps)?);
            last = whole.end();
        }

        if last < input.len() {
            parts.push(Substitution::Text(input[last..].to_string()));
        }

        Ok(Self(parts))
    }

    /// Template made of literal text only
    pub fn text(text: impl Into<String>) -> Self {
        Self(vec![Substitution::Text(text.into())])
    }

    /// Template referring to a single launch argument
    pub fn arg(name: impl Into<String>) -> Self {
        Self(vec![Substitution::Arg(name.into())])
    }

    /// Template built from explicit parts
    pub fn concat(parts: impl IntoIterator<Item = Substitution>) -> Self {
        Self(parts.into_iter().collect())
    }

    pub fn parts(&self) -> &[Substitution] {
        &self.0
    }

    /// The literal value, if the template contains no substitutions
    pub fn as_literal(&self) -> Option<String> {
        self.0
            .iter()
            .map(|part| match part {
                Substitution::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(|texts| texts.concat())
    }

    /// Names of all launch arguments this template refers to
    pub fn referenced_args(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|part| match part {
            Substitution::Arg(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Resolve the template against a context.
    ///
    /// Argument values are inserted verbatim and are not re-evaluated.
    pub fn resolve(&self, ctx: &SubstitutionContext) -> Result<String, SubstitutionError> {
        let mut result = String::new();
        for part in &self.0 {
            result.push_str(&part.resolve(ctx)?);
        }
        Ok(result)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.0 {
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl From<&str> for Template {
    fn from(text: &str) -> Self {
        Template::text(text)
    }
}

/// Turn one regex match into a substitution
fn parse_capture(caps: &Captures) -> Result<Substitution, SubstitutionError> {
    // Pattern 1: $(type value) - e.g., $(arg port)
    if let (Some(subst_type), Some(value)) = (caps.get(1), caps.get(2)) {
        let value = value.as_str().trim();
        return match subst_type.as_str() {
            "arg" | "var" => Ok(Substitution::Arg(value.to_string())),
            "env" => {
                let mut tokens = value.splitn(2, char::is_whitespace);
                let name = tokens.next().unwrap_or_default().to_string();
                let default = tokens.next().map(|d| d.trim().to_string());
                Ok(Substitution::Env { name, default })
            }
            other => Err(SubstitutionError::UnknownType(other.to_string())),
        };
    }

    // Pattern 2: $(type) - no argument-less substitutions are supported
    if let Some(subst_type) = caps.get(3) {
        return Err(SubstitutionError::UnknownType(subst_type.as_str().to_string()));
    }

    Err(SubstitutionError::InvalidPattern(
        caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
    ))
}

/// Substitution context containing all available variables
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Resolved launch arguments, in declaration order
    pub args: IndexMap<String, String>,
    /// Environment overrides, checked before the process environment
    pub env: HashMap<String, String>,
}

impl SubstitutionContext {
    /// Create a new substitution context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Substitute all patterns in a string
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        Template::parse(input)?.resolve(self)
    }

    fn resolve_arg(&self, name: &str) -> Result<String, SubstitutionError> {
        self.args
            .get(name)
            .cloned()
            .ok_or_else(|| SubstitutionError::UndefinedArg(name.to_string()))
    }

    fn resolve_env(&self, name: &str) -> Result<String, SubstitutionError> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        std::env::var(name).map_err(|_| SubstitutionError::UndefinedEnv(name.to_string()))
    }
}

/// Errors that can occur during substitution
#[derive(Debug, thiserror::Error)]
pub enum SubstitutionError {
    #[error("Unknown substitution type: {0}")]
    UnknownType(String),

    #[error("Undefined argument: {0}")]
    UndefinedArg(String),

    #[error("Undefined environment variable: {0}")]
    UndefinedEnv(String),

    #[error("Invalid substitution pattern: {0}")]
    InvalidPattern(String),
}
