//! Launch argument declarations and their resolution

use crate::config::SubstitutionContext;
use indexmap::IndexMap;

/// A user-overridable launch argument
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchArgument {
    /// Argument name, referenced as `$(arg name)`
    pub name: String,
    /// Default value used when no override is given
    pub default: String,
    /// Optional description
    pub description: Option<String>,
}

impl LaunchArgument {
    pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Build the substitution context from declarations and overrides.
///
/// Declared defaults come first, in declaration order; overrides replace
/// them. Values are taken as-is, without any type checking. Overrides for
/// undeclared names are kept but reported, since nothing in the plan can
/// refer to them.
pub fn resolve_arguments<'a>(
    declarations: impl IntoIterator<Item = &'a LaunchArgument>,
    overrides: &IndexMap<String, String>,
) -> SubstitutionContext {
    let mut ctx = SubstitutionContext::new();

    for decl in declarations {
        ctx.args.insert(decl.name.clone(), decl.default.clone());
    }

    for (name, value) in overrides {
        if !ctx.args.contains_key(name) {
            log::warn!("Override for undeclared argument '{}' has no effect", name);
        }
        ctx.args.insert(name.clone(), value.clone());
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declarations() -> Vec<LaunchArgument> {
        vec![
            LaunchArgument::new("port", "/dev/ttyUSB0"),
            LaunchArgument::new("baud", "115200").with_description("serial baud rate"),
        ]
    }

    #[test]
    fn test_defaults_in_declaration_order() {
        let ctx = resolve_arguments(&declarations(), &IndexMap::new());
        let names: Vec<&str> = ctx.args.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["port", "baud"]);
        assert_eq!(ctx.args["baud"], "115200");
    }

    #[test]
    fn test_override_replaces_default() {
        let mut overrides = IndexMap::new();
        overrides.insert("baud".to_string(), "57600".to_string());

        let ctx = resolve_arguments(&declarations(), &overrides);
        assert_eq!(ctx.args["baud"], "57600");
        assert_eq!(ctx.args["port"], "/dev/ttyUSB0");
    }

    #[test]
    fn test_malformed_values_pass_through() {
        let mut overrides = IndexMap::new();
        overrides.insert("baud".to_string(), "fast".to_string());

        let ctx = resolve_arguments(&declarations(), &overrides);
        assert_eq!(ctx.args["baud"], "fast");
    }

    #[test]
    fn test_undeclared_override_is_kept() {
        let mut overrides = IndexMap::new();
        overrides.insert("extra".to_string(), "1".to_string());

        let ctx = resolve_arguments(&declarations(), &overrides);
        assert_eq!(ctx.args.len(), 3);
        assert_eq!(ctx.args["extra"], "1");
    }
}
