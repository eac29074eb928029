//! Locating ROS package executables

use crate::runtime::plan::ResolvedNode;
use std::fmt;
use std::path::{Path, PathBuf};

/// Install prefixes searched for `lib/<package>/<executable>`
#[derive(Debug, Clone)]
pub struct PackageIndex {
    pub prefixes: Vec<PathBuf>,
    /// Command used when an executable is not found under any prefix
    pub ros2_command: String,
}

impl Default for PackageIndex {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            ros2_command: "ros2".to_string(),
        }
    }
}

impl PackageIndex {
    /// Prefixes from `AMENT_PREFIX_PATH`
    pub fn from_env() -> Self {
        let prefixes = std::env::var("AMENT_PREFIX_PATH")
            .map(|paths| Self::split_prefixes(&paths))
            .unwrap_or_default();

        if prefixes.is_empty() {
            log::debug!("AMENT_PREFIX_PATH is empty, nodes will be started through 'ros2 run'");
        }

        Self {
            prefixes,
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    fn split_prefixes(paths: &str) -> Vec<PathBuf> {
        paths
            .split(':')
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }

    /// First `<prefix>/lib/<package>/<executable>` that exists
    pub fn find_executable(&self, package: &str, executable: &str) -> Option<PathBuf> {
        self.prefixes
            .iter()
            .map(|prefix| prefix.join("lib").join(package).join(executable))
            .find(|path| path.is_file())
    }

    /// Full command line for a resolved node
    pub fn command_for(&self, node: &ResolvedNode) -> CommandLine {
        let mut args = Vec::new();

        let program = match self.find_executable(&node.package, &node.executable) {
            Some(path) => path_to_string(&path),
            None => {
                args.push("run".to_string());
                args.push(node.package.clone());
                args.push(node.executable.clone());
                self.ros2_command.clone()
            }
        };

        args.extend(node.arguments.iter().cloned());
        args.extend(node.ros_arguments());

        CommandLine { program, args }
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Program and arguments of a process to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
