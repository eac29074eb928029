//! Fleet Launch
//!
//! A ROS2-style launcher for a multi-vehicle MAVROS setup.
//!
//! # Overview
//!
//! The launch description declares six overridable arguments and four nodes:
//! - `uav1` MAVROS bridge, started immediately
//! - `uav2` MAVROS bridge, started after `delay_uav2_sec`
//! - `uav3` MAVROS bridge, declared but not scheduled (`--enable uav3`)
//! - `foxglove_bridge`, started after `delay_foxglove_sec` on port 8765
//!
//! Every vehicle connects through `serial:///$(arg port):$(arg baud)` and
//! differs only in its namespace and `target_system_id`.
//!
//! # Example
//!
//! ```text
//! fleet_launch port:=/dev/ttyACM0 baud:=921600 delay_uav2_sec:=2.0
//! fleet_launch --dry-run --format yaml
//! fleet_launch --enable uav3 --params-file field.yaml
//! ```

pub mod cli;
pub mod config;
pub mod description;
pub mod runtime;

pub use cli::{LaunchArgs, PlanFormat};
pub use config::{
    resolve_arguments, LaunchArgument, OverrideError, SubstitutionContext, SubstitutionError,
    Template,
};
pub use description::{fleet_description, Action, FleetOptions, LaunchDescription, TimerAction};
pub use runtime::{
    CommandLine, Executor, ExecutorConfig, ExecutorError, ManagedProcess, NodeSelection,
    PackageIndex, PlanError, ProcessConfig, ProcessError, ProcessEvent, ProcessStatus,
    ResolvedNode, ResolvedPlan,
};
