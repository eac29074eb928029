//! The fleet launch description: three MAVROS bridges and a Foxglove bridge
//!
//! | action                         | when                          |
//! |--------------------------------|-------------------------------|
//! | `uav1` mavros_node             | immediately                   |
//! | `uav2` mavros_node             | after `delay_uav2_sec`        |
//! | `uav3` mavros_node             | declared, not scheduled       |
//! | foxglove_bridge                | after `delay_foxglove_sec`    |
//!
//! All vehicles share the connection string `serial:///$(arg port):$(arg baud)`
//! and differ only in namespace and `target_system_id`.

use crate::config::{LaunchArgument, Substitution, Template};
use crate::description::{Action, LaunchDescription, NodeDescriptor, OutputMode, TimerAction};

pub const ARG_PORT: &str = "port";
pub const ARG_BAUD: &str = "baud";
pub const ARG_SYSTEM_ID: &str = "system_id";
pub const ARG_DELAY_UAV2: &str = "delay_uav2_sec";
pub const ARG_DELAY_UAV3: &str = "delay_uav3_sec";
pub const ARG_DELAY_FOXGLOVE: &str = "delay_foxglove_sec";

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: &str = "115200";
pub const DEFAULT_SYSTEM_ID: &str = "255";
pub const DEFAULT_DELAY_UAV2: &str = "5.0";
pub const DEFAULT_DELAY_UAV3: &str = "10.0";
pub const DEFAULT_DELAY_FOXGLOVE: &str = "15.0";

pub const MAVROS_PACKAGE: &str = "mavros";
pub const MAVROS_EXECUTABLE: &str = "mavros_node";

pub const FOXGLOVE_PACKAGE: &str = "foxglove_bridge";
pub const FOXGLOVE_EXECUTABLE: &str = "foxglove_bridge";
pub const FOXGLOVE_PORT: u16 = 8765;
pub const FOXGLOVE_ADDRESS: &str = "0.0.0.0";

/// Topic filter matching every vehicle namespace
pub const FOXGLOVE_FLEET_TOPICS: &str = "/uav1/**,/uav2/**,/uav3/**";

/// Knobs that are not launch arguments
#[derive(Debug, Clone, Default)]
pub struct FleetOptions {
    /// Value for the bridge's `--topics` filter; all topics when unset
    pub foxglove_topics: Option<String>,
}

/// The six overridable launch arguments, in declaration order
pub fn fleet_arguments() -> Vec<LaunchArgument> {
    vec![
        LaunchArgument::new(ARG_PORT, DEFAULT_PORT).with_description("serial device of the radio"),
        LaunchArgument::new(ARG_BAUD, DEFAULT_BAUD).with_description("serial baud rate"),
        LaunchArgument::new(ARG_SYSTEM_ID, DEFAULT_SYSTEM_ID)
            .with_description("MAVLink system id of this ground station"),
        LaunchArgument::new(ARG_DELAY_UAV2, DEFAULT_DELAY_UAV2)
            .with_description("seconds before uav2 is started"),
        LaunchArgument::new(ARG_DELAY_UAV3, DEFAULT_DELAY_UAV3)
            .with_description("seconds before uav3 is started"),
        LaunchArgument::new(ARG_DELAY_FOXGLOVE, DEFAULT_DELAY_FOXGLOVE)
            .with_description("seconds before foxglove_bridge is started"),
    ]
}

/// `serial:///$(arg port):$(arg baud)`
pub fn fcu_url() -> Template {
    Template::concat([
        Substitution::Text("serial:///".to_string()),
        Substitution::Arg(ARG_PORT.to_string()),
        Substitution::Text(":".to_string()),
        Substitution::Arg(ARG_BAUD.to_string()),
    ])
}

/// MAVROS bridge for one vehicle, namespaced `uav<target_system_id>`
pub fn vehicle_node(target_system_id: i64) -> NodeDescriptor {
    NodeDescriptor::new(MAVROS_PACKAGE, MAVROS_EXECUTABLE)
        .with_namespace(format!("uav{}", target_system_id))
        .with_output(OutputMode::Screen)
        .with_parameter("fcu_url", fcu_url())
        .with_parameter("system_id", Template::arg(ARG_SYSTEM_ID))
        .with_parameter("target_system_id", target_system_id)
}

/// Foxglove WebSocket bridge on a fixed port and address
pub fn foxglove_node(options: &FleetOptions) -> NodeDescriptor {
    let mut node = NodeDescriptor::new(FOXGLOVE_PACKAGE, FOXGLOVE_EXECUTABLE)
        .with_name(FOXGLOVE_EXECUTABLE)
        .with_output(OutputMode::Screen)
        .with_argument("--port")
        .with_argument(FOXGLOVE_PORT.to_string().as_str())
        .with_argument("--address")
        .with_argument(FOXGLOVE_ADDRESS);

    if let Some(topics) = &options.foxglove_topics {
        node = node.with_argument("--topics").with_argument(topics.as_str());
    }

    node
}

/// Build the complete fleet launch description
pub fn fleet_description(options: &FleetOptions) -> LaunchDescription {
    let mut actions: Vec<Action> = fleet_arguments()
        .into_iter()
        .map(Action::DeclareArgument)
        .collect();

    actions.push(Action::Node(vehicle_node(1)));
    actions.push(Action::Timer(TimerAction::new(
        Template::arg(ARG_DELAY_UAV2),
        vec![Action::Node(vehicle_node(2))],
    )));
    actions.push(Action::Timer(
        TimerAction::new(
            Template::arg(ARG_DELAY_UAV3),
            vec![Action::Node(vehicle_node(3))],
        )
        .disabled(),
    ));
    actions.push(Action::Timer(TimerAction::new(
        Template::arg(ARG_DELAY_FOXGLOVE),
        vec![Action::Node(foxglove_node(options))],
    )));

    LaunchDescription::new(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::ParameterValue;

    #[test]
    fn test_declares_six_arguments() {
        let description = fleet_description(&FleetOptions::default());
        let declared: Vec<(&str, &str)> = description
            .declared_arguments()
            .iter()
            .map(|arg| (arg.name.as_str(), arg.default.as_str()))
            .collect();

        assert_eq!(
            declared,
            vec![
                ("port", "/dev/ttyUSB0"),
                ("baud", "115200"),
                ("system_id", "255"),
                ("delay_uav2_sec", "5.0"),
                ("delay_uav3_sec", "10.0"),
                ("delay_foxglove_sec", "15.0"),
            ]
        );
    }

    #[test]
    fn test_schedule_shape() {
        let description = fleet_description(&FleetOptions::default());

        let immediate: Vec<&str> = description.immediate_nodes().map(|n| n.key()).collect();
        assert_eq!(immediate, vec!["uav1"]);

        let timers: Vec<(String, bool)> = description
            .timers()
            .map(|t| (t.period.to_string(), t.enabled))
            .collect();
        assert_eq!(
            timers,
            vec![
                ("$(arg delay_uav2_sec)".to_string(), true),
                ("$(arg delay_uav3_sec)".to_string(), false),
                ("$(arg delay_foxglove_sec)".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_vehicle_parameters() {
        let node = vehicle_node(2);
        assert_eq!(node.namespace.as_deref(), Some("uav2"));
        assert_eq!(node.parameters["fcu_url"], ParameterValue::Template(fcu_url()));
        assert_eq!(
            node.parameters["system_id"],
            ParameterValue::Template(Template::arg("system_id"))
        );
        assert_eq!(node.parameters["target_system_id"], ParameterValue::Integer(2));
    }

    #[test]
    fn test_foxglove_topic_filter_is_optional() {
        let plain = foxglove_node(&FleetOptions::default());
        let args: Vec<String> = plain.arguments.iter().map(|a| a.to_string()).collect();
        assert_eq!(args, vec!["--port", "8765", "--address", "0.0.0.0"]);

        let filtered = foxglove_node(&FleetOptions {
            foxglove_topics: Some(FOXGLOVE_FLEET_TOPICS.to_string()),
        });
        let args: Vec<String> = filtered.arguments.iter().map(|a| a.to_string()).collect();
        assert_eq!(
            &args[4..],
            &["--topics".to_string(), FOXGLOVE_FLEET_TOPICS.to_string()]
        );
    }
}
