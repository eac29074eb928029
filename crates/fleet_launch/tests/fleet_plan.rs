//! Structural checks on the resolved fleet launch plan

use fleet_launch::description::ResolvedParameter;
use fleet_launch::{
    fleet_description, resolve_arguments, FleetOptions, NodeSelection, ResolvedPlan,
};
use indexmap::IndexMap;

fn resolve(overrides: &[(&str, &str)], selection: NodeSelection) -> ResolvedPlan {
    let description = fleet_description(&FleetOptions::default());
    let overrides: IndexMap<String, String> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let ctx = resolve_arguments(description.declared_arguments(), &overrides);
    description
        .resolve(&ctx, &selection)
        .expect("fleet plan should resolve")
}

fn default_plan() -> ResolvedPlan {
    resolve(&[], NodeSelection::default())
}

fn timer_delay(plan: &ResolvedPlan, key: &str) -> Option<f64> {
    plan.entry_of(key).and_then(|entry| entry.delay_sec)
}

#[test]
fn test_default_schedule() {
    let plan = default_plan();

    let immediate: Vec<Vec<&str>> = plan
        .immediate()
        .map(|e| e.nodes.iter().map(|n| n.key.as_str()).collect())
        .collect();
    assert_eq!(immediate, vec![vec!["uav1"]]);

    let timers: Vec<(Option<f64>, Vec<&str>)> = plan
        .timers()
        .map(|e| (e.delay_sec, e.nodes.iter().map(|n| n.key.as_str()).collect()))
        .collect();
    assert_eq!(
        timers,
        vec![
            (Some(5.0), vec!["uav2"]),
            (Some(15.0), vec!["foxglove_bridge"]),
        ]
    );

    let unscheduled: Vec<&str> = plan
        .unscheduled()
        .flat_map(|e| e.nodes.iter().map(|n| n.key.as_str()))
        .collect();
    assert_eq!(unscheduled, vec!["uav3"]);
    assert_eq!(timer_delay(&plan, "uav3"), Some(10.0));
}

#[test]
fn test_fcu_url_follows_port_and_baud() {
    for (port, baud) in [("/dev/ttyUSB0", "115200"), ("/dev/ttyACM1", "921600")] {
        let plan = resolve(&[("port", port), ("baud", baud)], NodeSelection::default());
        for key in ["uav1", "uav2", "uav3"] {
            let node = plan.node(key).unwrap();
            assert_eq!(
                node.parameters["fcu_url"],
                ResolvedParameter::String(format!("serial:///{}:{}", port, baud))
            );
        }
    }
}

#[test]
fn test_target_system_ids_are_distinct() {
    let plan = default_plan();

    let ids: Vec<(String, Option<i64>)> = ["uav1", "uav2", "uav3"]
        .iter()
        .map(|key| {
            let node = plan.node(key).unwrap();
            (
                node.namespace.clone().unwrap(),
                node.parameters["target_system_id"].as_i64(),
            )
        })
        .collect();

    assert_eq!(
        ids,
        vec![
            ("/uav1".to_string(), Some(1)),
            ("/uav2".to_string(), Some(2)),
            ("/uav3".to_string(), Some(3)),
        ]
    );
}

#[test]
fn test_changing_one_delay_changes_only_that_timer() {
    let baseline = default_plan();
    let plan = resolve(&[("delay_uav2_sec", "1.5")], NodeSelection::default());

    assert_eq!(timer_delay(&plan, "uav2"), Some(1.5));
    assert_eq!(
        timer_delay(&plan, "foxglove_bridge"),
        timer_delay(&baseline, "foxglove_bridge")
    );
    assert_eq!(timer_delay(&plan, "uav3"), timer_delay(&baseline, "uav3"));

    let plan = resolve(&[("delay_foxglove_sec", "30")], NodeSelection::default());
    assert_eq!(timer_delay(&plan, "foxglove_bridge"), Some(30.0));
    assert_eq!(timer_delay(&plan, "uav2"), Some(5.0));
}

#[test]
fn test_foxglove_arguments_are_fixed() {
    let overrides = [
        ("port", "/dev/ttyS3"),
        ("baud", "57600"),
        ("system_id", "1"),
        ("delay_foxglove_sec", "0"),
    ];
    for plan in [default_plan(), resolve(&overrides, NodeSelection::default())] {
        let bridge = plan.node("foxglove_bridge").unwrap();
        assert_eq!(bridge.arguments, vec!["--port", "8765", "--address", "0.0.0.0"]);
        assert!(bridge.parameters.is_empty());
    }
}

#[test]
fn test_system_id_is_typed_the_same_for_every_vehicle() {
    let plan = default_plan();
    for key in ["uav1", "uav2", "uav3"] {
        assert_eq!(
            plan.node(key).unwrap().parameters["system_id"],
            ResolvedParameter::Integer(255)
        );
    }

    let plan = resolve(&[("system_id", "gcs")], NodeSelection::default());
    for key in ["uav1", "uav2", "uav3"] {
        assert_eq!(
            plan.node(key).unwrap().parameters["system_id"].as_str(),
            Some("gcs")
        );
    }
}

#[test]
fn test_enable_uav3() {
    let selection = NodeSelection {
        enable: ["uav3".to_string()].into(),
        ..Default::default()
    };
    let plan = resolve(&[], selection);

    assert_eq!(plan.timers().count(), 3);
    assert_eq!(plan.unscheduled().count(), 0);
    assert!(plan.entry_of("uav3").unwrap().scheduled);
}

#[test]
fn test_disable_bridge() {
    let selection = NodeSelection {
        disable: ["foxglove_bridge".to_string()].into(),
        ..Default::default()
    };
    let plan = resolve(&[], selection);

    assert_eq!(plan.timers().count(), 1);
    assert!(!plan.entry_of("foxglove_bridge").unwrap().scheduled);
}

#[test]
fn test_malformed_delay_is_reported_at_resolution() {
    let description = fleet_description(&FleetOptions::default());
    let mut overrides = IndexMap::new();
    overrides.insert("delay_uav2_sec".to_string(), "later".to_string());
    let ctx = resolve_arguments(description.declared_arguments(), &overrides);

    let err = description
        .resolve(&ctx, &NodeSelection::default())
        .unwrap_err();
    assert!(err.to_string().contains("later"));
}

#[test]
fn test_malformed_uav3_delay_only_matters_when_enabled() {
    let plan = resolve(&[("delay_uav3_sec", "soon")], NodeSelection::default());
    assert_eq!(plan.immediate().count(), 1);
    assert_eq!(plan.timers().count(), 2);
    assert_eq!(timer_delay(&plan, "uav2"), Some(5.0));
    assert_eq!(
        plan.entry_of("uav3").unwrap().period.as_deref(),
        Some("soon")
    );

    let description = fleet_description(&FleetOptions::default());
    let mut overrides = IndexMap::new();
    overrides.insert("delay_uav3_sec".to_string(), "soon".to_string());
    let ctx = resolve_arguments(description.declared_arguments(), &overrides);
    let selection = NodeSelection {
        enable: ["uav3".to_string()].into(),
        ..Default::default()
    };
    let err = description.resolve(&ctx, &selection).unwrap_err();
    assert!(err.to_string().contains("soon"));
}

#[test]
fn test_delay_beyond_duration_range_is_rejected() {
    let description = fleet_description(&FleetOptions::default());
    let mut overrides = IndexMap::new();
    overrides.insert("delay_uav2_sec".to_string(), "1e20".to_string());
    let ctx = resolve_arguments(description.declared_arguments(), &overrides);

    let err = description
        .resolve(&ctx, &NodeSelection::default())
        .unwrap_err();
    assert!(err.to_string().contains("1e20"));
}

#[test]
fn test_plan_serializes() {
    let plan = default_plan();

    let yaml = serde_yaml::to_string(&plan).unwrap();
    assert!(yaml.contains("fcu_url:"));
    assert!(yaml.contains("serial:///dev/ttyUSB0:115200"));

    let json: serde_json::Value = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["args"]["baud"], "115200");
    assert_eq!(json["entries"][0]["nodes"][0]["parameters"]["system_id"], 255);
    assert_eq!(json["entries"][0]["nodes"][0]["output"], "screen");
}
