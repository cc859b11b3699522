//! Session lifecycle, telemetry, keepalive, and dead-reckoning tests.

use std::time::Duration;

use crate::test_utils::{connect_session, wait_for_telemetry, SimulatorOptions, VehicleSimulator};
use tetherlink_flight::{FlightError, SessionState};
use tetherlink_wire::WireError;

const POSE_TOL: f64 = 1e-6;

#[tokio::test]
async fn test_connect_publishes_telemetry() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    assert_eq!(session.state().await, SessionState::Connected);
    wait_for_telemetry(&session).await;

    let sample = session.telemetry().await.expect("telemetry sample");
    assert_eq!(sample.battery_pct, 87);
    assert_eq!(sample.height_cm, 0);
    assert_eq!(sample.wifi_quality, 90);

    session.disconnect().await;
}

#[tokio::test]
async fn test_takeoff_and_land_cycle() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    session.takeoff(80, false).await.expect("takeoff");
    assert_eq!(session.state().await, SessionState::Hovering);
    assert!(session.pose().await.z_cm > 0.0);

    session.land().await.expect("land");
    assert_eq!(session.state().await, SessionState::Connected);
    assert_eq!(sim.count("land"), 1);

    // Landing again from the ground is not a valid transition.
    let err = session.land().await.unwrap_err();
    assert!(matches!(err, FlightError::InvalidState { op: "land", .. }));
    assert_eq!(sim.count("land"), 1);

    session.disconnect().await;
}

#[tokio::test]
async fn test_commands_rejected_in_wrong_state() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    let err = session.forward(50).await.unwrap_err();
    assert!(matches!(err, FlightError::InvalidState { op: "move", .. }));
    let err = session.rotate_cw(90).await.unwrap_err();
    assert!(matches!(err, FlightError::InvalidState { op: "rotate", .. }));

    session.takeoff(80, false).await.expect("takeoff");
    let err = session.takeoff(80, false).await.unwrap_err();
    assert!(matches!(
        err,
        FlightError::InvalidState { op: "takeoff", .. }
    ));

    session.disconnect().await;
}

#[tokio::test]
async fn test_low_battery_blocks_takeoff_unless_overridden() {
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        battery_pct: 10,
        ..SimulatorOptions::default()
    })
    .await;
    let session = connect_session(&sim).await;
    wait_for_telemetry(&session).await;

    let err = session.takeoff(80, false).await.unwrap_err();
    assert!(matches!(
        err,
        FlightError::LowBattery {
            battery_pct: 10,
            floor_pct: 20
        }
    ));
    assert_eq!(sim.count("takeoff"), 0);

    session.takeoff(80, true).await.expect("override takeoff");
    assert_eq!(session.state().await, SessionState::Hovering);

    session.disconnect().await;
}

#[tokio::test]
async fn test_dead_reckoning_square_leg() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;
    session.takeoff(80, false).await.expect("takeoff");
    let start_z = session.pose().await.z_cm;

    session.forward(100).await.expect("forward");
    session.rotate_cw(90).await.expect("rotate");
    session.forward(100).await.expect("forward");

    let pose = session.pose().await;
    assert!((pose.x_cm - 100.0).abs() < POSE_TOL);
    assert!((pose.y_cm - 100.0).abs() < POSE_TOL);
    assert!((pose.z_cm - start_z).abs() < POSE_TOL);
    assert!((pose.yaw_deg - 90.0).abs() < POSE_TOL);

    session.disconnect().await;
}

#[tokio::test]
async fn test_landing_pose_restored_on_next_takeoff() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    session.takeoff(80, false).await.expect("takeoff");
    session.forward(60).await.expect("forward");
    session.rotate_cw(180).await.expect("rotate");
    session.land().await.expect("land");

    session.takeoff(80, false).await.expect("second takeoff");
    let pose = session.pose().await;
    assert!((pose.x_cm - 60.0).abs() < POSE_TOL);
    assert!((pose.yaw_deg - 180.0).abs() < POSE_TOL);

    session.disconnect().await;
}

#[tokio::test]
async fn test_land_is_noop_near_ground() {
    // A hover height below the confirm threshold also exercises the bounded
    // takeoff timeout path.
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        hover_height_cm: 10,
        ..SimulatorOptions::default()
    })
    .await;
    let session = connect_session(&sim).await;

    session.takeoff(80, false).await.expect("takeoff");
    assert_eq!(session.state().await, SessionState::Hovering);
    wait_for_telemetry(&session).await;

    session.land().await.expect("near-ground land");
    assert_eq!(sim.count("land"), 0);
    assert_eq!(session.state().await, SessionState::Hovering);

    session.disconnect().await;
}

#[tokio::test]
async fn test_vehicle_rejection_surfaces_without_pose_update() {
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        reject: vec!["forward"],
        ..SimulatorOptions::default()
    })
    .await;
    let session = connect_session(&sim).await;
    session.takeoff(80, false).await.expect("takeoff");

    let err = session.forward(50).await.unwrap_err();
    assert!(matches!(err, FlightError::Wire(WireError::Rejected(_))));

    let pose = session.pose().await;
    assert!(pose.x_cm.abs() < POSE_TOL);
    assert_eq!(session.state().await, SessionState::Hovering);

    session.disconnect().await;
}

#[tokio::test]
async fn test_set_speed_clamps_to_sdk_range() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    session.set_speed(5).await.expect("set_speed low");
    session.set_speed(150).await.expect("set_speed high");

    let log = sim.command_log();
    assert!(log.iter().any(|line| line == "speed 10"));
    assert!(log.iter().any(|line| line == "speed 100"));

    session.disconnect().await;
}

#[tokio::test]
async fn test_keepalive_pings_only_while_airborne() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(sim.count("battery?"), 0);

    session.takeoff(80, false).await.expect("takeoff");
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(sim.count("battery?") > 0);

    session.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_stops_background_loops() {
    let sim = VehicleSimulator::spawn().await;
    let session = connect_session(&sim).await;
    session.takeoff(80, false).await.expect("takeoff");

    session.disconnect().await;
    assert_eq!(session.state().await, SessionState::Disconnected);

    let traffic_at_disconnect = sim.command_log().len();
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(sim.command_log().len(), traffic_at_disconnect);
}
