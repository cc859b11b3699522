//! Navigation controller tests: goto sub-stepping, projection checks,
//! cooperative aborts, and mission sequencing.

use std::sync::Arc;
use std::time::Duration;

use crate::test_utils::{connect_session, SimulatorOptions, VehicleSimulator};
use tetherlink_flight::Session;
use tetherlink_geofence::{GeofenceEngine, GeofenceMode};
use tetherlink_nav::{Displacement, MissionStep, NavStatus, NavigationController};

const POLL: Duration = Duration::from_millis(50);
const POSE_TOL: f64 = 1e-6;

async fn airborne_controller(
    sim: &VehicleSimulator,
) -> (Arc<Session>, Arc<GeofenceEngine>, NavigationController) {
    let session = Arc::new(connect_session(sim).await);
    let engine = GeofenceEngine::install(Arc::clone(&session)).await;
    session.takeoff(80, false).await.expect("takeoff");
    let nav = NavigationController::new(Arc::clone(&session), Arc::clone(&engine));
    (session, engine, nav)
}

#[tokio::test]
async fn test_goto_completes_in_substeps() {
    let sim = VehicleSimulator::spawn().await;
    let (session, _engine, nav) = airborne_controller(&sim).await;

    let report = nav
        .goto(Displacement {
            dx_cm: 60.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        })
        .await;

    assert_eq!(report.status, NavStatus::Completed);
    assert_eq!(report.steps_executed, 3);
    assert_eq!(report.steps_planned, 3);
    assert_eq!(sim.count("forward"), 3);
    assert!((session.pose().await.x_cm - 60.0).abs() < POSE_TOL);

    session.disconnect().await;
}

#[tokio::test]
async fn test_goto_halted_by_hard_projection() {
    let sim = VehicleSimulator::spawn().await;
    let (session, engine, nav) = airborne_controller(&sim).await;
    engine
        .set(120.0, 120.0, 200.0, 0.0, GeofenceMode::Hard, POLL)
        .await
        .expect("arm geofence");

    // Half-width 60: sub-steps land at 20/40/60, and the projection to 80
    // is rejected before it is ever sent.
    let report = nav
        .goto(Displacement {
            dx_cm: 100.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        })
        .await;

    assert_eq!(report.status, NavStatus::Aborted);
    assert_eq!(report.steps_executed, 3);
    assert_eq!(report.steps_planned, 5);
    assert_eq!(sim.count("forward"), 3);
    assert!((session.pose().await.x_cm - 60.0).abs() < POSE_TOL);
    assert_eq!(sim.count("land"), 0);

    session.disconnect().await;
}

#[tokio::test]
async fn test_soft_violation_stops_goto_at_next_boundary_only() {
    // Slow the vehicle down so the monitor's debounce window elapses while a
    // sub-step is still in flight.
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        response_delay: Duration::from_millis(200),
        ..SimulatorOptions::default()
    })
    .await;
    let (session, engine, nav) = airborne_controller(&sim).await;
    engine
        .set(80.0, 80.0, 200.0, 0.0, GeofenceMode::Soft, POLL)
        .await
        .expect("arm geofence");

    // Half-width 40: the pose leaves the box once the third sub-step lands
    // at x=60. Soft mode lets the fourth sub-step (already past its checks)
    // run to completion; the abort flag then stops the fifth at its
    // boundary.
    let report = nav
        .goto(Displacement {
            dx_cm: 100.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        })
        .await;

    assert_eq!(report.status, NavStatus::Aborted);
    assert_eq!(report.steps_executed, 4);
    assert_eq!(report.steps_planned, 5);
    assert_eq!(sim.count("forward"), 4);
    assert_eq!(sim.count("land"), 0);
    assert!(session.abort().goto_requested());

    session.disconnect().await;
}

#[tokio::test]
async fn test_manual_abort_stops_goto_partway() {
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        response_delay: Duration::from_millis(150),
        ..SimulatorOptions::default()
    })
    .await;
    let (session, _engine, nav) = airborne_controller(&sim).await;

    let aborter = Arc::clone(&session);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        aborter.abort().request_goto_abort();
    });

    let report = nav
        .goto(Displacement {
            dx_cm: 100.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        })
        .await;

    assert_eq!(report.status, NavStatus::Aborted);
    assert!(report.steps_executed < report.steps_planned);
    assert_eq!(report.steps_planned, 5);

    session.disconnect().await;
}

#[tokio::test]
async fn test_goto_fails_on_vehicle_rejection() {
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        reject: vec!["forward"],
        ..SimulatorOptions::default()
    })
    .await;
    let (session, _engine, nav) = airborne_controller(&sim).await;

    let report = nav
        .goto(Displacement {
            dx_cm: 40.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        })
        .await;

    assert_eq!(report.status, NavStatus::Failed);
    assert_eq!(report.steps_executed, 0);
    assert!(session.pose().await.x_cm.abs() < POSE_TOL);

    session.disconnect().await;
}

#[tokio::test]
async fn test_mission_runs_steps_in_order() {
    let sim = VehicleSimulator::spawn().await;
    let (session, _engine, nav) = airborne_controller(&sim).await;

    let steps = vec![
        MissionStep::Goto(Displacement {
            dx_cm: 40.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        }),
        MissionStep::Rotate { degrees: 90.0 },
        MissionStep::Goto(Displacement {
            dx_cm: 0.0,
            dy_cm: 40.0,
            dz_cm: 0.0,
        }),
    ];
    let report = nav.run_mission(&steps).await;

    assert_eq!(report.status, NavStatus::Completed);
    assert_eq!(report.steps_completed, 3);
    assert_eq!(report.steps_total, 3);

    let pose = session.pose().await;
    assert!((pose.x_cm - 40.0).abs() < POSE_TOL);
    assert!((pose.y_cm - 40.0).abs() < POSE_TOL);
    assert!((pose.yaw_deg - 90.0).abs() < POSE_TOL);
    // After the cw turn, world +Y is straight ahead.
    assert_eq!(sim.count("forward"), 4);
    assert_eq!(sim.count("cw"), 1);

    session.disconnect().await;
}

#[tokio::test]
async fn test_mission_abort_checked_between_operations() {
    let sim = VehicleSimulator::spawn_with(SimulatorOptions {
        response_delay: Duration::from_millis(150),
        ..SimulatorOptions::default()
    })
    .await;
    let (session, _engine, nav) = airborne_controller(&sim).await;

    let aborter = Arc::clone(&session);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        aborter.abort().request_mission_abort();
    });

    let steps = vec![
        MissionStep::Goto(Displacement {
            dx_cm: 20.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        }),
        MissionStep::Goto(Displacement {
            dx_cm: 20.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        }),
        MissionStep::Goto(Displacement {
            dx_cm: 20.0,
            dy_cm: 0.0,
            dz_cm: 0.0,
        }),
    ];
    let report = nav.run_mission(&steps).await;

    assert_eq!(report.status, NavStatus::Aborted);
    assert!(report.steps_completed < report.steps_total);
    // Completed operations are not rolled back.
    let expected_x = f64::from(report.steps_completed) * 20.0;
    assert!((session.pose().await.x_cm - expected_x).abs() < POSE_TOL);

    session.disconnect().await;
}
