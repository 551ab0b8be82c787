mod common;

use common::{eventually, harness, ScriptedDistanceSensor};
use rover_core::common::{DriveDirection, GeoCoordinate, NotificationKind};
use rover_core::control::DriveCommand;
use rover_core::error::MissionError;
use rover_core::navigation::MissionOutcome;
use std::sync::Arc;
use std::time::Duration;

fn clear_road() -> Arc<ScriptedDistanceSensor> {
    Arc::new(ScriptedDistanceSensor::constant(300.0))
}

#[tokio::test]
async fn two_waypoint_mission_completes_once() {
    let h = harness(clear_road());
    let a = GeoCoordinate::new(47.6423, -122.1368);
    let b = GeoCoordinate::new(47.6425, -122.1368);
    h.localizer.update_position(a);
    h.localizer.update_heading(0.0);

    h.core.start_mission(vec![a, b]).await.unwrap();
    assert!(h.core.is_mission_active());
    assert!(eventually(|| h.core.current_target() == Some(b)).await);

    h.localizer.update_position(b);
    let outcome = tokio::time::timeout(Duration::from_secs(2), h.core.wait_for_mission())
        .await
        .unwrap();
    assert_eq!(outcome, Some(MissionOutcome::Completed));
    assert!(!h.core.is_mission_active());
    assert_eq!(h.core.current_target(), None);

    assert_eq!(h.sink.count("Mission complete"), 1);
    assert_eq!(h.sink.count("Mission aborted"), 0);
    assert_eq!(
        h.sink.of_kind(NotificationKind::ControlMode),
        vec!["Navigation", "Parked"]
    );
    assert_eq!(h.dispatcher.count(DriveCommand::SpeedStop), 1);
    assert_eq!(h.dispatcher.count(DriveCommand::DriveStop), 1);
    assert_eq!(h.dispatcher.commands().first(), Some(&DriveCommand::SpeedNormal));

    let status = h.core.mission_status();
    assert_eq!(status.next_index, 2);
    assert_eq!(status.waypoint_count, 2);
}

#[tokio::test]
async fn start_rejections() {
    let h = harness(clear_road());
    assert_eq!(
        h.core.start_mission(Vec::new()).await,
        Err(MissionError::EmptyWaypointList)
    );
    assert!(!h.core.is_mission_active());
    assert!(h.sink.messages().is_empty());

    let far = GeoCoordinate::new(48.0, -122.0);
    h.core.start_mission(vec![far]).await.unwrap();
    assert_eq!(
        h.core.start_mission(vec![far]).await,
        Err(MissionError::MissionAlreadyActive)
    );
    assert_eq!(h.core.current_target(), Some(far));

    h.core.cancel_mission();
    h.core.wait_for_mission().await;
}

#[tokio::test]
async fn cancel_stops_mission_but_not_avoidance() {
    let sensor = clear_road();
    let h = harness(sensor.clone());
    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    h.localizer.update_heading(0.0);

    h.core.set_autonomous_avoidance_enabled(true);
    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 0.01)])
        .await
        .unwrap();
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveRight) >= 2).await);

    h.core.cancel_mission();
    h.core.cancel_mission();
    let outcome = tokio::time::timeout(Duration::from_secs(2), h.core.wait_for_mission())
        .await
        .unwrap();
    assert_eq!(outcome, Some(MissionOutcome::Aborted));

    // give any straggling tick a chance to show up
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(h.dispatcher.count(DriveCommand::SpeedStop), 1);
    assert_eq!(h.dispatcher.count(DriveCommand::DriveStop), 1);
    assert_eq!(h.sink.count("Mission aborted"), 1);
    assert_eq!(h.sink.count("Mission complete"), 0);
    let commands = h.dispatcher.commands();
    assert_eq!(
        &commands[commands.len() - 2..],
        &[DriveCommand::SpeedStop, DriveCommand::DriveStop]
    );

    assert!(h.core.is_autonomous_avoidance_enabled());
    assert!(h.core.is_avoidance_running());
    sensor.push(Ok(10.0));
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveReverseLeft) == 1).await);
}

#[tokio::test]
async fn avoidance_moves_again_after_mission_parks() {
    let sensor = clear_road();
    let h = harness(sensor.clone());
    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    h.localizer.update_heading(90.0);

    h.core.set_autonomous_avoidance_enabled(true);
    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 0.01)])
        .await
        .unwrap();
    h.core.cancel_mission();
    h.core.wait_for_mission().await;

    let forward = h.dispatcher.count(DriveCommand::DriveForward);
    sensor.push(Ok(10.0));
    sensor.push(Ok(10.0));
    sensor.push(Ok(200.0));
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveForward) > forward).await);

    let commands = h.dispatcher.commands();
    let parked = commands
        .iter()
        .rposition(|c| *c == DriveCommand::SpeedStop)
        .unwrap();
    assert_eq!(
        &commands[parked + 1..],
        &[
            DriveCommand::DriveStop,
            DriveCommand::SpeedNormal,
            DriveCommand::DriveReverseLeft,
            DriveCommand::SpeedNormal,
            DriveCommand::DriveReverse,
            DriveCommand::SpeedNormal,
            DriveCommand::DriveForward,
        ]
    );
}

#[tokio::test]
async fn steering_follows_heading() {
    let h = harness(clear_road());
    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    // target due east
    h.localizer.update_heading(0.0);
    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 0.01)])
        .await
        .unwrap();
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveRight) > 0).await);

    h.localizer.update_heading(180.0);
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveLeft) > 0).await);

    h.localizer.update_heading(92.0);
    assert!(eventually(|| h.dispatcher.count(DriveCommand::DriveForward) > 0).await);

    h.core.cancel_mission();
    h.core.wait_for_mission().await;
}

#[tokio::test]
async fn drive_loop_yields_to_obstacle_override() {
    let h = harness(Arc::new(ScriptedDistanceSensor::constant(10.0)));
    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    h.localizer.update_heading(0.0);

    h.core.set_autonomous_avoidance_enabled(true);
    assert!(eventually(|| h.core.is_obstacle_detected()).await);

    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 0.01)])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(h.dispatcher.count(DriveCommand::DriveRight), 0);
    assert!(h.dispatcher.count(DriveCommand::DriveReverse) > 0);

    h.core.cancel_mission();
    h.core.wait_for_mission().await;
}

#[tokio::test]
async fn status_reports_distance_to_target() {
    let h = harness(clear_road());
    assert!(!h.core.mission_status().active);
    assert_eq!(h.core.distance_to_target(), None);

    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 1.0)])
        .await
        .unwrap();

    let status = h.core.mission_status();
    assert!(status.active);
    assert_eq!(status.next_index, 0);
    assert_eq!(status.target, Some(GeoCoordinate::new(0.0, 1.0)));
    let distance = status.distance_to_target_meters.unwrap();
    assert!((distance - 111_195.0).abs() < 50.0);

    h.core.cancel_mission();
    h.core.wait_for_mission().await;
}

#[tokio::test]
async fn lost_fix_keeps_last_decision() {
    let h = harness(clear_road());
    h.localizer.update_position(GeoCoordinate::new(0.0, 0.0));
    h.localizer.update_heading(0.0);
    h.core
        .start_mission(vec![GeoCoordinate::new(0.0, 0.01)])
        .await
        .unwrap();
    assert!(eventually(|| h.core.mission_status().direction == DriveDirection::Right).await);

    h.localizer.clear_position();
    h.localizer.update_heading(90.0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.core.mission_status().direction, DriveDirection::Right);
    assert!(h.core.is_mission_active());

    h.core.cancel_mission();
    h.core.wait_for_mission().await;
}
