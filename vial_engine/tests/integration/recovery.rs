//! Integration test: defined errors, the recovery gate, intents and stop.

use serde_json::json;
use std::time::Duration;
use vial_common::types::DeckPoint;
use vial_engine::state::labware::LabwareLocation;
use vial_engine::{CommandIntent, CommandStatus, EngineError, EngineSettings};
use vial_hal::drivers::simulation::{FaultSite, InjectedFault, SimulationDriver};

use super::{cmd, defined_type, failure_kind, harness, harness_with};

fn move_to(well: &str) -> serde_json::Value {
    json!({"pipetteId": "p1", "labwareId": "plate", "wellName": well})
}

#[tokio::test]
async fn stall_forgets_locations_and_gates_motion() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok("moveToWell", move_to("A1")).await;
    assert!(h.engine.state().pipettes.current_location().is_some());

    h.driver.inject_fault(FaultSite::Move, InjectedFault::Stall);
    let stalled = h.run("moveToWell", move_to("B1")).await;
    assert_eq!(defined_type(&stalled), "stallOrCollision");
    assert!(h.engine.state().pipettes.current_location().is_none());

    let gated = h.run("moveToWell", move_to("C1")).await;
    assert_eq!(failure_kind(&gated), "RecoveryRequiredError");
    assert!(gated
        .error
        .as_ref()
        .unwrap()
        .detail
        .contains("unsafe/updatePositionEstimators"));

    h.load_liquid("plate", json!({"D1": 10.0})).await;

    h.run_ok("unsafe/updatePositionEstimators", json!({"pipetteId": "p1"}))
        .await;
    assert!(h.engine.pending_recovery().is_none());
    h.run_ok("moveToWell", move_to("C1")).await;
    assert_eq!(
        h.engine.state().pipettes.current_well("p1"),
        Some(("plate", "C1"))
    );
}

#[tokio::test]
async fn fixit_commands_need_a_pending_recovery() {
    let mut h = harness();
    let err = h
        .engine
        .add_command(cmd("home", json!({})).with_intent(CommandIntent::Fixit))
        .unwrap_err();
    assert_eq!(err, EngineError::FixitWithoutRecovery("home".to_string()));
}

#[tokio::test]
async fn fixit_commands_run_before_queued_protocol_commands() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.inject_fault(FaultSite::Move, InjectedFault::Stall);
    h.run("moveToWell", move_to("A1")).await;
    assert!(h.engine.pending_recovery().is_some());

    let protocol = h.engine.add_command(cmd("moveToWell", move_to("A2"))).unwrap();
    let fixit = h
        .engine
        .add_command(cmd("home", json!({})).with_intent(CommandIntent::Fixit))
        .unwrap();
    h.engine.run_until_idle().await;

    let home = h.engine.get_command(&fixit.id).unwrap().clone();
    let moved = h.engine.get_command(&protocol.id).unwrap().clone();
    assert_eq!(home.status, CommandStatus::Succeeded);
    assert_eq!(moved.status, CommandStatus::Succeeded);
    assert!(home.completed_at.unwrap() <= moved.started_at.unwrap());
}

#[tokio::test]
async fn setup_commands_are_refused_once_the_protocol_starts() {
    let mut h = harness();
    let setup = h
        .engine
        .execute_command(
            cmd(
                "loadPipette",
                json!({"pipetteId": "p1", "pipetteName": "flex_1channel_50",
                       "mount": "left", "channels": 1, "maxVolume": 50.0}),
            )
            .with_intent(CommandIntent::Setup),
        )
        .await
        .unwrap();
    assert_eq!(setup.status, CommandStatus::Succeeded);

    h.run_ok("home", json!({})).await;

    let err = h
        .engine
        .add_command(cmd("home", json!({})).with_intent(CommandIntent::Setup))
        .unwrap_err();
    assert_eq!(err, EngineError::SetupCommandAfterStart("home".to_string()));
}

#[tokio::test]
async fn stuck_tip_needs_an_unsafe_recovery() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.inject_fault(FaultSite::DropTip, InjectedFault::TipStuck);

    let dropped = h.run("dropTipInPlace", json!({"pipetteId": "p1"})).await;
    assert_eq!(defined_type(&dropped), "tipPhysicallyAttached");
    assert!(h.engine.state().pipettes.attached_tip("p1").is_some());
    assert!(h.engine.state().pipettes.fluid_unknown("p1"));

    let home = h.run("home", json!({})).await;
    assert_eq!(failure_kind(&home), "RecoveryRequiredError");
    assert!(home
        .error
        .as_ref()
        .unwrap()
        .detail
        .contains("unsafe/blowOutInPlace"));

    h.run_ok("unsafe/dropTipInPlace", json!({"pipetteId": "p1"}))
        .await;
    assert!(h.engine.pending_recovery().is_none());
    assert!(h.engine.state().pipettes.attached_tip("p1").is_none());
}

#[tokio::test]
async fn resuming_a_false_positive_applies_the_alternative_update() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.inject_fault(FaultSite::DropTip, InjectedFault::TipStuck);
    h.run("dropTipInPlace", json!({"pipetteId": "p1"})).await;
    assert!(h.engine.state().pipettes.attached_tip("p1").is_some());

    h.engine.resume_from_recovery(true);
    assert!(h.engine.pending_recovery().is_none());
    assert!(h.engine.state().pipettes.attached_tip("p1").is_none());
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(0.0));
}

#[tokio::test]
async fn unclassified_failures_leave_no_pending_recovery() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.inject_fault(
        FaultSite::Move,
        InjectedFault::Communication("bus reset".to_string()),
    );

    let command = h.run("moveToWell", move_to("A1")).await;
    assert_eq!(failure_kind(&command), "CommunicationError");
    assert!(command.defined_error.is_none());
    assert!(h.engine.pending_recovery().is_none());
    assert_eq!(
        h.engine.state().pipettes.current_well("p1"),
        Some(("tips", "A1"))
    );
}

#[tokio::test]
async fn stopping_interrupts_the_running_command() {
    let mut h = harness_with(
        SimulationDriver::new().with_move_latency(Duration::from_millis(500)),
        EngineSettings::default(),
    );
    h.run_ok(
        "loadPipette",
        json!({"pipetteId": "p1", "pipetteName": "flex_1channel_50",
               "mount": "left", "channels": 1, "maxVolume": 50.0}),
    )
    .await;

    let stop = h.engine.stop_handle();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.stop();
    });

    let command = h.run("moveToWell", move_to("A1")).await;
    stopper.await.unwrap();
    assert_eq!(failure_kind(&command), "RunStoppedError");
    assert!(h.engine.state().pipettes.current_location().is_none());
    assert!(h.engine.stop_handle().is_stopped());

    let err = h.engine.add_command(cmd("home", json!({}))).unwrap_err();
    assert_eq!(err, EngineError::RunStopped);
}

fn place(labware_id: &str, location: serde_json::Value) -> serde_json::Value {
    json!({"labwareId": labware_id, "location": location})
}

#[tokio::test]
async fn held_labware_is_placed_and_its_location_recorded() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.attach_gripper();
    h.driver.grip_labware().unwrap();

    h.run_ok("unsafe/placeLabware", place("plate", json!({"slotName": "C2"})))
        .await;

    assert_eq!(
        h.engine.state().labware.get_location("plate"),
        Some(&LabwareLocation::DeckSlot {
            slot_name: "C2".into()
        })
    );
    let gripper = h.driver.gripper().unwrap();
    assert!(!gripper.holding_labware);
    assert_eq!(gripper.position, DeckPoint::new(200.0, 200.0, 0.0));
    assert_eq!(h.driver.home_count(), 1);
    assert!(h.engine.state().pipettes.current_location().is_none());
}

#[tokio::test]
async fn plate_reader_slot_sends_labware_to_the_lid_dock() {
    let mut h = harness();
    h.run_ok(
        "loadModule",
        json!({"model": "absorbanceReaderV1", "location": "D3", "moduleId": "reader"}),
    )
    .await;
    h.driver.attach_gripper();
    h.driver.grip_labware().unwrap();

    h.run_ok("unsafe/placeLabware", place("plate", json!({"slotName": "D3"})))
        .await;

    assert_eq!(
        h.engine.state().labware.get_location("plate"),
        Some(&LabwareLocation::AddressableArea {
            addressable_area_name: "absorbanceReaderV1LidDockD3".into()
        })
    );
    assert_eq!(
        h.driver.gripper().unwrap().position,
        DeckPoint::new(480.0, 40.0, 10.0)
    );
}

#[tokio::test]
async fn placing_needs_a_gripper_holding_labware() {
    let mut h = harness();
    let command = h
        .run("unsafe/placeLabware", place("plate", json!({"slotName": "C2"})))
        .await;
    assert_eq!(failure_kind(&command), "GripperNotAttachedError");

    h.driver.attach_gripper();
    let command = h
        .run("unsafe/placeLabware", place("plate", json!({"slotName": "C2"})))
        .await;
    assert_eq!(failure_kind(&command), "CannotPerformGripperAction");
    assert_eq!(h.driver.home_count(), 0);
    assert!(h.engine.state().labware.get_location("plate").is_none());

    h.driver.grip_labware().unwrap();
    let command = h
        .run("unsafe/placeLabware", place("plate", json!({"slotName": "B2"})))
        .await;
    assert_eq!(failure_kind(&command), "AddressableAreaDoesNotExistError");
    assert!(h.driver.gripper().unwrap().holding_labware);
}

#[tokio::test]
async fn placing_labware_waits_for_recovery() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver.attach_gripper();
    h.driver.grip_labware().unwrap();
    h.driver.inject_fault(FaultSite::Move, InjectedFault::Stall);
    h.run("moveToWell", move_to("A1")).await;

    let gated = h
        .run("unsafe/placeLabware", place("plate", json!({"slotName": "C2"})))
        .await;
    assert_eq!(failure_kind(&gated), "RecoveryRequiredError");

    h.run_ok("unsafe/updatePositionEstimators", json!({"pipetteId": "p1"}))
        .await;
    h.run_ok("unsafe/placeLabware", place("plate", json!({"slotName": "C2"})))
        .await;
}
