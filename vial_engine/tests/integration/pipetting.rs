//! Integration test: aspirate, dispense and blow-out bookkeeping.

use serde_json::json;
use vial_engine::CommandStatus;
use vial_hal::drivers::simulation::{FaultSite, InjectedFault};

use super::{defined_type, failure_kind, harness};

#[tokio::test]
async fn aspirate_then_dispense_moves_liquid_between_wells() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.load_liquid("plate", json!({"A1": 100.0, "A2": 0.0})).await;

    let aspirate = h
        .run_ok(
            "aspirate",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
                   "volume": 20.0, "flowRate": 10.0}),
        )
        .await;
    assert!(aspirate.result.is_some());
    assert_eq!(h.loaded_volume("plate", "A1"), Some(80.0));
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(20.0));
    assert_eq!(
        h.engine.state().pipettes.current_well("p1"),
        Some(("plate", "A1"))
    );

    h.run_ok(
        "dispense",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A2",
               "volume": 15.0, "flowRate": 10.0}),
    )
    .await;
    assert_eq!(h.loaded_volume("plate", "A2"), Some(15.0));
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(5.0));
    assert_eq!(
        h.engine.state().pipettes.current_well("p1"),
        Some(("plate", "A2"))
    );
}

#[tokio::test]
async fn aspirate_prepares_an_unready_plunger_first() {
    let mut h = harness();
    h.pipette_with_tip().await;
    assert!(!h.driver.pipette("p1").unwrap().ready_to_aspirate);

    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "B3",
               "volume": 10.0, "flowRate": 10.0}),
    )
    .await;
    assert!(h.driver.pipette("p1").unwrap().ready_to_aspirate);
    assert_eq!(h.engine.state().pipettes.aspirated_liquid("p1"), Some(10.0));
}

#[tokio::test]
async fn in_place_aspirate_requires_a_ready_plunger() {
    let mut h = harness();
    h.pipette_with_tip().await;

    let command = h
        .run(
            "aspirateInPlace",
            json!({"pipetteId": "p1", "volume": 5.0, "flowRate": 5.0}),
        )
        .await;
    assert_eq!(failure_kind(&command), "PipetteNotReadyToAspirateError");

    h.run_ok("prepareToAspirate", json!({"pipetteId": "p1"})).await;
    h.run_ok(
        "aspirateInPlace",
        json!({"pipetteId": "p1", "volume": 5.0, "flowRate": 5.0}),
    )
    .await;
    h.run_ok(
        "airGapInPlace",
        json!({"pipetteId": "p1", "volume": 2.0, "flowRate": 5.0}),
    )
    .await;
    let pipettes = &h.engine.state().pipettes;
    assert_eq!(pipettes.aspirated_volume("p1"), Some(7.0));
    assert_eq!(pipettes.aspirated_liquid("p1"), Some(5.0));
}

#[tokio::test]
async fn aspirate_without_tip_is_rejected() {
    let mut h = harness();
    h.run_ok(
        "loadPipette",
        json!({"pipetteId": "p1", "pipetteName": "flex_1channel_50",
               "mount": "left", "channels": 1, "maxVolume": 50.0}),
    )
    .await;

    let command = h
        .run(
            "aspirate",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
                   "volume": 5.0, "flowRate": 5.0}),
        )
        .await;
    assert_eq!(failure_kind(&command), "TipNotAttachedError");
}

#[tokio::test]
async fn aspirate_from_tip_rack_is_rejected() {
    let mut h = harness();
    h.pipette_with_tip().await;

    let command = h
        .run(
            "aspirate",
            json!({"pipetteId": "p1", "labwareId": "tips", "wellName": "B1",
                   "volume": 5.0, "flowRate": 5.0}),
        )
        .await;
    assert_eq!(failure_kind(&command), "LabwareIsTipRackError");
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(0.0));
}

#[tokio::test]
async fn partial_aspirate_leaves_a_note() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.load_liquid("plate", json!({"C1": 200.0})).await;

    let command = h
        .run_ok(
            "aspirate",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "C1",
                   "volume": 60.0, "flowRate": 10.0}),
        )
        .await;
    assert_eq!(command.notes.len(), 1);
    assert_eq!(command.notes[0].note_kind, "information");
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(50.0));
    assert_eq!(h.loaded_volume("plate", "C1"), Some(150.0));
}

#[tokio::test]
async fn overpressure_makes_tip_contents_and_wells_unknown() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.load_liquid("plate", json!({"A1": 100.0})).await;
    h.driver
        .inject_fault(FaultSite::Aspirate, InjectedFault::Overpressure);

    let command = h
        .run(
            "aspirate",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
                   "volume": 20.0, "flowRate": 10.0}),
        )
        .await;
    assert_eq!(defined_type(&command), "overpressure");
    let error = command.error.as_ref().unwrap();
    assert!(error.is_defined);
    assert_eq!(error.error_code, "3006");

    let state = h.engine.state();
    assert!(state.pipettes.fluid_unknown("p1"));
    assert_eq!(state.pipettes.aspirated_volume("p1"), None);
    assert_eq!(h.loaded_volume("plate", "A1"), None);
    assert_eq!(
        state.pipettes.current_well("p1"),
        Some(("plate", "A1"))
    );

    let pending = h.engine.pending_recovery().unwrap();
    assert_eq!(pending.command_id, command.id);
    assert_eq!(pending.error.minimum_recovery().command_type(), "home");
}

#[tokio::test]
async fn dispense_overpressure_keeps_motion_gated_until_home() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "volume": 20.0, "flowRate": 10.0}),
    )
    .await;
    h.driver
        .inject_fault(FaultSite::Dispense, InjectedFault::Overpressure);

    let command = h
        .run(
            "dispenseInPlace",
            json!({"pipetteId": "p1", "volume": 10.0, "flowRate": 10.0}),
        )
        .await;
    assert_eq!(defined_type(&command), "overpressure");

    let gated = h
        .run(
            "blowout",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1"}),
        )
        .await;
    assert_eq!(failure_kind(&gated), "RecoveryRequiredError");

    h.run_ok("home", json!({})).await;
    assert!(h.engine.pending_recovery().is_none());
    assert_eq!(h.driver.home_count(), 1);
}

#[tokio::test]
async fn dispense_approach_ignores_operation_volume_offset() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "volume": 20.0, "flowRate": 10.0}),
    )
    .await;
    h.run_ok(
        "moveToWell",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A2"}),
    )
    .await;
    let well_top = h.driver.pipette("p1").unwrap().position;

    h.run_ok(
        "dispense",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A2",
               "wellLocation": {"origin": "top", "volumeOffset": "operationVolume"},
               "volume": 10.0, "flowRate": 10.0}),
    )
    .await;
    assert_eq!(h.driver.pipette("p1").unwrap().position, well_top);
}

#[tokio::test]
async fn air_gap_overpressure_makes_tip_contents_unknown() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.load_liquid("plate", json!({"A1": 100.0})).await;
    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "volume": 20.0, "flowRate": 10.0}),
    )
    .await;
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(20.0));
    h.driver
        .inject_fault(FaultSite::Aspirate, InjectedFault::Overpressure);

    let command = h
        .run(
            "airGapInPlace",
            json!({"pipetteId": "p1", "volume": 5.0, "flowRate": 10.0}),
        )
        .await;
    assert_eq!(defined_type(&command), "overpressure");
    assert!(h.engine.state().pipettes.fluid_unknown("p1"));
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), None);
}

#[tokio::test]
async fn blow_out_in_place_overpressure_makes_tip_contents_unknown() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "volume": 20.0, "flowRate": 10.0}),
    )
    .await;
    h.driver
        .inject_fault(FaultSite::BlowOut, InjectedFault::Overpressure);

    let command = h
        .run("blowOutInPlace", json!({"pipetteId": "p1", "flowRate": 5.0}))
        .await;
    assert_eq!(defined_type(&command), "overpressure");
    assert!(h.engine.state().pipettes.fluid_unknown("p1"));
}

#[tokio::test]
async fn prepare_to_aspirate_overpressure_needs_home() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.driver
        .inject_fault(FaultSite::PrepareForAspirate, InjectedFault::Overpressure);

    let command = h
        .run("prepareToAspirate", json!({"pipetteId": "p1"}))
        .await;
    assert_eq!(defined_type(&command), "overpressure");
    assert!(h.engine.state().pipettes.fluid_unknown("p1"));
    let pending = h.engine.pending_recovery().unwrap();
    assert_eq!(pending.error.minimum_recovery().command_type(), "home");
}

#[tokio::test]
async fn blow_out_empties_the_tip_and_unreadies_the_plunger() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "volume": 20.0, "flowRate": 10.0}),
    )
    .await;

    let command = h
        .run_ok(
            "blowout",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A2"}),
        )
        .await;
    assert_eq!(command.status, CommandStatus::Succeeded);
    assert_eq!(h.engine.state().pipettes.aspirated_volume("p1"), Some(0.0));
    assert!(!h.driver.pipette("p1").unwrap().ready_to_aspirate);
}

#[tokio::test]
async fn eight_channels_pool_into_one_reservoir_well() {
    let mut h = harness();
    h.run_ok(
        "loadPipette",
        json!({"pipetteId": "p8", "pipetteName": "flex_8channel_50",
               "mount": "right", "channels": 8, "maxVolume": 50.0}),
    )
    .await;
    h.run_ok(
        "pickUpTip",
        json!({"pipetteId": "p8", "labwareId": "tips", "wellName": "A1"}),
    )
    .await;
    h.load_liquid("res12", json!({"A3": 1000.0, "A4": 1000.0})).await;

    h.run_ok(
        "aspirate",
        json!({"pipetteId": "p8", "labwareId": "res12", "wellName": "A3",
               "volume": 10.0, "flowRate": 10.0}),
    )
    .await;
    assert_eq!(h.loaded_volume("res12", "A3"), Some(920.0));
    assert_eq!(h.loaded_volume("res12", "A4"), Some(1000.0));
}
