//! Integration test: liquid probing, meniscus moves and reader lids.

use serde_json::json;
use vial_engine::EngineSettings;
use vial_engine::command::CommandResult;
use vial_hal::drivers::simulation::SimulationDriver;

use super::{defined_type, failure_kind, harness, harness_with, PLATE_ORIGIN, PLATE_WELL_DEPTH};

fn probe(well: &str) -> serde_json::Value {
    json!({"pipetteId": "p1", "labwareId": "plate", "wellName": well})
}

fn plate_bottom_z() -> f64 {
    PLATE_ORIGIN.z - PLATE_WELL_DEPTH
}

#[tokio::test]
async fn probe_records_height_for_meniscus_moves() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok("prepareToAspirate", json!({"pipetteId": "p1"})).await;
    h.driver.set_liquid_surface(Some(plate_bottom_z() + 4.0));

    let command = h.run_ok("liquidProbe", probe("A1")).await;
    match command.result {
        Some(CommandResult::LiquidProbe(result)) => {
            assert!((result.z_position - 4.0).abs() < 1e-6);
        }
        other => panic!("unexpected result {other:?}"),
    }
    let height = h
        .engine
        .state()
        .wells
        .get_last_measured_height("plate", "A1")
        .unwrap();
    assert!((height - 4.0).abs() < 1e-6);

    h.run_ok(
        "moveToWell",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "wellLocation": {"origin": "meniscus", "offset": {"z": -1.0}}}),
    )
    .await;
    let z = h.engine.state().pipettes.deck_point("p1").unwrap().z;
    assert!((z - (plate_bottom_z() + 3.0)).abs() < 1e-6);
}

#[tokio::test]
async fn probe_without_liquid_clears_the_last_height() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok("prepareToAspirate", json!({"pipetteId": "p1"})).await;
    h.driver.set_liquid_surface(Some(plate_bottom_z() + 2.0));
    h.run_ok("liquidProbe", probe("B1")).await;

    h.driver.set_liquid_surface(None);
    let command = h.run("liquidProbe", probe("B1")).await;
    assert_eq!(defined_type(&command), "liquidNotFound");
    assert_eq!(
        h.engine
            .state()
            .wells
            .get_last_measured_height("plate", "B1"),
        None
    );
    assert_eq!(
        h.engine
            .pending_recovery()
            .unwrap()
            .error
            .minimum_recovery()
            .command_type(),
        "unsafe/dropTipInPlace"
    );
}

#[tokio::test]
async fn probe_needs_an_empty_tip() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok("prepareToAspirate", json!({"pipetteId": "p1"})).await;
    h.run_ok(
        "aspirateInPlace",
        json!({"pipetteId": "p1", "volume": 5.0, "flowRate": 5.0}),
    )
    .await;

    let command = h.run("liquidProbe", probe("A1")).await;
    assert_eq!(failure_kind(&command), "TipNotEmptyError");
}

#[tokio::test]
async fn meniscus_move_needs_a_probe() {
    let mut h = harness();
    h.pipette_with_tip().await;

    let command = h
        .run(
            "moveToWell",
            json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "H12",
                   "wellLocation": {"origin": "meniscus"}}),
        )
        .await;
    assert_eq!(failure_kind(&command), "LiquidHeightUnknownError");
}

fn reader_lid_on(h: &super::Harness) -> bool {
    h.engine
        .state()
        .modules
        .get_absorbance_reader_substate("reader")
        .unwrap()
        .is_lid_on
}

#[tokio::test]
async fn virtual_reader_lid_never_reaches_hardware() {
    let mut h = harness();
    h.run_ok(
        "loadModule",
        json!({"model": "absorbanceReaderV1", "location": "D3", "moduleId": "reader"}),
    )
    .await;
    assert!(reader_lid_on(&h));

    h.run_ok("absorbanceReader/openLid", json!({"moduleId": "reader"}))
        .await;
    assert!(!reader_lid_on(&h));
    h.run_ok("absorbanceReader/closeLid", json!({"moduleId": "reader"}))
        .await;
    assert!(reader_lid_on(&h));
}

#[tokio::test]
async fn physical_reader_lid_moves_only_when_needed() {
    let mut h = harness_with(
        SimulationDriver::new(),
        EngineSettings {
            use_virtual_modules: false,
        },
    );
    h.run_ok(
        "loadModule",
        json!({"model": "absorbanceReaderV1", "location": "D3", "moduleId": "reader"}),
    )
    .await;

    h.run_ok("absorbanceReader/closeLid", json!({"moduleId": "reader"}))
        .await;

    let detached = h
        .run("absorbanceReader/openLid", json!({"moduleId": "reader"}))
        .await;
    assert_eq!(failure_kind(&detached), "ModuleNotAttachedError");
    assert!(reader_lid_on(&h));

    h.driver.attach_module("reader");
    h.run_ok("absorbanceReader/openLid", json!({"moduleId": "reader"}))
        .await;
    assert!(!reader_lid_on(&h));
}

#[tokio::test]
async fn lid_commands_need_a_reader() {
    let mut h = harness();
    h.run_ok(
        "loadModule",
        json!({"model": "temperatureModuleV2", "location": "C1", "moduleId": "temp"}),
    )
    .await;

    let wrong = h
        .run("absorbanceReader/closeLid", json!({"moduleId": "temp"}))
        .await;
    assert_eq!(failure_kind(&wrong), "WrongModuleTypeError");

    let missing = h
        .run("absorbanceReader/openLid", json!({"moduleId": "nope"}))
        .await;
    assert_eq!(failure_kind(&missing), "ModuleNotLoadedError");
}
