//! Integration test: liquid declarations and liquid classes.

use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use vial_engine::command::CommandResult;
use vial_engine::{Command, EngineError, EngineSettings, ProtocolEngine};
use vial_hal::drivers::simulation::SimulationDriver;

use super::{deck, failure_kind, harness, Harness};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../vial_common/tests/fixtures/liquid-class")
}

fn harness_with_classes() -> Harness {
    let driver = Arc::new(SimulationDriver::new());
    let engine = ProtocolEngine::new(driver.clone(), Arc::new(deck()), EngineSettings::default())
        .with_liquid_class_dir(fixtures());
    Harness { engine, driver }
}

fn class_id(command: &Command) -> String {
    match &command.result {
        Some(CommandResult::LoadLiquidClass(result)) => result.liquid_class_id.clone(),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn load_liquid_validates_volumes() {
    let mut h = harness();

    let negative = h
        .run(
            "loadLiquid",
            json!({"liquidId": "water", "labwareId": "plate", "volumeByWell": {"A1": -1.0}}),
        )
        .await;
    assert_eq!(failure_kind(&negative), "InvalidLiquidError");

    let empty = h
        .run(
            "loadLiquid",
            json!({"liquidId": "EMPTY", "labwareId": "plate", "volumeByWell": {"A1": 5.0}}),
        )
        .await;
    assert_eq!(failure_kind(&empty), "InvalidLiquidError");

    let unknown_well = h
        .run(
            "loadLiquid",
            json!({"liquidId": "water", "labwareId": "plate", "volumeByWell": {"Z99": 5.0}}),
        )
        .await;
    assert_eq!(failure_kind(&unknown_well), "LabwareError");

    h.load_liquid("plate", json!({"A1": 40.0, "B1": 60.0})).await;
    assert_eq!(h.loaded_volume("plate", "A1"), Some(40.0));
    assert_eq!(h.loaded_volume("plate", "B1"), Some(60.0));
    assert_eq!(h.engine.state().wells.get_all().len(), 2);
}

#[tokio::test]
async fn liquid_classes_are_stored_once() {
    let mut h = harness_with_classes();

    let record = h
        .engine
        .liquid_class_record("water", "flex_1channel_50", "opentrons_flex_96_tiprack_50ul")
        .unwrap();
    assert_eq!(record.liquid_class_name, "water");

    let first = h
        .run_ok("loadLiquidClass", json!({"liquidClassRecord": record}))
        .await;
    let id = class_id(&first);

    let again = h
        .run_ok("loadLiquidClass", json!({"liquidClassRecord": record}))
        .await;
    assert_eq!(class_id(&again), id);
    assert_eq!(h.engine.state().liquid_classes.get_all().len(), 1);

    let mut changed = record.clone();
    changed.tiprack = "opentrons_flex_96_tiprack_200ul".to_string();
    let redefined = h
        .run(
            "loadLiquidClass",
            json!({"liquidClassId": id, "liquidClassRecord": changed}),
        )
        .await;
    assert_eq!(failure_kind(&redefined), "LiquidClassRedefinitionError");
}

#[tokio::test]
async fn liquid_class_lookup_errors() {
    let h = harness();
    let err = h
        .engine
        .liquid_class_record("water", "flex_1channel_50", "opentrons_flex_96_tiprack_50ul")
        .unwrap_err();
    assert!(matches!(err, EngineError::LiquidClass(_)));

    let err = harness_with_classes()
        .engine
        .liquid_class_record("water", "flex_8channel_1000", "opentrons_flex_96_tiprack_50ul")
        .unwrap_err();
    assert!(matches!(err, EngineError::LiquidClassDoesNotExist(_)));
}
