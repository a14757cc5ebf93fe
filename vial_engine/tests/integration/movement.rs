//! Integration test: gantry moves and touch tip.

use serde_json::json;
use vial_common::types::DeckPoint;
use vial_engine::state::pipettes::LocationTarget;

use super::{failure_kind, harness, PLATE_ORIGIN};

#[tokio::test]
async fn move_to_well_records_well_and_deck_point() {
    let mut h = harness();
    h.pipette_with_tip().await;

    h.run_ok(
        "moveToWell",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1",
               "wellLocation": {"origin": "top", "offset": {"z": 5.0}}}),
    )
    .await;

    let pipettes = &h.engine.state().pipettes;
    assert_eq!(pipettes.current_well("p1"), Some(("plate", "A1")));
    let point = pipettes.deck_point("p1").unwrap();
    assert_eq!(point.x, PLATE_ORIGIN.x);
    assert_eq!(point.y, PLATE_ORIGIN.y);
    assert!((point.z - (PLATE_ORIGIN.z + 5.0)).abs() < 1e-9);
    assert_eq!(h.driver.pipette("p1").unwrap().position, point);
}

#[tokio::test]
async fn move_to_coordinates_forgets_the_logical_location() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "moveToWell",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "A1"}),
    )
    .await;

    h.run_ok(
        "moveToCoordinates",
        json!({"pipetteId": "p1", "coordinates": {"x": 50.0, "y": 60.0, "z": 70.0}}),
    )
    .await;
    let pipettes = &h.engine.state().pipettes;
    assert!(pipettes.current_location().is_none());
    assert_eq!(pipettes.deck_point("p1"), Some(DeckPoint::new(50.0, 60.0, 70.0)));
}

#[tokio::test]
async fn relative_moves_keep_the_logical_location() {
    let mut h = harness();
    h.pipette_with_tip().await;
    h.run_ok(
        "moveToWell",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "B2"}),
    )
    .await;
    let before = h.engine.state().pipettes.deck_point("p1").unwrap();

    h.run_ok(
        "moveRelative",
        json!({"pipetteId": "p1", "axis": "z", "distance": 10.0}),
    )
    .await;
    let pipettes = &h.engine.state().pipettes;
    assert_eq!(pipettes.current_well("p1"), Some(("plate", "B2")));
    assert!((pipettes.deck_point("p1").unwrap().z - (before.z + 10.0)).abs() < 1e-9);
}

#[tokio::test]
async fn addressable_area_moves() {
    let mut h = harness();
    h.pipette_with_tip().await;

    h.run_ok(
        "moveToAddressableArea",
        json!({"pipetteId": "p1", "addressableAreaName": "movableTrashA3"}),
    )
    .await;
    let location = h.engine.state().pipettes.current_location().unwrap();
    assert_eq!(
        location.target,
        LocationTarget::AddressableArea {
            addressable_area_name: "movableTrashA3".to_string()
        }
    );

    let missing = h
        .run(
            "moveToAddressableArea",
            json!({"pipetteId": "p1", "addressableAreaName": "D4"}),
        )
        .await;
    assert_eq!(failure_kind(&missing), "AddressableAreaDoesNotExistError");

    let staging = h
        .run(
            "moveToAddressableArea",
            json!({"pipetteId": "p1", "addressableAreaName": "A4"}),
        )
        .await;
    assert_eq!(failure_kind(&staging), "LocationIsStagingSlotError");
}

#[tokio::test]
async fn touch_tip_ends_in_the_well() {
    let mut h = harness();
    h.pipette_with_tip().await;

    h.run_ok(
        "touchTip",
        json!({"pipetteId": "p1", "labwareId": "plate", "wellName": "C4"}),
    )
    .await;
    assert_eq!(
        h.engine.state().pipettes.current_well("p1"),
        Some(("plate", "C4"))
    );
}

#[tokio::test]
async fn touch_tip_is_refused_where_disabled() {
    let mut h = harness();
    h.pipette_with_tip().await;

    let reservoir = h
        .run(
            "touchTip",
            json!({"pipetteId": "p1", "labwareId": "res1", "wellName": "A1"}),
        )
        .await;
    assert_eq!(failure_kind(&reservoir), "TouchTipDisabledError");

    let tips = h
        .run(
            "touchTip",
            json!({"pipetteId": "p1", "labwareId": "tips", "wellName": "A2"}),
        )
        .await;
    assert_eq!(failure_kind(&tips), "LabwareIsTipRackError");
}
