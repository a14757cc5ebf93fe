//! Liquid class definition loading against on-disk fixtures.

use serde_json::Value;
use std::path::{Path, PathBuf};
use vial_common::liquid_class::{
    BlowoutLocation, LiquidClassSchemaV1, PositionReference, load_definition,
};
use vial_common::types::Offset;

// ── Helpers ─────────────────────────────────────────────────────────

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/liquid-class")
}

fn water_text() -> String {
    std::fs::read_to_string(fixtures_dir().join("1/water.json")).unwrap()
}

/// JSON numbers compare by value: `2` and `2.0` are the same document.
fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        other => other,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn water_round_trips_to_the_same_document() {
    let text = water_text();
    let parsed = LiquidClassSchemaV1::from_json(&text).unwrap();
    let written = serde_json::to_value(&parsed).unwrap();
    let original: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(normalize(written), normalize(original));
}

#[test]
fn unset_optional_groups_stay_unset() {
    let parsed = LiquidClassSchemaV1::from_json(&water_text()).unwrap();
    let filter_tips = &parsed.by_pipette[0].by_tip_type[1];
    assert!(filter_tips.multi_dispense.is_none());
    assert!(filter_tips.aspirate.mix.params.is_none());

    let written = serde_json::to_value(filter_tips).unwrap();
    assert!(written.get("multiDispense").is_none());
    assert!(written["aspirate"]["mix"].get("params").is_none());
}

#[test]
fn load_definition_by_name_and_version() {
    let water = load_definition(&fixtures_dir(), "water", 1).unwrap();
    assert_eq!(water.liquid_class_name, "water");
    assert_eq!(water.by_pipette[0].pipette_model, "flex_1channel_50");

    let submerge = &water.by_pipette[0].by_tip_type[0].aspirate.submerge;
    assert_eq!(submerge.position_reference, PositionReference::WellTop);
    assert_eq!(submerge.offset, Offset::new(0.0, 0.0, 2.0));
    assert_eq!(submerge.speed, 100.0);
    assert!(!submerge.delay.enable);
}

#[test]
fn record_for_pipette_and_tiprack() {
    let water = load_definition(&fixtures_dir(), "water", 1).unwrap();
    let record = water
        .record_for("flex_1channel_50", "opentrons_flex_96_tiprack_50ul")
        .unwrap();
    assert_eq!(record.liquid_class_name, "water");
    let blowout = record.single_dispense.retract.blowout.params.as_ref().unwrap();
    assert_eq!(blowout.location, BlowoutLocation::Trash);
    assert_eq!(blowout.flow_rate, 100.0);

    assert!(water.record_for("flex_1channel_50", "unknown_rack").is_none());
    assert!(water.record_for("flex_8channel_50", "opentrons_flex_96_tiprack_50ul").is_none());
}

#[test]
fn curves_from_fixture_interpolate() {
    let water = load_definition(&fixtures_dir(), "water", 1).unwrap();
    let aspirate = &water.by_pipette[0].by_tip_type[0].aspirate;
    assert_eq!(aspirate.flow_rate_by_volume.get_for_volume(15.0).unwrap(), 35.0);
    assert_eq!(aspirate.flow_rate_by_volume.get_for_volume(1.0).unwrap(), 40.0);
    assert_eq!(aspirate.flow_rate_by_volume.get_for_volume(40.0).unwrap(), 30.0);

    let multi = water.by_pipette[0].by_tip_type[0].multi_dispense.as_ref().unwrap();
    assert_eq!(multi.disposal_by_volume.breakpoints(), &[(10.5, 4.0)]);
}

#[test]
fn missing_version_directory() {
    assert!(load_definition(&fixtures_dir(), "water", 2).is_err());
}
