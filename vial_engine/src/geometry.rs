//! Deck geometry derived from labware data and engine state.
//!
//! Resolves well locations to deck points, finds the wells a pipette's
//! active nozzles cover, and builds arc and touch-tip paths.

use vial_common::hal::labware::{LabwareProvider, WellGeometry};
use vial_common::nozzle::NozzleMap;
use vial_common::types::{DeckPoint, Offset, VolumeOffset, WellLocation, WellOrigin};

use crate::error::EngineError;
use crate::state::EngineState;
use crate::well_math;

/// Clearance added above the higher endpoint of an arc move, in mm.
pub const ARC_CLEARANCE: f64 = 10.0;

/// Deck point of a location inside a well.
///
/// `operation_volume` is the signed volume of the operation being
/// performed, used when the location asks for an `operationVolume` offset.
pub fn well_position(
    labware: &dyn LabwareProvider,
    state: &EngineState,
    labware_id: &str,
    well_name: &str,
    location: &WellLocation,
    operation_volume: Option<f64>,
) -> Result<DeckPoint, EngineError> {
    let well = labware.well(labware_id, well_name)?;
    let origin = match location.origin {
        WellOrigin::Top => well.top,
        WellOrigin::Bottom => well.bottom(),
        WellOrigin::Center => well.center(),
        WellOrigin::Meniscus => {
            let height = state
                .wells
                .get_last_measured_height(labware_id, well_name)
                .ok_or_else(|| EngineError::LiquidHeightUnknown {
                    labware_id: labware_id.to_string(),
                    well_name: well_name.to_string(),
                })?;
            well.bottom().offset_by(Offset::new(0.0, 0.0, height))
        }
    };

    let volume_shift = match location.volume_offset {
        None => 0.0,
        Some(VolumeOffset::Volume(v)) => volume_to_height(&well, v),
        Some(VolumeOffset::Operation(_)) => volume_to_height(&well, operation_volume.unwrap_or(0.0)),
    };

    Ok(origin
        .offset_by(location.offset)
        .offset_by(Offset::new(0.0, 0.0, volume_shift)))
}

/// Height change for a volume change in a well of constant cross-section.
pub fn volume_to_height(well: &WellGeometry, volume: f64) -> f64 {
    let area = well.cross_section_area();
    if area > 0.0 { volume / area } else { 0.0 }
}

/// Liquid volume for a height above the well bottom.
pub fn height_to_volume(well: &WellGeometry, height: f64) -> f64 {
    height.max(0.0) * well.cross_section_area()
}

fn nozzle_map<'a>(state: &'a EngineState, pipette_id: &str) -> Result<&'a NozzleMap, EngineError> {
    state
        .pipettes
        .nozzle_map(pipette_id)
        .ok_or_else(|| EngineError::PipetteNotLoaded(pipette_id.to_string()))
}

/// Wells touched by the pipette's active nozzles when addressing `well_name`.
pub fn wells_covered_by_pipette(
    labware: &dyn LabwareProvider,
    state: &EngineState,
    labware_id: &str,
    well_name: &str,
    pipette_id: &str,
) -> Result<Vec<String>, EngineError> {
    let info = labware.labware(labware_id)?;
    let map = nozzle_map(state, pipette_id)?;
    Ok(well_math::wells_covered(map, well_name, &info.wells_by_column)?)
}

/// Active nozzles entering each covered well.
pub fn nozzles_per_well(
    labware: &dyn LabwareProvider,
    state: &EngineState,
    labware_id: &str,
    well_name: &str,
    pipette_id: &str,
) -> Result<usize, EngineError> {
    let info = labware.labware(labware_id)?;
    let map = nozzle_map(state, pipette_id)?;
    Ok(well_math::nozzles_per_well(map, well_name, &info.wells_by_column)?)
}

/// Waypoints from `from` to `to`.
///
/// A direct move is one segment. Otherwise the pipette rises to a safe
/// height, travels, then descends; `minimum_z_height` can raise the arc.
pub fn arc_waypoints(
    from: DeckPoint,
    to: DeckPoint,
    direct: bool,
    minimum_z_height: Option<f64>,
) -> Vec<DeckPoint> {
    if direct {
        return vec![to];
    }
    let arc_z = (from.z.max(to.z) + ARC_CLEARANCE).max(minimum_z_height.unwrap_or(f64::MIN));
    vec![
        DeckPoint::new(from.x, from.y, arc_z),
        DeckPoint::new(to.x, to.y, arc_z),
        to,
    ]
}

/// Edge points of a touch tip around `center`, ending back at the center.
///
/// `radius` is the fraction of the well's half extent to travel;
/// `mm_from_edge` pulls each point back toward the center.
pub fn touch_tip_waypoints(
    well: &WellGeometry,
    center: DeckPoint,
    radius: f64,
    mm_from_edge: f64,
) -> Vec<DeckPoint> {
    let (half_x, half_y) = well.half_extents();
    let dx = (half_x * radius - mm_from_edge).max(0.0);
    let dy = (half_y * radius - mm_from_edge).max(0.0);
    vec![
        DeckPoint::new(center.x + dx, center.y, center.z),
        DeckPoint::new(center.x - dx, center.y, center.z),
        DeckPoint::new(center.x, center.y + dy, center.z),
        DeckPoint::new(center.x, center.y - dy, center.z),
        center,
    ]
}

/// Deck point of a named area, rejecting staging slots.
pub fn addressable_area_position(
    labware: &dyn LabwareProvider,
    name: &str,
    offset: Offset,
) -> Result<DeckPoint, EngineError> {
    let area = labware
        .addressable_area(name)
        .map_err(|_| EngineError::AddressableAreaNotInDeckConfiguration(name.to_string()))?;
    if area.staging_slot {
        return Err(EngineError::StagingSlotNotAccessible(name.to_string()));
    }
    Ok(area.center.offset_by(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::update::{StateUpdate, ValueOrClear};
    use vial_common::hal::labware::WellShape;
    use vial_common::types::OperationVolume;
    use vial_hal::{DeckConfig, LabwareConfig, SimulatedDeck};

    fn deck() -> SimulatedDeck {
        SimulatedDeck::from_config(DeckConfig {
            labware: vec![LabwareConfig::plate_96("plate", DeckPoint::new(10.0, 80.0, 50.0))],
            addressable_areas: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn origins_resolve_against_well_geometry() {
        let deck = deck();
        let state = EngineState::new();
        let well = deck.well("plate", "A1").unwrap();

        let top = well_position(&deck, &state, "plate", "A1", &WellLocation::default(), None).unwrap();
        assert_eq!(top, well.top);

        let bottom = WellLocation::at(WellOrigin::Bottom).with_offset(Offset::new(0.0, 0.0, 1.0));
        let p = well_position(&deck, &state, "plate", "A1", &bottom, None).unwrap();
        assert!((p.z - (well.top.z - well.depth + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn meniscus_needs_probe() {
        let deck = deck();
        let mut state = EngineState::new();
        let meniscus = WellLocation::at(WellOrigin::Meniscus)
            .with_volume_offset(VolumeOffset::Operation(OperationVolume::OperationVolume));
        let err = well_position(&deck, &state, "plate", "A1", &meniscus, Some(-10.0)).unwrap_err();
        assert!(matches!(err, EngineError::LiquidHeightUnknown { .. }));

        state.apply(&StateUpdate::new().set_liquid_probed(
            "plate",
            "A1",
            ValueOrClear::Value(5.0),
            ValueOrClear::Value(100.0),
            chrono::Utc::now(),
        ));
        let well = deck.well("plate", "A1").unwrap();
        let p = well_position(&deck, &state, "plate", "A1", &meniscus, Some(-10.0)).unwrap();
        let expected = well.bottom().z + 5.0 - 10.0 / well.cross_section_area();
        assert!((p.z - expected).abs() < 1e-9);
    }

    #[test]
    fn arc_rises_above_both_ends() {
        let from = DeckPoint::new(0.0, 0.0, 20.0);
        let to = DeckPoint::new(50.0, 10.0, 5.0);
        let path = arc_waypoints(from, to, false, None);
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].z, 30.0);
        assert_eq!(path[2], to);
        assert_eq!(arc_waypoints(from, to, false, Some(90.0))[1].z, 90.0);
        assert_eq!(arc_waypoints(from, to, true, Some(90.0)), vec![to]);
    }

    #[test]
    fn touch_tip_stays_inside_edge() {
        let well = WellGeometry {
            top: DeckPoint::default(),
            depth: 10.0,
            shape: WellShape::Circular { diameter: 6.0 },
        };
        let center = DeckPoint::new(0.0, 0.0, -1.0);
        let points = touch_tip_waypoints(&well, center, 1.0, 0.5);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].x, 2.5);
        assert_eq!(points[3].y, -2.5);
        assert_eq!(points[4], center);
    }

    #[test]
    fn volume_height_conversion() {
        let well = WellGeometry {
            top: DeckPoint::default(),
            depth: 10.0,
            shape: WellShape::Rectangular {
                x_dimension: 2.0,
                y_dimension: 5.0,
            },
        };
        assert_eq!(volume_to_height(&well, 20.0), 2.0);
        assert_eq!(height_to_volume(&well, 3.0), 30.0);
    }
}
