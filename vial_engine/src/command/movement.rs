//! `moveToWell`, `moveToCoordinates`, `moveToAddressableArea` and
//! `moveRelative`.

use serde::{Deserialize, Serialize};
use vial_common::types::{DeckPoint, MovementAxis, Offset, WellLocation};

use super::context::CommandContext;
use super::movement_common::{self, DestinationPosition, MoveOptions};
use super::outcome::Execution;
use crate::error::EngineError;

/// Params of `moveToWell`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToWellParams {
    /// Pipette.
    pub pipette_id: String,
    /// Labware.
    pub labware_id: String,
    /// Well.
    pub well_name: String,
    /// Where in the well.
    #[serde(default)]
    pub well_location: WellLocation,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `moveToCoordinates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToCoordinatesParams {
    /// Pipette.
    pub pipette_id: String,
    /// Absolute destination.
    pub coordinates: DeckPoint,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `moveToAddressableArea`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveToAddressableAreaParams {
    /// Pipette.
    pub pipette_id: String,
    /// Area of the deck configuration.
    pub addressable_area_name: String,
    /// Offset from the area's reference point.
    #[serde(default)]
    pub offset: Offset,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `moveRelative`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRelativeParams {
    /// Pipette.
    pub pipette_id: String,
    /// Axis to jog along.
    pub axis: MovementAxis,
    /// Signed distance in mm.
    pub distance: f64,
}

/// Move to a location in a well.
pub async fn move_to_well(
    ctx: &mut CommandContext<'_>,
    params: &MoveToWellParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    movement_common::move_to_well(
        ctx,
        &params.pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        None,
        params.movement,
    )
    .await
}

/// Move to deck coordinates.
pub async fn move_to_coordinates(
    ctx: &mut CommandContext<'_>,
    params: &MoveToCoordinatesParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    movement_common::move_to_coordinates(ctx, &params.pipette_id, params.coordinates, params.movement)
        .await
}

/// Move to a named deck area.
pub async fn move_to_addressable_area(
    ctx: &mut CommandContext<'_>,
    params: &MoveToAddressableAreaParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    movement_common::move_to_addressable_area(
        ctx,
        &params.pipette_id,
        &params.addressable_area_name,
        params.offset,
        params.movement,
    )
    .await
}

/// Jog along one axis.
pub async fn move_relative(
    ctx: &mut CommandContext<'_>,
    params: &MoveRelativeParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    movement_common::move_relative(ctx, &params.pipette_id, params.axis, params.distance).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_move_params() {
        let params: MoveRelativeParams =
            serde_json::from_str(r#"{"pipetteId":"p","axis":"z","distance":-2.5}"#).unwrap();
        assert_eq!(params.axis, MovementAxis::Z);
        assert_eq!(params.distance, -2.5);
    }

    #[test]
    fn addressable_area_offset_defaults_to_zero() {
        let params: MoveToAddressableAreaParams = serde_json::from_str(
            r#"{"pipetteId":"p","addressableAreaName":"movableTrashA3"}"#,
        )
        .unwrap();
        assert_eq!(params.offset, Offset::default());
        assert!(!params.movement.force_direct);
    }
}
