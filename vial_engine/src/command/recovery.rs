//! Recovery commands: `home` and the `unsafe/` family.
//!
//! Apart from `unsafe/placeLabware`, these are the only motion commands
//! accepted while a defined error is awaiting recovery, and each clears the
//! errors it satisfies.

use serde::{Deserialize, Serialize};
use tracing::info;
use vial_common::hal::driver::HardwareError;
use vial_common::types::DeckPoint;

use super::context::CommandContext;
use super::outcome::Execution;
use super::pipetting_common;
use crate::error::EngineError;
use crate::state::labware::LabwareLocation;
use crate::state::update::StateUpdate;

/// Params of `home`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HomeParams {}

/// Params of `unsafe/updatePositionEstimators`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePositionEstimatorsParams {
    /// Pipette whose axes to re-seed; every axis when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipette_id: Option<String>,
}

/// Params of `unsafe/dropTipInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsafeDropTipInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// Home the plunger after ejecting.
    #[serde(default)]
    pub home_after: bool,
}

/// Params of `unsafe/blowOutInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsafeBlowOutInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// µL/s; hardware default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
}

/// Params of `unsafe/placeLabware`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsafePlaceLabwareParams {
    /// Labware held by the gripper.
    pub labware_id: String,
    /// Where to set it down.
    pub location: LabwareLocation,
}

/// Addressable area name of a plate reader's lid dock.
pub fn absorbance_reader_lid_dock(slot: &str) -> String {
    format!("absorbanceReaderV1LidDock{slot}")
}

/// Home every axis. Every pipette's location is forgotten.
pub async fn home(
    ctx: &mut CommandContext<'_>,
    _params: &HomeParams,
) -> Result<Execution<()>, EngineError> {
    ctx.hardware.home().await?;
    Ok(Execution::success(
        (),
        StateUpdate::new().clear_all_pipette_locations(),
    ))
}

/// Re-seed motor position estimates from the encoders.
pub async fn update_position_estimators(
    ctx: &mut CommandContext<'_>,
    params: &UpdatePositionEstimatorsParams,
) -> Result<Execution<()>, EngineError> {
    if let Some(id) = &params.pipette_id {
        ctx.pipette(id)?;
    }
    ctx.hardware
        .update_position_estimators(params.pipette_id.as_deref())
        .await?;
    Ok(Execution::success((), StateUpdate::new()))
}

/// Eject the tip without checking the tip sensor.
pub async fn unsafe_drop_tip_in_place(
    ctx: &mut CommandContext<'_>,
    params: &UnsafeDropTipInPlaceParams,
) -> Result<Execution<()>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;
    ctx.hardware
        .drop_tip_in_place(pipette_id, params.home_after)
        .await?;
    Ok(Execution::success(
        (),
        StateUpdate::new()
            .update_pipette_tip_state(pipette_id, None)
            .set_fluid_empty(pipette_id),
    ))
}

/// Blow out from a plunger position the engine no longer trusts.
pub async fn unsafe_blow_out_in_place(
    ctx: &mut CommandContext<'_>,
    params: &UnsafeBlowOutInPlaceParams,
) -> Result<Execution<()>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;
    ctx.hardware
        .update_position_estimators(Some(pipette_id))
        .await?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;
    pipetting_common::blow_out_in_place(ctx, pipette_id, params.flow_rate, position).await
}

/// Final location and jaw drop point for labware set down at `location`.
///
/// A deck slot holding a plate reader redirects to the reader's lid dock.
/// Staging slots are reachable by the gripper.
fn gripper_drop_target(
    ctx: &CommandContext<'_>,
    location: &LabwareLocation,
) -> Result<(LabwareLocation, DeckPoint), EngineError> {
    let area_center = |name: &str| {
        ctx.labware
            .addressable_area(name)
            .map(|area| area.center)
            .map_err(|_| EngineError::AddressableAreaNotInDeckConfiguration(name.to_string()))
    };
    match location {
        LabwareLocation::DeckSlot { slot_name } => {
            let slot_center = area_center(slot_name)?;
            match ctx.state.modules.get_by_slot(slot_name) {
                Some(module) if module.model.is_absorbance_reader() => {
                    let dock = absorbance_reader_lid_dock(slot_name);
                    let center = area_center(&dock)?;
                    Ok((
                        LabwareLocation::AddressableArea {
                            addressable_area_name: dock,
                        },
                        center,
                    ))
                }
                _ => Ok((location.clone(), slot_center)),
            }
        }
        LabwareLocation::AddressableArea {
            addressable_area_name,
        } => Ok((location.clone(), area_center(addressable_area_name)?)),
        LabwareLocation::Module { module_id } => {
            let module = ctx.state.modules.get(module_id)?;
            Ok((location.clone(), area_center(&module.location)?))
        }
    }
}

/// Set down labware the gripper was holding when a move was interrupted.
///
/// The gantry position is lost after an interruption, so every axis is
/// homed before the gripper moves.
pub async fn unsafe_place_labware(
    ctx: &mut CommandContext<'_>,
    params: &UnsafePlaceLabwareParams,
) -> Result<Execution<()>, EngineError> {
    if !ctx.hardware.has_gripper() {
        return Err(HardwareError::GripperNotAttached.into());
    }
    if !ctx.hardware.is_gripping_labware()? {
        return Err(EngineError::CannotPerformGripperAction(
            "Cannot place labware when gripper is not gripping".to_string(),
        ));
    }
    ctx.labware_info(&params.labware_id)?;
    let (location, drop_point) = gripper_drop_target(ctx, &params.location)?;

    ctx.hardware.home().await?;
    ctx.hardware.place_labware(drop_point).await?;
    info!("Placed labware {} at {:?}", params.labware_id, location);

    Ok(Execution::success(
        (),
        StateUpdate::new()
            .clear_all_pipette_locations()
            .set_labware_location(&params.labware_id, location),
    ))
}
