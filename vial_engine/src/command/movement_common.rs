//! Gantry micro-operations.
//!
//! Every move resolves a destination, asks the hardware to travel there
//! and records where the pipette ended up. A `StallOrCollisionDetected`
//! from the hardware becomes a defined error whose update forgets the
//! location of every pipette, since the gantry's absolute position can no
//! longer be trusted.

use serde::{Deserialize, Serialize};
use vial_common::hal::driver::HardwareError;
use vial_common::types::{DeckPoint, MovementAxis, Offset, WellLocation};

use super::context::CommandContext;
use super::outcome::{DefinedErrorData, Execution};
use super::pipetting_common;
use crate::error::{DefinedError, EngineError};
use crate::geometry;
use crate::state::pipettes::LocationTarget;
use crate::state::update::StateUpdate;

/// Path options shared by every absolute move.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MoveOptions {
    /// Travel in a straight line instead of an arc.
    pub force_direct: bool,
    /// Lowest z for the travel segment of an arc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_z_height: Option<f64>,
    /// Gantry speed in mm/s.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Public result of any move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationPosition {
    /// Critical point after the move.
    pub position: DeckPoint,
}

fn stall(err: HardwareError) -> Result<DefinedErrorData, EngineError> {
    match err {
        HardwareError::StallOrCollisionDetected(_) => Ok(DefinedErrorData::new(
            DefinedError::stall_or_collision(&err),
            StateUpdate::new().clear_all_pipette_locations(),
        )),
        other => Err(EngineError::Hardware(other)),
    }
}

async fn travel(
    ctx: &CommandContext<'_>,
    pipette_id: &str,
    to: DeckPoint,
    direct: bool,
    options: MoveOptions,
) -> Result<Result<DeckPoint, DefinedErrorData>, EngineError> {
    let from = pipetting_common::current_position(ctx, pipette_id).await?;
    let waypoints =
        geometry::arc_waypoints(from, to, direct || options.force_direct, options.minimum_z_height);
    match ctx.hardware.move_to(pipette_id, &waypoints, options.speed).await {
        Ok(position) => Ok(Ok(position)),
        Err(err) => stall(err).map(Err),
    }
}

/// Move to a location inside a well.
///
/// `operation_volume` resolves an `operationVolume` volume offset. Volume
/// offsets on a tip rack are rejected before any motion.
pub async fn move_to_well(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    labware_id: &str,
    well_name: &str,
    location: &WellLocation,
    operation_volume: Option<f64>,
    options: MoveOptions,
) -> Result<Execution<DestinationPosition>, EngineError> {
    ctx.pipette(pipette_id)?;
    let info = ctx.labware_info(labware_id)?;
    if info.is_tiprack && location.volume_offset.is_some() {
        return Err(EngineError::TipRackVolumeOffset(labware_id.to_string()));
    }

    let destination = geometry::well_position(
        ctx.labware,
        ctx.state,
        labware_id,
        well_name,
        location,
        operation_volume,
    )?;
    let same_well = ctx.state.pipettes.current_well(pipette_id) == Some((labware_id, well_name));

    Ok(match travel(ctx, pipette_id, destination, same_well, options).await? {
        Ok(position) => Execution::success(
            DestinationPosition { position },
            StateUpdate::new().set_pipette_location(
                pipette_id,
                LocationTarget::Well {
                    labware_id: labware_id.to_string(),
                    well_name: well_name.to_string(),
                },
                position,
            ),
        ),
        Err(defined) => Execution::DefinedError(defined),
    })
}

/// Move to raw deck coordinates.
pub async fn move_to_coordinates(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    coordinates: DeckPoint,
    options: MoveOptions,
) -> Result<Execution<DestinationPosition>, EngineError> {
    ctx.pipette(pipette_id)?;
    Ok(match travel(ctx, pipette_id, coordinates, false, options).await? {
        Ok(position) => Execution::success(
            DestinationPosition { position },
            StateUpdate::new().set_pipette_position(pipette_id, position),
        ),
        Err(defined) => Execution::DefinedError(defined),
    })
}

/// Move to a named area of the deck configuration.
pub async fn move_to_addressable_area(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    addressable_area_name: &str,
    offset: Offset,
    options: MoveOptions,
) -> Result<Execution<DestinationPosition>, EngineError> {
    ctx.pipette(pipette_id)?;
    let destination = geometry::addressable_area_position(ctx.labware, addressable_area_name, offset)?;
    Ok(match travel(ctx, pipette_id, destination, false, options).await? {
        Ok(position) => Execution::success(
            DestinationPosition { position },
            StateUpdate::new().set_pipette_location(
                pipette_id,
                LocationTarget::AddressableArea {
                    addressable_area_name: addressable_area_name.to_string(),
                },
                position,
            ),
        ),
        Err(defined) => Execution::DefinedError(defined),
    })
}

/// Jog along one axis. The logical location is kept.
pub async fn move_relative(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    axis: MovementAxis,
    distance: f64,
) -> Result<Execution<DestinationPosition>, EngineError> {
    ctx.pipette(pipette_id)?;
    let kept = ctx
        .state
        .pipettes
        .current_location()
        .filter(|current| current.pipette_id == pipette_id)
        .map(|current| current.target.clone());

    match ctx.hardware.move_relative(pipette_id, axis, distance).await {
        Ok(position) => {
            let update = match kept {
                Some(target) => StateUpdate::new().set_pipette_location(pipette_id, target, position),
                None => StateUpdate::new().set_pipette_position(pipette_id, position),
            };
            Ok(Execution::success(DestinationPosition { position }, update))
        }
        Err(err) => stall(err).map(Execution::DefinedError),
    }
}

/// Move through explicit waypoints without touching location state.
pub async fn move_through(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    waypoints: &[DeckPoint],
    speed: Option<f64>,
) -> Result<Execution<DestinationPosition>, EngineError> {
    match ctx.hardware.move_to(pipette_id, waypoints, speed).await {
        Ok(position) => Ok(Execution::success(
            DestinationPosition { position },
            StateUpdate::new(),
        )),
        Err(err) => stall(err).map(Execution::DefinedError),
    }
}
