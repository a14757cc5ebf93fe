//! `dispense` and `dispenseInPlace`.

use serde::{Deserialize, Serialize};
use vial_common::types::WellLocation;

use super::context::CommandContext;
use super::movement_common::{self, MoveOptions};
use super::outcome::Execution;
use super::pipetting_common::{
    self, LiquidHandlingResult, PipettingAtWellResult, WellTarget, clear_wells,
};
use crate::error::EngineError;

/// Params of `dispense`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseParams {
    /// Pipette.
    pub pipette_id: String,
    /// Destination labware.
    pub labware_id: String,
    /// Destination well.
    pub well_name: String,
    /// Where in the well.
    #[serde(default)]
    pub well_location: WellLocation,
    /// µL to push out.
    pub volume: f64,
    /// µL/s.
    pub flow_rate: f64,
    /// Extra plunger travel past the bottom, in µL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_out: Option<f64>,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `dispenseInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// µL to push out.
    pub volume: f64,
    /// µL/s.
    pub flow_rate: f64,
    /// Extra plunger travel past the bottom, in µL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_out: Option<f64>,
}

/// Move to a well and dispense into it.
///
/// Only the liquid part of the ejected volume is credited to the wells.
pub async fn dispense(
    ctx: &mut CommandContext<'_>,
    params: &DispenseParams,
) -> Result<Execution<PipettingAtWellResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.require_tip(pipette_id)?;
    let target = WellTarget::covered(ctx, pipette_id, &params.labware_id, &params.well_name)?;

    let moved = match movement_common::move_to_well(
        ctx,
        pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        None,
        params.movement,
    )
    .await?
    {
        Execution::Success(moved) => moved,
        Execution::DefinedError(err) => return Ok(Execution::DefinedError(err)),
    };
    let position = moved.public.position;

    Ok(
        match pipetting_common::dispense_in_place(
            ctx,
            pipette_id,
            params.volume,
            params.flow_rate,
            params.push_out,
            position,
        )
        .await?
        {
            Execution::Success(ejected) => {
                let volume = ejected.public.volume;
                let delta = target.dispensed(ctx, pipette_id, volume);
                Execution::success(
                    PipettingAtWellResult { volume, position },
                    target.operated(moved.state_update.reduce(ejected.state_update), delta),
                )
            }
            Execution::DefinedError(err) => Execution::DefinedError(clear_wells(
                err.after(&moved.state_update),
                Some(&target),
            )),
        },
    )
}

/// Dispense where the pipette already is.
pub async fn dispense_in_place(
    ctx: &mut CommandContext<'_>,
    params: &DispenseInPlaceParams,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.require_tip(pipette_id)?;
    let target = WellTarget::current(ctx, pipette_id)?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;

    Ok(
        match pipetting_common::dispense_in_place(
            ctx,
            pipette_id,
            params.volume,
            params.flow_rate,
            params.push_out,
            position,
        )
        .await?
        {
            Execution::Success(ejected) => {
                let update = match &target {
                    Some(target) => {
                        let delta = target.dispensed(ctx, pipette_id, ejected.public.volume);
                        target.operated(ejected.state_update, delta)
                    }
                    None => ejected.state_update,
                };
                Execution::success(ejected.public, update)
            }
            Execution::DefinedError(err) => {
                Execution::DefinedError(clear_wells(err, target.as_ref()))
            }
        },
    )
}
