//! `aspirate`, `aspirateInPlace`, `airGapInPlace` and `prepareToAspirate`.

use serde::{Deserialize, Serialize};
use vial_common::types::WellLocation;

use super::context::CommandContext;
use super::movement_common::{self, MoveOptions};
use super::outcome::Execution;
use super::pipetting_common::{
    self, LiquidHandlingResult, PipettingAtWellResult, WellTarget, clear_wells,
};
use crate::error::EngineError;
use crate::state::update::StateUpdate;

/// Params of `aspirate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateParams {
    /// Pipette.
    pub pipette_id: String,
    /// Source labware.
    pub labware_id: String,
    /// Source well.
    pub well_name: String,
    /// Where in the well.
    #[serde(default)]
    pub well_location: WellLocation,
    /// µL to draw.
    pub volume: f64,
    /// µL/s.
    pub flow_rate: f64,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `aspirateInPlace` and `airGapInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspirateInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// µL to draw.
    pub volume: f64,
    /// µL/s.
    pub flow_rate: f64,
}

/// Params of `airGapInPlace`.
pub type AirGapInPlaceParams = AspirateInPlaceParams;

/// Params of `prepareToAspirate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareToAspirateParams {
    /// Pipette.
    pub pipette_id: String,
}

/// Move to a well and draw liquid from it.
///
/// A plunger left unready by a blow-out is first prepared above the well,
/// so no air is pushed into the liquid.
pub async fn aspirate(
    ctx: &mut CommandContext<'_>,
    params: &AspirateParams,
) -> Result<Execution<PipettingAtWellResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    let labware_id = params.labware_id.as_str();
    let well_name = params.well_name.as_str();
    ctx.require_tip(pipette_id)?;
    if ctx.labware_info(labware_id)?.is_tiprack {
        return Err(EngineError::LabwareIsTipRack(labware_id.to_string()));
    }
    let target = WellTarget::covered(ctx, pipette_id, labware_id, well_name)?;

    let mut update = StateUpdate::new();
    if !ctx.hardware.is_ready_to_aspirate(pipette_id)? {
        let top = WellLocation::default();
        let above = match movement_common::move_to_well(
            ctx,
            pipette_id,
            labware_id,
            well_name,
            &top,
            None,
            params.movement,
        )
        .await?
        {
            Execution::Success(moved) => moved,
            Execution::DefinedError(err) => return Ok(Execution::DefinedError(err)),
        };
        update = update.reduce(above.state_update);

        match pipetting_common::prepare_for_aspirate(ctx, pipette_id, above.public.position)
            .await?
        {
            Execution::Success(prepared) => update = update.reduce(prepared.state_update),
            Execution::DefinedError(err) => {
                return Ok(Execution::DefinedError(err.after(&update)));
            }
        }
    }

    let moved = match movement_common::move_to_well(
        ctx,
        pipette_id,
        labware_id,
        well_name,
        &params.well_location,
        Some(-params.volume),
        params.movement,
    )
    .await?
    {
        Execution::Success(moved) => moved,
        Execution::DefinedError(err) => return Ok(Execution::DefinedError(err.after(&update))),
    };
    let position = moved.public.position;
    let update = update.reduce(moved.state_update);

    Ok(
        match pipetting_common::aspirate_in_place(
            ctx,
            pipette_id,
            params.volume,
            params.flow_rate,
            position,
        )
        .await?
        {
            Execution::Success(drawn) => {
                let volume = drawn.public.volume;
                Execution::success(
                    PipettingAtWellResult { volume, position },
                    target.operated(update.reduce(drawn.state_update), target.removed(volume)),
                )
            }
            Execution::DefinedError(err) => {
                Execution::DefinedError(clear_wells(err.after(&update), Some(&target)))
            }
        },
    )
}

/// Draw liquid where the pipette already is.
pub async fn aspirate_in_place(
    ctx: &mut CommandContext<'_>,
    params: &AspirateInPlaceParams,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.require_tip(pipette_id)?;
    pipetting_common::require_ready_to_aspirate(ctx, pipette_id)?;
    let target = WellTarget::current(ctx, pipette_id)?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;

    Ok(
        match pipetting_common::aspirate_in_place(
            ctx,
            pipette_id,
            params.volume,
            params.flow_rate,
            position,
        )
        .await?
        {
            Execution::Success(drawn) => {
                let update = match &target {
                    Some(target) => {
                        target.operated(drawn.state_update, target.removed(drawn.public.volume))
                    }
                    None => drawn.state_update,
                };
                Execution::success(drawn.public, update)
            }
            Execution::DefinedError(err) => {
                Execution::DefinedError(clear_wells(err, target.as_ref()))
            }
        },
    )
}

/// Draw air where the pipette already is. Wells are never touched.
pub async fn air_gap_in_place(
    ctx: &mut CommandContext<'_>,
    params: &AirGapInPlaceParams,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.require_tip(pipette_id)?;
    pipetting_common::require_ready_to_aspirate(ctx, pipette_id)?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;
    pipetting_common::air_gap_in_place(ctx, pipette_id, params.volume, params.flow_rate, position)
        .await
}

/// Bring the plunger to its aspirate-ready position.
pub async fn prepare_to_aspirate(
    ctx: &mut CommandContext<'_>,
    params: &PrepareToAspirateParams,
) -> Result<Execution<()>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;
    pipetting_common::prepare_for_aspirate(ctx, pipette_id, position).await
}
