//! `blowout` and `blowOutInPlace`.

use serde::{Deserialize, Serialize};
use vial_common::types::WellLocation;

use super::context::CommandContext;
use super::movement_common::{self, DestinationPosition, MoveOptions};
use super::outcome::Execution;
use super::pipetting_common;
use crate::error::EngineError;

/// Params of `blowout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowOutParams {
    /// Pipette.
    pub pipette_id: String,
    /// Labware to blow out over.
    pub labware_id: String,
    /// Well to blow out over.
    pub well_name: String,
    /// Where in the well.
    #[serde(default)]
    pub well_location: WellLocation,
    /// µL/s; hardware default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
    /// Path options.
    #[serde(flatten)]
    pub movement: MoveOptions,
}

/// Params of `blowOutInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlowOutInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// µL/s; hardware default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_rate: Option<f64>,
}

/// Move to a well and blow out. Leaves the plunger unready.
pub async fn blow_out(
    ctx: &mut CommandContext<'_>,
    params: &BlowOutParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;

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

    Ok(
        match pipetting_common::blow_out_in_place(
            ctx,
            pipette_id,
            params.flow_rate,
            moved.public.position,
        )
        .await?
        {
            Execution::Success(blown) => Execution::success(
                moved.public,
                moved.state_update.reduce(blown.state_update),
            ),
            Execution::DefinedError(err) => {
                Execution::DefinedError(err.after(&moved.state_update))
            }
        },
    )
}

/// Blow out where the pipette already is.
pub async fn blow_out_in_place(
    ctx: &mut CommandContext<'_>,
    params: &BlowOutInPlaceParams,
) -> Result<Execution<()>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;
    let position = pipetting_common::current_position(ctx, pipette_id).await?;
    pipetting_common::blow_out_in_place(ctx, pipette_id, params.flow_rate, position).await
}
