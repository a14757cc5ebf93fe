//! `touchTip`: brush the tip against the walls of a well.

use serde::{Deserialize, Serialize};
use vial_common::hal::labware::QUIRK_TOUCH_TIP_DISABLED;
use vial_common::types::WellLocation;

use super::context::CommandContext;
use super::movement_common::{self, DestinationPosition, MoveOptions};
use super::outcome::Execution;
use crate::error::EngineError;
use crate::geometry;

fn default_radius() -> f64 {
    1.0
}

/// Params of `touchTip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchTipParams {
    /// Pipette.
    pub pipette_id: String,
    /// Labware.
    pub labware_id: String,
    /// Well.
    pub well_name: String,
    /// Height of the touch points.
    #[serde(default)]
    pub well_location: WellLocation,
    /// Fraction of the well's half width to travel.
    #[serde(default = "default_radius")]
    pub radius: f64,
    /// Distance kept from the wall, in mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mm_from_edge: Option<f64>,
    /// Gantry speed for the touch moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Move into the well, touch four edge points and return to the center.
///
/// The final location is the well.
pub async fn touch_tip(
    ctx: &mut CommandContext<'_>,
    params: &TouchTipParams,
) -> Result<Execution<DestinationPosition>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.require_tip(pipette_id)?;
    let info = ctx.labware_info(&params.labware_id)?;
    if info.is_tiprack {
        return Err(EngineError::LabwareIsTipRack(params.labware_id.clone()));
    }
    if info.has_quirk(QUIRK_TOUCH_TIP_DISABLED) {
        return Err(EngineError::TouchTipDisabled(params.labware_id.clone()));
    }
    let well = ctx.labware.well(&params.labware_id, &params.well_name)?;

    let centered = match movement_common::move_to_well(
        ctx,
        pipette_id,
        &params.labware_id,
        &params.well_name,
        &params.well_location,
        None,
        MoveOptions::default(),
    )
    .await?
    {
        Execution::Success(moved) => moved,
        Execution::DefinedError(err) => return Ok(Execution::DefinedError(err)),
    };

    let center = centered.public.position;
    let waypoints = geometry::touch_tip_waypoints(
        &well,
        center,
        params.radius,
        params.mm_from_edge.unwrap_or(0.0),
    );

    Ok(
        match movement_common::move_through(ctx, pipette_id, &waypoints, params.speed).await? {
            Execution::Success(_) => Execution::success(centered.public, centered.state_update),
            Execution::DefinedError(err) => {
                Execution::DefinedError(err.after(&centered.state_update))
            }
        },
    )
}
