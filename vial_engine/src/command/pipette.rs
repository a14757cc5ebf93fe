//! Pipette and tip commands: `loadPipette`, `configureNozzleLayout`,
//! `pickUpTip` and `dropTipInPlace`.

use serde::{Deserialize, Serialize};
use vial_common::hal::driver::{PipetteSpec, TipPresence};
use vial_common::nozzle::{NozzleLayout, NozzleMap, PhysicalNozzleGrid};
use vial_common::types::{DeckPoint, WellLocation};

use super::context::CommandContext;
use super::movement_common::{self, MoveOptions};
use super::outcome::{DefinedErrorData, Execution};
use crate::error::{DefinedError, EngineError};
use crate::resources;
use crate::state::pipettes::AttachedTip;
use crate::state::update::StateUpdate;

/// Params of `loadPipette`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteParams {
    /// Id to use; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipette_id: Option<String>,
    /// Physical description.
    #[serde(flatten)]
    pub spec: PipetteSpec,
}

/// Public result of `loadPipette`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPipetteResult {
    /// Assigned id.
    pub pipette_id: String,
}

/// Params of `configureNozzleLayout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureNozzleLayoutParams {
    /// Pipette.
    pub pipette_id: String,
    /// Requested layout.
    pub configuration_params: NozzleLayout,
}

/// Params of `pickUpTip`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipParams {
    /// Pipette.
    pub pipette_id: String,
    /// Tip rack.
    pub labware_id: String,
    /// Tip position.
    pub well_name: String,
    /// Where in the tip well.
    #[serde(default)]
    pub well_location: WellLocation,
}

/// Public result of `pickUpTip`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickUpTipResult {
    /// Length of the new tip.
    pub tip_length: f64,
    /// Critical point at pick-up.
    pub position: DeckPoint,
}

fn default_home_after() -> bool {
    true
}

/// Params of `dropTipInPlace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropTipInPlaceParams {
    /// Pipette.
    pub pipette_id: String,
    /// Home the plunger after ejecting.
    #[serde(default = "default_home_after")]
    pub home_after: bool,
}

/// Register a pipette with every nozzle active.
pub async fn load_pipette(
    ctx: &mut CommandContext<'_>,
    params: &LoadPipetteParams,
) -> Result<Execution<LoadPipetteResult>, EngineError> {
    let grid = PhysicalNozzleGrid::for_channels(params.spec.channels)?;
    let nozzle_map = NozzleMap::full(&grid)?;
    let pipette_id = params
        .pipette_id
        .clone()
        .unwrap_or_else(resources::generate_id);

    ctx.hardware.load_pipette(&pipette_id, &params.spec).await?;

    let update = StateUpdate::new()
        .set_load_pipette(&pipette_id, params.spec.clone())
        .update_pipette_nozzle(&pipette_id, nozzle_map);
    Ok(Execution::success(LoadPipetteResult { pipette_id }, update))
}

/// Replace the active nozzles of a pipette.
pub async fn configure_nozzle_layout(
    ctx: &mut CommandContext<'_>,
    params: &ConfigureNozzleLayoutParams,
) -> Result<Execution<()>, EngineError> {
    let pipette = ctx.pipette(&params.pipette_id)?;
    let grid = PhysicalNozzleGrid::for_channels(pipette.spec.channels)?;
    let nozzle_map = NozzleMap::from_layout(&grid, &params.configuration_params)?;
    Ok(Execution::success(
        (),
        StateUpdate::new().update_pipette_nozzle(&params.pipette_id, nozzle_map),
    ))
}

/// Move to a tip rack well and pick up its tip.
pub async fn pick_up_tip(
    ctx: &mut CommandContext<'_>,
    params: &PickUpTipParams,
) -> Result<Execution<PickUpTipResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;
    let info = ctx.labware_info(&params.labware_id)?;
    let tip_length = match (info.is_tiprack, info.tip_length) {
        (true, Some(length)) => length,
        _ => return Err(EngineError::LabwareIsNotTipRack(params.labware_id.clone())),
    };

    let moved = match movement_common::move_to_well(
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

    ctx.hardware.pick_up_tip(pipette_id, tip_length).await?;

    let update = moved
        .state_update
        .update_pipette_tip_state(pipette_id, Some(AttachedTip { length: tip_length }))
        .set_fluid_empty(pipette_id);
    Ok(Execution::success(
        PickUpTipResult {
            tip_length,
            position: moved.public.position,
        },
        update,
    ))
}

/// Eject the tip, then check the tip sensor.
///
/// A tip still present is a defined error that keeps the tip in state;
/// should the sensor be wrong, the false-positive update removes it.
pub async fn drop_tip_in_place(
    ctx: &mut CommandContext<'_>,
    params: &DropTipInPlaceParams,
) -> Result<Execution<()>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    ctx.pipette(pipette_id)?;

    ctx.hardware
        .drop_tip_in_place(pipette_id, params.home_after)
        .await?;
    let removed = StateUpdate::new()
        .update_pipette_tip_state(pipette_id, None)
        .set_fluid_empty(pipette_id);

    match ctx.hardware.tip_presence(pipette_id).await? {
        TipPresence::Absent => Ok(Execution::success((), removed)),
        TipPresence::Present => Ok(Execution::DefinedError(
            DefinedErrorData::new(
                DefinedError::tip_physically_attached(pipette_id),
                StateUpdate::new().set_fluid_unknown(pipette_id),
            )
            .with_false_positive(removed),
        )),
    }
}
