//! `liquidProbe`: find the liquid surface of a well with the tip sensor.

use serde::{Deserialize, Serialize};
use vial_common::consts::VOLUME_TOLERANCE;
use vial_common::hal::driver::HardwareError;
use vial_common::types::{DeckPoint, WellLocation};

use super::context::CommandContext;
use super::movement_common::{self, MoveOptions};
use super::outcome::{DefinedErrorData, Execution};
use super::pipetting_common;
use crate::error::{DefinedError, EngineError};
use crate::geometry;
use crate::resources;
use crate::state::pipettes::LocationTarget;
use crate::state::update::{StateUpdate, ValueOrClear};

/// Params of `liquidProbe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidProbeParams {
    /// Pipette.
    pub pipette_id: String,
    /// Labware.
    pub labware_id: String,
    /// Well.
    pub well_name: String,
    /// Probe start, relative to the well top by default.
    #[serde(default)]
    pub well_location: WellLocation,
}

/// Public result of `liquidProbe`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidProbeResult {
    /// Liquid height above the well bottom, in mm.
    pub z_position: f64,
    /// Critical point where liquid was found.
    pub position: DeckPoint,
}

fn require_empty_tip(ctx: &CommandContext<'_>, pipette_id: &str) -> Result<(), EngineError> {
    match ctx.state.pipettes.aspirated_volume(pipette_id) {
        Some(volume) if volume <= VOLUME_TOLERANCE => Ok(()),
        _ => Err(EngineError::TipNotEmpty(pipette_id.to_string())),
    }
}

/// Probe down from the top of a well.
///
/// Success records the probed height and the volume it implies. A probe
/// that finds nothing forgets any earlier probe of the well.
pub async fn liquid_probe(
    ctx: &mut CommandContext<'_>,
    params: &LiquidProbeParams,
) -> Result<Execution<LiquidProbeResult>, EngineError> {
    let pipette_id = params.pipette_id.as_str();
    let labware_id = params.labware_id.as_str();
    let well_name = params.well_name.as_str();
    ctx.require_tip(pipette_id)?;
    require_empty_tip(ctx, pipette_id)?;
    pipetting_common::require_ready_to_aspirate(ctx, pipette_id)?;
    let well = ctx.labware.well(labware_id, well_name)?;

    let start = match movement_common::move_to_well(
        ctx,
        pipette_id,
        labware_id,
        well_name,
        &params.well_location,
        None,
        MoveOptions::default(),
    )
    .await?
    {
        Execution::Success(moved) => moved,
        Execution::DefinedError(err) => return Ok(Execution::DefinedError(err)),
    };
    let bottom_z = well.bottom().z;
    let max_z_distance = (start.public.position.z - bottom_z).max(0.0);

    match ctx.hardware.liquid_probe(pipette_id, max_z_distance).await {
        Ok(surface_z) => {
            let height = surface_z - bottom_z;
            let volume = geometry::height_to_volume(&well, height);
            let position = DeckPoint {
                z: surface_z,
                ..start.public.position
            };
            let update = start
                .state_update
                .set_pipette_location(
                    pipette_id,
                    LocationTarget::Well {
                        labware_id: labware_id.to_string(),
                        well_name: well_name.to_string(),
                    },
                    position,
                )
                .set_liquid_probed(
                    labware_id,
                    well_name,
                    ValueOrClear::Value(height),
                    ValueOrClear::Value(volume),
                    resources::now(),
                );
            Ok(Execution::success(
                LiquidProbeResult {
                    z_position: height,
                    position,
                },
                update,
            ))
        }
        Err(err @ HardwareError::LiquidNotFound { .. }) => {
            let update = start.state_update.set_liquid_probed(
                labware_id,
                well_name,
                ValueOrClear::Clear,
                ValueOrClear::Clear,
                resources::now(),
            );
            Ok(Execution::DefinedError(DefinedErrorData::new(
                DefinedError::liquid_not_found(&err),
                update,
            )))
        }
        Err(err) => Err(err.into()),
    }
}
