//! Pipetting micro-operations.
//!
//! Thin wrappers around the plunger calls of the hardware collaborator.
//! Each translates `PipetteOverpressure` into a defined error whose update
//! marks the tip contents unknown, and reports the fluid change on success.
//! Well bookkeeping is left to the calling command, which knows the target.

use serde::{Deserialize, Serialize};
use vial_common::hal::driver::HardwareError;
use vial_common::types::DeckPoint;

use super::context::CommandContext;
use super::outcome::{DefinedErrorData, Execution};
use super::CommandNote;
use crate::error::{DefinedError, EngineError};
use crate::geometry;
use crate::state::fluid_stack::{AspiratedFluid, FluidKind};
use crate::state::update::{StateUpdate, ValueOrClear};

/// Public result of a plunger operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidHandlingResult {
    /// Volume actually moved, in µL.
    pub volume: f64,
}

/// Public result of a plunger operation at a well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipettingAtWellResult {
    /// Volume actually moved, in µL.
    pub volume: f64,
    /// Critical point during the operation.
    pub position: DeckPoint,
}

fn overpressure(
    err: HardwareError,
    pipette_id: &str,
    retry_location: DeckPoint,
) -> Result<DefinedErrorData, EngineError> {
    match err {
        HardwareError::PipetteOverpressure { .. } => Ok(DefinedErrorData::new(
            DefinedError::overpressure(&err, Some(retry_location)),
            StateUpdate::new().set_fluid_unknown(pipette_id),
        )),
        other => Err(EngineError::Hardware(other)),
    }
}

fn note_partial_move(ctx: &mut CommandContext<'_>, action: &str, requested: f64, moved: f64) {
    if (requested - moved).abs() > vial_common::consts::VOLUME_TOLERANCE {
        ctx.add_note(CommandNote::information(
            format!("{action} volume adjusted to {moved:.2} uL"),
            format!(
                "Requested {requested:.2} uL but the pipette could {action} only {moved:.2} uL"
            ),
        ));
    }
}

/// Move the plunger to its aspirate-ready position; empties the tip.
pub async fn prepare_for_aspirate(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    retry_location: DeckPoint,
) -> Result<Execution<()>, EngineError> {
    match ctx.hardware.prepare_for_aspirate(pipette_id).await {
        Ok(()) => Ok(Execution::success(
            (),
            StateUpdate::new().set_fluid_empty(pipette_id),
        )),
        Err(err) => overpressure(err, pipette_id, retry_location).map(Execution::DefinedError),
    }
}

/// Draw liquid at the current position.
pub async fn aspirate_in_place(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    volume: f64,
    flow_rate: f64,
    retry_location: DeckPoint,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    match ctx
        .hardware
        .aspirate_in_place(pipette_id, volume, flow_rate)
        .await
    {
        Ok(moved) => {
            note_partial_move(ctx, "aspirate", volume, moved);
            Ok(Execution::success(
                LiquidHandlingResult { volume: moved },
                StateUpdate::new().set_fluid_aspirated(
                    pipette_id,
                    AspiratedFluid::new(FluidKind::Liquid, moved),
                ),
            ))
        }
        Err(err) => overpressure(err, pipette_id, retry_location).map(Execution::DefinedError),
    }
}

/// Draw air at the current position.
pub async fn air_gap_in_place(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    volume: f64,
    flow_rate: f64,
    retry_location: DeckPoint,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    match ctx
        .hardware
        .aspirate_in_place(pipette_id, volume, flow_rate)
        .await
    {
        Ok(moved) => {
            note_partial_move(ctx, "air gap", volume, moved);
            Ok(Execution::success(
                LiquidHandlingResult { volume: moved },
                StateUpdate::new()
                    .set_fluid_aspirated(pipette_id, AspiratedFluid::new(FluidKind::Air, moved)),
            ))
        }
        Err(err) => overpressure(err, pipette_id, retry_location).map(Execution::DefinedError),
    }
}

/// Push fluid out at the current position.
pub async fn dispense_in_place(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    volume: f64,
    flow_rate: f64,
    push_out: Option<f64>,
    retry_location: DeckPoint,
) -> Result<Execution<LiquidHandlingResult>, EngineError> {
    match ctx
        .hardware
        .dispense_in_place(pipette_id, volume, flow_rate, push_out)
        .await
    {
        Ok(moved) => {
            note_partial_move(ctx, "dispense", volume, moved);
            Ok(Execution::success(
                LiquidHandlingResult { volume: moved },
                StateUpdate::new().set_fluid_ejected(pipette_id, moved),
            ))
        }
        Err(err) => overpressure(err, pipette_id, retry_location).map(Execution::DefinedError),
    }
}

/// Blow out at the current position; empties the tip.
pub async fn blow_out_in_place(
    ctx: &mut CommandContext<'_>,
    pipette_id: &str,
    flow_rate: Option<f64>,
    retry_location: DeckPoint,
) -> Result<Execution<()>, EngineError> {
    match ctx.hardware.blow_out_in_place(pipette_id, flow_rate).await {
        Ok(()) => Ok(Execution::success(
            (),
            StateUpdate::new().set_fluid_empty(pipette_id),
        )),
        Err(err) => overpressure(err, pipette_id, retry_location).map(Execution::DefinedError),
    }
}

// ─── Well Bookkeeping ───────────────────────────────────────────────

/// Wells an operation touches and how many nozzles enter each.
#[derive(Debug, Clone, PartialEq)]
pub struct WellTarget {
    /// Labware.
    pub labware_id: String,
    /// Every covered well.
    pub well_names: Vec<String>,
    /// Active nozzles per covered well.
    pub nozzles_per_well: usize,
}

impl WellTarget {
    /// Wells covered when the pipette addresses `well_name`.
    pub fn covered(
        ctx: &CommandContext<'_>,
        pipette_id: &str,
        labware_id: &str,
        well_name: &str,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            labware_id: labware_id.to_string(),
            well_names: geometry::wells_covered_by_pipette(
                ctx.labware,
                ctx.state,
                labware_id,
                well_name,
                pipette_id,
            )?,
            nozzles_per_well: geometry::nozzles_per_well(
                ctx.labware,
                ctx.state,
                labware_id,
                well_name,
                pipette_id,
            )?,
        })
    }

    /// Wells under the pipette, if it was last moved to a well.
    pub fn current(ctx: &CommandContext<'_>, pipette_id: &str) -> Result<Option<Self>, EngineError> {
        match ctx.state.pipettes.current_well(pipette_id) {
            Some((labware_id, well_name)) => {
                Self::covered(ctx, pipette_id, labware_id, well_name).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Per-well delta for `volume` µL drawn by every nozzle.
    pub fn removed(&self, volume: f64) -> ValueOrClear<f64> {
        ValueOrClear::Value(-volume * self.nozzles_per_well as f64)
    }

    /// Per-well delta for a dispense of `volume` µL; `Clear` when the tip
    /// contents are unknown. Uses the contents before the command.
    pub fn dispensed(&self, ctx: &CommandContext<'_>, pipette_id: &str, volume: f64) -> ValueOrClear<f64> {
        ctx.state
            .pipettes
            .liquid_part_of_dispense(pipette_id, volume)
            .map(|liquid| liquid * self.nozzles_per_well as f64)
            .into()
    }

    /// `update` with this target's wells changed by `delta`.
    pub fn operated(&self, update: StateUpdate, delta: ValueOrClear<f64>) -> StateUpdate {
        update.set_liquid_operated(&self.labware_id, self.well_names.clone(), delta)
    }
}

/// Record the target's wells as indeterminate on a defined error.
pub fn clear_wells(mut error: DefinedErrorData, target: Option<&WellTarget>) -> DefinedErrorData {
    if let Some(target) = target {
        error.state_update = target.operated(error.state_update, ValueOrClear::Clear);
    }
    error
}

/// Where the pipette is now, for retry locations of in-place operations.
pub async fn current_position(
    ctx: &CommandContext<'_>,
    pipette_id: &str,
) -> Result<DeckPoint, EngineError> {
    match ctx.state.pipettes.deck_point(pipette_id) {
        Some(point) => Ok(point),
        None => Ok(ctx.hardware.current_position(pipette_id).await?),
    }
}

/// Error unless the plunger is ready to aspirate.
pub fn require_ready_to_aspirate(ctx: &CommandContext<'_>, pipette_id: &str) -> Result<(), EngineError> {
    if ctx.hardware.is_ready_to_aspirate(pipette_id)? {
        Ok(())
    } else {
        Err(EngineError::PipetteNotReadyToAspirate(pipette_id.to_string()))
    }
}
