//! Command model and dispatch.
//!
//! A [`Command`] is one discrete robot operation. Its [`CommandParams`]
//! variant selects the implementation; [`execute`] runs it against a
//! [`CommandContext`] and returns the outcome without touching state. The
//! engine applies the resulting update once the command is terminal.
//!
//! # Module Structure
//!
//! - [`outcome`] - Success and defined-error outcomes
//! - [`context`] - Collaborators and state visible to a running command
//! - [`pipetting_common`] - Plunger micro-operations
//! - [`movement_common`] - Gantry micro-operations
//! - one module per command family

pub mod aspirate;
pub mod blow_out;
pub mod context;
pub mod dispense;
pub mod liquid;
pub mod liquid_probe;
pub mod module;
pub mod movement;
pub mod movement_common;
pub mod outcome;
pub mod pipette;
pub mod pipetting_common;
pub mod recovery;
pub mod touch_tip;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DefinedError, EngineError, ErrorOccurrence, RecoveryAction};
use context::CommandContext;
use outcome::Execution;

// ─── Lifecycle ──────────────────────────────────────────────────────

/// Why a command was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandIntent {
    /// Part of the protocol.
    #[default]
    Protocol,
    /// Before the protocol starts.
    Setup,
    /// Error recovery.
    Fixit,
}

/// Where a command is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandStatus {
    /// Waiting in the queue.
    Queued,
    /// Executing.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished with an error.
    Failed,
}

impl CommandStatus {
    /// No further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Remark attached to a command while it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandNote {
    /// `information`, `warning`, ...
    pub note_kind: String,
    /// One-line summary.
    pub short_message: String,
    /// Full text.
    pub long_message: String,
    /// Emitting component.
    pub source: String,
}

impl CommandNote {
    /// Informational note from command execution.
    pub fn information(short_message: String, long_message: String) -> Self {
        Self {
            note_kind: "information".to_string(),
            short_message,
            long_message,
            source: "execution".to_string(),
        }
    }
}

/// Request to add a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCreate {
    /// Type tag and params.
    #[serde(flatten)]
    pub params: CommandParams,
    /// Submission intent.
    #[serde(default)]
    pub intent: CommandIntent,
    /// Stable key; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl CommandCreate {
    /// Protocol command with a generated key.
    pub fn new(params: CommandParams) -> Self {
        Self {
            params,
            intent: CommandIntent::Protocol,
            key: None,
        }
    }

    /// Same request with another intent.
    pub fn with_intent(mut self, intent: CommandIntent) -> Self {
        self.intent = intent;
        self
    }
}

/// A command and everything known about its execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Unique id.
    pub id: String,
    /// Stable key.
    pub key: String,
    /// Submission intent.
    pub intent: CommandIntent,
    /// Type tag and params.
    #[serde(flatten)]
    pub params: CommandParams,
    /// Lifecycle position.
    pub status: CommandStatus,
    /// Public result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    /// Public error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOccurrence>,
    /// Defined error on failure, if the failure was a defined one.
    #[serde(skip)]
    pub defined_error: Option<DefinedError>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Start of execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// End of execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Notes emitted while running.
    pub notes: Vec<CommandNote>,
}

impl Command {
    /// Command type tag.
    pub fn command_type(&self) -> &'static str {
        self.params.command_type()
    }
}

// ─── Params & Results ───────────────────────────────────────────────

/// Every command the engine executes, tagged by `commandType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "commandType", content = "params")]
pub enum CommandParams {
    /// Register a pipette.
    #[serde(rename = "loadPipette")]
    LoadPipette(pipette::LoadPipetteParams),
    /// Change the active nozzles.
    #[serde(rename = "configureNozzleLayout")]
    ConfigureNozzleLayout(pipette::ConfigureNozzleLayoutParams),
    /// Pick up a tip from a tip rack.
    #[serde(rename = "pickUpTip")]
    PickUpTip(pipette::PickUpTipParams),
    /// Drop the tip and verify it is gone.
    #[serde(rename = "dropTipInPlace")]
    DropTipInPlace(pipette::DropTipInPlaceParams),
    /// Home every axis.
    #[serde(rename = "home")]
    Home(recovery::HomeParams),
    /// Re-seed position estimators.
    #[serde(rename = "unsafe/updatePositionEstimators")]
    UpdatePositionEstimators(recovery::UpdatePositionEstimatorsParams),
    /// Drop the tip without verification.
    #[serde(rename = "unsafe/dropTipInPlace")]
    UnsafeDropTipInPlace(recovery::UnsafeDropTipInPlaceParams),
    /// Blow out from an unknown plunger position.
    #[serde(rename = "unsafe/blowOutInPlace")]
    UnsafeBlowOutInPlace(recovery::UnsafeBlowOutInPlaceParams),
    /// Set down labware already held by the gripper.
    #[serde(rename = "unsafe/placeLabware")]
    UnsafePlaceLabware(recovery::UnsafePlaceLabwareParams),
    /// Move to a well and aspirate.
    #[serde(rename = "aspirate")]
    Aspirate(aspirate::AspirateParams),
    /// Aspirate where the pipette is.
    #[serde(rename = "aspirateInPlace")]
    AspirateInPlace(aspirate::AspirateInPlaceParams),
    /// Draw an air gap where the pipette is.
    #[serde(rename = "airGapInPlace")]
    AirGapInPlace(aspirate::AirGapInPlaceParams),
    /// Make the plunger ready to aspirate.
    #[serde(rename = "prepareToAspirate")]
    PrepareToAspirate(aspirate::PrepareToAspirateParams),
    /// Move to a well and dispense.
    #[serde(rename = "dispense")]
    Dispense(dispense::DispenseParams),
    /// Dispense where the pipette is.
    #[serde(rename = "dispenseInPlace")]
    DispenseInPlace(dispense::DispenseInPlaceParams),
    /// Move to a well and blow out.
    #[serde(rename = "blowout")]
    BlowOut(blow_out::BlowOutParams),
    /// Blow out where the pipette is.
    #[serde(rename = "blowOutInPlace")]
    BlowOutInPlace(blow_out::BlowOutInPlaceParams),
    /// Move to a well.
    #[serde(rename = "moveToWell")]
    MoveToWell(movement::MoveToWellParams),
    /// Move to deck coordinates.
    #[serde(rename = "moveToCoordinates")]
    MoveToCoordinates(movement::MoveToCoordinatesParams),
    /// Move to a named deck area.
    #[serde(rename = "moveToAddressableArea")]
    MoveToAddressableArea(movement::MoveToAddressableAreaParams),
    /// Jog along one axis.
    #[serde(rename = "moveRelative")]
    MoveRelative(movement::MoveRelativeParams),
    /// Touch the tip against the well walls.
    #[serde(rename = "touchTip")]
    TouchTip(touch_tip::TouchTipParams),
    /// Find the liquid surface of a well.
    #[serde(rename = "liquidProbe")]
    LiquidProbe(liquid_probe::LiquidProbeParams),
    /// Declare well volumes.
    #[serde(rename = "loadLiquid")]
    LoadLiquid(liquid::LoadLiquidParams),
    /// Store a liquid class.
    #[serde(rename = "loadLiquidClass")]
    LoadLiquidClass(liquid::LoadLiquidClassParams),
    /// Register a module.
    #[serde(rename = "loadModule")]
    LoadModule(module::LoadModuleParams),
    /// Close a plate reader lid.
    #[serde(rename = "absorbanceReader/closeLid")]
    CloseLid(module::LidParams),
    /// Open a plate reader lid.
    #[serde(rename = "absorbanceReader/openLid")]
    OpenLid(module::LidParams),
}

impl CommandParams {
    /// Command type tag.
    pub const fn command_type(&self) -> &'static str {
        match self {
            Self::LoadPipette(_) => "loadPipette",
            Self::ConfigureNozzleLayout(_) => "configureNozzleLayout",
            Self::PickUpTip(_) => "pickUpTip",
            Self::DropTipInPlace(_) => "dropTipInPlace",
            Self::Home(_) => "home",
            Self::UpdatePositionEstimators(_) => "unsafe/updatePositionEstimators",
            Self::UnsafeDropTipInPlace(_) => "unsafe/dropTipInPlace",
            Self::UnsafeBlowOutInPlace(_) => "unsafe/blowOutInPlace",
            Self::UnsafePlaceLabware(_) => "unsafe/placeLabware",
            Self::Aspirate(_) => "aspirate",
            Self::AspirateInPlace(_) => "aspirateInPlace",
            Self::AirGapInPlace(_) => "airGapInPlace",
            Self::PrepareToAspirate(_) => "prepareToAspirate",
            Self::Dispense(_) => "dispense",
            Self::DispenseInPlace(_) => "dispenseInPlace",
            Self::BlowOut(_) => "blowout",
            Self::BlowOutInPlace(_) => "blowOutInPlace",
            Self::MoveToWell(_) => "moveToWell",
            Self::MoveToCoordinates(_) => "moveToCoordinates",
            Self::MoveToAddressableArea(_) => "moveToAddressableArea",
            Self::MoveRelative(_) => "moveRelative",
            Self::TouchTip(_) => "touchTip",
            Self::LiquidProbe(_) => "liquidProbe",
            Self::LoadLiquid(_) => "loadLiquid",
            Self::LoadLiquidClass(_) => "loadLiquidClass",
            Self::LoadModule(_) => "loadModule",
            Self::CloseLid(_) => "absorbanceReader/closeLid",
            Self::OpenLid(_) => "absorbanceReader/openLid",
        }
    }

    /// Whether the command can move the plunger, gantry or a lid.
    pub const fn is_motion(&self) -> bool {
        !matches!(
            self,
            Self::LoadPipette(_)
                | Self::ConfigureNozzleLayout(_)
                | Self::LoadLiquid(_)
                | Self::LoadLiquidClass(_)
                | Self::LoadModule(_)
        )
    }

    /// Recovery this command performs, if any.
    pub const fn recovery_action(&self) -> Option<RecoveryAction> {
        match self {
            Self::Home(_) => Some(RecoveryAction::Home),
            Self::UpdatePositionEstimators(_) => Some(RecoveryAction::UpdatePositionEstimators),
            Self::UnsafeDropTipInPlace(_) => Some(RecoveryAction::UnsafeDropTip),
            Self::UnsafeBlowOutInPlace(_) => Some(RecoveryAction::UnsafeBlowOut),
            _ => None,
        }
    }
}

/// Command with no result payload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmptyResult {}

/// Public result of a succeeded command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    /// No payload.
    Empty(EmptyResult),
    /// `loadPipette`.
    LoadPipette(pipette::LoadPipetteResult),
    /// `pickUpTip`.
    PickUpTip(pipette::PickUpTipResult),
    /// Volume-only plunger result.
    LiquidHandling(pipetting_common::LiquidHandlingResult),
    /// Plunger result at a well.
    PipettingAtWell(pipetting_common::PipettingAtWellResult),
    /// Any move.
    Position(movement_common::DestinationPosition),
    /// `liquidProbe`.
    LiquidProbe(liquid_probe::LiquidProbeResult),
    /// `loadLiquidClass`.
    LoadLiquidClass(liquid::LoadLiquidClassResult),
    /// `loadModule`.
    LoadModule(module::LoadModuleResult),
}

// ─── Dispatch ───────────────────────────────────────────────────────

fn wrap<T>(
    outcome: Result<Execution<T>, EngineError>,
    into: fn(T) -> CommandResult,
) -> Result<Execution<CommandResult>, EngineError> {
    outcome.map(|execution| execution.map(into))
}

fn empty(_: ()) -> CommandResult {
    CommandResult::Empty(EmptyResult {})
}

/// Run one command's implementation.
///
/// State is read through `ctx` and never written; the caller applies the
/// returned update.
pub async fn execute(
    params: &CommandParams,
    ctx: &mut CommandContext<'_>,
) -> Result<Execution<CommandResult>, EngineError> {
    use CommandResult as R;
    match params {
        CommandParams::LoadPipette(p) => wrap(pipette::load_pipette(ctx, p).await, R::LoadPipette),
        CommandParams::ConfigureNozzleLayout(p) => {
            wrap(pipette::configure_nozzle_layout(ctx, p).await, empty)
        }
        CommandParams::PickUpTip(p) => wrap(pipette::pick_up_tip(ctx, p).await, R::PickUpTip),
        CommandParams::DropTipInPlace(p) => wrap(pipette::drop_tip_in_place(ctx, p).await, empty),
        CommandParams::Home(p) => wrap(recovery::home(ctx, p).await, empty),
        CommandParams::UpdatePositionEstimators(p) => {
            wrap(recovery::update_position_estimators(ctx, p).await, empty)
        }
        CommandParams::UnsafeDropTipInPlace(p) => {
            wrap(recovery::unsafe_drop_tip_in_place(ctx, p).await, empty)
        }
        CommandParams::UnsafeBlowOutInPlace(p) => {
            wrap(recovery::unsafe_blow_out_in_place(ctx, p).await, empty)
        }
        CommandParams::UnsafePlaceLabware(p) => {
            wrap(recovery::unsafe_place_labware(ctx, p).await, empty)
        }
        CommandParams::Aspirate(p) => wrap(aspirate::aspirate(ctx, p).await, R::PipettingAtWell),
        CommandParams::AspirateInPlace(p) => {
            wrap(aspirate::aspirate_in_place(ctx, p).await, R::LiquidHandling)
        }
        CommandParams::AirGapInPlace(p) => {
            wrap(aspirate::air_gap_in_place(ctx, p).await, R::LiquidHandling)
        }
        CommandParams::PrepareToAspirate(p) => {
            wrap(aspirate::prepare_to_aspirate(ctx, p).await, empty)
        }
        CommandParams::Dispense(p) => wrap(dispense::dispense(ctx, p).await, R::PipettingAtWell),
        CommandParams::DispenseInPlace(p) => {
            wrap(dispense::dispense_in_place(ctx, p).await, R::LiquidHandling)
        }
        CommandParams::BlowOut(p) => wrap(blow_out::blow_out(ctx, p).await, R::Position),
        CommandParams::BlowOutInPlace(p) => {
            wrap(blow_out::blow_out_in_place(ctx, p).await, empty)
        }
        CommandParams::MoveToWell(p) => wrap(movement::move_to_well(ctx, p).await, R::Position),
        CommandParams::MoveToCoordinates(p) => {
            wrap(movement::move_to_coordinates(ctx, p).await, R::Position)
        }
        CommandParams::MoveToAddressableArea(p) => {
            wrap(movement::move_to_addressable_area(ctx, p).await, R::Position)
        }
        CommandParams::MoveRelative(p) => {
            wrap(movement::move_relative(ctx, p).await, R::Position)
        }
        CommandParams::TouchTip(p) => wrap(touch_tip::touch_tip(ctx, p).await, R::Position),
        CommandParams::LiquidProbe(p) => {
            wrap(liquid_probe::liquid_probe(ctx, p).await, R::LiquidProbe)
        }
        CommandParams::LoadLiquid(p) => wrap(liquid::load_liquid(ctx, p), empty),
        CommandParams::LoadLiquidClass(p) => {
            wrap(liquid::load_liquid_class(ctx, p), R::LoadLiquidClass)
        }
        CommandParams::LoadModule(p) => wrap(module::load_module(ctx, p), R::LoadModule),
        CommandParams::CloseLid(p) => wrap(module::set_lid(ctx, p, true).await, empty),
        CommandParams::OpenLid(p) => wrap(module::set_lid(ctx, p, false).await, empty),
    }
}
