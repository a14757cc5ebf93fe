//! Engine error model.
//!
//! Two kinds of failure leave a command:
//! - [`DefinedError`]: a closed set of documented, recoverable faults, each
//!   with a minimum recovery action before motion may continue.
//! - [`EngineError`]: anything else; run-ending, no recovery metadata.
//!
//! Both become an [`ErrorOccurrence`], the public payload of a failed command.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use vial_common::hal::driver::HardwareError;
use vial_common::hal::labware::LabwareError;
use vial_common::liquid_class::LiquidClassError;
use vial_common::nozzle::NozzleMapError;
use vial_common::types::DeckPoint;

use crate::resources;
use crate::well_math::WellMathError;

// ─── Error Codes ────────────────────────────────────────────────────

/// Stall or collision.
pub const CODE_STALL_OR_COLLISION: &str = "3000";
/// Liquid not found by a probe.
pub const CODE_LIQUID_NOT_FOUND: &str = "3001";
/// Pipette overpressure.
pub const CODE_OVERPRESSURE: &str = "3006";
/// Tip still attached after a drop.
pub const CODE_TIP_PHYSICALLY_ATTACHED: &str = "3007";
/// Everything else.
pub const CODE_UNCLASSIFIED: &str = "4000";

// ─── Unclassified Errors ────────────────────────────────────────────

/// Failures that end a command without recovery metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Unknown pipette id.
    #[error("Pipette not loaded: {0}")]
    PipetteNotLoaded(String),

    /// In-place aspirate with the plunger in an unknown position.
    #[error("Pipette {0} is not ready to aspirate; prepare it first")]
    PipetteNotReadyToAspirate(String),

    /// Operation needs a tip.
    #[error("No tip attached to pipette {0}")]
    TipNotAttached(String),

    /// Operation needs an empty tip.
    #[error("Tip on pipette {0} is not empty")]
    TipNotEmpty(String),

    /// Volume offsets only make sense in liquid-holding labware.
    #[error("Cannot specify a volume offset on tip rack {0}")]
    TipRackVolumeOffset(String),

    /// Labware must not be a tip rack.
    #[error("Labware {0} is a tip rack")]
    LabwareIsTipRack(String),

    /// Labware must be a tip rack.
    #[error("Labware {0} is not a tip rack")]
    LabwareIsNotTipRack(String),

    /// Labware forbids touch tip.
    #[error("Touch tip is disabled for labware {0}")]
    TouchTipDisabled(String),

    /// Meniscus-relative location on a well with no valid probe result.
    #[error("Liquid height unknown for well {well_name} of {labware_id}")]
    LiquidHeightUnknown {
        /// Labware.
        labware_id: String,
        /// Well.
        well_name: String,
    },

    /// Liquid class id already holds a different record.
    #[error("Liquid class {0} already exists with a different definition")]
    LiquidClassRedefinition(String),

    /// Unknown liquid class id.
    #[error("Liquid class ID {0} not found")]
    LiquidClassDoesNotExist(String),

    /// Invalid liquid declaration.
    #[error("Invalid liquid: {0}")]
    InvalidLiquid(String),

    /// Area is not on the configured deck.
    #[error("Addressable area {0} is not in the deck configuration")]
    AddressableAreaNotInDeckConfiguration(String),

    /// Pipettes cannot reach staging slots.
    #[error("Cannot move pipette to staging slot {0}")]
    StagingSlotNotAccessible(String),

    /// Unknown module id.
    #[error("Module not loaded: {0}")]
    ModuleNotLoaded(String),

    /// Module exists but is the wrong kind.
    #[error("Module {module_id} is not a {expected}")]
    WrongModuleType {
        /// Module.
        module_id: String,
        /// Expected model family.
        expected: String,
    },

    /// Module is in a state that forbids the action.
    #[error("Cannot perform module action: {0}")]
    CannotPerformModuleAction(String),

    /// Gripper is in a state that forbids the action.
    #[error("Cannot perform gripper action: {0}")]
    CannotPerformGripperAction(String),

    /// Nozzle layout cannot be built.
    #[error("Invalid nozzle layout: {0}")]
    NozzleLayout(#[from] NozzleMapError),

    /// Motion attempted while a defined error awaits recovery.
    #[error("Recovery required after {error_type}: run {minimum_action} first")]
    RecoveryRequired {
        /// Pending defined error type.
        error_type: String,
        /// Minimum command that clears it.
        minimum_action: String,
    },

    /// Setup command after the run started.
    #[error("Setup command {0} cannot run after the protocol has started")]
    SetupCommandAfterStart(String),

    /// Fixit command with nothing to fix.
    #[error("Fixit command {0} requires a pending error recovery")]
    FixitWithoutRecovery(String),

    /// Unknown command id.
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Command params could not be read.
    #[error("Invalid command params: {0}")]
    InvalidParams(String),

    /// Run was stopped while the command was pending or in flight.
    #[error("Run was stopped")]
    RunStopped,

    /// Hardware failure not translated into a defined error.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Labware lookup failure.
    #[error(transparent)]
    Labware(#[from] LabwareError),

    /// Well coverage failure.
    #[error(transparent)]
    WellMath(#[from] WellMathError),

    /// Liquid class lookup failure.
    #[error(transparent)]
    LiquidClass(#[from] LiquidClassError),
}

impl EngineError {
    /// Stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PipetteNotLoaded(_) => "PipetteNotLoadedError",
            Self::PipetteNotReadyToAspirate(_) => "PipetteNotReadyToAspirateError",
            Self::TipNotAttached(_) => "TipNotAttachedError",
            Self::TipNotEmpty(_) => "TipNotEmptyError",
            Self::TipRackVolumeOffset(_) => "LabwareIsTipRackError",
            Self::LabwareIsTipRack(_) => "LabwareIsTipRackError",
            Self::LabwareIsNotTipRack(_) => "LabwareIsNotTipRackError",
            Self::TouchTipDisabled(_) => "TouchTipDisabledError",
            Self::LiquidHeightUnknown { .. } => "LiquidHeightUnknownError",
            Self::LiquidClassRedefinition(_) => "LiquidClassRedefinitionError",
            Self::LiquidClassDoesNotExist(_) => "LiquidClassDoesNotExistError",
            Self::InvalidLiquid(_) => "InvalidLiquidError",
            Self::AddressableAreaNotInDeckConfiguration(_) => {
                "AddressableAreaDoesNotExistError"
            }
            Self::StagingSlotNotAccessible(_) => "LocationIsStagingSlotError",
            Self::ModuleNotLoaded(_) => "ModuleNotLoadedError",
            Self::WrongModuleType { .. } => "WrongModuleTypeError",
            Self::CannotPerformModuleAction(_) => "CannotPerformModuleAction",
            Self::CannotPerformGripperAction(_) => "CannotPerformGripperAction",
            Self::NozzleLayout(_) => "InvalidNozzleLayoutError",
            Self::RecoveryRequired { .. } => "RecoveryRequiredError",
            Self::SetupCommandAfterStart(_) => "SetupCommandNotAllowedError",
            Self::FixitWithoutRecovery(_) => "FixitCommandNotAllowedError",
            Self::CommandNotFound(_) => "CommandDoesNotExistError",
            Self::InvalidParams(_) => "InvalidParamsError",
            Self::RunStopped => "RunStoppedError",
            Self::Hardware(e) => e.kind(),
            Self::Labware(_) => "LabwareError",
            Self::WellMath(_) => "InvalidStoredData",
            Self::LiquidClass(_) => "LiquidClassError",
        }
    }
}

// ─── Error Occurrence ───────────────────────────────────────────────

/// Public payload of a failed command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOccurrence {
    /// Unique id.
    pub id: String,
    /// When the error was observed.
    pub created_at: DateTime<Utc>,
    /// Defined error type or `unclassified`.
    pub error_type: String,
    /// Stable numeric code.
    pub error_code: String,
    /// Human readable detail.
    pub detail: String,
    /// Extra structured context.
    pub error_info: BTreeMap<String, String>,
    /// Lower-level causes.
    pub wrapped_errors: Vec<ErrorOccurrence>,
    /// True for defined errors.
    pub is_defined: bool,
}

impl ErrorOccurrence {
    fn build(error_type: &str, error_code: &str, detail: String, is_defined: bool) -> Self {
        Self {
            id: resources::generate_id(),
            created_at: resources::now(),
            error_type: error_type.to_string(),
            error_code: error_code.to_string(),
            detail,
            error_info: BTreeMap::new(),
            wrapped_errors: Vec::new(),
            is_defined,
        }
    }

    /// Occurrence describing a raw hardware error.
    pub fn from_hardware(err: &HardwareError) -> Self {
        let code = match err {
            HardwareError::PipetteOverpressure { .. } => CODE_OVERPRESSURE,
            HardwareError::StallOrCollisionDetected(_) => CODE_STALL_OR_COLLISION,
            HardwareError::LiquidNotFound { .. } => CODE_LIQUID_NOT_FOUND,
            _ => CODE_UNCLASSIFIED,
        };
        Self::build(err.kind(), code, err.to_string(), false)
    }

    /// Occurrence for an unclassified engine failure.
    pub fn unclassified(err: &EngineError) -> Self {
        let mut occurrence = Self::build("unclassified", CODE_UNCLASSIFIED, err.to_string(), false);
        occurrence
            .error_info
            .insert("kind".to_string(), err.kind().to_string());
        if let EngineError::Hardware(hw) = err {
            occurrence.error_code = Self::from_hardware(hw).error_code;
            occurrence.wrapped_errors.push(Self::from_hardware(hw));
        }
        occurrence
    }

    fn with_info(mut self, key: &str, value: String) -> Self {
        self.error_info.insert(key.to_string(), value);
        self
    }

    fn wrapping(mut self, inner: ErrorOccurrence) -> Self {
        self.wrapped_errors.push(inner);
        self
    }
}

// ─── Defined Errors ─────────────────────────────────────────────────

/// Command that can satisfy a pending recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryAction {
    /// `home`.
    Home,
    /// `unsafe/updatePositionEstimators`.
    UpdatePositionEstimators,
    /// `unsafe/dropTipInPlace`.
    UnsafeDropTip,
    /// `unsafe/blowOutInPlace`.
    UnsafeBlowOut,
}

impl RecoveryAction {
    /// Command type tag that performs this action.
    pub const fn command_type(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::UpdatePositionEstimators => "unsafe/updatePositionEstimators",
            Self::UnsafeDropTip => "unsafe/dropTipInPlace",
            Self::UnsafeBlowOut => "unsafe/blowOutInPlace",
        }
    }
}

/// Documented, recoverable command failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "errorType", rename_all = "camelCase")]
pub enum DefinedError {
    /// Plunger motion stopped against pressure.
    #[serde(rename_all = "camelCase")]
    Overpressure {
        /// Public payload.
        occurrence: ErrorOccurrence,
        /// Where the operation can be retried from.
        retry_location: Option<DeckPoint>,
    },
    /// Gantry position diverged from the commanded one.
    StallOrCollision {
        /// Public payload.
        occurrence: ErrorOccurrence,
    },
    /// Probe found no liquid.
    LiquidNotFound {
        /// Public payload.
        occurrence: ErrorOccurrence,
    },
    /// Tip still on after a drop.
    TipPhysicallyAttached {
        /// Public payload.
        occurrence: ErrorOccurrence,
    },
}

impl DefinedError {
    /// Overpressure wrapping the hardware cause.
    pub fn overpressure(cause: &HardwareError, retry_location: Option<DeckPoint>) -> Self {
        let mut occurrence = ErrorOccurrence::build(
            "overpressure",
            CODE_OVERPRESSURE,
            "Overpressure detected during plunger motion".to_string(),
            true,
        )
        .wrapping(ErrorOccurrence::from_hardware(cause));
        if let Some(point) = retry_location {
            occurrence = occurrence.with_info("retryLocation", point.to_string());
        }
        Self::Overpressure {
            occurrence,
            retry_location,
        }
    }

    /// Stall or collision wrapping the hardware cause.
    pub fn stall_or_collision(cause: &HardwareError) -> Self {
        let occurrence = ErrorOccurrence::build(
            "stallOrCollision",
            CODE_STALL_OR_COLLISION,
            "Stall or collision detected".to_string(),
            true,
        )
        .wrapping(ErrorOccurrence::from_hardware(cause));
        Self::StallOrCollision { occurrence }
    }

    /// Liquid not found wrapping the hardware cause.
    pub fn liquid_not_found(cause: &HardwareError) -> Self {
        let occurrence = ErrorOccurrence::build(
            "liquidNotFound",
            CODE_LIQUID_NOT_FOUND,
            "Liquid not found during probe".to_string(),
            true,
        )
        .wrapping(ErrorOccurrence::from_hardware(cause));
        Self::LiquidNotFound { occurrence }
    }

    /// Tip sensor still reports a tip after a drop.
    pub fn tip_physically_attached(pipette_id: &str) -> Self {
        let occurrence = ErrorOccurrence::build(
            "tipPhysicallyAttached",
            CODE_TIP_PHYSICALLY_ATTACHED,
            format!("Tip still attached to {pipette_id} after drop"),
            true,
        )
        .with_info("pipetteId", pipette_id.to_string());
        Self::TipPhysicallyAttached { occurrence }
    }

    /// Public payload.
    pub fn occurrence(&self) -> &ErrorOccurrence {
        match self {
            Self::Overpressure { occurrence, .. }
            | Self::StallOrCollision { occurrence }
            | Self::LiquidNotFound { occurrence }
            | Self::TipPhysicallyAttached { occurrence } => occurrence,
        }
    }

    /// Error type tag.
    pub fn error_type(&self) -> &str {
        &self.occurrence().error_type
    }

    /// Commands that clear this error, minimum first.
    pub const fn satisfied_by(&self) -> &'static [RecoveryAction] {
        use RecoveryAction::*;
        match self {
            Self::Overpressure { .. } => &[Home, UpdatePositionEstimators, UnsafeDropTip, UnsafeBlowOut],
            Self::StallOrCollision { .. } => &[UpdatePositionEstimators, Home],
            Self::LiquidNotFound { .. } => &[UnsafeDropTip, Home],
            Self::TipPhysicallyAttached { .. } => &[UnsafeBlowOut, UnsafeDropTip],
        }
    }

    /// Least invasive command that clears this error.
    pub const fn minimum_recovery(&self) -> RecoveryAction {
        self.satisfied_by()[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overpressure_wraps_cause() {
        let cause = HardwareError::PipetteOverpressure {
            pipette_id: "p1".into(),
            detail: "12 kPa".into(),
        };
        let err = DefinedError::overpressure(&cause, Some(DeckPoint::new(1.0, 2.0, 3.0)));
        let occ = err.occurrence();
        assert!(occ.is_defined);
        assert_eq!(occ.error_type, "overpressure");
        assert_eq!(occ.error_code, CODE_OVERPRESSURE);
        assert_eq!(occ.wrapped_errors.len(), 1);
        assert_eq!(occ.wrapped_errors[0].error_type, "PipetteOverpressureError");
        assert!(occ.error_info.contains_key("retryLocation"));
        assert_eq!(err.minimum_recovery(), RecoveryAction::Home);
    }

    #[test]
    fn minimum_recovery_per_error() {
        let stall = DefinedError::stall_or_collision(&HardwareError::StallOrCollisionDetected(
            "x".into(),
        ));
        assert_eq!(stall.minimum_recovery(), RecoveryAction::UpdatePositionEstimators);
        assert!(stall.satisfied_by().contains(&RecoveryAction::Home));

        let probe = DefinedError::liquid_not_found(&HardwareError::LiquidNotFound {
            pipette_id: "p".into(),
            max_z_distance: 5.0,
        });
        assert_eq!(probe.minimum_recovery(), RecoveryAction::UnsafeDropTip);

        let tip = DefinedError::tip_physically_attached("p");
        assert_eq!(tip.minimum_recovery(), RecoveryAction::UnsafeBlowOut);
        assert_eq!(tip.error_type(), "tipPhysicallyAttached");
        assert!(!tip.satisfied_by().contains(&RecoveryAction::Home));
    }

    #[test]
    fn unclassified_occurrence_wraps_hardware() {
        let err = EngineError::Hardware(HardwareError::CommunicationError("bus".into()));
        let occ = ErrorOccurrence::unclassified(&err);
        assert!(!occ.is_defined);
        assert_eq!(occ.error_type, "unclassified");
        assert_eq!(occ.error_code, CODE_UNCLASSIFIED);
        assert_eq!(occ.error_info["kind"], "CommunicationError");
        assert_eq!(occ.wrapped_errors.len(), 1);
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::LiquidHeightUnknown {
            labware_id: "plate".into(),
            well_name: "A1".into(),
        };
        assert!(err.to_string().contains("A1"));
        assert_eq!(
            EngineError::from(WellMathError::EmptyLabware).kind(),
            "InvalidStoredData"
        );
    }
}
