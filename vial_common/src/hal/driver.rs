//! Pipetting hardware trait and error types.
//!
//! This module defines:
//! - `PipettingHardware` trait - Async surface for plunger, gantry and sensors
//! - `HardwareError` enum - Typed hardware failures
//! - `DriverFactory` type alias - Factory function type
//! - `PipetteSpec`, `TipPresence`, `LidAction` - Call arguments and replies

use crate::types::{DeckPoint, Mount, MovementAxis};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error types for hardware operations.
///
/// `PipetteOverpressure`, `StallOrCollisionDetected` and `LiquidNotFound`
/// are expected runtime faults; the rest indicate a broken setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// Plunger stopped mid-move against pressure.
    #[error("Pipette overpressure on {pipette_id}: {detail}")]
    PipetteOverpressure {
        /// Acting pipette.
        pipette_id: String,
        /// Sensor detail.
        detail: String,
    },

    /// Encoder position diverged from the commanded position.
    #[error("Stall or collision detected: {0}")]
    StallOrCollisionDetected(String),

    /// Liquid level probe reached its limit without contact.
    #[error("Liquid not found by {pipette_id} within {max_z_distance} mm")]
    LiquidNotFound {
        /// Probing pipette.
        pipette_id: String,
        /// Probe travel in mm.
        max_z_distance: f64,
    },

    /// Operation needs a tip.
    #[error("No tip attached to {0}")]
    TipNotAttached(String),

    /// Pick-up with a tip already on.
    #[error("Tip already attached to {0}")]
    TipAlreadyAttached(String),

    /// Unknown pipette id.
    #[error("Pipette not loaded: {0}")]
    PipetteNotLoaded(String),

    /// Unknown or disconnected module.
    #[error("Module not attached: {0}")]
    ModuleNotAttached(String),

    /// Gripper operation on a robot without one.
    #[error("No gripper attached")]
    GripperNotAttached,

    /// Transport failure.
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// No driver registered under the name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl HardwareError {
    /// Stable name of the error kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PipetteOverpressure { .. } => "PipetteOverpressureError",
            Self::StallOrCollisionDetected(_) => "StallOrCollisionDetectedError",
            Self::LiquidNotFound { .. } => "LiquidNotFoundError",
            Self::TipNotAttached(_) => "TipNotAttachedError",
            Self::TipAlreadyAttached(_) => "TipAlreadyAttachedError",
            Self::PipetteNotLoaded(_) => "PipetteNotLoadedError",
            Self::ModuleNotAttached(_) => "ModuleNotAttachedError",
            Self::GripperNotAttached => "GripperNotAttachedError",
            Self::CommunicationError(_) => "CommunicationError",
            Self::DriverNotFound(_) => "DriverNotFoundError",
        }
    }
}

/// Physical description of a pipette being loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteSpec {
    /// Model name, e.g. `flex_8channel_1000`.
    pub pipette_name: String,
    /// Mount it sits on.
    pub mount: Mount,
    /// 1, 8 or 96.
    pub channels: u32,
    /// Maximum volume in µL.
    pub max_volume: f64,
}

/// Tip sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TipPresence {
    /// A tip is on the pipette.
    Present,
    /// No tip.
    Absent,
}

/// Lid motion on a plate-reader style module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LidAction {
    /// Put the lid on.
    Close,
    /// Take the lid off.
    Open,
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Arc<dyn PipettingHardware>;

/// Trait defining the hardware collaborator the engine drives.
///
/// Every `async` method is a suspension point of the engine; no state is
/// touched while a call is pending.
///
/// # Readiness
///
/// A pipette is "ready to aspirate" once the plunger sits at its bottom
/// position with no air drawn. Blow-out and dispense-with-push-out leave it
/// not ready; `prepare_for_aspirate` makes it ready again.
#[async_trait]
pub trait PipettingHardware: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Register a pipette under an engine-assigned id.
    async fn load_pipette(
        &self,
        pipette_id: &str,
        spec: &PipetteSpec,
    ) -> Result<(), HardwareError>;

    /// Whether the plunger is in position for an aspirate.
    fn is_ready_to_aspirate(&self, pipette_id: &str) -> Result<bool, HardwareError>;

    /// Move the plunger to its aspirate-ready position.
    async fn prepare_for_aspirate(&self, pipette_id: &str) -> Result<(), HardwareError>;

    /// Aspirate at the current position. Returns the volume moved.
    async fn aspirate_in_place(
        &self,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
    ) -> Result<f64, HardwareError>;

    /// Dispense at the current position. Returns the volume moved.
    async fn dispense_in_place(
        &self,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<f64, HardwareError>;

    /// Blow out at the current position.
    async fn blow_out_in_place(
        &self,
        pipette_id: &str,
        flow_rate: Option<f64>,
    ) -> Result<(), HardwareError>;

    /// Move through `waypoints`; returns the final critical point.
    async fn move_to(
        &self,
        pipette_id: &str,
        waypoints: &[DeckPoint],
        speed: Option<f64>,
    ) -> Result<DeckPoint, HardwareError>;

    /// Jog along one axis; returns the new position.
    async fn move_relative(
        &self,
        pipette_id: &str,
        axis: MovementAxis,
        distance: f64,
    ) -> Result<DeckPoint, HardwareError>;

    /// Current critical point of the pipette.
    async fn current_position(&self, pipette_id: &str) -> Result<DeckPoint, HardwareError>;

    /// Probe downward for a liquid surface; returns its absolute z.
    async fn liquid_probe(
        &self,
        pipette_id: &str,
        max_z_distance: f64,
    ) -> Result<f64, HardwareError>;

    /// Pick up a tip at the current position.
    async fn pick_up_tip(&self, pipette_id: &str, tip_length: f64) -> Result<(), HardwareError>;

    /// Eject the tip at the current position.
    async fn drop_tip_in_place(
        &self,
        pipette_id: &str,
        home_after: bool,
    ) -> Result<(), HardwareError>;

    /// Read the tip presence sensor.
    async fn tip_presence(&self, pipette_id: &str) -> Result<TipPresence, HardwareError>;

    /// Home every axis.
    async fn home(&self) -> Result<(), HardwareError>;

    /// Re-seed motor position estimates from encoders.
    async fn update_position_estimators(
        &self,
        pipette_id: Option<&str>,
    ) -> Result<(), HardwareError>;

    /// Move a module lid.
    ///
    /// Default: the driver has no modules attached.
    async fn move_module_lid(
        &self,
        module_id: &str,
        _action: LidAction,
    ) -> Result<(), HardwareError> {
        Err(HardwareError::ModuleNotAttached(module_id.to_string()))
    }

    /// Whether a gripper is attached.
    fn has_gripper(&self) -> bool {
        false
    }

    /// Whether the gripper jaws currently hold labware.
    fn is_gripping_labware(&self) -> Result<bool, HardwareError> {
        Err(HardwareError::GripperNotAttached)
    }

    /// Carry held labware to `drop_point` and open the jaws.
    ///
    /// Default: the driver has no gripper.
    async fn place_labware(&self, _drop_point: DeckPoint) -> Result<(), HardwareError> {
        Err(HardwareError::GripperNotAttached)
    }
}
