//! Simulated pipette and gantry state.

use std::collections::{HashMap, HashSet};
use vial_common::hal::driver::{HardwareError, PipetteSpec};
use vial_common::types::DeckPoint;

/// Gantry position after homing.
pub const HOME_POSITION: DeckPoint = DeckPoint::new(0.0, 0.0, 200.0);

/// State of one simulated pipette.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPipette {
    /// Loaded description.
    pub spec: PipetteSpec,
    /// Critical point.
    pub position: DeckPoint,
    /// Volume currently drawn into the tip (µL).
    pub plunger_volume: f64,
    /// Plunger sits at its aspirate-ready position.
    pub ready_to_aspirate: bool,
    /// Length of the attached tip.
    pub tip_length: Option<f64>,
}

impl SimulatedPipette {
    /// Fresh pipette at the home position with no tip.
    pub fn new(spec: PipetteSpec) -> Self {
        Self {
            spec,
            position: HOME_POSITION,
            plunger_volume: 0.0,
            ready_to_aspirate: false,
            tip_length: None,
        }
    }

    /// Error unless a tip is attached.
    pub fn require_tip(&self, pipette_id: &str) -> Result<(), HardwareError> {
        if self.tip_length.is_none() {
            return Err(HardwareError::TipNotAttached(pipette_id.to_string()));
        }
        Ok(())
    }
}

/// State of the simulated gripper.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedGripper {
    /// Jaws are closed on labware.
    pub holding_labware: bool,
    /// Jaw center.
    pub position: DeckPoint,
}

impl Default for SimulatedGripper {
    fn default() -> Self {
        Self {
            holding_labware: false,
            position: HOME_POSITION,
        }
    }
}

/// Whole-robot simulated state.
#[derive(Debug, Default)]
pub struct SimulationState {
    /// Pipettes by id.
    pub pipettes: HashMap<String, SimulatedPipette>,
    /// Attached module ids.
    pub modules: HashSet<String>,
    /// Absolute z of the liquid surface under the probe, if any.
    pub liquid_surface_z: Option<f64>,
    /// Gripper, when one is attached.
    pub gripper: Option<SimulatedGripper>,
    /// Number of completed home calls.
    pub home_count: u32,
}

impl SimulationState {
    /// Mutable pipette lookup.
    pub fn pipette_mut(&mut self, pipette_id: &str) -> Result<&mut SimulatedPipette, HardwareError> {
        self.pipettes
            .get_mut(pipette_id)
            .ok_or_else(|| HardwareError::PipetteNotLoaded(pipette_id.to_string()))
    }

    /// Shared pipette lookup.
    pub fn pipette(&self, pipette_id: &str) -> Result<&SimulatedPipette, HardwareError> {
        self.pipettes
            .get(pipette_id)
            .ok_or_else(|| HardwareError::PipetteNotLoaded(pipette_id.to_string()))
    }
}
