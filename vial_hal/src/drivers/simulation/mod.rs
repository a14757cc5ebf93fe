//! Simulation driver module.
//!
//! Software pipetting hardware for development and testing. Tracks plunger
//! readiness, tip presence and gantry position per pipette, an optional
//! gripper, and can be told to fail specific calls.

mod driver;
mod faults;
mod state;

pub use driver::SimulationDriver;
pub use faults::{FaultPlan, FaultSite, InjectedFault};
pub use state::{SimulatedGripper, SimulatedPipette, SimulationState};

use std::sync::Arc;
use vial_common::hal::driver::PipettingHardware;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Arc<dyn PipettingHardware> {
    Arc::new(SimulationDriver::new())
}
