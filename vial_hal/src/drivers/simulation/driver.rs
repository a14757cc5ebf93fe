//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements `PipettingHardware` with in-memory
//! plunger, tip and gantry state. Faults queued through
//! [`SimulationDriver::inject_fault`] replace the next matching call's
//! outcome.

use super::faults::{FaultPlan, FaultSite, InjectedFault};
use super::state::{HOME_POSITION, SimulatedGripper, SimulatedPipette, SimulationState};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use vial_common::hal::driver::{
    HardwareError, LidAction, PipetteSpec, PipettingHardware, TipPresence,
};
use vial_common::types::{DeckPoint, MovementAxis};

/// Simulation driver implementing the `PipettingHardware` trait.
pub struct SimulationDriver {
    name: &'static str,
    version: &'static str,
    state: Mutex<SimulationState>,
    faults: Mutex<FaultPlan>,
    /// Artificial duration of every gantry move.
    move_latency: Option<Duration>,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            state: Mutex::new(SimulationState::default()),
            faults: Mutex::new(FaultPlan::default()),
            move_latency: None,
        }
    }

    /// Make every gantry move take `latency`.
    pub fn with_move_latency(mut self, latency: Duration) -> Self {
        self.move_latency = Some(latency);
        self
    }

    /// Queue a fault for the next call at `site`.
    pub fn inject_fault(&self, site: FaultSite, fault: InjectedFault) {
        debug!("Injecting {:?} at {:?}", fault, site);
        self.faults.lock().push(site, fault);
    }

    /// Faults not yet consumed.
    pub fn pending_faults(&self) -> usize {
        self.faults.lock().pending()
    }

    /// Place a liquid surface at absolute height `z` for probing.
    pub fn set_liquid_surface(&self, z: Option<f64>) {
        self.state.lock().liquid_surface_z = z;
    }

    /// Attach a module so lid commands reach it.
    pub fn attach_module(&self, module_id: &str) {
        self.state.lock().modules.insert(module_id.to_string());
    }

    /// Attach an empty gripper.
    pub fn attach_gripper(&self) {
        self.state.lock().gripper = Some(SimulatedGripper::default());
    }

    /// Close the gripper jaws on labware.
    ///
    /// # Errors
    /// `HardwareError::GripperNotAttached` without a gripper.
    pub fn grip_labware(&self) -> Result<(), HardwareError> {
        let mut state = self.state.lock();
        let gripper = state
            .gripper
            .as_mut()
            .ok_or(HardwareError::GripperNotAttached)?;
        gripper.holding_labware = true;
        Ok(())
    }

    /// Snapshot of the gripper.
    pub fn gripper(&self) -> Option<SimulatedGripper> {
        self.state.lock().gripper.clone()
    }

    /// Snapshot of one pipette.
    pub fn pipette(&self, pipette_id: &str) -> Option<SimulatedPipette> {
        self.state.lock().pipettes.get(pipette_id).cloned()
    }

    /// Completed home calls.
    pub fn home_count(&self) -> u32 {
        self.state.lock().home_count
    }

    fn take_fault(&self, site: FaultSite) -> Option<InjectedFault> {
        self.faults.lock().take(site)
    }

    /// Raise the queued fault for `site`, if it is an error fault.
    fn check_fault(
        &self,
        site: FaultSite,
        pipette_id: &str,
        max_z_distance: f64,
    ) -> Result<Option<InjectedFault>, HardwareError> {
        match self.take_fault(site) {
            Some(fault) => match fault.to_error(pipette_id, max_z_distance) {
                Some(err) => {
                    warn!("Simulated fault at {:?}: {}", site, err);
                    Err(err)
                }
                None => Ok(Some(fault)),
            },
            None => Ok(None),
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipettingHardware for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    async fn load_pipette(
        &self,
        pipette_id: &str,
        spec: &PipetteSpec,
    ) -> Result<(), HardwareError> {
        info!(
            "Loading simulated pipette {} ({}, {} channels) on {:?}",
            pipette_id, spec.pipette_name, spec.channels, spec.mount
        );
        self.state
            .lock()
            .pipettes
            .insert(pipette_id.to_string(), SimulatedPipette::new(spec.clone()));
        Ok(())
    }

    fn is_ready_to_aspirate(&self, pipette_id: &str) -> Result<bool, HardwareError> {
        Ok(self.state.lock().pipette(pipette_id)?.ready_to_aspirate)
    }

    async fn prepare_for_aspirate(&self, pipette_id: &str) -> Result<(), HardwareError> {
        let fault = self.check_fault(FaultSite::PrepareForAspirate, pipette_id, 0.0);
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        if let Err(err) = fault {
            pipette.ready_to_aspirate = false;
            return Err(err);
        }
        pipette.plunger_volume = 0.0;
        pipette.ready_to_aspirate = true;
        debug!("{} ready to aspirate", pipette_id);
        Ok(())
    }

    async fn aspirate_in_place(
        &self,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
    ) -> Result<f64, HardwareError> {
        let fault = self.check_fault(FaultSite::Aspirate, pipette_id, 0.0);
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.require_tip(pipette_id)?;
        if let Err(err) = fault {
            pipette.ready_to_aspirate = false;
            return Err(err);
        }
        let available = (pipette.spec.max_volume - pipette.plunger_volume).max(0.0);
        let moved = volume.min(available);
        pipette.plunger_volume += moved;
        debug!(
            "{} aspirated {:.2} uL at {:.1} uL/s (requested {:.2})",
            pipette_id, moved, flow_rate, volume
        );
        Ok(moved)
    }

    async fn dispense_in_place(
        &self,
        pipette_id: &str,
        volume: f64,
        flow_rate: f64,
        push_out: Option<f64>,
    ) -> Result<f64, HardwareError> {
        let fault = self.check_fault(FaultSite::Dispense, pipette_id, 0.0);
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.require_tip(pipette_id)?;
        if let Err(err) = fault {
            pipette.ready_to_aspirate = false;
            return Err(err);
        }
        let moved = volume.min(pipette.plunger_volume);
        pipette.plunger_volume -= moved;
        if push_out.is_some_and(|p| p > 0.0) {
            pipette.ready_to_aspirate = false;
        }
        debug!(
            "{} dispensed {:.2} uL at {:.1} uL/s (push out {:?})",
            pipette_id, moved, flow_rate, push_out
        );
        Ok(moved)
    }

    async fn blow_out_in_place(
        &self,
        pipette_id: &str,
        flow_rate: Option<f64>,
    ) -> Result<(), HardwareError> {
        let fault = self.check_fault(FaultSite::BlowOut, pipette_id, 0.0);
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.ready_to_aspirate = false;
        fault?;
        pipette.plunger_volume = 0.0;
        debug!("{} blew out (flow rate {:?})", pipette_id, flow_rate);
        Ok(())
    }

    async fn move_to(
        &self,
        pipette_id: &str,
        waypoints: &[DeckPoint],
        speed: Option<f64>,
    ) -> Result<DeckPoint, HardwareError> {
        if let Some(latency) = self.move_latency {
            tokio::time::sleep(latency).await;
        }
        self.check_fault(FaultSite::Move, pipette_id, 0.0)?;
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        if let Some(last) = waypoints.last() {
            pipette.position = *last;
        }
        debug!(
            "{} moved through {} waypoint(s) to {} (speed {:?})",
            pipette_id,
            waypoints.len(),
            pipette.position,
            speed
        );
        Ok(pipette.position)
    }

    async fn move_relative(
        &self,
        pipette_id: &str,
        axis: MovementAxis,
        distance: f64,
    ) -> Result<DeckPoint, HardwareError> {
        if let Some(latency) = self.move_latency {
            tokio::time::sleep(latency).await;
        }
        self.check_fault(FaultSite::Move, pipette_id, 0.0)?;
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.position = pipette.position.moved_along(axis, distance);
        Ok(pipette.position)
    }

    async fn current_position(&self, pipette_id: &str) -> Result<DeckPoint, HardwareError> {
        Ok(self.state.lock().pipette(pipette_id)?.position)
    }

    async fn liquid_probe(
        &self,
        pipette_id: &str,
        max_z_distance: f64,
    ) -> Result<f64, HardwareError> {
        self.check_fault(FaultSite::LiquidProbe, pipette_id, max_z_distance)?;
        let mut state = self.state.lock();
        let surface = state.liquid_surface_z;
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.require_tip(pipette_id)?;
        let start = pipette.position.z;
        match surface {
            Some(z) if z <= start && start - z <= max_z_distance => {
                pipette.position.z = z;
                debug!("{} found liquid at z={:.2}", pipette_id, z);
                Ok(z)
            }
            _ => {
                pipette.position.z = start - max_z_distance;
                Err(HardwareError::LiquidNotFound {
                    pipette_id: pipette_id.to_string(),
                    max_z_distance,
                })
            }
        }
    }

    async fn pick_up_tip(&self, pipette_id: &str, tip_length: f64) -> Result<(), HardwareError> {
        self.check_fault(FaultSite::PickUpTip, pipette_id, 0.0)?;
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        if pipette.tip_length.is_some() {
            return Err(HardwareError::TipAlreadyAttached(pipette_id.to_string()));
        }
        pipette.tip_length = Some(tip_length);
        pipette.plunger_volume = 0.0;
        pipette.ready_to_aspirate = false;
        info!("{} picked up a {:.1} mm tip", pipette_id, tip_length);
        Ok(())
    }

    async fn drop_tip_in_place(
        &self,
        pipette_id: &str,
        home_after: bool,
    ) -> Result<(), HardwareError> {
        let fault = self.check_fault(FaultSite::DropTip, pipette_id, 0.0)?;
        let mut state = self.state.lock();
        let pipette = state.pipette_mut(pipette_id)?;
        pipette.plunger_volume = 0.0;
        pipette.ready_to_aspirate = false;
        if fault == Some(InjectedFault::TipStuck) {
            warn!("{} tip stuck after drop", pipette_id);
            return Ok(());
        }
        pipette.tip_length = None;
        info!("{} dropped tip (home after: {})", pipette_id, home_after);
        Ok(())
    }

    async fn tip_presence(&self, pipette_id: &str) -> Result<TipPresence, HardwareError> {
        let state = self.state.lock();
        Ok(match state.pipette(pipette_id)?.tip_length {
            Some(_) => TipPresence::Present,
            None => TipPresence::Absent,
        })
    }

    async fn home(&self) -> Result<(), HardwareError> {
        self.check_fault(FaultSite::Home, "gantry", 0.0)?;
        let mut state = self.state.lock();
        for pipette in state.pipettes.values_mut() {
            pipette.position = HOME_POSITION;
        }
        if let Some(gripper) = state.gripper.as_mut() {
            gripper.position = HOME_POSITION;
        }
        state.home_count += 1;
        info!("Simulated gantry homed");
        Ok(())
    }

    async fn update_position_estimators(
        &self,
        pipette_id: Option<&str>,
    ) -> Result<(), HardwareError> {
        let state = self.state.lock();
        if let Some(id) = pipette_id {
            state.pipette(id)?;
        }
        debug!("Position estimators updated ({:?})", pipette_id);
        Ok(())
    }

    async fn move_module_lid(
        &self,
        module_id: &str,
        action: LidAction,
    ) -> Result<(), HardwareError> {
        if !self.state.lock().modules.contains(module_id) {
            return Err(HardwareError::ModuleNotAttached(module_id.to_string()));
        }
        info!("Module {} lid: {:?}", module_id, action);
        Ok(())
    }

    fn has_gripper(&self) -> bool {
        self.state.lock().gripper.is_some()
    }

    fn is_gripping_labware(&self) -> Result<bool, HardwareError> {
        self.state
            .lock()
            .gripper
            .as_ref()
            .map(|gripper| gripper.holding_labware)
            .ok_or(HardwareError::GripperNotAttached)
    }

    async fn place_labware(&self, drop_point: DeckPoint) -> Result<(), HardwareError> {
        if let Some(latency) = self.move_latency {
            tokio::time::sleep(latency).await;
        }
        self.check_fault(FaultSite::Move, "gripper", 0.0)?;
        let mut state = self.state.lock();
        let gripper = state
            .gripper
            .as_mut()
            .ok_or(HardwareError::GripperNotAttached)?;
        gripper.position = drop_point;
        gripper.holding_labware = false;
        info!("Gripper released labware at {:?}", drop_point);
        Ok(())
    }
}
