//! Fault injection for the simulation driver.
//!
//! Faults are queued per call site and consumed first-in first-out, one
//! per matching call.

use std::collections::VecDeque;
use vial_common::hal::driver::HardwareError;

/// Driver call that a fault can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultSite {
    /// `aspirate_in_place`.
    Aspirate,
    /// `dispense_in_place`.
    Dispense,
    /// `blow_out_in_place`.
    BlowOut,
    /// `prepare_for_aspirate`.
    PrepareForAspirate,
    /// `move_to` and `move_relative`.
    Move,
    /// `liquid_probe`.
    LiquidProbe,
    /// `drop_tip_in_place`.
    DropTip,
    /// `pick_up_tip`.
    PickUpTip,
    /// `home`.
    Home,
}

/// Failure to produce at a site.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedFault {
    /// Plunger overpressure.
    Overpressure,
    /// Gantry stall.
    Stall,
    /// Probe finds no liquid.
    NoLiquid,
    /// Tip stays on after a drop.
    TipStuck,
    /// Transport failure with a message.
    Communication(String),
}

impl InjectedFault {
    /// Hardware error this fault raises, if it raises one.
    ///
    /// `TipStuck` completes the call and is observed via the tip sensor.
    pub(crate) fn to_error(&self, pipette_id: &str, max_z_distance: f64) -> Option<HardwareError> {
        match self {
            Self::Overpressure => Some(HardwareError::PipetteOverpressure {
                pipette_id: pipette_id.to_string(),
                detail: "simulated overpressure".to_string(),
            }),
            Self::Stall => Some(HardwareError::StallOrCollisionDetected(format!(
                "simulated stall on {pipette_id}"
            ))),
            Self::NoLiquid => Some(HardwareError::LiquidNotFound {
                pipette_id: pipette_id.to_string(),
                max_z_distance,
            }),
            Self::TipStuck => None,
            Self::Communication(msg) => Some(HardwareError::CommunicationError(msg.clone())),
        }
    }
}

/// Ordered queue of pending faults.
#[derive(Debug, Default)]
pub struct FaultPlan {
    queue: VecDeque<(FaultSite, InjectedFault)>,
}

impl FaultPlan {
    /// Queue a fault for the next call at `site`.
    pub fn push(&mut self, site: FaultSite, fault: InjectedFault) {
        self.queue.push_back((site, fault));
    }

    /// Remove and return the oldest fault queued for `site`.
    pub fn take(&mut self, site: FaultSite) -> Option<InjectedFault> {
        let index = self.queue.iter().position(|(s, _)| *s == site)?;
        self.queue.remove(index).map(|(_, fault)| fault)
    }

    /// Number of faults still queued.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drop every queued fault.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_are_taken_per_site_in_order() {
        let mut plan = FaultPlan::default();
        plan.push(FaultSite::Move, InjectedFault::Stall);
        plan.push(FaultSite::Aspirate, InjectedFault::Overpressure);
        plan.push(FaultSite::Move, InjectedFault::Communication("bus".into()));

        assert_eq!(plan.take(FaultSite::Aspirate), Some(InjectedFault::Overpressure));
        assert_eq!(plan.take(FaultSite::Aspirate), None);
        assert_eq!(plan.take(FaultSite::Move), Some(InjectedFault::Stall));
        assert_eq!(plan.pending(), 1);
        plan.clear();
        assert_eq!(plan.take(FaultSite::Move), None);
    }

    #[test]
    fn tip_stuck_raises_nothing() {
        assert!(InjectedFault::TipStuck.to_error("p", 0.0).is_none());
        assert!(matches!(
            InjectedFault::NoLiquid.to_error("p", 5.0),
            Some(HardwareError::LiquidNotFound { max_z_distance, .. }) if max_z_distance == 5.0
        ));
    }
}
